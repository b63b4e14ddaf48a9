// ============================================================
// Layer 4 — Document Loader
// ============================================================
// Loads annotated documents from JSON.
//
// Accepted inputs:
//   a .json file       holding one document or an array of them
//   a directory        every *.json file in it, sorted by name
//
// Document JSON (see domain::document):
//   {
//     "id": "doc-1",
//     "text": "Alice met Bob in Paris",
//     "spans": {
//       "entities": { "gold": [ {"start": 0, "end": 5, "label": "PER"}, ... ] }
//     },
//     "relations": {
//       "relations": { "gold": [ {"head": {...}, "tail": {...}, "label": "met_person"} ] }
//     }
//   }
//
// A missing path yields an empty corpus with a warning. A file
// that does not parse is an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::document::Document;
use crate::domain::error::Result;
use crate::domain::traits::DocumentSource;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Document>),
    One(Box<Document>),
}

/// Loads documents from a JSON file or a directory of JSON files.
/// Implements the DocumentSource trait from Layer 3.
pub struct JsonDocumentLoader {
    path: PathBuf,
}

impl JsonDocumentLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for JsonDocumentLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if !self.path.exists() {
            tracing::warn!(
                "Document path '{}' does not exist, returning empty corpus",
                self.path.display()
            );
            return Ok(Vec::new());
        }

        if self.path.is_file() {
            return load_file(&self.path);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        files.sort();

        let mut docs = Vec::new();
        for file in files {
            docs.extend(load_file(&file)?);
        }
        tracing::info!("Loaded {} documents from '{}'", docs.len(), self.path.display());
        Ok(docs)
    }
}

fn load_file(path: &Path) -> Result<Vec<Document>> {
    let json = fs::read_to_string(path)?;
    let docs = match serde_json::from_str::<OneOrMany>(&json)? {
        OneOrMany::Many(docs) => docs,
        OneOrMany::One(doc) => vec![*doc],
    };
    tracing::debug!("Loaded {} documents from '{}'", docs.len(), path.display());
    Ok(docs)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Error;

    const DOC: &str = r#"{
        "text": "Alice met Bob",
        "spans": {"entities": {"gold": [
            {"start": 0, "end": 5, "label": "PER"},
            {"start": 10, "end": 13, "label": "PER"}
        ]}},
        "relations": {"relations": {"gold": [
            {"head": {"start": 0, "end": 5, "label": "PER"},
             "tail": {"start": 10, "end": 13, "label": "PER"},
             "label": "met_person"}
        ]}}
    }"#;

    #[test]
    fn test_load_array_file() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("docs.json");
        fs::write(&file, format!("[{DOC}, {DOC}]")).unwrap();

        let docs = JsonDocumentLoader::new(&file).load_all().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].span_layer("entities").unwrap().len(), 2);
        assert_eq!(docs[0].relation_layer("relations").unwrap().gold()[0].label.to_string(), "met_person");
    }

    #[test]
    fn test_inverted_span_fails_to_load() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, r#"{"text": "Alice", "spans": {"entities": {"gold": [
            {"start": 5, "end": 0, "label": "PER"}
        ]}}}"#)
        .unwrap();

        let result = JsonDocumentLoader::new(&file).load_all();
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_load_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), DOC.replace("Alice", "Alina")).unwrap();
        fs::write(dir.path().join("a.json"), DOC).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = JsonDocumentLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].text().starts_with("Alice"));
        assert!(docs[1].text().starts_with("Alina"));
    }

    #[test]
    fn test_missing_path_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let docs = JsonDocumentLoader::new(dir.path().join("nope")).load_all().unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, "{ not json").unwrap();
        assert!(matches!(JsonDocumentLoader::new(&file).load_all(), Err(Error::Json(_))));
    }
}
