// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one CLI command each:
//
//   prepare_use_case — corpus → tokenizer + prepared task module
//                      (+ an initialised classifier on request)
//   encode_use_case  — prepared task module → encodings summary
//   predict_use_case — task module + classifier → annotated documents
//
// No printing here (that's Layer 1) and no encoding logic
// (that's Layer 3); only workflow coordination.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// Backend the CLI runs models on.
pub type AppBackend = burn::backend::NdArray;

pub mod prepare_use_case;

pub mod encode_use_case;

pub mod predict_use_case;

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Two annotated documents:
    ///   "Alice met Bob"            — 2 PER, met_person(Alice, Bob)
    ///   "Carol met Dave in Paris"  — 2 PER + LOC, met_person(Carol, Dave),
    ///                                lives_in(Carol, Paris)
    pub(crate) fn write_corpus(dir: &Path) -> PathBuf {
        let corpus = r#"[
            {
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
            },
            {
                "text": "Carol met Dave in Paris",
                "spans": {"entities": {"gold": [
                    {"start": 0, "end": 5, "label": "PER"},
                    {"start": 10, "end": 14, "label": "PER"},
                    {"start": 18, "end": 23, "label": "LOC"}
                ]}},
                "relations": {"relations": {"gold": [
                    {"head": {"start": 0, "end": 5, "label": "PER"},
                     "tail": {"start": 10, "end": 14, "label": "PER"},
                     "label": "met_person"},
                    {"head": {"start": 0, "end": 5, "label": "PER"},
                     "tail": {"start": 18, "end": 23, "label": "LOC"},
                     "label": "lives_in"}
                ]}}
            }
        ]"#;
        let path = dir.join("corpus.json");
        fs::write(&path, corpus).unwrap();
        path
    }
}
