// ============================================================
// Layer 4 — Character ↔ Token Alignment
// ============================================================
// Two small utilities the relation encoder is built on:
//
//   get_token_slice          character range → token range,
//                            using the tokenizer's char→token map
//   get_window_around_slice  bounded token window that must keep
//                            a required token range inside it
//
// Both return Option: `None` means "this candidate cannot be
// aligned / does not fit". Callers skip such candidates and keep
// going; neither function ever fails hard.
//
// All ranges are half-open: (start, end) covers start..end.
//
// Example (tokens of "Alice met Bob"):
//   chars   A l i c e _ m e t _ B o b
//   token   0 0 0 0 0 - 1 1 1 - 2 2 2
//   get_token_slice((6, 9), ..)   → Some((1, 2))
//   get_token_slice((5, 9), ..)   → None   (char 5 is a space)

/// Convert a character range into a token range.
///
/// `character_offset` is the start of the text the tokenizer saw
/// (e.g. a sentence partition) inside the full document; it is
/// subtracted before asking `char_to_token`.
///
/// Returns `None` when the first or last character of the range
/// maps to no token, or the range lies before the offset.
pub fn get_token_slice<F>(
    character_slice:  (usize, usize),
    char_to_token:    F,
    character_offset: usize,
) -> Option<(usize, usize)>
where
    F: Fn(usize) -> Option<usize>,
{
    let (start, end) = character_slice;
    let start_char = start.checked_sub(character_offset)?;
    // `end` is exclusive, so the last covered character is end - 1
    let last_char = end.checked_sub(1)?.checked_sub(character_offset)?;

    let start_token = char_to_token(start_char)?;
    let last_token  = char_to_token(last_char)?;
    if last_token < start_token {
        return None;
    }
    Some((start_token, last_token + 1))
}

/// Pick a token window of at most `max_window_size` tokens that
/// contains `slice`, centred on it where possible and clipped to
/// `[0, available_input_length)`.
///
/// Returns `None` if `slice` alone is longer than `max_window_size`.
pub fn get_window_around_slice(
    slice:                  (usize, usize),
    max_window_size:        usize,
    available_input_length: usize,
) -> Option<(usize, usize)> {
    let (slice_start, slice_end) = slice;
    let slice_len = slice_end.saturating_sub(slice_start);
    if slice_len > max_window_size {
        return None;
    }

    // Spread the spare room evenly on both sides of the slice
    let spare = (max_window_size - slice_len) as isize;
    let mut window_start = slice_start as isize - spare / 2;
    let mut window_end   = window_start + max_window_size as isize;

    // Shift right if we ran off the beginning
    if window_start < 0 {
        window_end  -= window_start;
        window_start = 0;
    }

    // Shift left if we ran off the end, never below zero
    let available = available_input_length as isize;
    if window_end > available {
        window_start = (window_start - (window_end - available)).max(0);
        window_end   = available;
    }

    Some((window_start as usize, window_end.max(window_start) as usize))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// char→token map for "Alice met Bob" (see module header)
    fn mapper(c: usize) -> Option<usize> {
        match c {
            0..=4   => Some(0),
            6..=8   => Some(1),
            10..=12 => Some(2),
            _ => None,
        }
    }

    #[test]
    fn test_aligned_span() {
        assert_eq!(get_token_slice((0, 5), mapper, 0), Some((0, 1)));
        assert_eq!(get_token_slice((6, 13), mapper, 0), Some((1, 3)));
    }

    #[test]
    fn test_boundary_on_whitespace_is_unaligned() {
        assert_eq!(get_token_slice((5, 9), mapper, 0), None);
        assert_eq!(get_token_slice((6, 10), mapper, 0), None);
    }

    #[test]
    fn test_offset_is_subtracted() {
        // The partition starts at document char 100
        assert_eq!(get_token_slice((110, 113), mapper, 100), Some((2, 3)));
        // A span before the partition cannot be aligned
        assert_eq!(get_token_slice((50, 55), mapper, 100), None);
    }

    #[test]
    fn test_empty_span_at_zero_is_unaligned() {
        assert_eq!(get_token_slice((0, 0), mapper, 0), None);
    }

    #[test]
    fn test_window_is_centred() {
        // slice of 2 tokens, window of 6, plenty of input
        assert_eq!(get_window_around_slice((10, 12), 6, 100), Some((8, 14)));
    }

    #[test]
    fn test_window_clipped_at_start() {
        assert_eq!(get_window_around_slice((1, 3), 6, 100), Some((0, 6)));
    }

    #[test]
    fn test_window_clipped_at_end() {
        assert_eq!(get_window_around_slice((97, 99), 6, 100), Some((94, 100)));
    }

    #[test]
    fn test_window_larger_than_input() {
        assert_eq!(get_window_around_slice((1, 3), 10, 5), Some((0, 5)));
    }

    #[test]
    fn test_slice_too_long_for_window() {
        assert_eq!(get_window_around_slice((0, 7), 6, 100), None);
        assert_eq!(get_window_around_slice((3, 5), 0, 100), None);
    }

    #[test]
    fn test_window_always_contains_slice() {
        let input_len = 20;
        for max_window in 0..=input_len + 2 {
            for start in 0..input_len {
                for end in start..=input_len {
                    let Some((ws, we)) = get_window_around_slice((start, end), max_window, input_len)
                    else {
                        assert!(end - start > max_window);
                        continue;
                    };
                    assert!(ws <= start && end <= we, "window ({ws},{we}) misses ({start},{end})");
                    assert!(we - ws <= max_window);
                    assert!(we <= input_len);
                }
            }
        }
    }
}
