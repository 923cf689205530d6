//! Character-weighted timestamp estimation.
//!
//! Longer words take longer to say, so each whitespace-separated token gets a
//! share of the audio proportional to its character count (minimum 1). Tokens
//! are laid out back to back from 0 so the last one ends at `duration`.

use crate::error::{ClipforgeError, Result};
use crate::timing::WordTiming;

/// Allocate `duration` seconds across the words of `text`.
///
/// Empty or whitespace-only text yields an empty sequence.
///
/// # Errors
/// `ClipforgeError::Estimation` if `duration` is not a finite positive number.
pub fn estimate(text: &str, duration: f64) -> Result<Vec<WordTiming>> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ClipforgeError::Estimation(format!(
            "duration must be a positive number of seconds, got {duration}"
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let weights: Vec<usize> = words.iter().map(|w| w.chars().count().max(1)).collect();
    let total: usize = weights.iter().sum();

    let mut timings = Vec::with_capacity(words.len());
    let mut consumed = 0usize;
    let mut start = 0.0;
    for (word, weight) in words.into_iter().zip(weights) {
        consumed += weight;
        // Derive each boundary from the running weight so rounding never
        // accumulates and the final end lands on `duration` exactly.
        let end = if consumed == total {
            duration
        } else {
            duration * consumed as f64 / total as f64
        };
        timings.push(WordTiming::new(word, start, end));
        start = end;
    }

    Ok(timings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equal_words_split_evenly() {
        let timings = estimate("HELLO WORLD", 2.0).unwrap();
        assert_eq!(
            timings,
            vec![
                WordTiming::new("HELLO", 0.0, 1.0),
                WordTiming::new("WORLD", 1.0, 2.0),
            ]
        );
    }

    #[test]
    fn empty_text_is_not_an_error() {
        assert!(estimate("", 3.0).unwrap().is_empty());
        assert!(estimate("  \n\t ", 3.0).unwrap().is_empty());
    }

    #[test]
    fn spans_are_contiguous_and_cover_duration() {
        let text = "the quick brown fox jumps over the extraordinarily lazy dog";
        let duration = 7.37;
        let timings = estimate(text, duration).unwrap();

        assert_eq!(timings.len(), 10);
        assert_eq!(timings[0].start, 0.0);
        for pair in timings.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_relative_eq!(timings.last().unwrap().end, duration, epsilon = 1e-9);
        let total: f64 = timings.iter().map(WordTiming::span).sum();
        assert_relative_eq!(total, duration, epsilon = 1e-9);
    }

    #[test]
    fn duration_is_proportional_to_character_count() {
        let timings = estimate("a abcd", 5.0).unwrap();
        assert_relative_eq!(timings[0].span(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(timings[1].span(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn single_character_words_get_nonzero_time() {
        let timings = estimate("I a & 7 x", 1.0).unwrap();
        assert_eq!(timings.len(), 5);
        for t in &timings {
            assert!(t.span() > 0.0, "{t:?} has no duration");
            assert_relative_eq!(t.span(), 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        // "café" is 4 chars but 5 bytes; "naïve" is 5 chars.
        let timings = estimate("café naïve", 9.0).unwrap();
        assert_relative_eq!(timings[0].span(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(timings[1].span(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_positive_duration() {
        assert!(matches!(
            estimate("hello", 0.0),
            Err(ClipforgeError::Estimation(_))
        ));
        assert!(estimate("hello", -1.0).is_err());
        assert!(estimate("hello", f64::NAN).is_err());
    }

    #[test]
    fn tiny_duration_still_contiguous() {
        let timings = estimate("one two three four", 1e-6).unwrap();
        assert_eq!(timings[0].start, 0.0);
        assert_eq!(timings.last().unwrap().end, 1e-6);
        for pair in timings.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].end > pair[0].start);
        }
    }
}
