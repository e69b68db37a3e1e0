//! Lexicon-based sentiment scoring.
//!
//! Deliberately simple and deterministic: lowercase the text, count
//! occurrences of each lexicon word as a substring, and take the difference.
//! The output is an advisory signal for the advice prompt, never a gate.

use crate::types::{Polarity, SentimentResult};

/// Words counted toward a positive score.
pub const POSITIVE_LEXICON: [&str; 6] = ["happy", "good", "great", "positive", "joy", "love"];

/// Words counted toward a negative score.
pub const NEGATIVE_LEXICON: [&str; 6] = ["sad", "bad", "terrible", "negative", "hate", "depressed"];

/// Score sentiment for a message.
///
/// Counting is substring-based, so "joyful" counts for "joy". Both lexicons
/// are applied to the same lowercased text; the score is the positive count
/// minus the negative count and the polarity follows the sign.
pub fn score_sentiment(text: &str) -> SentimentResult {
    let lower = text.to_lowercase();

    let positive: usize = POSITIVE_LEXICON.iter().map(|w| lower.matches(w).count()).sum();
    let negative: usize = NEGATIVE_LEXICON.iter().map(|w| lower.matches(w).count()).sum();

    let score = positive as i32 - negative as i32;
    let polarity = if score > 0 {
        Polarity::Positive
    } else if score < 0 {
        Polarity::Negative
    } else {
        Polarity::Neutral
    };

    SentimentResult { score, polarity }
}
