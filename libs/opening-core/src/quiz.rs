//! Typed-recall checking for quiz sessions.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::tokens::tokenize;

/// Result of comparing a typed answer against a target prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    /// The prompted prefix of the line's tokens.
    pub target: Vec<String>,
    /// The user's answer, whitespace-tokenized.
    pub typed: Vec<String>,
    /// Leading tokens matched before the first mismatch.
    pub correct_tokens: usize,
}

impl QuizResult {
    pub fn target_tokens(&self) -> usize {
        self.target.len()
    }

    /// Extra typed tokens past the target carry no penalty.
    pub fn fully_correct(&self) -> bool {
        self.correct_tokens == self.target.len()
    }
}

/// Compare a typed answer against the first `prompt_length` tokens.
///
/// Strict prefix matching: one early wrong token zeroes out credit for
/// everything after it, even if later tokens happen to match. Fails with
/// `EmptyTarget` when the line has no tokens at all.
pub fn check(tokens: &[String], typed_text: &str, prompt_length: usize) -> Result<QuizResult> {
    if tokens.is_empty() {
        return Err(CoreError::EmptyTarget);
    }

    let target: Vec<String> = tokens.iter().take(prompt_length).cloned().collect();
    let typed = tokenize(typed_text);
    let correct_tokens = typed
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    Ok(QuizResult {
        target,
        typed,
        correct_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn full_recall_is_fully_correct() {
        let result = check(&toks("e4 e5 Nf3"), "e4 e5 Nf3", 3).unwrap();
        assert_eq!(result.correct_tokens, 3);
        assert_eq!(result.target_tokens(), 3);
        assert!(result.fully_correct());
    }

    #[test]
    fn credit_stops_at_first_mismatch() {
        let result = check(&toks("e4 e5 Nf3"), "e4 e6", 3).unwrap();
        assert_eq!(result.correct_tokens, 1);
        assert!(!result.fully_correct());
    }

    #[test]
    fn later_accidental_matches_earn_nothing() {
        // Wrong second token; the third matches the target but counts for zero.
        let result = check(&toks("e4 e5 Nf3 Nc6"), "e4 d5 Nf3", 4).unwrap();
        assert_eq!(result.correct_tokens, 1);
    }

    #[test]
    fn extra_typed_tokens_are_not_penalized() {
        let result = check(&toks("e4 e5"), "e4 e5 Nf3 Nc6", 2).unwrap();
        assert_eq!(result.correct_tokens, 2);
        assert!(result.fully_correct());
    }

    #[test]
    fn short_answer_is_partial() {
        let result = check(&toks("e4 e5 Nf3 Nc6"), "e4 e5", 4).unwrap();
        assert_eq!(result.correct_tokens, 2);
        assert!(!result.fully_correct());
    }

    #[test]
    fn prompt_longer_than_line_targets_the_whole_line() {
        let result = check(&toks("e4 e5"), "e4 e5", 10).unwrap();
        assert_eq!(result.target_tokens(), 2);
        assert!(result.fully_correct());
    }

    #[test]
    fn empty_line_is_rejected() {
        let err = check(&[], "e4", 3).unwrap_err();
        assert!(matches!(err, CoreError::EmptyTarget));
    }
}
