//! Shared token-sequence helpers.

/// Split a move string into SAN tokens, in play order.
pub fn tokenize(moves: &str) -> Vec<String> {
    moves.split_whitespace().map(str::to_string).collect()
}

/// Longest prefix shared by every sequence.
///
/// Computed positionally up to the shortest sequence's length; empty when
/// the set is empty or the sequences diverge at position 0.
pub fn longest_common_prefix(seqs: &[Vec<String>]) -> Vec<String> {
    let Some(first) = seqs.first() else {
        return Vec::new();
    };
    let shortest = seqs.iter().map(Vec::len).min().unwrap_or(0);

    let mut prefix = Vec::new();
    for i in 0..shortest {
        let token = &first[i];
        if seqs[1..].iter().all(|s| &s[i] == token) {
            prefix.push(token.clone());
        } else {
            break;
        }
    }
    prefix
}

/// Join tokens into fixed-size chunks for study-sheet display.
pub fn chunk_tokens(tokens: &[String], size: usize) -> Vec<String> {
    if size == 0 {
        return Vec::new();
    }
    tokens.chunks(size).map(|chunk| chunk.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seq(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn tokenize_collapses_whitespace() {
        assert_eq!(tokenize("  e4   e5 \t Nf3 "), vec!["e4", "e5", "Nf3"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn common_prefix_of_diverging_lines() {
        let seqs = vec![seq("e4 e5 Nf3"), seq("e4 e5 Nc6")];
        assert_eq!(longest_common_prefix(&seqs), vec!["e4", "e5"]);
    }

    #[test]
    fn common_prefix_stops_at_shortest() {
        let seqs = vec![seq("e4 e5 Nf3 Nc6"), seq("e4 e5")];
        assert_eq!(longest_common_prefix(&seqs), vec!["e4", "e5"]);
    }

    #[test]
    fn common_prefix_empty_cases() {
        assert!(longest_common_prefix(&[]).is_empty());
        let diverge_at_zero = vec![seq("e4 e5"), seq("d4 d5")];
        assert!(longest_common_prefix(&diverge_at_zero).is_empty());
    }

    #[test]
    fn single_sequence_is_its_own_prefix() {
        let seqs = vec![seq("e4 e5 Nf3")];
        assert_eq!(longest_common_prefix(&seqs), vec!["e4", "e5", "Nf3"]);
    }

    #[test]
    fn chunking_groups_tokens() {
        let tokens = seq("e4 e5 Nf3 Nc6 d4");
        assert_eq!(
            chunk_tokens(&tokens, 2),
            vec!["e4 e5", "Nf3 Nc6", "d4"]
        );
        assert!(chunk_tokens(&tokens, 0).is_empty());
    }
}
