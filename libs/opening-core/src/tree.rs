//! Branching-structure analysis across a set of opening lines.
//!
//! Groups lines by their next divergent token so a repertoire can be
//! memorized as a decision tree: if they play X, respond with Y.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tokens::longest_common_prefix;
use crate::types::OpeningLine;

/// Sentinel token for lines that end before the branching position.
pub const END_TOKEN: &str = "<END>";

const MAX_EXAMPLE_NAMES: usize = 5;

/// One divergence point: the token at a ply and the lines sharing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchNode {
    pub token: String,
    pub count: usize,
    /// Up to five line names, ascending lexicographic.
    pub example_names: Vec<String>,
}

/// A branch together with its continuations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub token: String,
    pub count: usize,
    pub example_names: Vec<String>,
    pub children: Vec<TreeNode>,
}

/// The full branching view over a set of lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningTree {
    /// Tokens every line shares, from the starting position.
    pub common_prefix: Vec<String>,
    /// Branches at the first position past the common prefix.
    pub roots: Vec<TreeNode>,
}

fn token_at(tokens: &[String], position: usize) -> String {
    tokens
        .get(position)
        .cloned()
        .unwrap_or_else(|| END_TOKEN.to_string())
}

/// Partition lines by the token at `position`.
///
/// Lines shorter than `position` fall into the `<END>` bucket. Branches are
/// ordered by descending cardinality, ties broken by ascending token, so
/// the most common continuation always comes first.
pub fn branch_at(lines: &[OpeningLine], position: usize) -> Vec<BranchNode> {
    let mut buckets: BTreeMap<String, Vec<&OpeningLine>> = BTreeMap::new();
    for line in lines {
        let token = token_at(&line.tokens(), position);
        buckets.entry(token).or_default().push(line);
    }

    let mut branches: Vec<BranchNode> = buckets
        .into_iter()
        .map(|(token, bucket)| {
            let mut names: Vec<String> = bucket.iter().map(|l| l.name.clone()).collect();
            names.sort();
            names.truncate(MAX_EXAMPLE_NAMES);
            BranchNode {
                token,
                count: bucket.len(),
                example_names: names,
            }
        })
        .collect();

    branches.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.token.cmp(&b.token)));
    branches
}

/// Build the branching tree starting just past the common prefix.
///
/// Recursion descends only into branches that are not `<END>` and cover
/// more than one line; depth is bounded by `max_depth` alone, never by
/// the data.
pub fn build_tree(lines: &[OpeningLine], max_depth: usize) -> OpeningTree {
    let seqs: Vec<Vec<String>> = lines.iter().map(OpeningLine::tokens).collect();
    let common_prefix = longest_common_prefix(&seqs);
    let roots = branch_level(lines, common_prefix.len(), max_depth);
    OpeningTree {
        common_prefix,
        roots,
    }
}

fn branch_level(lines: &[OpeningLine], position: usize, depth: usize) -> Vec<TreeNode> {
    if depth == 0 || lines.is_empty() {
        return Vec::new();
    }

    branch_at(lines, position)
        .into_iter()
        .map(|branch| {
            let children = if branch.token != END_TOKEN && branch.count > 1 {
                let sub: Vec<OpeningLine> = lines
                    .iter()
                    .filter(|l| token_at(&l.tokens(), position) == branch.token)
                    .cloned()
                    .collect();
                branch_level(&sub, position + 1, depth - 1)
            } else {
                Vec::new()
            };

            TreeNode {
                token: branch.token,
                count: branch.count,
                example_names: branch.example_names,
                children,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(id: i64, name: &str, moves: &str) -> OpeningLine {
        OpeningLine {
            id,
            name: name.to_string(),
            moves: moves.to_string(),
        }
    }

    #[test]
    fn larger_group_comes_first() {
        let lines = vec![
            line(1, "Main A", "e4 e5 Nf3"),
            line(2, "Main B", "e4 e5 Nf3 Nc6"),
            line(3, "Sideline", "e4 e5 Bc4"),
        ];

        let branches = branch_at(&lines, 2);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].token, "Nf3");
        assert_eq!(branches[0].count, 2);
        assert_eq!(branches[1].token, "Bc4");
        assert_eq!(branches[1].count, 1);
    }

    #[test]
    fn count_ties_break_on_token_order() {
        let lines = vec![
            line(1, "A", "e4 e5 Nf3"),
            line(2, "B", "e4 e5 Bc4"),
        ];
        let branches = branch_at(&lines, 2);
        assert_eq!(branches[0].token, "Bc4");
        assert_eq!(branches[1].token, "Nf3");
    }

    #[test]
    fn short_lines_land_in_the_end_bucket() {
        let lines = vec![
            line(1, "Long", "e4 e5 Nf3"),
            line(2, "Short", "e4 e5"),
        ];
        let branches = branch_at(&lines, 2);
        let end = branches.iter().find(|b| b.token == END_TOKEN).unwrap();
        assert_eq!(end.count, 1);
        assert_eq!(end.example_names, vec!["Short"]);
    }

    #[test]
    fn example_names_are_sorted_and_capped() {
        let lines: Vec<OpeningLine> = (0..8)
            .map(|i| line(i, &format!("Line {}", 7 - i), "e4 e5 Nf3"))
            .collect();
        let branches = branch_at(&lines, 2);
        assert_eq!(branches[0].example_names.len(), 5);
        assert_eq!(branches[0].example_names[0], "Line 0");
    }

    #[test]
    fn tree_starts_past_the_common_prefix() {
        let lines = vec![
            line(1, "Scotch: Classical", "e4 e5 Nf3 Nc6 d4 exd4 Nxd4 Bc5"),
            line(2, "Scotch: Schmidt", "e4 e5 Nf3 Nc6 d4 exd4 Nxd4 Nf6"),
            line(3, "Italian", "e4 e5 Nf3 Nc6 Bc4"),
        ];

        let tree = build_tree(&lines, 3);
        assert_eq!(tree.common_prefix, vec!["e4", "e5", "Nf3", "Nc6"]);
        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.roots[0].token, "d4");
        assert_eq!(tree.roots[0].count, 2);
        assert_eq!(tree.roots[1].token, "Bc4");
    }

    #[test]
    fn singleton_branches_are_not_expanded() {
        let lines = vec![
            line(1, "A", "e4 e5 Nf3 Nc6"),
            line(2, "B", "e4 c5 Nf3 d6"),
        ];
        let tree = build_tree(&lines, 4);
        // Diverges at ply 1; each branch is a singleton with no children.
        assert_eq!(tree.common_prefix, vec!["e4"]);
        for root in &tree.roots {
            assert_eq!(root.count, 1);
            assert!(root.children.is_empty());
        }
    }

    #[test]
    fn depth_limit_bounds_recursion() {
        let lines = vec![
            line(1, "A", "e4 e5 Nf3"),
            line(2, "B", "e4 e5 Bc4"),
            line(3, "C", "e4 c5 Nf3"),
        ];

        let shallow = build_tree(&lines, 1);
        assert_eq!(shallow.common_prefix, vec!["e4"]);
        assert_eq!(shallow.roots[0].token, "e5");
        assert_eq!(shallow.roots[0].count, 2);
        // One level only: the shared continuation is grouped but unexpanded.
        assert!(shallow.roots[0].children.is_empty());

        let deeper = build_tree(&lines, 2);
        assert_eq!(deeper.roots[0].children.len(), 2);
    }

    #[test]
    fn empty_input_yields_an_empty_tree() {
        let tree = build_tree(&[], 3);
        assert!(tree.common_prefix.is_empty());
        assert!(tree.roots.is_empty());
    }
}
