//! Core study-analytics library for the opening trainer.
//!
//! Provides:
//! - Token-sequence utilities (tokenize, longest common prefix, chunking)
//! - SM-2 spaced repetition scheduling for opening lines
//! - Typed-recall quiz checking (strict prefix scoring)
//! - Opening branch-tree building
//! - Evaluation-swing detection over an external oracle

pub mod error;
pub mod quiz;
pub mod scheduler;
pub mod swing;
pub mod tokens;
pub mod tree;
pub mod types;

pub use error::{CoreError, Result};
pub use quiz::{check, QuizResult};
pub use scheduler::{pick_due, DueOpening, Sm2};
pub use swing::{
    analyze_line, EvalOracle, LargestSwing, OracleScore, PlyEval, ScanAborted, SwingReport,
    MATE_SCORE,
};
pub use tokens::{chunk_tokens, longest_common_prefix, tokenize};
pub use tree::{branch_at, build_tree, BranchNode, OpeningTree, TreeNode, END_TOKEN};
pub use types::{OpeningLine, PromptMode, ReviewLogEntry, SchedulerState, Side};
