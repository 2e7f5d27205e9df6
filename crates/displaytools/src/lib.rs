pub mod config;
pub mod display;
pub mod error;
pub mod logical_lines;
pub mod markers;
pub mod rewriter;
pub mod segments;
pub mod shell;
pub mod tokenizer;

pub use error::RewriteError;
pub use rewriter::{CallNames, Rewriter, rewrite};
pub use shell::{CellRunner, DisplayTools};
