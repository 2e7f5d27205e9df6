//! Shell integration
//!
//! [`DisplayTools`] sits in front of whatever executes cells and hands it the
//! rewritten cell instead of the one typed by the user.

use crate::{
    error::RewriteError,
    rewriter::{CallNames, Rewriter},
};

/// Executes a cell of source text
pub trait CellRunner {
    type Outcome;

    fn run_cell(&mut self, cell: &str) -> Self::Outcome;
}

/// Wraps a [`CellRunner`] and rewrites every cell before it runs.
#[derive(Debug)]
pub struct DisplayTools<R> {
    runner: R,
    rewriter: Rewriter,
    last_error: Option<RewriteError>,
}

impl<R: CellRunner> DisplayTools<R> {
    pub fn new(runner: R) -> Self {
        Self::with_rewriter(runner, Rewriter::default())
    }

    pub const fn with_rewriter(runner: R, rewriter: Rewriter) -> Self {
        Self {
            runner,
            rewriter,
            last_error: None,
        }
    }

    /// Rewrite `raw_cell` and run the result.
    ///
    /// When the rewrite fails the error is logged and kept, and the cell runs
    /// exactly as typed.
    pub fn run_cell(&mut self, raw_cell: &str) -> R::Outcome {
        match self.rewriter.rewrite(raw_cell) {
            Ok(cell) => {
                self.last_error = None;
                self.runner.run_cell(&cell)
            }
            Err(error) => {
                log::warn!(
                    "There was an error in the displaytools extension (probably due to unsupported \
                     syntax).\nThis is the error message:\n\n{error}\n\nWe leave this cell unchanged."
                );
                self.last_error = Some(error);
                self.runner.run_cell(raw_cell)
            }
        }
    }

    /// Error of the most recent [`run_cell`](Self::run_cell), if it fell back
    pub const fn last_error(&self) -> Option<&RewriteError> {
        self.last_error.as_ref()
    }

    /// Names the runner has to bind before executing rewritten cells
    pub fn helper_names(&self) -> [&str; 3] {
        self.rewriter.names().helper_names()
    }

    pub const fn names(&self) -> &CallNames {
        self.rewriter.names()
    }

    pub const fn runner(&self) -> &R {
        &self.runner
    }

    pub fn into_runner(self) -> R {
        self.runner
    }
}
