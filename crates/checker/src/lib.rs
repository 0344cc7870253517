//! Discussion-section verification: a pasted spreadsheet row goes in, a
//! judgment about the quote and the student's paraphrase comes out.

pub mod advisory;
pub mod config;
pub mod error;
pub mod pipeline;

pub use advisory::Advisory;
pub use config::CheckerConfig;
pub use error::EvaluationError;
pub use pipeline::{
    DocumentSummary, Evaluation, EvaluationInput, Pipeline, PreparedEvaluation, Preview,
};
