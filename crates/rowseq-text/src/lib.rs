//! Stateless batch transforms over RowSeq tables: text filtering,
//! vocabulary extraction, and vectorization. Everything here consumes the
//! collection purely as a row source/sink; no persistence or ordering
//! logic lives in this crate.

pub mod config;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod vectorize;

// re-exports
pub use config::{AnalysisConfig, AveragerKind, NgramRange, VectorizerKind};
pub use error::TextError;
pub use filter::{FilterOutput, TextFilter};
pub use pipeline::{Pipeline, PipelineOutput};
pub use vectorize::{BagOfWords, EmbeddingAverager, TfIdf, Vectorizer, Vocabulary};
