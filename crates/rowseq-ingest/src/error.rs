use thiserror::Error as ThisError;

///
/// IngestError
///

#[derive(Debug, ThisError)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] rowseq::Error),

    #[error("malformed export: {0}")]
    Export(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
