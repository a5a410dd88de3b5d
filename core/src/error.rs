use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("server ignored range request")]
    RangeNotHonored,
    #[error("io error: {0}")]
    Io(String),
    #[error("finalize failed: {0}")]
    Finalize(String),
    #[error("transfer failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl TransferError {
    /// Whether another attempt may succeed. Finalize failures and an
    /// exhausted retry budget are terminal for the task.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::Network(_) => true,
            TransferError::Status(_) => true,
            TransferError::RangeNotHonored => true,
            TransferError::Io(_) => true,
            TransferError::Finalize(_) => false,
            TransferError::Exhausted { .. } => false,
        }
    }
}

pub type TransferResult<T> = Result<T, TransferError>;
