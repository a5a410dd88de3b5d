pub mod config;
pub mod error;
pub mod fsutil;
pub mod limiter;
pub mod net;
pub mod probe;
pub mod progress;
pub mod task;
pub mod transfer;


pub use crate::config::TransferConfig;
pub use crate::error::{TransferError, TransferResult};
pub use crate::probe::RemoteCapability;
pub use crate::progress::{NullObserver, ProgressObserver, ProgressSnapshot};
pub use crate::task::{TransferStatus, TransferTask};
pub use crate::transfer::TransferEngine;
