mod batch;
mod hash;
mod retry;
mod task;
mod transfer;

pub use batch::BatchDownloadCoordinator;
pub use hash::{HashAlgorithm, HashVerifier};
pub use retry::RetryPolicy;
pub use task::{DownloadResult, DownloadTask};
pub use transfer::{Transfer, TransferEngine};
