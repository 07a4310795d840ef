pub mod base_backend;
pub mod error;
pub mod normalizing;
pub mod storage;
pub mod types;

pub use base_backend::{BackendCapability, BaseBackend};
pub use error::{BackendError, BackendResult};
pub use normalizing::ErrorNormalizingBackend;
pub use storage::{FileSystem, LocalFileSystem};
