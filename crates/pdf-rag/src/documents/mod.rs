//! Document storage and lifecycle

mod manager;
mod storage;

pub use manager::DocumentManager;
pub use storage::{DocumentStorage, PendingUpload, StoredDocument};
