//! Cross-process mutual exclusion for the token cache's backing storage.

mod cross_process;
mod file_lock;

pub use cross_process::CrossProcessLock;
pub use file_lock::{FileLock, OsFileLock};
