pub mod storage;

pub use storage::{MemoryScheduler, DEFAULT_VISIBILITY_TIMEOUT};
