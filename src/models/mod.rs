pub mod loaders;
pub mod snapshot;
pub mod task;

pub use loaders::SnapshotStore;
pub use snapshot::{OriginStorage, SessionSnapshot, StorageEntry, StoredCookie};
pub use task::{Citation, ExtractionPath, Prompt, RawReply, Task, TaskId, TaskResult, TaskStatus};
