pub mod prompt_flow;
pub mod task_ctx;

pub use prompt_flow::{ChatSessionDriver, TaskOutcome};
pub use task_ctx::TaskCtx;
