pub mod completion_waiter;
pub mod reply_extractor;
pub mod search_mode;

pub use completion_waiter::{CompletionWaiter, Settled};
pub use reply_extractor::{collect_citations, ReplyExtractor};
pub use search_mode::{ensure_search_mode, SearchMode};
