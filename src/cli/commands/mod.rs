//! CLI command implementations.

mod ask;
mod config;
mod context;
mod delete;
mod ingest;
mod list;
mod search;
mod summarize;

pub use ask::run_ask;
pub use config::run_config;
pub use context::{parse_position, run_context};
pub use delete::run_delete;
pub use ingest::run_ingest;
pub use list::run_list;
pub use search::run_search;
pub use summarize::run_summarize;
