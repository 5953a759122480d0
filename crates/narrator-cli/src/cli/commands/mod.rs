//! CLI command handlers, one file per command.

mod extract;
mod run;
mod split;
mod status;
mod usage;

pub use extract::run_extract;
pub use run::{run_documents, RunArgs};
pub use split::run_split;
pub use status::run_status;
pub use usage::run_usage;
