//! Processing protocol
//!
//! Runs one unit at a time and turns whatever happened into a [`PluginResult`]:
//! logs emitted during the call, the elapsed time, and any error with its
//! traceback. A failing unit never stops the stream; only the abort test does.

pub mod commit;
mod process;
mod publisher;
mod result;

pub use commit::{commit, commit_configured, commit_path, CommitSettings};
pub use process::{process, process_checked, process_legacy};
pub use publisher::Publisher;
pub use result::{PluginResult, PluginSummary};
