//! Compatibility and ordering logic
//!
//! Decides which plug-in runs against which instance, in which order, and when a
//! run has to stop early.

mod abort;
mod iterator;
mod matching;

pub use abort::{default_abort_test, default_test, AbortTest};
pub use iterator::{IterOptions, Unit, Units};
pub(crate) use iterator::publishable_instances;
pub use matching::{
    family_matches, host_matches, instances_by_plugin, plugins_by_family, plugins_by_host,
    plugins_by_instance, sort, target_matches, MatchMode,
};
