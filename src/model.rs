//! Data model: the publish session [`Context`] and its [`Instance`]s.

mod context;
mod data;
mod instance;

pub use context::Context;
pub use data::DataMap;
pub use instance::Instance;

/// Context data key holding the session's result log
pub const KEY_RESULTS: &str = "results";
/// Instance data key overriding the native instance name
pub const KEY_NAME: &str = "name";
/// Instance data key holding the primary family
pub const KEY_FAMILY: &str = "family";
/// Instance data key holding additional families
pub const KEY_FAMILIES: &str = "families";
/// Instance data key opting an instance in or out of publishing
pub const KEY_PUBLISH: &str = "publish";
