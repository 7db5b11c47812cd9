//! Plug-in contract
//!
//! A plug-in is a [`PluginClass`] (declared metadata plus a constructor) and the
//! [`Plugin`] objects it builds. Each processed unit gets a fresh plug-in object
//! whose [`Plugin::process`] receives exactly the services the class declared in
//! its `params`.
//!
//! Older context-wide plug-ins implement [`LegacyPlugin`] instead and are wrapped
//! with [`PluginBuilder::legacy`].

mod category;
mod class;
mod legacy;
mod shape;

pub use category::Category;
pub use class::{Factory, LegacyFactory, PluginBuilder, PluginClass};
pub use legacy::LegacyPlugin;
pub use shape::{validate_shape, version_compatible};

pub(crate) use class::Constructor;

use crate::error::PluginError;
use crate::provider::Arguments;

/// Wildcard accepted in `hosts`, `families` and `targets`
pub const WILDCARD: &str = "*";

/// Target every plug-in declares unless told otherwise
pub const DEFAULT_TARGET: &str = "default";

/// Processing entry point of a plug-in object.
pub trait Plugin: Send {
    fn process(&mut self, args: &Arguments) -> Result<(), PluginError>;
}

/// Adapts a closure into a [`Plugin`].
pub struct FnPlugin<F>(pub F);

impl<F> Plugin for FnPlugin<F>
where
    F: FnMut(&Arguments) -> Result<(), PluginError> + Send,
{
    fn process(&mut self, args: &Arguments) -> Result<(), PluginError> {
        (self.0)(args)
    }
}
