//! Legacy context-wide plug-in contract

use crate::error::PluginError;
use crate::model::{Context, Instance};

/// Plug-in processed once per pass with the whole context.
///
/// `process_context` runs first. If it succeeds, `process_instance` runs once per
/// compatible instance and each instance's failure is reported on its own. If it
/// fails, no instance is processed.
pub trait LegacyPlugin: Send {
    fn process_context(&mut self, _context: &Context) -> Result<(), PluginError> {
        Ok(())
    }

    fn process_instance(&mut self, _instance: &Instance) -> Result<(), PluginError> {
        Ok(())
    }
}
