use crate::error::ProcessError;
use crate::logging::LogRecord;
use crate::plugin::PluginClass;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity of the plug-in a result belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginSummary {
    pub name: String,
    pub label: String,
    pub id: Uuid,
    pub order: f64,
}

impl From<&PluginClass> for PluginSummary {
    fn from(class: &PluginClass) -> Self {
        Self {
            name: class.name().to_string(),
            label: class.label().to_string(),
            id: class.id(),
            order: class.sort_order(),
        }
    }
}

/// Outcome of processing one unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginResult {
    pub plugin: PluginSummary,
    /// Name of the processed instance, `None` for a context-level pass
    pub instance: Option<String>,
    pub success: bool,
    pub records: Vec<LogRecord>,
    pub duration_ms: f64,
    pub error: Option<ProcessError>,
}

impl PluginResult {
    pub fn order(&self) -> f64 {
        self.plugin.order
    }

    /// JSON summary kept in the context's result log.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
