//! Per-invocation log capture
//!
//! [`capture`] installs a recording subscriber for exactly one closure call. The
//! records are returned to the caller and, through [`replay`], handed on to
//! whatever subscriber the host installed, so nothing leaks across units.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::Layer;

/// A log event emitted by a plug-in during its own invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureLayer {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CaptureLayer {
    pub fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        self.records.lock().push(LogRecord {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Run `f` with a recording subscriber and return its output and records.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<LogRecord>) {
    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let output = tracing::subscriber::with_default(subscriber, f);
    (output, layer.take())
}

/// Re-emit captured records to the ambient subscriber.
pub fn replay(records: &[LogRecord], plugin: &str) {
    for record in records {
        let level: Level = record.level.parse().unwrap_or(Level::INFO);
        let message = record.message.as_str();
        let source = record.target.as_str();
        match level {
            Level::ERROR => tracing::error!(plugin, source, "{}", message),
            Level::WARN => tracing::warn!(plugin, source, "{}", message),
            Level::INFO => tracing::info!(plugin, source, "{}", message),
            Level::DEBUG => tracing::debug!(plugin, source, "{}", message),
            _ => tracing::trace!(plugin, source, "{}", message),
        }
    }
}
