//! Abort test evaluated before every processed unit

use crate::order::Band;
use std::sync::Arc;

/// Decides whether a run continues.
///
/// Called with the order of the next unit and the orders of every unit that failed
/// so far. Returning `Some(reason)` stops the run.
pub type AbortTest = Arc<dyn Fn(f64, &[f64]) -> Option<String> + Send + Sync>;

/// Validation failures gate extraction and integration.
pub fn default_test(next_order: f64, orders_with_error: &[f64]) -> Option<String> {
    let boundary = Band::Validation.upper_bound();
    let failed_validation = orders_with_error.iter().any(|order| *order < boundary);
    if failed_validation && next_order >= boundary {
        Some("failed validation".to_string())
    } else {
        None
    }
}

pub fn default_abort_test() -> AbortTest {
    Arc::new(default_test)
}
