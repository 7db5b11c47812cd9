//! Shape validation and framework version compatibility

use super::category::Category;
use super::class::PluginClass;
use semver::{Version, VersionReq};

/// Check that a class declares everything its category needs.
///
/// Returns every problem found, not just the first.
pub fn validate_shape(class: &PluginClass) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();

    match class.order() {
        None => problems.push("order is undefined".to_string()),
        Some(order) if !order.is_finite() => {
            problems.push(format!("order {} is not a finite number", order))
        }
        Some(_) => {}
    }

    if let Err(e) = VersionReq::parse(class.requires()) {
        problems.push(format!(
            "requires '{}' is not a valid version predicate: {}",
            class.requires(),
            e
        ));
    }

    match class.category() {
        Category::Collector => {
            if class.hosts().is_empty() {
                problems.push("collector declares no hosts".to_string());
            }
        }
        Category::Validator | Category::Extractor => {
            if class.hosts().is_empty() && class.families().is_empty() {
                problems.push(format!(
                    "{} declares neither hosts nor families",
                    class.category()
                ));
            }
        }
        Category::Integrator => {
            if class.families().is_empty() {
                problems.push("integrator declares no families".to_string());
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

/// Whether the running framework satisfies the class's `requires`.
///
/// An unparsable predicate is never satisfied.
pub fn version_compatible(class: &PluginClass, framework: &Version) -> bool {
    VersionReq::parse(class.requires())
        .map(|req| req.matches(framework))
        .unwrap_or(false)
}
