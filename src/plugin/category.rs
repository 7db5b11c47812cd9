//! Plug-in categories and their discovery names

use crate::error::RegistryError;
use crate::order::Band;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Selects or collects instances into the context
    #[serde(alias = "selector")]
    Collector,
    Validator,
    Extractor,
    /// Integrates or conforms extracted output
    #[serde(alias = "conform")]
    Integrator,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Collector,
        Category::Validator,
        Category::Extractor,
        Category::Integrator,
    ];

    pub fn band(self) -> Band {
        match self {
            Category::Collector => Band::Collection,
            Category::Validator => Band::Validation,
            Category::Extractor => Band::Extraction,
            Category::Integrator => Band::Integration,
        }
    }

    pub fn default_order(self) -> f64 {
        self.band().anchor()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Collector => "collector",
            Category::Validator => "validator",
            Category::Extractor => "extractor",
            Category::Integrator => "integrator",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collector" | "collectors" | "selector" | "selectors" => Ok(Category::Collector),
            "validator" | "validators" => Ok(Category::Validator),
            "extractor" | "extractors" => Ok(Category::Extractor),
            "integrator" | "integrators" | "conform" | "conforms" => Ok(Category::Integrator),
            _ => Err(RegistryError::UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("selectors".parse::<Category>().unwrap(), Category::Collector);
        assert_eq!("Validators".parse::<Category>().unwrap(), Category::Validator);
        assert_eq!("conform".parse::<Category>().unwrap(), Category::Integrator);
        assert!(matches!(
            "renderers".parse::<Category>(),
            Err(RegistryError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_default_orders_follow_bands() {
        assert_eq!(Category::Collector.default_order(), 0.0);
        assert_eq!(Category::Integrator.default_order(), 3.0);
    }
}
