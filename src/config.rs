//! Explorer configuration
//!
//! Loaded once when an explorer is built, from environment variables, a YAML
//! document, or plain defaults.

use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

/// Spacing rules for the layout engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical space reserved per visible node
    pub node_spacing: f64,
    /// Extra space added to the canvas height
    pub padding: f64,
    /// Canvas never gets shorter than this
    pub minimum_height: f64,
    /// Order increment between siblings sharing a parent
    pub sibling_separation: f64,
    /// Order increment when the next node hangs off a different parent
    pub cousin_separation: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 40.0,
            padding: 80.0,
            minimum_height: 400.0,
            sibling_separation: 1.0,
            cousin_separation: 1.5,
        }
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Start with the root expanded
    pub root_expanded: bool,
    pub layout: LayoutConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            root_expanded: true,
            layout: LayoutConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Defaults overridden by `DRILLDOWN_*` environment variables
    pub fn from_env() -> Result<Self, ExplorerError> {
        let defaults = LayoutConfig::default();
        let config = Self {
            root_expanded: env_bool("DRILLDOWN_ROOT_EXPANDED", true),
            layout: LayoutConfig {
                node_spacing: env_f64("DRILLDOWN_NODE_SPACING", defaults.node_spacing)?,
                padding: env_f64("DRILLDOWN_PADDING", defaults.padding)?,
                minimum_height: env_f64("DRILLDOWN_MIN_HEIGHT", defaults.minimum_height)?,
                sibling_separation: env_f64(
                    "DRILLDOWN_SIBLING_SEPARATION",
                    defaults.sibling_separation,
                )?,
                cousin_separation: env_f64(
                    "DRILLDOWN_COUSIN_SEPARATION",
                    defaults.cousin_separation,
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ExplorerError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ExplorerError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExplorerError> {
        let layout = &self.layout;
        let checks = [
            ("node_spacing", layout.node_spacing),
            ("padding", layout.padding),
            ("minimum_height", layout.minimum_height),
            ("sibling_separation", layout.sibling_separation),
            ("cousin_separation", layout.cousin_separation),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(ExplorerError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if layout.cousin_separation < layout.sibling_separation {
            return Err(ExplorerError::Config(format!(
                "cousin_separation ({}) must not be smaller than sibling_separation ({})",
                layout.cousin_separation, layout.sibling_separation
            )));
        }
        Ok(())
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64, ExplorerError> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ExplorerError::Config(format!("{} is not a number: {:?}", key, v))),
        Err(_) => Ok(default),
    }
}
