//! Validation options
//!
//! Options come from three places, later ones overriding earlier ones:
//! 1. `PAIRL_STRICT` / `PAIRL_PROJECTED_COST` environment variables
//! 2. A YAML file (`strict: true`, `projected_cost: 0.04`)
//! 3. Explicit CLI flags

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PairlError, Result};

pub const STRICT_ENV: &str = "PAIRL_STRICT";
pub const PROJECTED_COST_ENV: &str = "PAIRL_PROJECTED_COST";

/// Knobs for one validation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationOptions {
    /// Escalate no-new-facts findings to errors when the message opts in
    /// with `#rule no_new_facts=true`
    pub strict: bool,
    /// Externally projected cost, checked against `@budget` before the
    /// message's own `#cost` records
    pub projected_cost: Option<f64>,
}

impl ValidationOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            projected_cost: None,
        }
    }

    pub fn with_projected_cost(mut self, cost: f64) -> Self {
        self.projected_cost = Some(cost);
        self
    }

    /// Read options from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read options through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(value) = lookup(STRICT_ENV) {
            options.strict = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(PairlError::InvalidEnv {
                        var: STRICT_ENV.to_string(),
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup(PROJECTED_COST_ENV) {
            let cost = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|c| c.is_finite() && *c >= 0.0)
                .ok_or_else(|| PairlError::InvalidEnv {
                    var: PROJECTED_COST_ENV.to_string(),
                    value: value.clone(),
                })?;
            options.projected_cost = Some(cost);
        }

        Ok(options)
    }

    /// Overlay the values `layer` sets on top of `self`
    pub fn merged_with(mut self, layer: &OptionsLayer) -> Self {
        if let Some(strict) = layer.strict {
            self.strict = strict;
        }
        if layer.projected_cost.is_some() {
            self.projected_cost = layer.projected_cost;
        }
        self
    }
}

/// Options as written in a config file: absent keys leave the lower layer alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_cost: Option<f64>,
}

/// Load an options layer from a YAML file
pub fn load_options(path: impl AsRef<Path>) -> Result<OptionsLayer> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| PairlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let layer: OptionsLayer =
        serde_yaml::from_str(&content).map_err(|source| PairlError::Config {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        path = %path.display(),
        strict = ?layer.strict,
        projected_cost = ?layer.projected_cost,
        "loaded validation options"
    );
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_are_loose() {
        let options = ValidationOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, ValidationOptions::default());
        assert!(!options.strict);
    }

    #[test]
    fn test_env_values() {
        let options = ValidationOptions::from_lookup(lookup(&[
            (STRICT_ENV, "TRUE"),
            (PROJECTED_COST_ENV, "0.25"),
        ]))
        .unwrap();
        assert!(options.strict);
        assert_eq!(options.projected_cost, Some(0.25));
    }

    #[test]
    fn test_bad_env_values() {
        let err = ValidationOptions::from_lookup(lookup(&[(STRICT_ENV, "maybe")])).unwrap_err();
        assert!(matches!(err, PairlError::InvalidEnv { .. }));
        let err =
            ValidationOptions::from_lookup(lookup(&[(PROJECTED_COST_ENV, "-3")])).unwrap_err();
        assert!(err.to_string().contains(PROJECTED_COST_ENV));
    }

    fn write_yaml(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("pairl.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_merge() {
        let base = ValidationOptions::default().with_projected_cost(1.0);
        let merged = base.merged_with(&OptionsLayer {
            strict: Some(true),
            projected_cost: None,
        });
        assert!(merged.strict);
        assert_eq!(merged.projected_cost, Some(1.0));
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(&dir, "strict: true\nprojected_cost: 0.04\n");
        let layer = load_options(&path).unwrap();
        assert_eq!(layer.strict, Some(true));
        assert_eq!(layer.projected_cost, Some(0.04));
    }

    #[test]
    fn test_file_turns_strict_off_over_env() {
        let env = ValidationOptions::from_lookup(lookup(&[(STRICT_ENV, "1")])).unwrap();
        assert!(env.strict);

        let dir = tempfile::tempdir().unwrap();
        let layer = load_options(write_yaml(&dir, "strict: false\n")).unwrap();
        let merged = env.merged_with(&layer);
        assert!(!merged.strict);
    }

    #[test]
    fn test_absent_file_keys_keep_env_values() {
        let env = ValidationOptions::from_lookup(lookup(&[
            (STRICT_ENV, "yes"),
            (PROJECTED_COST_ENV, "0.5"),
        ]))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let layer = load_options(write_yaml(&dir, "projected_cost: 0.1\n")).unwrap();
        assert_eq!(layer.strict, None);
        let merged = env.merged_with(&layer);
        assert!(merged.strict);
        assert_eq!(merged.projected_cost, Some(0.1));
    }

    #[test]
    fn test_load_yaml_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(&dir, "strictness: high\n");
        assert!(matches!(
            load_options(&path),
            Err(PairlError::Config { .. })
        ));
    }
}
