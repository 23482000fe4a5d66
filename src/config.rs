use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const CONFIG_SCHEMA: &str = include_str!("../deferrals.schema.json");

/// Contents of a deferrals config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub deferrals: DeferralConfig,
}

/// Behavior switches for a [`DeferralRegistry`](crate::deferral::DeferralRegistry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferralConfig {
    /// Waiting on a missing key creates it instead of resolving immediately.
    #[serde(default)]
    pub wait_for_undefined: bool,
    /// Reported on supersede; `create` replaces existing keys either way.
    #[serde(default)]
    pub recreate_on_make: bool,
}

impl DeferralConfig {
    pub fn apply(&mut self, patch: DeferralConfigPatch) {
        if let Some(wait_for_undefined) = patch.wait_for_undefined {
            self.wait_for_undefined = wait_for_undefined;
        }
        if let Some(recreate_on_make) = patch.recreate_on_make {
            self.recreate_on_make = recreate_on_make;
        }
    }
}

/// Partial update for [`DeferralConfig`]; `None` fields are left as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferralConfigPatch {
    #[serde(default)]
    pub wait_for_undefined: Option<bool>,
    #[serde(default)]
    pub recreate_on_make: Option<bool>,
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", config_path.display()))
    }

    /// Parses JSONC text and checks it against the bundled schema.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = json5::from_str(content).context("failed to parse config text")?;
        check_schema(&value)?;
        serde_json::from_value(value).context("failed to deserialize config")
    }
}

fn check_schema(value: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(CONFIG_SCHEMA).context("bundled config schema is not valid json")?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    if let Err(errors) = compiled.validate(value) {
        let messages: Vec<String> = errors.map(|error| error.to_string()).collect();
        return Err(anyhow!("config validation failed: {}", messages.join("; ")));
    }
    Ok(())
}
