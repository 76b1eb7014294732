// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::path::{Path, PathBuf};

use anyhow::Context;
use dis::DEFAULT_STACK_SIZE;
use serde::Deserialize;

/// Name of the configuration file looked up next to the input.
pub const CONFIG_FILE_NAME: &str = "disc.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigRoot {
    pub log: ConfigSectionLog,
    pub module: ConfigSectionModule,
}

impl ConfigRoot {
    /// Reads the configuration from `explicit` if given, otherwise from `disc.toml` in the
    /// directory of `input` when that file exists.
    pub fn load(explicit: Option<&Path>, input: &Path) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = sibling_config(input);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        Self::parse(&text).with_context(|| format!("invalid configuration {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigSectionLog {
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigSectionModule {
    pub name: Option<String>,
    pub stack_size: i32,
    pub entry: Option<String>,
}

impl Default for ConfigSectionModule {
    fn default() -> Self {
        Self {
            name: None,
            stack_size: DEFAULT_STACK_SIZE,
            entry: None,
        }
    }
}

#[must_use]
fn sibling_config(input: &Path) -> PathBuf {
    input.parent()
        .unwrap_or_else(|| Path::new(""))
        .join(CONFIG_FILE_NAME)
}
