//! Ambient configuration: a `serde::Deserialize` struct with
//! `#[serde(default = ...)]` fields, a `CONFIG_FILE_NAME` constant, and an
//! upward `find_config_file` search that stops at a repository's `.git`
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::resolve::interpolate::{BoolStyle, ListStyle, ParsingConfig};

pub const CONFIG_FILE_NAME: &str = ".stagecraft.toml";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default = "default_pipeline_file")]
    pub pipeline_file: String,
    #[serde(default = "default_params_path")]
    pub default_params_path: String,
    #[serde(default)]
    pub parsing: ParsingSwitches,
}

/// The `parsing.bool`/`parsing.list` configuration keys — the behavioral
/// switches Command-dict expansion reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParsingSwitches {
    #[serde(default = "default_bool_style")]
    pub bool: BoolStyleConfig,
    #[serde(default = "default_list_style")]
    pub list: ListStyleConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoolStyleConfig {
    StoreTrue,
    BooleanOptional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListStyleConfig {
    Nargs,
    Append,
}

fn default_pipeline_file() -> String {
    "pipeline.yaml".to_string()
}

fn default_params_path() -> String {
    "params.yaml".to_string()
}

fn default_bool_style() -> BoolStyleConfig {
    BoolStyleConfig::StoreTrue
}

fn default_list_style() -> ListStyleConfig {
    ListStyleConfig::Nargs
}

impl Default for ParsingSwitches {
    fn default() -> Self {
        ParsingSwitches { bool: default_bool_style(), list: default_list_style() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pipeline_file: default_pipeline_file(),
            default_params_path: default_params_path(),
            parsing: ParsingSwitches::default(),
        }
    }
}

impl Config {
    pub fn parsing_config(&self) -> ParsingConfig {
        ParsingConfig {
            bool_style: match self.parsing.bool {
                BoolStyleConfig::StoreTrue => BoolStyle::StoreTrue,
                BoolStyleConfig::BooleanOptional => BoolStyle::BooleanOptional,
            },
            list_style: match self.parsing.list {
                ListStyleConfig::Nargs => ListStyle::Nargs,
                ListStyleConfig::Append => ListStyle::Append,
            },
        }
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

pub struct ConfigLoadResult {
    pub config: Config,
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {path:?}"))?;
            let config: Config = ::toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {path:?}"))?;
            Ok(ConfigLoadResult { config, from_file: true })
        }
        None => Ok(ConfigLoadResult { config: Config::default(), from_file: false }),
    }
}
