//! Configuration
//!
//! Settings are layered, later sources overriding earlier ones:
//! built-in defaults, the user config file, the project config file (or an
//! explicit `--config` path), `DISPLAYTOOLS_*` environment variables and
//! finally command line flags.

use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};

use crate::{
    display::{self, DEFAULT_LINE_WIDTH, DisplayPublisher, MimeBundle},
    rewriter::{CallNames, Rewriter},
};

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "displaytools.toml";

/// Prefix of the environment variables that override file settings
pub const ENV_PREFIX: &str = "DISPLAYTOOLS_";

/// Effective settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Function that displays a value without a label
    pub display_function: String,
    /// Function that displays a labeled value
    pub custom_display_function: String,
    /// Function that summarizes a value in one line
    pub info_function: String,
    /// Text published after every display
    pub delimiter: String,
    /// Width that labeled array representations are wrapped to
    pub line_width: usize,
    /// Fail instead of falling back to the unchanged cell
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        let names = CallNames::default();
        Self {
            display_function: names.display,
            custom_display_function: names.custom_display,
            info_function: names.info,
            delimiter: names.delimiter,
            line_width: DEFAULT_LINE_WIDTH,
            strict: false,
        }
    }
}

impl Config {
    /// Load the layered configuration for the current process.
    pub fn load(explicit: Option<&Path>, overrides: &PartialConfig) -> Result<Self> {
        let project_dir = std::env::current_dir().context("Failed to get current directory")?;
        let loader = ConfigLoader {
            user_config_dir: user_config_dir(),
            project_dir,
            explicit: explicit.map(Path::to_path_buf),
        };
        loader.load(|key| std::env::var(key).ok(), overrides)
    }

    /// Names emitted into rewritten cells
    pub fn call_names(&self) -> CallNames {
        CallNames {
            display: self.display_function.clone(),
            custom_display: self.custom_display_function.clone(),
            info: self.info_function.clone(),
            delimiter: self.delimiter.clone(),
        }
    }

    pub fn rewriter(&self) -> Rewriter {
        Rewriter::new(self.call_names())
    }

    /// Publish `bundle` labeled with `label`, wrapped to the configured width.
    pub fn custom_display(
        &self,
        publisher: &mut impl DisplayPublisher,
        label: &str,
        bundle: &MimeBundle,
    ) -> io::Result<()> {
        display::custom_display(publisher, label, bundle, self.line_width)
    }

    fn apply(&mut self, layer: PartialConfig) {
        let PartialConfig {
            display_function,
            custom_display_function,
            info_function,
            delimiter,
            line_width,
            strict,
        } = layer;

        if let Some(value) = display_function {
            self.display_function = value;
        }
        if let Some(value) = custom_display_function {
            self.custom_display_function = value;
        }
        if let Some(value) = info_function {
            self.info_function = value;
        }
        if let Some(value) = delimiter {
            self.delimiter = value;
        }
        if let Some(value) = line_width {
            self.line_width = value;
        }
        if let Some(value) = strict {
            self.strict = value;
        }
    }
}

/// One configuration layer; unset fields leave lower layers in place
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialConfig {
    pub display_function: Option<String>,
    pub custom_display_function: Option<String>,
    pub info_function: Option<String>,
    pub delimiter: Option<String>,
    pub line_width: Option<usize>,
    pub strict: Option<bool>,
}

impl PartialConfig {
    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Collect `DISPLAYTOOLS_*` variables through `lookup`.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        Ok(Self {
            display_function: var("DISPLAY_FUNCTION"),
            custom_display_function: var("CUSTOM_DISPLAY_FUNCTION"),
            info_function: var("INFO_FUNCTION"),
            delimiter: var("DELIMITER"),
            line_width: parse_var("LINE_WIDTH", var("LINE_WIDTH"))?,
            strict: parse_var("STRICT", var("STRICT"))?,
        })
    }
}

fn parse_var<T>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("Invalid value {raw:?} for {ENV_PREFIX}{name}"))
        })
        .transpose()
}

/// Where configuration files are searched
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Directory holding `displaytools/displaytools.toml`
    pub user_config_dir: Option<PathBuf>,
    /// Directory searched for `displaytools.toml`
    pub project_dir: PathBuf,
    /// Replaces the project file when set
    pub explicit: Option<PathBuf>,
}

impl ConfigLoader {
    /// Merge all layers, reading environment variables through `env`.
    pub fn load(
        &self,
        env: impl Fn(&str) -> Option<String>,
        overrides: &PartialConfig,
    ) -> Result<Config> {
        let mut config = Config::default();

        if let Some(dir) = &self.user_config_dir {
            let path = dir.join("displaytools").join(CONFIG_FILE_NAME);
            if path.is_file() {
                log::debug!("Loading user config from {}", path.display());
                config.apply(PartialConfig::from_file(&path)?);
            }
        }

        match &self.explicit {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                config.apply(PartialConfig::from_file(path)?);
            }
            None => {
                let path = self.project_dir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    log::debug!("Loading project config from {}", path.display());
                    config.apply(PartialConfig::from_file(&path)?);
                }
            }
        }

        config.apply(PartialConfig::from_env(env)?);
        config.apply(overrides.clone());
        log::trace!("Effective config: {config:?}");
        Ok(config)
    }
}

fn user_config_dir() -> Option<PathBuf> {
    match etcetera::choose_base_strategy() {
        Ok(strategy) => Some(strategy.config_dir()),
        Err(error) => {
            log::debug!("No user config directory: {error}");
            None
        }
    }
}
