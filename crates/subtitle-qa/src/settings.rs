use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::cli::{CliArgs, CliSources};
use crate::config::AnalysisConfig;

const CONFIG_FILENAME: &str = "subtitle-qa.toml";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(flatten)]
    analysis: AnalysisConfig,
    #[serde(default)]
    output: Option<OutputFileConfig>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
struct OutputFileConfig {
    audit: Option<String>,
    pretty: Option<bool>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub analysis: AnalysisConfig,
    pub output: OutputSettings,
    pub video_duration: Option<f64>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub report: PathBuf,
    pub audit: Option<PathBuf>,
    pub pretty: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString) -> Self {
        ConfigError::InvalidValue {
            path: None,
            field,
            value: value.to_string(),
        }
    }

    fn with_path(self, config_path: Option<&Path>) -> Self {
        match self {
            ConfigError::InvalidValue {
                path: None,
                field,
                value,
            } => ConfigError::InvalidValue {
                path: config_path.map(Path::to_path_buf),
                field,
                value,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let config = read_config_file(&path)?;
        return Ok((config, Some(path)));
    }

    if let Some(project_path) = project_config_path()
        && project_path.exists()
    {
        let config = read_config_file(&project_path)?;
        return Ok((config, Some(project_path)));
    }

    let Some(default_path) = default_config_path() else {
        return Ok((FileConfig::default(), None));
    };
    if !default_path.exists() {
        return Ok((FileConfig::default(), None));
    }
    let config = read_config_file(&default_path)?;
    Ok((config, Some(default_path)))
}

fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

    let FileConfig {
        analysis,
        output: file_output,
    } = file;

    analysis
        .validate()
        .map_err(|err| err.with_path(config_path.as_deref()))?;

    let audit = if sources.audit_from_cli {
        cli.audit.clone().map(expand_pathbuf)
    } else {
        file_output
            .as_ref()
            .and_then(|cfg| normalize_string(cfg.audit.clone()))
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref()))
    };

    let pretty = if sources.compact_from_cli {
        !cli.compact
    } else {
        file_output
            .as_ref()
            .and_then(|cfg| cfg.pretty)
            .unwrap_or(true)
    };

    let video_duration = match cli.video_duration {
        Some(value) if !value.is_finite() || value < 0.0 => {
            return Err(ConfigError::invalid("video_duration", value));
        }
        other => other,
    };

    Ok(EffectiveSettings {
        analysis,
        output: OutputSettings {
            report: expand_pathbuf(cli.output.clone()),
            audit,
            pretty,
        },
        video_duration,
        config_path,
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "subtitle-qa", "subtitle-qa")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join(CONFIG_FILENAME))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    match base {
        Some(base) if !expanded.is_absolute() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/")
        && let Some(base) = BaseDirs::new()
    {
        return base.home_dir().join(stripped);
    }
    PathBuf::from(value)
}
