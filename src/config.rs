use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use crate::api::FIRST_SEASON_YEAR;
use crate::error::PipelineError;
use crate::export::OutputFormat;
use crate::filter::{DEFAULT_DCAT_FILTER, FilterOptions};

pub const DEFAULT_BASE_URL: &str = "https://ifsc.results.info/api/v1/";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
const DEFAULT_YEAR: i32 = 2025;
const DEFAULT_OUTPUT: &str = "results.csv";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-GB,en;q=0.6";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_FETCH_PARALLELISM: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub year: i32,
    pub dcat_filter: String,
    pub only_finalists: bool,
    pub output: PathBuf,
    pub raw_output: Option<PathBuf>,
    /// Opaque session cookie, sent verbatim.
    pub cookie: Option<String>,
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    pub fetch_parallelism: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            year: DEFAULT_YEAR,
            dcat_filter: DEFAULT_DCAT_FILTER.to_string(),
            only_finalists: true,
            output: PathBuf::from(DEFAULT_OUTPUT),
            raw_output: None,
            cookie: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fetch_parallelism: 1,
        }
    }
}

/// `config.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub year: Option<i32>,
    pub dcat_filter: Option<String>,
    pub only_finalists: Option<bool>,
    pub output: Option<PathBuf>,
    pub raw_output: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub timeout_secs: Option<u64>,
    pub fetch_parallelism: Option<usize>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Default, Clone, Args)]
pub struct Overrides {
    /// Season year to fetch
    #[arg(long)]
    pub year: Option<i32>,
    /// API base URL
    #[arg(long)]
    pub base_url: Option<String>,
    /// Case-insensitive discipline filter, e.g. "boulder" or "lead"
    #[arg(long)]
    pub dcat_filter: Option<String>,
    /// Keep every athlete, not only those who reached the final
    #[arg(long)]
    pub all_athletes: bool,
    /// Output file (.csv or .xlsx)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Also write the unfiltered normalized rows to this CSV
    #[arg(long)]
    pub raw_output: Option<PathBuf>,
    /// Parallel athlete profile lookups
    #[arg(long)]
    pub fetch_parallelism: Option<usize>,
    /// Request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Defaults, then the config file (if present), then the process environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if let Some(file) = read_file_config(path, config_path.is_some())? {
            settings.apply_file(file);
        }
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.year {
            self.year = v;
        }
        if let Some(v) = file.dcat_filter {
            self.dcat_filter = v;
        }
        if let Some(v) = file.only_finalists {
            self.only_finalists = v;
        }
        if let Some(v) = file.output {
            self.output = v;
        }
        if file.raw_output.is_some() {
            self.raw_output = file.raw_output;
        }
        if let Some(v) = file.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file.accept_language {
            self.accept_language = v;
        }
        if let Some(v) = file.timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = file.fetch_parallelism {
            self.fetch_parallelism = v;
        }
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(cookie) = var("COOKIE").and_then(non_empty) {
            self.cookie = Some(cookie);
        }
        if let Some(url) = var("IFSC_BASE_URL").and_then(non_empty) {
            self.base_url = url;
        }
        if let Some(n) = var("FETCH_PARALLELISM").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.fetch_parallelism = n;
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(v) = overrides.year {
            self.year = v;
        }
        if let Some(v) = overrides.base_url {
            self.base_url = v;
        }
        if let Some(v) = overrides.dcat_filter {
            self.dcat_filter = v;
        }
        if overrides.all_athletes {
            self.only_finalists = false;
        }
        if let Some(v) = overrides.output {
            self.output = v;
        }
        if overrides.raw_output.is_some() {
            self.raw_output = overrides.raw_output;
        }
        if let Some(v) = overrides.fetch_parallelism {
            self.fetch_parallelism = v;
        }
        if let Some(v) = overrides.timeout_secs {
            self.timeout_secs = v;
        }
    }

    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(PipelineError::config("base_url is empty"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(PipelineError::config(format!(
                "base_url must be http(s): {url}"
            )));
        }
        if self.year < FIRST_SEASON_YEAR {
            return Err(PipelineError::config(format!(
                "year {} is before the first season ({FIRST_SEASON_YEAR})",
                self.year
            )));
        }
        if self.dcat_filter.trim().is_empty() {
            return Err(PipelineError::config("dcat_filter must not be blank"));
        }
        if self.timeout_secs == 0 {
            return Err(PipelineError::config("timeout_secs must be positive"));
        }
        OutputFormat::from_path(&self.output)?;
        if let Some(raw) = &self.raw_output {
            if OutputFormat::from_path(raw)? != OutputFormat::Csv {
                return Err(PipelineError::config(format!(
                    "raw output must be a .csv file: {}",
                    raw.display()
                )));
            }
        }
        Ok(())
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            dcat_filter: self.dcat_filter.clone(),
            only_finalists: self.only_finalists,
        }
    }

    pub fn parallelism(&self) -> usize {
        self.fetch_parallelism.clamp(1, MAX_FETCH_PARALLELISM)
    }
}

fn read_file_config(path: &Path, required: bool) -> Result<Option<FileConfig>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read config file {}", path.display()));
        }
    };
    let file = toml::from_str::<FileConfig>(&raw)
        .with_context(|| format!("parse config file {}", path.display()))?;
    Ok(Some(file))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_file_env_and_cli() {
        let mut settings = Settings::default();
        let file: FileConfig = toml::from_str(
            r#"
            year = 2024
            dcat_filter = "lead"
            fetch_parallelism = 4
            "#,
        )
        .unwrap();
        settings.apply_file(file);
        settings.apply_env(|key| match key {
            "COOKIE" => Some("session=abc".to_string()),
            "FETCH_PARALLELISM" => Some("8".to_string()),
            _ => None,
        });
        settings.apply_overrides(Overrides {
            year: Some(2023),
            all_athletes: true,
            ..Overrides::default()
        });

        assert_eq!(settings.year, 2023);
        assert_eq!(settings.dcat_filter, "lead");
        assert_eq!(settings.cookie.as_deref(), Some("session=abc"));
        assert_eq!(settings.fetch_parallelism, 8);
        assert!(!settings.only_finalists);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("baseurl = \"x\"").is_err());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let early = Settings {
            year: 1985,
            ..Settings::default()
        };
        assert!(matches!(
            early.validate(),
            Err(PipelineError::Configuration(_))
        ));

        let bad_output = Settings {
            output: PathBuf::from("results.parquet"),
            ..Settings::default()
        };
        assert!(bad_output.validate().is_err());

        let blank_url = Settings {
            base_url: " ".to_string(),
            ..Settings::default()
        };
        assert!(blank_url.validate().is_err());
    }

    #[test]
    fn parallelism_is_clamped() {
        let settings = Settings {
            fetch_parallelism: 0,
            ..Settings::default()
        };
        assert_eq!(settings.parallelism(), 1);
        let settings = Settings {
            fetch_parallelism: 500,
            ..Settings::default()
        };
        assert_eq!(settings.parallelism(), 32);
    }
}
