//! Configuration file, environment overrides and their merge with the CLI
//!
//! Precedence, highest first: CLI flag, environment, config file, default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::consts::{
    DEFAULT_CACHE_TTL, DEFAULT_CONCURRENCY, DEFAULT_FETCH_ATTEMPTS, DEFAULT_PRICING_URL,
    DEFAULT_RETRY_BASE, DEFAULT_SOURCE_PRIORITY,
};
use crate::error::AppError;
use crate::source::SourceOverrides;
use crate::utils::Timezone;

const PRICING_URL_ENV: &str = "AGENTCOST_PRICING_URL";
const OFFLINE_ENV: &str = "AGENTCOST_OFFLINE";
const CONCURRENCY_ENV: &str = "AGENTCOST_CONCURRENCY";
const TIMEZONE_ENV: &str = "AGENTCOST_TIMEZONE";
const CACHE_DIR_ENV: &str = "AGENTCOST_CACHE_DIR";
const CLAUDE_CONFIG_ENV: &str = "CLAUDE_CONFIG_DIR";
const CODEX_HOME_ENV: &str = "CODEX_HOME";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) timezone: Option<String>,
    #[serde(default)]
    pub(crate) offline: bool,
    #[serde(default)]
    pub(crate) pricing_url: Option<String>,
    #[serde(default)]
    pub(crate) concurrency: Option<f64>,
    #[serde(default)]
    pub(crate) ignore_pricing_failures: bool,
    #[serde(default)]
    pub(crate) pricing_cache_ttl_hours: Option<u64>,
    #[serde(default)]
    pub(crate) pricing_fetch_attempts: Option<u32>,
    #[serde(default)]
    pub(crate) pricing_retry_base_ms: Option<u64>,
    #[serde(default)]
    pub(crate) source_priority: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) cache_dir: Option<PathBuf>,
}

impl Config {
    /// First config file found wins; none at all means defaults.
    pub(crate) fn load() -> Result<Self, AppError> {
        Self::load_from(&Self::get_config_paths())
    }

    fn load_from(paths: &[PathBuf]) -> Result<Self, AppError> {
        for path in paths {
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };
            let config = toml::from_str::<Config>(&content).map_err(|e| AppError::Config {
                path: path.display().to_string(),
                reason: e.message().to_string(),
            })?;
            debug!(path = %path.display(), "Loaded config");
            return Ok(config);
        }
        Ok(Self::default())
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // ~/.config/agentcost/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("agentcost").join("config.toml"));
        }

        // Platform config dir (~/Library/Application Support on macOS)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("agentcost").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".agentcost.toml"));
        }

        paths
    }
}

/// An environment variable that changed this run's behavior
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ActiveOverride {
    pub(crate) name: &'static str,
    pub(crate) value: String,
}

/// Validated environment overrides
#[derive(Debug, Clone, Default)]
pub(crate) struct EnvOverrides {
    pub(crate) pricing_url: Option<String>,
    pub(crate) offline: Option<bool>,
    pub(crate) concurrency: Option<f64>,
    pub(crate) timezone: Option<Timezone>,
    pub(crate) cache_dir: Option<PathBuf>,
    pub(crate) sources: SourceOverrides,
    pub(crate) active: Vec<ActiveOverride>,
}

fn invalid(name: &str, value: &str, expected: &'static str) -> AppError {
    AppError::InvalidOverride {
        name: name.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(invalid(name, value, "expected 1, 0, true, false, yes or no")),
    }
}

fn parse_url(name: &str, value: &str) -> Result<String, AppError> {
    let url = value.trim();
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url.to_string())
    } else {
        Err(invalid(name, value, "expected an http(s) URL"))
    }
}

fn parse_number(name: &str, value: &str) -> Result<f64, AppError> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(invalid(name, value, "expected a number")),
    }
}

impl EnvOverrides {
    pub(crate) fn from_env() -> Result<Self, AppError> {
        Self::from_vars(std::env::vars())
    }

    /// Unset and empty variables are ignored; anything else must parse.
    pub(crate) fn from_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut overrides = Self::default();
        for (name, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            let name: &'static str = match name.as_str() {
                PRICING_URL_ENV => {
                    overrides.pricing_url = Some(parse_url(&name, &value)?);
                    PRICING_URL_ENV
                }
                OFFLINE_ENV => {
                    overrides.offline = Some(parse_bool(&name, &value)?);
                    OFFLINE_ENV
                }
                CONCURRENCY_ENV => {
                    overrides.concurrency = Some(parse_number(&name, &value)?);
                    CONCURRENCY_ENV
                }
                TIMEZONE_ENV => {
                    let tz = Timezone::parse(Some(&value))
                        .map_err(|_| invalid(&name, &value, "expected an IANA timezone name"))?;
                    overrides.timezone = Some(tz);
                    TIMEZONE_ENV
                }
                CACHE_DIR_ENV => {
                    overrides.cache_dir = Some(PathBuf::from(value.trim()));
                    CACHE_DIR_ENV
                }
                CLAUDE_CONFIG_ENV => {
                    overrides.sources.claude_root = Some(PathBuf::from(value.trim()));
                    CLAUDE_CONFIG_ENV
                }
                CODEX_HOME_ENV => {
                    overrides.sources.codex_home = Some(PathBuf::from(value.trim()));
                    CODEX_HOME_ENV
                }
                _ => continue,
            };
            overrides.active.push(ActiveOverride { name, value });
        }
        overrides.active.sort_by_key(|o| o.name);
        Ok(overrides)
    }
}

/// Command-line values that take part in settings resolution
#[derive(Debug, Clone, Default)]
pub(crate) struct CliOverrides {
    pub(crate) timezone: Option<String>,
    pub(crate) offline: bool,
    pub(crate) pricing_url: Option<String>,
    pub(crate) ignore_pricing_failures: bool,
    pub(crate) concurrency: Option<f64>,
}

/// Effective settings of one run
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) timezone: Timezone,
    pub(crate) offline: bool,
    pub(crate) pricing_url: String,
    pub(crate) ignore_pricing_failures: bool,
    pub(crate) concurrency: f64,
    pub(crate) cache_ttl: Duration,
    pub(crate) fetch_attempts: u32,
    pub(crate) retry_base: Duration,
    pub(crate) source_priority: Vec<String>,
    pub(crate) cache_dir: Option<PathBuf>,
    pub(crate) sources: SourceOverrides,
    pub(crate) active_overrides: Vec<ActiveOverride>,
}

impl Settings {
    pub(crate) fn resolve(
        cli: &CliOverrides,
        env: EnvOverrides,
        config: Config,
        default_cache_dir: Option<PathBuf>,
    ) -> Result<Self, AppError> {
        let timezone = match (&cli.timezone, env.timezone, &config.timezone) {
            (Some(raw), _, _) => Timezone::parse(Some(raw))?,
            (None, Some(tz), _) => tz,
            (None, None, raw) => Timezone::parse(raw.as_deref())?,
        };

        let pricing_url = match (&cli.pricing_url, env.pricing_url, config.pricing_url) {
            (Some(url), _, _) => parse_url("--pricing-url", url)?,
            (None, Some(url), _) => url,
            (None, None, Some(url)) => parse_url("pricing_url", &url)?,
            (None, None, None) => DEFAULT_PRICING_URL.to_string(),
        };

        let source_priority = config
            .source_priority
            .map(|list| list.iter().map(|s| s.trim().to_lowercase()).collect())
            .unwrap_or_else(|| DEFAULT_SOURCE_PRIORITY.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            timezone,
            offline: cli.offline || env.offline.unwrap_or(config.offline),
            pricing_url,
            ignore_pricing_failures: cli.ignore_pricing_failures || config.ignore_pricing_failures,
            concurrency: cli
                .concurrency
                .or(env.concurrency)
                .or(config.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
            cache_ttl: config
                .pricing_cache_ttl_hours
                .map(|h| Duration::from_secs(h.saturating_mul(3600)))
                .unwrap_or(DEFAULT_CACHE_TTL),
            fetch_attempts: config.pricing_fetch_attempts.unwrap_or(DEFAULT_FETCH_ATTEMPTS),
            retry_base: config
                .pricing_retry_base_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RETRY_BASE),
            source_priority,
            cache_dir: env.cache_dir.or(config.cache_dir).or(default_cache_dir),
            sources: env.sources,
            active_overrides: env.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn config_paths_are_searched_in_order() {
        let paths = Config::get_config_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("agentcost")));
    }

    #[test]
    fn first_existing_config_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.toml");
        let second = dir.path().join("b.toml");
        fs::write(
            &second,
            "timezone = \"UTC\"\nconcurrency = 2\nsource_priority = [\"codex\", \"Claude\"]\n",
        )
        .unwrap();
        let config = Config::load_from(&[first, second]).unwrap();
        assert_eq!(config.timezone.as_deref(), Some("UTC"));
        assert_eq!(config.concurrency, Some(2.0));
    }

    #[test]
    fn malformed_config_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "offline = \"sometimes\"").unwrap();
        let err = Config::load_from(std::slice::from_ref(&path)).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn env_overrides_are_validated_and_recorded() {
        let env = EnvOverrides::from_vars(vars(&[
            ("AGENTCOST_OFFLINE", "yes"),
            ("CODEX_HOME", "/tmp/codex"),
            ("AGENTCOST_CONCURRENCY", "3"),
            ("PATH", "/usr/bin"),
            ("CLAUDE_CONFIG_DIR", ""),
        ]))
        .unwrap();
        assert_eq!(env.offline, Some(true));
        assert_eq!(env.concurrency, Some(3.0));
        assert_eq!(env.sources.codex_home, Some(PathBuf::from("/tmp/codex")));
        assert!(env.sources.claude_root.is_none());
        let names: Vec<&str> = env.active.iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["AGENTCOST_CONCURRENCY", "AGENTCOST_OFFLINE", "CODEX_HOME"]);
    }

    #[test]
    fn malformed_env_override_names_the_variable() {
        for (name, value) in [
            ("AGENTCOST_OFFLINE", "maybe"),
            ("AGENTCOST_CONCURRENCY", "lots"),
            ("AGENTCOST_PRICING_URL", "ftp://x"),
            ("AGENTCOST_TIMEZONE", "Mars/Base"),
        ] {
            let err = EnvOverrides::from_vars(vars(&[(name, value)])).unwrap_err();
            assert!(matches!(err, AppError::InvalidOverride { .. }));
            assert!(err.to_string().contains(name), "{err}");
            assert!(err.to_string().contains(value), "{err}");
        }
    }

    #[test]
    fn precedence_is_cli_then_env_then_config() {
        let config: Config = toml::from_str(
            "pricing_url = \"https://config.test/p.json\"\nconcurrency = 2\noffline = true\n",
        )
        .unwrap();
        let env = EnvOverrides::from_vars(vars(&[
            ("AGENTCOST_PRICING_URL", "https://env.test/p.json"),
            ("AGENTCOST_OFFLINE", "0"),
        ]))
        .unwrap();
        let cli = CliOverrides {
            concurrency: Some(16.0),
            ..CliOverrides::default()
        };
        let settings = Settings::resolve(&cli, env, config, None).unwrap();
        assert_eq!(settings.pricing_url, "https://env.test/p.json");
        assert_eq!(settings.concurrency, 16.0);
        assert!(!settings.offline);
    }

    #[test]
    fn defaults_apply_without_any_input() {
        let settings = Settings::resolve(
            &CliOverrides::default(),
            EnvOverrides::default(),
            Config::default(),
            Some(PathBuf::from("/cache")),
        )
        .unwrap();
        assert_eq!(settings.pricing_url, DEFAULT_PRICING_URL);
        assert_eq!(settings.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(settings.cache_ttl, DEFAULT_CACHE_TTL);
        assert_eq!(settings.fetch_attempts, 3);
        assert_eq!(settings.source_priority, vec!["claude", "codex"]);
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/cache")));
        assert_eq!(settings.timezone.label(), "local");
    }

    #[test]
    fn invalid_cli_timezone_is_rejected() {
        let cli = CliOverrides {
            timezone: Some("Nowhere/City".into()),
            ..CliOverrides::default()
        };
        let err = Settings::resolve(&cli, EnvOverrides::default(), Config::default(), None)
            .unwrap_err();
        assert!(err.to_string().contains("Nowhere/City"));
    }
}
