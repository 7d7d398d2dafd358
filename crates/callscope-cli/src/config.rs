// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use callscope_app::{DEFAULT_PAGE_SIZE, ViewOptions};
use log::LevelFilter;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "callscope";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_REDIRECT_DELAY: &str = "2s";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            view: View::default(),
            session: Session::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub calls_path: Option<String>,
    pub campaigns_path: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_API_BASE_URL.to_owned()),
            calls_path: Some(callscope_api::DEFAULT_CALLS_PATH.to_owned()),
            campaigns_path: Some(callscope_api::DEFAULT_CAMPAIGNS_PATH.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct View {
    pub page_size: Option<i64>,
    pub redirect_delay: Option<String>,
}

impl Default for View {
    fn default() -> Self {
        Self {
            page_size: Some(i64::from(DEFAULT_PAGE_SIZE)),
            redirect_delay: Some(DEFAULT_REDIRECT_DELAY.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    pub token_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CALLSCOPE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }
        Ok(app_config_dir()?.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is missing `version = 1`; add it above the [api], [view], [session], and [log] sections",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.api_base_url().is_empty() {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.api.timeout
            && parse_duration(timeout)? <= Duration::ZERO
        {
            bail!(
                "api.timeout in {} must be positive, got {}",
                path.display(),
                timeout
            );
        }

        if let Some(page_size) = self.view.page_size
            && !(1..=i64::from(u32::MAX)).contains(&page_size)
        {
            bail!(
                "view.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(delay) = &self.view.redirect_delay {
            parse_duration(delay)
                .with_context(|| format!("view.redirect_delay in {}", path.display()))?;
        }

        if let Some(level) = &self.log.level {
            level.parse::<LevelFilter>().map_err(|_| {
                anyhow!(
                    "log.level in {} must be one of off, error, warn, info, debug, trace; got {:?}",
                    path.display(),
                    level
                )
            })?;
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn calls_path(&self) -> &str {
        self.api
            .calls_path
            .as_deref()
            .unwrap_or(callscope_api::DEFAULT_CALLS_PATH)
    }

    pub fn campaigns_path(&self) -> &str {
        self.api
            .campaigns_path
            .as_deref()
            .unwrap_or(callscope_api::DEFAULT_CAMPAIGNS_PATH)
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn page_size(&self) -> u32 {
        self.view
            .page_size
            .and_then(|size| u32::try_from(size).ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn redirect_delay(&self) -> Result<Duration> {
        parse_duration(
            self.view
                .redirect_delay
                .as_deref()
                .unwrap_or(DEFAULT_REDIRECT_DELAY),
        )
    }

    pub fn view_options(&self) -> Result<ViewOptions> {
        Ok(ViewOptions {
            page_size: self.page_size(),
            redirect_delay: self.redirect_delay()?,
            ..ViewOptions::default()
        })
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.session.token_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(app_config_dir()?.join("session.toml")),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# callscope config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\ncalls_path = \"{}\"\ncampaigns_path = \"{}\"\ntimeout = \"{}\"\n\n[view]\npage_size = {}\nredirect_delay = \"{}\"\n\n[session]\n# Optional. Default is session.toml next to this file.\n# The CALLSCOPE_TOKEN and CALLSCOPE_ROLE env vars take precedence.\n# token_path = \"/absolute/path/to/session.toml\"\n\n[log]\n# RUST_LOG overrides this.\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_API_BASE_URL,
            callscope_api::DEFAULT_CALLS_PATH,
            callscope_api::DEFAULT_CAMPAIGNS_PATH,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_REDIRECT_DELAY,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn app_config_dir() -> Result<PathBuf> {
    let config_root = dirs::config_dir().ok_or_else(|| {
        anyhow!("cannot resolve config directory; set CALLSCOPE_CONFIG_PATH to the config file")
    })?;
    Ok(config_root.join(APP_NAME))
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
