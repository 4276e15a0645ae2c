use std::{fs, io, path::Path};

use anyhow::{anyhow, Context};
use review_console::{CountStrategy, DEFAULT_PAGE_LIMIT};
use serde::Deserialize;
use shared::domain::{ContentKind, Role};

pub const DEFAULT_CONFIG_FILE: &str = "moderator.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorSettings {
    pub server_url: String,
    pub token: Option<String>,
    pub role: Role,
    pub page_limit: u32,
    /// `None` picks the strategy each content kind supports.
    pub count_strategy: Option<CountStrategy>,
}

impl Default for ModeratorSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080/api".into(),
            token: None,
            role: Role::Moderator,
            page_limit: DEFAULT_PAGE_LIMIT,
            count_strategy: None,
        }
    }
}

impl ModeratorSettings {
    pub fn count_strategy_for(&self, kind: ContentKind) -> CountStrategy {
        self.count_strategy
            .unwrap_or_else(|| CountStrategy::for_kind(kind))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    token: Option<String>,
    role: Option<String>,
    page_limit: Option<u32>,
    count_strategy: Option<String>,
}

pub fn load_settings() -> anyhow::Result<ModeratorSettings> {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional TOML file, then environment overrides.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ModeratorSettings> {
    let mut settings = ModeratorSettings::default();

    let file_cfg = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<FileSettings>(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => FileSettings::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    };

    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.token {
        settings.token = Some(v);
    }
    if let Some(v) = file_cfg.role {
        settings.role = v.parse()?;
    }
    if let Some(v) = file_cfg.page_limit {
        settings.page_limit = v;
    }
    if let Some(v) = file_cfg.count_strategy {
        settings.count_strategy = Some(parse_count_strategy(&v)?);
    }

    if let Some(v) = env("MODERATOR_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("MODERATOR_TOKEN") {
        settings.token = Some(v);
    }
    if let Some(v) = env("MODERATOR_ROLE") {
        settings.role = v.parse()?;
    }
    if let Some(v) = env("MODERATOR_PAGE_LIMIT") {
        settings.page_limit = v
            .parse()
            .with_context(|| format!("invalid MODERATOR_PAGE_LIMIT '{v}'"))?;
    }
    if let Some(v) = env("MODERATOR_COUNT_STRATEGY") {
        settings.count_strategy = Some(parse_count_strategy(&v)?);
    }

    if settings.page_limit == 0 {
        return Err(anyhow!("page_limit must be at least 1"));
    }
    settings.server_url = settings.server_url.trim().trim_end_matches('/').to_string();

    Ok(settings)
}

pub fn parse_count_strategy(raw: &str) -> anyhow::Result<CountStrategy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "dedicated" | "endpoint" => Ok(CountStrategy::Dedicated),
        "probe" | "list_probe" | "list-probe" => Ok(CountStrategy::ListProbe),
        other => Err(anyhow!("unknown count strategy '{other}'")),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
