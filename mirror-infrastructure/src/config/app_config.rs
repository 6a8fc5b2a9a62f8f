use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use mirror_domain::{parse_window_bound, PageSizes, RetryPolicy, RuntimeConfig};

use super::validation::{validate_country_code, validate_http_url, validate_ratio};

pub const DEFAULT_CONFIG_PATH: &str = "./mirror.toml";
pub const DEFAULT_API_URL: &str = "https://api.start.gg/gql/alpha";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub data_dir: String,
    pub game_id: u64,
    pub country_code: Option<String>,
    pub worker_count: usize,
    pub request_timeout_seconds: u64,
    pub max_attempts: u32,
    pub rate_limit_floor_seconds: u64,
    pub backoff_base_millis: u64,
    pub backoff_max_millis: u64,
    pub per_page_tournaments: u32,
    pub per_page_standings: u32,
    pub per_page_seeds: u32,
    pub per_page_sets: u32,
    pub max_pages: u32,
    pub json_indent: usize,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub missing_field_rate_threshold: f64,
    pub max_integrity_issues: usize,
    pub strict_placements: bool,
    pub classifier_url: Option<String>,
    pub classifier_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        let retry = RetryPolicy::default();
        let pages = PageSizes::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            data_dir: runtime.data_dir,
            game_id: runtime.game_id,
            country_code: None,
            worker_count: runtime.worker_count,
            request_timeout_seconds: retry.attempt_timeout.as_secs(),
            max_attempts: retry.max_attempts,
            rate_limit_floor_seconds: retry.rate_limit_floor.as_secs(),
            backoff_base_millis: retry.backoff_base.as_millis() as u64,
            backoff_max_millis: retry.backoff_max.as_millis() as u64,
            per_page_tournaments: pages.tournaments,
            per_page_standings: pages.standings,
            per_page_seeds: pages.seeds,
            per_page_sets: pages.sets,
            max_pages: runtime.max_pages,
            json_indent: runtime.json_indent,
            window_start: None,
            window_end: None,
            missing_field_rate_threshold: runtime.missing_field_rate_threshold,
            max_integrity_issues: runtime.max_integrity_issues,
            strict_placements: runtime.strict_placements,
            classifier_url: None,
            classifier_token: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`, else `MIRROR_CONFIG`, else `./mirror.toml`. A missing file means defaults.
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_string(),
            None => env::var("MIRROR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        };
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path)
                .await
                .with_context(|| format!("failed to read {}", path))?;
            Self::parse(&content).with_context(|| format!("failed to parse {}", path))?
        } else {
            warn!("{} not found, using defaults", path);
            AppConfig::default()
        };
        config.apply_env_overrides()?;
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn normalize(&mut self) {
        self.api_url = self.api_url.trim().to_string();
        blank_to_none(&mut self.api_token);
        blank_to_none(&mut self.country_code);
        blank_to_none(&mut self.window_start);
        blank_to_none(&mut self.window_end);
        blank_to_none(&mut self.classifier_url);
        blank_to_none(&mut self.classifier_token);
        if let Some(code) = &mut self.country_code {
            *code = code.trim().to_uppercase();
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.data_dir = resolve_path(base, &self.data_dir);
    }

    pub fn validate(&self) -> Result<()> {
        validate_http_url("api_url", &self.api_url)?;
        if let Some(url) = &self.classifier_url {
            validate_http_url("classifier_url", url)?;
        }
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("data_dir must not be empty"));
        }
        if self.game_id == 0 {
            return Err(anyhow!("game_id must be greater than 0"));
        }
        if let Some(code) = &self.country_code {
            validate_country_code(code)?;
        }
        if self.worker_count == 0 {
            return Err(anyhow!("worker_count must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be greater than 0"));
        }
        if self.backoff_base_millis == 0 || self.backoff_max_millis < self.backoff_base_millis {
            return Err(anyhow!(
                "backoff_base_millis must be > 0 and not exceed backoff_max_millis"
            ));
        }
        let page_sizes = [
            self.per_page_tournaments,
            self.per_page_standings,
            self.per_page_seeds,
            self.per_page_sets,
        ];
        if page_sizes.contains(&0) {
            return Err(anyhow!("per_page_* values must be greater than 0"));
        }
        if self.max_pages == 0 {
            return Err(anyhow!("max_pages must be greater than 0"));
        }
        validate_ratio("missing_field_rate_threshold", self.missing_field_rate_threshold)?;
        let (start, end) = self.window_bounds()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(anyhow!("window_start must not be after window_end"));
            }
        }
        Ok(())
    }

    /// Commands that talk to the remote service need a token up front.
    pub fn require_api_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| {
                anyhow!("api_token is required (set it in the config or MIRROR_API_TOKEN)")
            })
    }

    fn window_bounds(&self) -> Result<(Option<i64>, Option<i64>)> {
        let start = self
            .window_start
            .as_deref()
            .map(parse_window_bound)
            .transpose()
            .context("window_start")?;
        let end = self
            .window_end
            .as_deref()
            .map(parse_window_bound)
            .transpose()
            .context("window_end")?;
        Ok((start, end))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            rate_limit_floor: Duration::from_secs(self.rate_limit_floor_seconds),
            backoff_base: Duration::from_millis(self.backoff_base_millis),
            backoff_max: Duration::from_millis(self.backoff_max_millis),
            attempt_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }

    pub fn to_runtime_config(&self) -> Result<RuntimeConfig> {
        let (window_start, window_end) = self.window_bounds()?;
        Ok(RuntimeConfig {
            data_dir: self.data_dir.clone(),
            game_id: self.game_id,
            country_code: self.country_code.clone(),
            worker_count: self.worker_count,
            page_sizes: PageSizes {
                tournaments: self.per_page_tournaments,
                standings: self.per_page_standings,
                seeds: self.per_page_seeds,
                sets: self.per_page_sets,
            },
            max_pages: self.max_pages,
            json_indent: self.json_indent,
            window_start,
            window_end,
            missing_field_rate_threshold: self.missing_field_rate_threshold,
            max_integrity_issues: self.max_integrity_issues,
            strict_placements: self.strict_placements,
            retry: self.retry_policy(),
        })
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("MIRROR_API_URL") {
            self.api_url = value;
        }
        if let Ok(value) = env::var("MIRROR_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("MIRROR_DATA_DIR") {
            self.data_dir = value;
        }
        if let Ok(value) = env::var("MIRROR_COUNTRY_CODE") {
            self.country_code = Some(value);
        }
        if let Ok(value) = env::var("MIRROR_WINDOW_START") {
            self.window_start = Some(value);
        }
        if let Ok(value) = env::var("MIRROR_WINDOW_END") {
            self.window_end = Some(value);
        }
        if let Ok(value) = env::var("MIRROR_CLASSIFIER_URL") {
            self.classifier_url = Some(value);
        }
        if let Ok(value) = env::var("MIRROR_CLASSIFIER_TOKEN") {
            self.classifier_token = Some(value);
        }
        override_parsed("MIRROR_GAME_ID", &mut self.game_id)?;
        override_parsed("MIRROR_WORKER_COUNT", &mut self.worker_count)?;
        override_parsed("MIRROR_REQUEST_TIMEOUT_SECONDS", &mut self.request_timeout_seconds)?;
        override_parsed("MIRROR_MAX_ATTEMPTS", &mut self.max_attempts)?;
        override_parsed("MIRROR_RATE_LIMIT_FLOOR_SECONDS", &mut self.rate_limit_floor_seconds)?;
        override_parsed("MIRROR_BACKOFF_BASE_MILLIS", &mut self.backoff_base_millis)?;
        override_parsed("MIRROR_BACKOFF_MAX_MILLIS", &mut self.backoff_max_millis)?;
        override_parsed("MIRROR_PER_PAGE_TOURNAMENTS", &mut self.per_page_tournaments)?;
        override_parsed("MIRROR_PER_PAGE_STANDINGS", &mut self.per_page_standings)?;
        override_parsed("MIRROR_PER_PAGE_SEEDS", &mut self.per_page_seeds)?;
        override_parsed("MIRROR_PER_PAGE_SETS", &mut self.per_page_sets)?;
        override_parsed("MIRROR_MAX_PAGES", &mut self.max_pages)?;
        override_parsed("MIRROR_JSON_INDENT", &mut self.json_indent)?;
        override_parsed(
            "MIRROR_MISSING_FIELD_RATE_THRESHOLD",
            &mut self.missing_field_rate_threshold,
        )?;
        override_parsed("MIRROR_MAX_INTEGRITY_ISSUES", &mut self.max_integrity_issues)?;
        override_parsed("MIRROR_STRICT_PLACEMENTS", &mut self.strict_placements)?;
        Ok(())
    }
}

fn override_parsed<T>(key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = env::var(key) {
        *target = value
            .trim()
            .parse()
            .map_err(|err| anyhow!("invalid {}='{}': {}", key, value, err))?;
    }
    Ok(())
}

fn blank_to_none(value: &mut Option<String>) {
    if value.as_ref().is_some_and(|inner| inner.trim().is_empty()) {
        *value = None;
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
