//! Program configuration
//!
//! Resolution order: built-in defaults → TOML file → environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tokio::fs;

use crate::error::ConfigError;
use crate::models::catalog;
use crate::models::Country;
use crate::services::phone::BareNumberPolicy;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "lead-engine.toml";

/// Program configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx connection string
    pub database_url: String,
    /// Default tracing filter, `RUST_LOG` takes precedence
    pub log_level: String,
    /// Keep everything in memory and log leads instead of posting them
    pub dry_run: bool,
    /// Days before a `(location, industry)` pair may be queried again
    pub rotation_period_days: i64,
    /// Days before a dispatched business may be engaged again
    pub reengagement_cooldown_days: i64,
    /// Purge leads / rotation history older than this many days
    pub retention_days: Option<i64>,
    /// Independent browser sessions per cycle
    pub workers: usize,
    /// Run a cycle every N seconds; absent means run one cycle and exit
    pub cycle_interval_secs: Option<u64>,
    /// Hard bound for one whole cycle
    pub cycle_timeout_secs: u64,
    pub enrich_timeout_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub industries: Vec<String>,
    pub query_templates: Vec<String>,
    pub countries: Vec<CountryProfile>,
    pub browser: BrowserSettings,
    pub search: SearchSettings,
    pub navigator: NavigatorSettings,
    pub phone: PhoneSettings,
    pub llm: LlmSettings,
    pub discord: DiscordSettings,
}

/// Per-country targets
#[derive(Clone, Debug, Deserialize)]
pub struct CountryProfile {
    pub code: Country,
    /// Overrides the built-in calling code
    #[serde(default)]
    pub calling_code: Option<String>,
    /// Query tasks emitted per cycle
    #[serde(default = "default_queries_per_cycle")]
    pub queries_per_cycle: usize,
    /// Cap on new leads per cycle
    #[serde(default)]
    pub lead_target: Option<usize>,
    /// Empty means the built-in catalog
    #[serde(default)]
    pub locations: Vec<String>,
}

fn default_queries_per_cycle() -> usize {
    1
}

impl CountryProfile {
    pub fn new(code: Country) -> Self {
        Self {
            code,
            calling_code: None,
            queries_per_cycle: default_queries_per_cycle(),
            lead_target: None,
            locations: catalog::default_locations(code),
        }
    }

    pub fn calling_code(&self) -> &str {
        self.calling_code
            .as_deref()
            .unwrap_or_else(|| self.code.default_calling_code())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chrome / Chromium binary, auto-detected when absent
    pub executable: Option<PathBuf>,
    /// Attach to an already running browser instead of launching one
    pub debug_port: Option<u16>,
    pub user_agent: String,
    /// Where debug screenshots go; none are taken when absent
    pub debug_dir: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            debug_port: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".to_string(),
            debug_dir: None,
        }
    }
}

/// Everything that describes the target search engine's markup
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub home_url: String,
    /// Local-results endpoint, the query is appended as `q`
    pub local_results_url: String,
    /// URL fragment that identifies local-results mode
    pub local_results_marker: String,
    /// Host fragments that belong to the engine itself
    pub engine_domains: Vec<String>,
    /// Consent overlay buttons, tried in order
    pub consent_buttons: Vec<String>,
    pub query_inputs: Vec<String>,
    /// Link texts of the maps / places affordance
    pub maps_links: Vec<String>,
    pub result_selectors: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            home_url: "https://www.google.com".to_string(),
            local_results_url: "https://www.google.com/search?tbm=lcl".to_string(),
            local_results_marker: "tbm=lcl".to_string(),
            engine_domains: vec!["google.com".to_string(), "google.co".to_string()],
            consent_buttons: vec![
                "Accept all".to_string(),
                "I agree".to_string(),
                "Alle akzeptieren".to_string(),
                "Tout accepter".to_string(),
                "Aceptar todo".to_string(),
            ],
            query_inputs: vec![
                r#"textarea[name="q"]"#.to_string(),
                r#"input[name="q"]"#.to_string(),
            ],
            maps_links: vec!["Maps".to_string(), "Places".to_string()],
            result_selectors: vec![
                r#"div[role="article"]"#.to_string(),
                ".VkpGBb".to_string(),
                ".u30pqe".to_string(),
                "div[data-cid]".to_string(),
                ".rllt__details".to_string(),
                "div.JsZOMb".to_string(),
                r#"div[jscontroller="AtSb"]"#.to_string(),
            ],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NavigatorSettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    /// Wait after a consent overlay is dismissed
    pub consent_settle_ms: u64,
    /// Wait after submitting the query
    pub submit_settle_ms: u64,
    /// Wait after clicking the maps affordance
    pub maps_settle_ms: u64,
    /// Wait once local results are reached
    pub final_settle_ms: u64,
    pub page_load_timeout_secs: u64,
    pub fallback_load_timeout_secs: u64,
    pub ui_check_timeout_secs: u64,
    pub results_timeout_secs: u64,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2000,
            consent_settle_ms: 1000,
            submit_settle_ms: 3000,
            maps_settle_ms: 3000,
            final_settle_ms: 5000,
            page_load_timeout_secs: 30,
            fallback_load_timeout_secs: 45,
            ui_check_timeout_secs: 5,
            results_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PhoneSettings {
    pub bare_number_policy: BareNumberPolicy,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_base_url: String,
    pub model_name: String,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model_name: "gemma-3-27b-it".to_string(),
            temperature: 0.9,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    pub webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/leads.db".to_string(),
            log_level: "info".to_string(),
            dry_run: false,
            rotation_period_days: 7,
            reengagement_cooldown_days: 30,
            retention_days: None,
            workers: 1,
            cycle_interval_secs: None,
            cycle_timeout_secs: 30 * 60,
            enrich_timeout_secs: 60,
            dispatch_timeout_secs: 30,
            industries: catalog::default_industries(),
            query_templates: catalog::default_query_templates(),
            countries: Country::ALL.into_iter().map(CountryProfile::new).collect(),
            browser: BrowserSettings::default(),
            search: SearchSettings::default(),
            navigator: NavigatorSettings::default(),
            phone: PhoneSettings::default(),
            llm: LlmSettings::default(),
            discord: DiscordSettings::default(),
        }
    }
}

impl Config {
    /// Load, apply environment overrides and validate
    ///
    /// `path` wins over `LEAD_ENGINE_CONFIG`, which wins over `lead-engine.toml`
    /// in the working directory. No file at all means built-in defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_config_path(path) {
            Some(path) => Self::from_toml_file(&path).await?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.fill_catalog_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without env overrides or validation
    pub async fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::ReadFailed {
                path: path.display().to_string(),
                source,
            })?;
        tracing::info!("Loaded config file: {}", path.display());
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        config.fill_catalog_defaults();
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(days) = env_parse("ROTATION_PERIOD_DAYS", "integer")? {
            self.rotation_period_days = days;
        }
        if let Some(dry_run) = env_parse("DRY_RUN", "boolean")? {
            self.dry_run = dry_run;
        }
        if let Some(port) = env_parse("BROWSER_DEBUG_PORT", "port number")? {
            self.browser.debug_port = Some(port);
        }
        if let Ok(key) = std::env::var("LLM_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY")) {
            self.llm.api_key = key;
        }
        if let Ok(base) = std::env::var("LLM_API_BASE_URL") {
            self.llm.api_base_url = base;
        }
        if let Ok(model) = std::env::var("LLM_MODEL_NAME") {
            self.llm.model_name = model;
        }
        if let Ok(webhook) = std::env::var("DISCORD_WEBHOOK") {
            self.discord.webhook_url = Some(webhook);
        }
        Ok(())
    }

    fn fill_catalog_defaults(&mut self) {
        for profile in &mut self.countries {
            if profile.locations.is_empty() {
                profile.locations = catalog::default_locations(profile.code);
            }
        }
    }

    /// Reject configurations the pipeline cannot run safely with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers must be at least 1"));
        }
        if self.countries.is_empty() {
            return Err(ConfigError::invalid("at least one country profile is required"));
        }
        if self.industries.is_empty() || self.query_templates.is_empty() {
            return Err(ConfigError::invalid("industries and query_templates must not be empty"));
        }
        if self.rotation_period_days < 0 || self.reengagement_cooldown_days < 0 {
            return Err(ConfigError::invalid("periods must not be negative"));
        }
        if let Some(retention) = self.retention_days {
            if retention < self.reengagement_cooldown_days {
                return Err(ConfigError::invalid(format!(
                    "retention_days ({}) must be >= reengagement_cooldown_days ({})",
                    retention, self.reengagement_cooldown_days
                )));
            }
            if retention < self.rotation_period_days {
                return Err(ConfigError::invalid(format!(
                    "retention_days ({}) must be >= rotation_period_days ({})",
                    retention, self.rotation_period_days
                )));
            }
        }
        for profile in &self.countries {
            if let Some(code) = &profile.calling_code {
                if !is_calling_code(code) {
                    return Err(ConfigError::invalid(format!(
                        "calling_code for {:?} must be 1-3 digits without '+' or '00' (got {:?})",
                        profile.code, code
                    )));
                }
            }
        }
        if self.navigator.max_attempts == 0 {
            return Err(ConfigError::invalid("navigator.max_attempts must be at least 1"));
        }
        if !self.dry_run && self.discord.webhook_url.is_none() {
            return Err(ConfigError::invalid(
                "discord.webhook_url (or DISCORD_WEBHOOK) is required unless dry_run is set",
            ));
        }
        Ok(())
    }

    pub fn rotation_period(&self) -> chrono::Duration {
        chrono::Duration::days(self.rotation_period_days)
    }

    pub fn reengagement_cooldown(&self) -> chrono::Duration {
        chrono::Duration::days(self.reengagement_cooldown_days)
    }

    pub fn retention(&self) -> Option<chrono::Duration> {
        self.retention_days.map(chrono::Duration::days)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_secs(self.enrich_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn country_profile(&self, country: Country) -> Option<&CountryProfile> {
        self.countries.iter().find(|p| p.code == country)
    }

    /// Calling code for `country`, falling back to the built-in table
    pub fn calling_code(&self, country: Country) -> String {
        self.country_profile(country)
            .map(|p| p.calling_code().to_string())
            .unwrap_or_else(|| country.default_calling_code().to_string())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("LEAD_ENGINE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

/// E.164 country code without any dialing prefix
fn is_calling_code(code: &str) -> bool {
    (1..=3).contains(&code.len())
        && code.bytes().all(|b| b.is_ascii_digit())
        && !code.starts_with('0')
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_countries() {
        let config = Config::default();
        assert_eq!(config.countries.len(), 2);
        assert_eq!(config.calling_code(Country::SouthAfrica), "27");
        assert_eq!(config.calling_code(Country::Zimbabwe), "263");
        assert_eq!(config.rotation_period(), chrono::Duration::days(7));
        assert_eq!(config.reengagement_cooldown(), chrono::Duration::days(30));
    }

    #[test]
    fn test_toml_overrides_and_fills_locations() {
        let config = Config::from_toml_str(
            r#"
            rotation_period_days = 3
            dry_run = true

            [[countries]]
            code = "SA"
            queries_per_cycle = 4
            lead_target = 10

            [[countries]]
            code = "ZW"
            calling_code = "263"
            locations = ["Gweru"]

            [phone]
            bare_number_policy = "assume_query_country"
            "#,
        )
        .unwrap();

        assert_eq!(config.rotation_period_days, 3);
        let sa = config.country_profile(Country::SouthAfrica).unwrap();
        assert_eq!(sa.queries_per_cycle, 4);
        assert_eq!(sa.lead_target, Some(10));
        assert!(sa.locations.contains(&"Sandton".to_string()));
        let zw = config.country_profile(Country::Zimbabwe).unwrap();
        assert_eq!(zw.locations, vec!["Gweru".to_string()]);
        assert_eq!(config.calling_code(Country::Zimbabwe), "263");
        assert_eq!(
            config.phone.bare_number_policy,
            BareNumberPolicy::AssumeQueryCountry
        );
        // untouched sections keep their defaults
        assert_eq!(config.navigator.max_attempts, 3);
    }

    #[test]
    fn test_validate_rejects_short_retention() {
        let config = Config {
            dry_run: true,
            retention_days: Some(14),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_retention_shorter_than_rotation() {
        let config = Config {
            dry_run: true,
            rotation_period_days: 60,
            retention_days: Some(45),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rotation_period_days"));

        let config = Config {
            retention_days: Some(60),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_prefixed_calling_code() {
        for bad in ["00263", "+263", "", "2633", "2a"] {
            let mut config = Config {
                dry_run: true,
                ..Config::default()
            };
            config.countries[1].calling_code = Some(bad.to_string());
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{:?} should be rejected",
                bad
            );
        }

        let mut config = Config {
            dry_run: true,
            ..Config::default()
        };
        config.countries[1].calling_code = Some("263".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_webhook_outside_dry_run() {
        let mut config = Config::default();
        assert!(config.validate().is_err());
        config.discord.webhook_url = Some("https://discord.com/api/webhooks/1/x".into());
        assert!(config.validate().is_ok());
    }
}
