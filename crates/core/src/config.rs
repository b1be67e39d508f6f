use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub retailer: RetailerConfig,
    pub llm: LlmConfig,
    pub checkout: CheckoutConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RetailerConfig {
    pub email: String,
    pub password: SecretString,
    pub card_cvv: SecretString,
    pub store_url: String,
    pub auth_url: String,
    pub webdriver_url: String,
    pub user_agent: String,
    pub headless: bool,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Settle delays are floors: the target site exposes no reliable completion
/// signal at these junctures, so the fixed waits stay even if a poll is
/// layered on top.
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub settle_secs: u64,
    pub page_settle_secs: u64,
    pub code_field_wait_secs: u64,
    pub placement_deadline_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub retailer_email: Option<String>,
    pub retailer_password: Option<String>,
    pub retailer_card_cvv: Option<String>,
    pub webdriver_url: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://aisle.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            retailer: RetailerConfig {
                email: String::new(),
                password: String::new().into(),
                card_cvv: String::new().into(),
                store_url: "https://www.woolworths.com.au".to_string(),
                auth_url: "https://auth.woolworths.com.au/u/login".to_string(),
                webdriver_url: "http://localhost:4444".to_string(),
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                             AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
                    .to_string(),
                headless: false,
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "gemma3n".to_string(),
                timeout_secs: 30,
            },
            checkout: CheckoutConfig {
                settle_secs: 10,
                page_settle_secs: 5,
                code_field_wait_secs: 5,
                placement_deadline_secs: 900,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 5000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("aisle.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(retailer) = patch.retailer {
            if let Some(email) = retailer.email {
                self.retailer.email = email;
            }
            if let Some(password_value) = retailer.password {
                self.retailer.password = secret_value(password_value);
            }
            if let Some(card_cvv_value) = retailer.card_cvv {
                self.retailer.card_cvv = secret_value(card_cvv_value);
            }
            if let Some(store_url) = retailer.store_url {
                self.retailer.store_url = store_url;
            }
            if let Some(auth_url) = retailer.auth_url {
                self.retailer.auth_url = auth_url;
            }
            if let Some(webdriver_url) = retailer.webdriver_url {
                self.retailer.webdriver_url = webdriver_url;
            }
            if let Some(user_agent) = retailer.user_agent {
                self.retailer.user_agent = user_agent;
            }
            if let Some(headless) = retailer.headless {
                self.retailer.headless = headless;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(checkout) = patch.checkout {
            if let Some(settle_secs) = checkout.settle_secs {
                self.checkout.settle_secs = settle_secs;
            }
            if let Some(page_settle_secs) = checkout.page_settle_secs {
                self.checkout.page_settle_secs = page_settle_secs;
            }
            if let Some(code_field_wait_secs) = checkout.code_field_wait_secs {
                self.checkout.code_field_wait_secs = code_field_wait_secs;
            }
            if let Some(placement_deadline_secs) = checkout.placement_deadline_secs {
                self.checkout.placement_deadline_secs = placement_deadline_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AISLE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("AISLE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("AISLE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("AISLE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("AISLE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AISLE_RETAILER_EMAIL") {
            self.retailer.email = value;
        }
        if let Some(value) = read_env("AISLE_RETAILER_PASSWORD") {
            self.retailer.password = secret_value(value);
        }
        if let Some(value) = read_env("AISLE_RETAILER_CARD_CVV") {
            self.retailer.card_cvv = secret_value(value);
        }
        if let Some(value) = read_env("AISLE_RETAILER_STORE_URL") {
            self.retailer.store_url = value;
        }
        if let Some(value) = read_env("AISLE_RETAILER_AUTH_URL") {
            self.retailer.auth_url = value;
        }
        if let Some(value) = read_env("AISLE_RETAILER_WEBDRIVER_URL") {
            self.retailer.webdriver_url = value;
        }
        if let Some(value) = read_env("AISLE_RETAILER_USER_AGENT") {
            self.retailer.user_agent = value;
        }
        if let Some(value) = read_env("AISLE_RETAILER_HEADLESS") {
            self.retailer.headless = parse_bool("AISLE_RETAILER_HEADLESS", &value)?;
        }

        if let Some(value) = read_env("AISLE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("AISLE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("AISLE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("AISLE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AISLE_CHECKOUT_SETTLE_SECS") {
            self.checkout.settle_secs = parse_u64("AISLE_CHECKOUT_SETTLE_SECS", &value)?;
        }
        if let Some(value) = read_env("AISLE_CHECKOUT_PAGE_SETTLE_SECS") {
            self.checkout.page_settle_secs = parse_u64("AISLE_CHECKOUT_PAGE_SETTLE_SECS", &value)?;
        }
        if let Some(value) = read_env("AISLE_CHECKOUT_CODE_FIELD_WAIT_SECS") {
            self.checkout.code_field_wait_secs =
                parse_u64("AISLE_CHECKOUT_CODE_FIELD_WAIT_SECS", &value)?;
        }
        if let Some(value) = read_env("AISLE_CHECKOUT_PLACEMENT_DEADLINE_SECS") {
            self.checkout.placement_deadline_secs =
                parse_u64("AISLE_CHECKOUT_PLACEMENT_DEADLINE_SECS", &value)?;
        }

        if let Some(value) = read_env("AISLE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AISLE_SERVER_PORT") {
            self.server.port = parse_u16("AISLE_SERVER_PORT", &value)?;
        }

        let log_level = read_env("AISLE_LOGGING_LEVEL").or_else(|| read_env("AISLE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("AISLE_LOGGING_FORMAT").or_else(|| read_env("AISLE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(retailer_email) = overrides.retailer_email {
            self.retailer.email = retailer_email;
        }
        if let Some(retailer_password) = overrides.retailer_password {
            self.retailer.password = secret_value(retailer_password);
        }
        if let Some(retailer_card_cvv) = overrides.retailer_card_cvv {
            self.retailer.card_cvv = secret_value(retailer_card_cvv);
        }
        if let Some(webdriver_url) = overrides.webdriver_url {
            self.retailer.webdriver_url = webdriver_url;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_retailer(&self.retailer)?;
        validate_llm(&self.llm)?;
        validate_checkout(&self.checkout)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("aisle.toml"), PathBuf::from("config/aisle.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_retailer(retailer: &RetailerConfig) -> Result<(), ConfigError> {
    if retailer.email.trim().is_empty() {
        return Err(ConfigError::Validation(
            "retailer.email is required (the retailer account login)".to_string(),
        ));
    }
    if retailer.password.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("retailer.password is required".to_string()));
    }

    let card_cvv = retailer.card_cvv.expose_secret().trim();
    if card_cvv.is_empty() {
        return Err(ConfigError::Validation(
            "retailer.card_cvv is required to confirm payment".to_string(),
        ));
    }
    if !(3..=4).contains(&card_cvv.len()) || !card_cvv.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ConfigError::Validation(
            "retailer.card_cvv must be a 3 or 4 digit number".to_string(),
        ));
    }

    for (key, url) in [
        ("retailer.store_url", &retailer.store_url),
        ("retailer.auth_url", &retailer.auth_url),
        ("retailer.webdriver_url", &retailer.webdriver_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("llm.base_url is required".to_string()));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model is required".to_string()));
    }
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_checkout(checkout: &CheckoutConfig) -> Result<(), ConfigError> {
    if checkout.settle_secs == 0 || checkout.settle_secs > 120 {
        return Err(ConfigError::Validation(
            "checkout.settle_secs must be in range 1..=120".to_string(),
        ));
    }
    if checkout.page_settle_secs == 0 || checkout.page_settle_secs > 120 {
        return Err(ConfigError::Validation(
            "checkout.page_settle_secs must be in range 1..=120".to_string(),
        ));
    }
    if checkout.code_field_wait_secs == 0 || checkout.code_field_wait_secs > 120 {
        return Err(ConfigError::Validation(
            "checkout.code_field_wait_secs must be in range 1..=120".to_string(),
        ));
    }
    if checkout.placement_deadline_secs < 60 {
        return Err(ConfigError::Validation(
            "checkout.placement_deadline_secs must be at least 60".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address is required".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    retailer: Option<RetailerPatch>,
    llm: Option<LlmPatch>,
    checkout: Option<CheckoutPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetailerPatch {
    email: Option<String>,
    password: Option<String>,
    card_cvv: Option<String>,
    store_url: Option<String>,
    auth_url: Option<String>,
    webdriver_url: Option<String>,
    user_agent: Option<String>,
    headless: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutPatch {
    settle_secs: Option<u64>,
    page_settle_secs: Option<u64>,
    code_field_wait_secs: Option<u64>,
    placement_deadline_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn credential_overrides() -> ConfigOverrides {
        ConfigOverrides {
            retailer_email: Some("shopper@example.com".to_string()),
            retailer_password: Some("hunter2!".to_string()),
            retailer_card_cvv: Some("123".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_RETAILER_PASSWORD", "from-env-secret");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("aisle.toml");
            fs::write(
                &path,
                r#"
[retailer]
email = "shopper@example.com"
password = "${TEST_RETAILER_PASSWORD}"
card_cvv = "123"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.retailer.password.expose_secret() == "from-env-secret",
                "password should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_RETAILER_PASSWORD"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AISLE_LOG_LEVEL", "warn");
        env::set_var("AISLE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: credential_overrides(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["AISLE_LOG_LEVEL", "AISLE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("AISLE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("AISLE_RETAILER_EMAIL", "env@example.com");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("aisle.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[retailer]
email = "file@example.com"
password = "file-password"
card_cvv = "123"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.retailer.email == "env@example.com",
                "env email should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["AISLE_DATABASE_URL", "AISLE_RETAILER_EMAIL"]);
        result
    }

    #[test]
    fn missing_credentials_fail_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure without credentials".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("retailer.email")
        );
        ensure(has_message, "validation failure should mention retailer.email")
    }

    #[test]
    fn non_numeric_cvv_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                retailer_card_cvv: Some("12ab".to_string()),
                ..credential_overrides()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure for bad cvv".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("retailer.card_cvv")
        );
        ensure(has_message, "validation failure should mention retailer.card_cvv")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                retailer_password: Some("super-secret-password".to_string()),
                retailer_card_cvv: Some("987".to_string()),
                ..credential_overrides()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;
        let debug = format!("{config:?}");

        ensure(
            !debug.contains("super-secret-password"),
            "debug output should not contain the account password",
        )?;
        ensure(!debug.contains("987"), "debug output should not contain the card cvv")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }
}
