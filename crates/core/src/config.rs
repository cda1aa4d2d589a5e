use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub business: BusinessProfile,
    pub messenger: MessengerConfig,
    pub collaborators: CollaboratorConfig,
    pub sheet: SheetConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Read-only business copy injected into reply templates. Price-like
/// values stay display strings (`$199`, `3-5`) because they are only
/// ever interpolated into message text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusinessProfile {
    pub name: String,
    pub support_email: String,
    pub support_phone: String,
    pub base_price: String,
    pub shipping_days: String,
    pub free_shipping_threshold: String,
    pub return_policy_days: String,
    pub promo_code: String,
    pub catalog_link: String,
}

#[derive(Clone, Debug)]
pub struct MessengerConfig {
    pub verify_token: String,
    pub page_token: Option<SecretString>,
    pub wechat_app_id: Option<String>,
    pub wechat_app_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct CollaboratorConfig {
    pub inventory_url: String,
    pub scheduling_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SheetConfig {
    pub enabled: bool,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub api_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
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
    pub verify_token: Option<String>,
    pub page_token: Option<String>,
    pub inventory_url: Option<String>,
    pub scheduling_url: Option<String>,
    pub sheet_enabled: Option<bool>,
    pub sheet_api_token: Option<String>,
    pub log_level: Option<String>,
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
            business: BusinessProfile {
                name: "Client1 Inc".to_string(),
                support_email: "support@automatedbusiness.com".to_string(),
                support_phone: "(123) 456-7890".to_string(),
                base_price: "$199".to_string(),
                shipping_days: "3-5".to_string(),
                free_shipping_threshold: "$50".to_string(),
                return_policy_days: "30".to_string(),
                promo_code: "CHAT20".to_string(),
                catalog_link: "https://automatedbusiness.com/products".to_string(),
            },
            messenger: MessengerConfig {
                verify_token: "secure_token".to_string(),
                page_token: None,
                wechat_app_id: None,
                wechat_app_secret: None,
            },
            collaborators: CollaboratorConfig {
                inventory_url: "http://localhost:10001".to_string(),
                scheduling_url: "http://localhost:10002".to_string(),
                request_timeout_secs: 10,
            },
            sheet: SheetConfig {
                enabled: false,
                spreadsheet_id: String::new(),
                sheet_name: "Lead and Issue Tracker".to_string(),
                api_token: None,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 10000,
                graceful_shutdown_secs: 15,
            },
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("parley.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(business) = patch.business {
            if let Some(name) = business.name {
                self.business.name = name;
            }
            if let Some(support_email) = business.support_email {
                self.business.support_email = support_email;
            }
            if let Some(support_phone) = business.support_phone {
                self.business.support_phone = support_phone;
            }
            if let Some(base_price) = business.base_price {
                self.business.base_price = base_price;
            }
            if let Some(shipping_days) = business.shipping_days {
                self.business.shipping_days = shipping_days;
            }
            if let Some(free_shipping_threshold) = business.free_shipping_threshold {
                self.business.free_shipping_threshold = free_shipping_threshold;
            }
            if let Some(return_policy_days) = business.return_policy_days {
                self.business.return_policy_days = return_policy_days;
            }
            if let Some(promo_code) = business.promo_code {
                self.business.promo_code = promo_code;
            }
            if let Some(catalog_link) = business.catalog_link {
                self.business.catalog_link = catalog_link;
            }
        }

        if let Some(messenger) = patch.messenger {
            if let Some(verify_token) = messenger.verify_token {
                self.messenger.verify_token = verify_token;
            }
            if let Some(page_token_value) = messenger.page_token {
                self.messenger.page_token = Some(secret_value(page_token_value));
            }
            if let Some(wechat_app_id) = messenger.wechat_app_id {
                self.messenger.wechat_app_id = Some(wechat_app_id);
            }
            if let Some(wechat_app_secret_value) = messenger.wechat_app_secret {
                self.messenger.wechat_app_secret = Some(secret_value(wechat_app_secret_value));
            }
        }

        if let Some(collaborators) = patch.collaborators {
            if let Some(inventory_url) = collaborators.inventory_url {
                self.collaborators.inventory_url = inventory_url;
            }
            if let Some(scheduling_url) = collaborators.scheduling_url {
                self.collaborators.scheduling_url = scheduling_url;
            }
            if let Some(request_timeout_secs) = collaborators.request_timeout_secs {
                self.collaborators.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(sheet) = patch.sheet {
            if let Some(enabled) = sheet.enabled {
                self.sheet.enabled = enabled;
            }
            if let Some(spreadsheet_id) = sheet.spreadsheet_id {
                self.sheet.spreadsheet_id = spreadsheet_id;
            }
            if let Some(sheet_name) = sheet.sheet_name {
                self.sheet.sheet_name = sheet_name;
            }
            if let Some(api_token_value) = sheet.api_token {
                self.sheet.api_token = Some(secret_value(api_token_value));
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("PARLEY_BUSINESS_NAME") {
            self.business.name = value;
        }
        if let Some(value) = read_env("PARLEY_SUPPORT_EMAIL") {
            self.business.support_email = value;
        }
        if let Some(value) = read_env("PARLEY_SUPPORT_PHONE") {
            self.business.support_phone = value;
        }
        if let Some(value) = read_env("PARLEY_BASE_PRICE") {
            self.business.base_price = value;
        }
        if let Some(value) = read_env("PARLEY_SHIPPING_DAYS") {
            self.business.shipping_days = value;
        }
        if let Some(value) = read_env("PARLEY_FREE_SHIPPING_THRESHOLD") {
            self.business.free_shipping_threshold = value;
        }
        if let Some(value) = read_env("PARLEY_RETURN_POLICY_DAYS") {
            self.business.return_policy_days = value;
        }
        if let Some(value) = read_env("PARLEY_PROMO_CODE") {
            self.business.promo_code = value;
        }
        if let Some(value) = read_env("PARLEY_CATALOG_LINK") {
            self.business.catalog_link = value;
        }

        if let Some(value) = read_env("PARLEY_VERIFY_TOKEN") {
            self.messenger.verify_token = value;
        }
        if let Some(value) = read_env("PARLEY_PAGE_TOKEN") {
            self.messenger.page_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("PARLEY_WECHAT_APP_ID") {
            self.messenger.wechat_app_id = Some(value);
        }
        if let Some(value) = read_env("PARLEY_WECHAT_APP_SECRET") {
            self.messenger.wechat_app_secret = Some(secret_value(value));
        }

        if let Some(value) = read_env("PARLEY_INVENTORY_URL") {
            self.collaborators.inventory_url = value;
        }
        if let Some(value) = read_env("PARLEY_SCHEDULING_URL") {
            self.collaborators.scheduling_url = value;
        }
        if let Some(value) = read_env("PARLEY_COLLABORATOR_TIMEOUT_SECS") {
            self.collaborators.request_timeout_secs =
                parse_u64("PARLEY_COLLABORATOR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PARLEY_SHEET_ENABLED") {
            self.sheet.enabled = parse_bool("PARLEY_SHEET_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PARLEY_SPREADSHEET_ID") {
            self.sheet.spreadsheet_id = value;
        }
        if let Some(value) = read_env("PARLEY_SHEET_NAME") {
            self.sheet.sheet_name = value;
        }
        if let Some(value) = read_env("PARLEY_SHEET_API_TOKEN") {
            self.sheet.api_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("PARLEY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PARLEY_SERVER_PORT").or_else(|| read_env("PORT")) {
            self.server.port = parse_u16("PARLEY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PARLEY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PARLEY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("PARLEY_LOGGING_LEVEL").or_else(|| read_env("PARLEY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PARLEY_LOGGING_FORMAT").or_else(|| read_env("PARLEY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(verify_token) = overrides.verify_token {
            self.messenger.verify_token = verify_token;
        }
        if let Some(page_token) = overrides.page_token {
            self.messenger.page_token = Some(secret_value(page_token));
        }
        if let Some(inventory_url) = overrides.inventory_url {
            self.collaborators.inventory_url = inventory_url;
        }
        if let Some(scheduling_url) = overrides.scheduling_url {
            self.collaborators.scheduling_url = scheduling_url;
        }
        if let Some(sheet_enabled) = overrides.sheet_enabled {
            self.sheet.enabled = sheet_enabled;
        }
        if let Some(sheet_api_token) = overrides.sheet_api_token {
            self.sheet.api_token = Some(secret_value(sheet_api_token));
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_business(&self.business)?;
        validate_messenger(&self.messenger)?;
        validate_collaborators(&self.collaborators)?;
        validate_sheet(&self.sheet)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("parley.toml"), PathBuf::from("config/parley.toml")]
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

fn validate_business(business: &BusinessProfile) -> Result<(), ConfigError> {
    if business.name.trim().is_empty() {
        return Err(ConfigError::Validation("business.name must not be empty".to_string()));
    }
    if business.support_email.trim().is_empty() || !business.support_email.contains('@') {
        return Err(ConfigError::Validation(
            "business.support_email must be a plausible email address".to_string(),
        ));
    }
    Ok(())
}

fn validate_messenger(messenger: &MessengerConfig) -> Result<(), ConfigError> {
    if messenger.verify_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "messenger.verify_token is required for the webhook verification handshake"
                .to_string(),
        ));
    }

    if let Some(page_token) = &messenger.page_token {
        if page_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "messenger.page_token is set but empty; omit it to run delivery in no-op mode"
                    .to_string(),
            ));
        }
    }

    // WeChat credentials come in pairs or not at all.
    match (&messenger.wechat_app_id, &messenger.wechat_app_secret) {
        (Some(_), None) | (None, Some(_)) => Err(ConfigError::Validation(
            "messenger.wechat_app_id and messenger.wechat_app_secret must be set together"
                .to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_collaborators(collaborators: &CollaboratorConfig) -> Result<(), ConfigError> {
    for (key, url) in [
        ("collaborators.inventory_url", &collaborators.inventory_url),
        ("collaborators.scheduling_url", &collaborators.scheduling_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    if collaborators.request_timeout_secs == 0 || collaborators.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "collaborators.request_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_sheet(sheet: &SheetConfig) -> Result<(), ConfigError> {
    if !sheet.enabled {
        return Ok(());
    }

    if sheet.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheet.enabled is true but sheet.spreadsheet_id is empty".to_string(),
        ));
    }
    if sheet.sheet_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheet.enabled is true but sheet.sheet_name is empty".to_string(),
        ));
    }

    let missing_token = sheet
        .api_token
        .as_ref()
        .map(|token| token.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing_token {
        return Err(ConfigError::Validation(
            "sheet.enabled is true but sheet.api_token is missing".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    business: Option<BusinessPatch>,
    messenger: Option<MessengerPatch>,
    collaborators: Option<CollaboratorsPatch>,
    sheet: Option<SheetPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct BusinessPatch {
    name: Option<String>,
    support_email: Option<String>,
    support_phone: Option<String>,
    base_price: Option<String>,
    shipping_days: Option<String>,
    free_shipping_threshold: Option<String>,
    return_policy_days: Option<String>,
    promo_code: Option<String>,
    catalog_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessengerPatch {
    verify_token: Option<String>,
    page_token: Option<String>,
    wechat_app_id: Option<String>,
    wechat_app_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CollaboratorsPatch {
    inventory_url: Option<String>,
    scheduling_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetPatch {
    enabled: Option<bool>,
    spreadsheet_id: Option<String>,
    sheet_name: Option<String>,
    api_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
