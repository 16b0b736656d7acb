use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

pub mod country_codes;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens. Filled from `JWT_SECRET` when empty.
    #[serde(default)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String { "compact".into() }

impl Default for LoggingConfig {
    fn default() -> Self { Self { format: default_log_format() } }
}

/// Data the delivery service rule engine consumes but does not own:
/// slice block bounds, the geo-limit country allow-list and defaulting values.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_slice_min")]
    pub range_slice_block_size_min: i32,
    #[serde(default = "default_slice_max")]
    pub range_slice_block_size_max: i32,
    #[serde(default = "default_country_codes")]
    pub country_codes: Vec<String>,
    #[serde(default = "default_routing_name")]
    pub default_routing_name: String,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

fn default_slice_min() -> i32 { 262_144 }
fn default_slice_max() -> i32 { 33_554_432 }
fn default_country_codes() -> Vec<String> {
    country_codes::ISO_3166_ALPHA2.iter().map(|c| c.to_string()).collect()
}
fn default_routing_name() -> String { "cdn".into() }
fn default_max_name_length() -> usize { 48 }

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            range_slice_block_size_min: default_slice_min(),
            range_slice_block_size_max: default_slice_max(),
            country_codes: default_country_codes(),
            default_routing_name: default_routing_name(),
            max_name_length: default_max_name_length(),
        }
    }
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 归一化 server
        self.server.normalize()?;
        // 归一化 database（支持从环境变量填充 URL）
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.rules.normalize_and_validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        // 若 TOML 中未提供 URL，则尝试从环境变量填充
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    /// Pool settings built purely from the environment, used when no config file exists.
    pub fn from_env() -> Self {
        let mut cfg = Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        };
        cfg.normalize_from_env();
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if self.jwt_secret.trim().is_empty() {
            if let Ok(secret) = std::env::var("JWT_SECRET") {
                self.jwt_secret = secret;
            }
        }
    }
}

impl RulesConfig {
    pub fn normalize_and_validate(&mut self) -> Result<()> {
        if self.range_slice_block_size_min <= 0 {
            return Err(anyhow!("rules.range_slice_block_size_min must be positive"));
        }
        if self.range_slice_block_size_max < self.range_slice_block_size_min {
            return Err(anyhow!("rules.range_slice_block_size_max must be >= range_slice_block_size_min"));
        }
        for code in self.country_codes.iter_mut() {
            *code = code.trim().to_ascii_uppercase();
        }
        self.country_codes.retain(|c| !c.is_empty());
        self.country_codes.sort();
        self.country_codes.dedup();
        if self.country_codes.is_empty() {
            return Err(anyhow!("rules.country_codes must not be empty"));
        }
        if self.default_routing_name.trim().is_empty() || self.default_routing_name.contains('.') {
            return Err(anyhow!("rules.default_routing_name must be non-empty and contain no '.'"));
        }
        if self.max_name_length == 0 {
            return Err(anyhow!("rules.max_name_length must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_defaults_match_slice_plugin_limits() {
        let rules = RulesConfig::default();
        assert_eq!(rules.range_slice_block_size_min, 262_144);
        assert_eq!(rules.range_slice_block_size_max, 33_554_432);
        assert!(rules.country_codes.iter().any(|c| c == "US"));
        assert_eq!(rules.default_routing_name, "cdn");
    }

    #[test]
    fn parses_partial_toml_and_normalizes_rules() {
        let toml_src = r#"
            [server]
            host = ""
            port = 9000

            [database]
            url = "postgres://u:p@localhost:5432/ds"

            [rules]
            country_codes = [" us", "ca", "US"]
            range_slice_block_size_min = 1024
        "#;
        let mut cfg: AppConfig = toml::from_str(toml_src).unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.rules.country_codes, vec!["CA".to_string(), "US".to_string()]);
        assert_eq!(cfg.rules.range_slice_block_size_min, 1024);
        assert_eq!(cfg.rules.range_slice_block_size_max, 33_554_432);
    }

    #[test]
    fn rejects_inverted_slice_bounds() {
        let mut rules = RulesConfig { range_slice_block_size_min: 10, range_slice_block_size_max: 5, ..RulesConfig::default() };
        assert!(rules.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_non_postgres_url() {
        let db = DatabaseConfig { url: "mysql://x".into(), min_connections: 1, max_connections: 2, connect_timeout_secs: 1, acquire_timeout_secs: 1, ..Default::default() };
        assert!(db.validate().is_err());
    }
}
