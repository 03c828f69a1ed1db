use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Absent means the process runs on the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_list_limit: i64,
    pub bulk_max_rows: usize,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_name: String,
    pub require_https: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub system_admin_email: String,
    #[serde(skip_serializing)]
    pub system_admin_password: String,
    pub create_sample_tenant: bool,
    pub sample_company_admin_email: String,
    #[serde(skip_serializing)]
    pub sample_company_admin_password: String,
    pub sample_accountant_email: String,
    #[serde(skip_serializing)]
    pub sample_accountant_password: String,
}

impl Environment {
    /// `APP_ENV` value; anything unrecognised is development.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

/// Replaces `slot` when `key` is set and parses; a bad value keeps the preset.
fn env_parse<T: FromStr>(slot: &mut T, key: &str) {
    if let Some(value) = env::var(key).ok().and_then(|v| v.trim().parse().ok()) {
        *slot = value;
    }
}

fn env_string(slot: &mut String, key: &str) {
    if let Ok(value) = env::var(key) {
        *slot = value;
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = Environment::from_name(&env::var("APP_ENV").unwrap_or_default());
        let mut config = Self::preset(environment);
        config.apply_env();
        config
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Staging => Self::staging(),
            Environment::Production => Self::production(),
        }
    }

    fn apply_env(&mut self) {
        let port_key = if env::var("INVOICER_API_PORT").is_ok() { "INVOICER_API_PORT" } else { "PORT" };
        env_parse(&mut self.server.port, port_key);

        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url).filter(|u| !u.trim().is_empty());
        }
        env_parse(&mut self.database.max_connections, "DATABASE_MAX_CONNECTIONS");
        env_parse(&mut self.database.connection_timeout, "DATABASE_CONNECTION_TIMEOUT");

        env_parse(&mut self.api.max_list_limit, "API_MAX_LIST_LIMIT");
        env_parse(&mut self.api.bulk_max_rows, "API_BULK_MAX_ROWS");
        env_parse(&mut self.api.max_request_size_bytes, "API_MAX_REQUEST_SIZE_BYTES");

        env_string(&mut self.security.jwt_secret, "JWT_SECRET");
        env_parse(&mut self.security.jwt_expiry_hours, "SECURITY_JWT_EXPIRY_HOURS");
        env_string(&mut self.security.cookie_name, "SECURITY_COOKIE_NAME");
        env_parse(&mut self.security.require_https, "SECURITY_REQUIRE_HTTPS");
        if let Ok(origins) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        let seed = &mut self.seed;
        env_string(&mut seed.system_admin_email, "SYSTEM_ADMIN_EMAIL");
        env_string(&mut seed.system_admin_password, "SYSTEM_ADMIN_PASSWORD");
        env_parse(&mut seed.create_sample_tenant, "CREATE_SAMPLE_TENANT");
        env_string(&mut seed.sample_company_admin_email, "SAMPLE_COMPANY_ADMIN_EMAIL");
        env_string(&mut seed.sample_company_admin_password, "SAMPLE_COMPANY_ADMIN_PASSWORD");
        env_string(&mut seed.sample_accountant_email, "SAMPLE_ACCOUNTANT_EMAIL");
        env_string(&mut seed.sample_accountant_password, "SAMPLE_ACCOUNTANT_PASSWORD");
    }

    /// Local work: in-memory store unless DATABASE_URL is set, seeded sample tenant.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3001 },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                max_list_limit: 1000,
                bulk_max_rows: 1000,
                max_request_size_bytes: 10 << 20,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7,
                cookie_name: "token".to_string(),
                require_https: false,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            seed: SeedConfig::defaults(true),
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.max_list_limit = 500;
        config.api.max_request_size_bytes = 5 << 20;
        config.harden("https://staging.example.com");
        config
    }

    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.api.max_list_limit = 100;
        config.api.max_request_size_bytes = 2 << 20;
        config.harden("https://app.example.com");
        config
    }

    /// No baked-in secret, HTTPS-only cookies, one origin, no sample data.
    fn harden(&mut self, origin: &str) {
        self.security.jwt_secret.clear();
        self.security.require_https = true;
        self.security.cors_origins = vec![origin.to_string()];
        self.seed = SeedConfig::defaults(false);
    }

    /// Cookie lifetime in seconds, derived from the token lifetime.
    pub fn cookie_max_age(&self) -> u64 {
        self.security.jwt_expiry_hours * 60 * 60
    }
}

impl SeedConfig {
    pub fn defaults(create_sample_tenant: bool) -> Self {
        Self {
            system_admin_email: "admin@system.com".to_string(),
            system_admin_password: "admin123".to_string(),
            create_sample_tenant,
            sample_company_admin_email: "admin@sample.com".to_string(),
            sample_company_admin_password: "Admin123!".to_string(),
            sample_accountant_email: "accountant@sample.com".to_string(),
            sample_accountant_password: "Accountant123!".to_string(),
        }
    }
}

/// Process-wide settings, read from the environment on first use.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
