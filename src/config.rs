use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::db::{DEFAULT_MAX_POOL_SIZE, DEFAULT_STATEMENT_TIMEOUT_MS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmtpSecurity {
    None,
    StartTls,
    Tls,
}

impl FromStr for SmtpSecurity {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(SmtpSecurity::None),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" | "ssl" => Ok(SmtpSecurity::Tls),
            other => Err(anyhow!("unknown SMTP security mode `{other}`")),
        }
    }
}

impl SmtpSecurity {
    /// Port used when `SMTP_PORT` is unset.
    pub fn default_port(self) -> u16 {
        match self {
            SmtpSecurity::None => 25,
            SmtpSecurity::StartTls => 587,
            SmtpSecurity::Tls => 465,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub database_statement_timeout: Duration,
    pub store_timeout: Duration,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub cors_allowed_origin: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub mail_timeout: Duration,
    pub notify_queue_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let database_statement_timeout = millis_var(
            "DATABASE_STATEMENT_TIMEOUT_MS",
            DEFAULT_STATEMENT_TIMEOUT_MS,
        )?;
        let store_timeout = millis_var("STORE_TIMEOUT_MS", 8_000)?;
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "internhub".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "internhub-clients".to_string());
        let jwt_expiry_minutes = env::var("JWT_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("JWT_EXPIRY_MINUTES must be an integer")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();

        let smtp = match env::var("SMTP_HOST").ok().filter(|host| !host.trim().is_empty()) {
            Some(host) => {
                let security: SmtpSecurity = env::var("SMTP_SECURITY")
                    .unwrap_or_else(|_| "starttls".to_string())
                    .parse()
                    .context("SMTP_SECURITY must be one of none, starttls, tls")?;
                Some(SmtpConfig {
                    host,
                    port: smtp_port(env::var("SMTP_PORT").ok().as_deref(), security)?,
                    security,
                    username: env::var("SMTP_USERNAME").ok(),
                    password: env::var("SMTP_PASSWORD").ok(),
                })
            }
            None => None,
        };
        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "InternHub <no-reply@internhub.local>".to_string());
        let mail_timeout = millis_var("MAIL_TIMEOUT_MS", 10_000)?;
        let notify_queue_capacity = env::var("NOTIFY_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "256".to_string())
            .parse::<usize>()
            .context("NOTIFY_QUEUE_CAPACITY must be a positive integer")?
            .max(1);

        Ok(Self {
            database_url,
            database_max_pool_size,
            database_statement_timeout,
            store_timeout,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_minutes,
            cors_allowed_origin,
            smtp,
            mail_from,
            mail_timeout,
            notify_queue_capacity,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn millis_var(key: &str, default: u64) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => parse_millis(&raw).with_context(|| format!("{key} must be a number of milliseconds")),
        Err(_) => Ok(Duration::from_millis(default)),
    }
}

fn parse_millis(raw: &str) -> Result<Duration> {
    let millis: u64 = raw.trim().parse()?;
    if millis == 0 {
        return Err(anyhow!("timeout must be greater than zero"));
    }
    Ok(Duration::from_millis(millis))
}

fn smtp_port(raw: Option<&str>, security: SmtpSecurity) -> Result<u16> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw.parse().context("SMTP_PORT must be a valid u16"),
        None => Ok(security.default_port()),
    }
}

/// Masks the password of a connection URL for logging. URLs without a
/// password are returned unchanged.
fn redact_database_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return "***".to_string();
    };
    if parsed.password().is_none() {
        return parsed.to_string();
    }
    match parsed.set_password(Some("*****")) {
        Ok(()) => parsed.to_string(),
        Err(()) => "***".to_string(),
    }
}
