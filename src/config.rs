use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub api_rps: u32,
    pub auth_rps: u32,
    pub log_format: LogFormat,
    pub admin: Option<AdminBootstrap>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let log_format = match env::var("LOG_FORMAT").ok().as_deref() {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!(
                    "Invalid value for LOG_FORMAT: {} (expected pretty or json)",
                    other
                )))
            }
        };

        let admin = match (env::var("ADMIN_USERNAME").ok(), env::var("ADMIN_PASSWORD").ok()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                let email = env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| format!("{}@school.local", username));
                Some(AdminBootstrap {
                    username,
                    password,
                    email,
                })
            }
            _ => None,
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_ttl_minutes: get_env_parse_or("JWT_TTL_MINUTES", 720)?,
            api_rps: get_env_parse_or("API_RPS", 50)?,
            auth_rps: get_env_parse_or("AUTH_RPS", 10)?,
            log_format,
            admin,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
