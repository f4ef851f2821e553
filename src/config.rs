use crate::application::{LendingPolicy, RetryPolicy};
use crate::domain::loan::MAX_LOAN_PERIOD_DAYS;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// 設定のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// 使用するストア
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

/// 起動時に環境変数から読み込む設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub port: u16,
    pub loan_period_days: i64,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
    pub lock_timeout: Duration,
}

impl Config {
    /// プロセスの環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から読み込む
    ///
    /// 未設定の項目は既定値を使い、解釈できない値はエラーにする。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loan_period_days: i64 = parse(&lookup, "LOAN_PERIOD_DAYS", 14)?;
        if !(1..=MAX_LOAN_PERIOD_DAYS).contains(&loan_period_days) {
            return Err(ConfigError::InvalidValue {
                key: "LOAN_PERIOD_DAYS",
                value: loan_period_days.to_string(),
            });
        }

        let retry_attempts: u32 = parse(&lookup, "CONFLICT_RETRY_ATTEMPTS", 3)?;
        if retry_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CONFLICT_RETRY_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            storage: parse(&lookup, "LENDING_STORAGE", StorageBackend::Postgres)?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/lending".to_string()),
            max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            port: parse(&lookup, "PORT", 3000)?,
            loan_period_days,
            retry_attempts,
            retry_backoff: Duration::from_millis(parse(&lookup, "CONFLICT_RETRY_BACKOFF_MS", 10)?),
            lock_timeout: Duration::from_millis(parse(&lookup, "LOCK_TIMEOUT_MS", 2000)?),
        })
    }

    /// 貸出業務のポリシーに変換する
    pub fn lending_policy(&self) -> LendingPolicy {
        LendingPolicy {
            loan_period: chrono::Duration::days(self.loan_period_days),
            retry: RetryPolicy {
                max_attempts: self.retry_attempts,
                backoff: self.retry_backoff,
            },
        }
    }
}

fn parse<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.port, 3000);
        assert_eq!(config.loan_period_days, 14);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.lock_timeout, Duration::from_millis(2000));

        let policy = config.lending_policy();
        assert_eq!(policy.loan_period, chrono::Duration::days(14));
        assert_eq!(policy.retry.max_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LENDING_STORAGE", "memory"),
            ("PORT", "8080"),
            ("LOAN_PERIOD_DAYS", "21"),
            ("CONFLICT_RETRY_BACKOFF_MS", "5"),
        ])
        .unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.port, 8080);
        assert_eq!(config.lending_policy().loan_period, chrono::Duration::days(21));
        assert_eq!(config.retry_backoff, Duration::from_millis(5));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            config_from(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError::InvalidValue {
                key: "PORT",
                value: "eighty".to_string()
            }
        );
        assert!(config_from(&[("LENDING_STORAGE", "mongo")]).is_err());
        assert!(config_from(&[("LOAN_PERIOD_DAYS", "0")]).is_err());
        assert!(config_from(&[("CONFLICT_RETRY_ATTEMPTS", "0")]).is_err());
    }

    #[test]
    fn test_loan_period_is_bounded() {
        assert_eq!(
            config_from(&[("LOAN_PERIOD_DAYS", "100000000")]).unwrap_err(),
            ConfigError::InvalidValue {
                key: "LOAN_PERIOD_DAYS",
                value: "100000000".to_string()
            }
        );
        assert!(config_from(&[("LOAN_PERIOD_DAYS", "-3")]).is_err());

        let config = config_from(&[("LOAN_PERIOD_DAYS", "3650")]).unwrap();
        assert_eq!(config.loan_period_days, 3650);
    }
}
