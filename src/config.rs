//! Configuration types, read from the environment.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::directory::model::ExternalId;
use crate::error::ConfigError;

const DEFAULT_DB_PATH: &str = "./data/company-bot.db";
const DEFAULT_PAGE_SIZE: u32 = 5;
const DEFAULT_CLI_USER_ID: ExternalId = 1;

/// Telegram channel settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Usernames or numeric ids; `*` admits everyone.
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    /// Human-readable allowlist for the startup banner.
    pub fn allowed_summary(&self) -> String {
        if self.allowed_users.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else if self.allowed_users.is_empty() {
            "none (deny all)".to_string()
        } else {
            self.allowed_users.join(", ")
        }
    }
}

/// Where conversation sessions are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStoreKind {
    #[default]
    Memory,
    Database,
}

impl std::str::FromStr for SessionStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "database" | "db" => Ok(Self::Database),
            other => Err(ConfigError::InvalidValue {
                key: "COMPANY_BOT_SESSION_STORE".into(),
                message: format!("expected `memory` or `database`, got `{other}`"),
            }),
        }
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Enabled when `TELEGRAM_BOT_TOKEN` is set.
    pub telegram: Option<TelegramConfig>,
    /// External id of the stdin user, when the CLI channel is enabled.
    pub cli_user: Option<ExternalId>,
    pub db_path: PathBuf,
    /// Employees per list page. Never zero.
    pub page_size: u32,
    pub session_store: SessionStoreKind,
    /// Directory seed applied at startup.
    pub seed_file: Option<PathBuf>,
    /// Directory for daily rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram = var("TELEGRAM_BOT_TOKEN").map(|token| TelegramConfig {
            bot_token: SecretString::from(token),
            allowed_users: var("TELEGRAM_ALLOWED_USERS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        });

        // The stdin channel defaults to on only when there is nothing else to talk to.
        let cli_enabled = match var("COMPANY_BOT_CLI") {
            Some(v) => is_truthy(&v),
            None => telegram.is_none(),
        };
        let cli_user = cli_enabled.then(|| {
            var("COMPANY_BOT_CLI_USER_ID")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_CLI_USER_ID)
        });

        if telegram.is_none() && cli_user.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "TELEGRAM_BOT_TOKEN".into(),
                hint: "Set a bot token or enable the stdin channel with COMPANY_BOT_CLI=1".into(),
            });
        }

        let page_size = var("COMPANY_BOT_PAGE_SIZE")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "COMPANY_BOT_PAGE_SIZE".into(),
                message: "page size must be at least 1".into(),
            });
        }

        let session_store = match var("COMPANY_BOT_SESSION_STORE") {
            Some(v) => v.parse()?,
            None => SessionStoreKind::default(),
        };

        Ok(Self {
            telegram,
            cli_user,
            db_path: var("COMPANY_BOT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            page_size,
            session_store,
            seed_file: var("COMPANY_BOT_SEED_FILE").map(PathBuf::from),
            log_dir: var("COMPANY_BOT_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
