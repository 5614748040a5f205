//! # Configuration DTO / 配置数据
//!
//! Plain data mapped from the TOML configuration file. No validation and no
//! policy lives here: an empty address is a fact for the caller to judge.
//!
//! ```toml
//! [account]
//! addr = "alice@example.org"
//! display_name = "Alice"
//!
//! [storage]
//! database_path = "/var/lib/mailchat/account.db"
//!
//! [logging]
//! log_dir = "/var/log/mailchat"
//!
//! [securejoin]
//! join_timeout_secs = 600
//! ```

use std::path::PathBuf;

/// Application configuration DTO (pure data, no logic)
/// 应用配置 DTO（纯数据，无逻辑）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Own e-mail address (may be empty)
    pub addr: String,

    /// Own display name, embedded into 1:1 invite codes
    pub display_name: String,

    /// Database path (path info only, no existence check)
    /// 数据库路径（仅路径信息，不检查文件是否存在）
    pub database_path: PathBuf,

    /// Directory for rolling log files; `None` logs to stdout only
    pub log_dir: Option<PathBuf>,

    /// Upper bound for a join attempt; `None` waits until finished or cancelled
    pub join_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Create AppConfig from TOML value
    /// 从 TOML 值创建 AppConfig
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let section_str = |section: &str, key: &str| {
            toml_value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(|v| v.as_str())
        };

        Ok(Self {
            addr: section_str("account", "addr").unwrap_or("").to_string(),
            display_name: section_str("account", "display_name")
                .unwrap_or("")
                .to_string(),
            database_path: PathBuf::from(section_str("storage", "database_path").unwrap_or("")),
            log_dir: section_str("logging", "log_dir").map(PathBuf::from),
            join_timeout_secs: toml_value
                .get("securejoin")
                .and_then(|s| s.get("join_timeout_secs"))
                .and_then(|v| v.as_integer())
                .and_then(|v| u64::try_from(v).ok()),
        })
    }

    /// Create empty AppConfig (all empty/default values)
    /// 创建空的 AppConfig（所有字段为空/默认值）
    pub fn empty() -> Self {
        Self {
            addr: String::new(),
            display_name: String::new(),
            database_path: PathBuf::new(),
            log_dir: None,
            join_timeout_secs: None,
        }
    }
}
