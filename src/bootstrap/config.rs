//! # Configuration Loader / 配置加载器
//!
//! Pure data loading: read the TOML file and map it onto [`AppConfig`].
//! Missing sections become empty values; deciding whether an empty address
//! is acceptable belongs to the caller.

use anyhow::Context;
use mc_core::config::AppConfig;
use std::path::PathBuf;

/// Load configuration from a TOML file
/// 从 TOML 文件加载配置
///
/// # Errors / 错误
///
/// Returns error if the file cannot be read or is not valid TOML.
/// 无法读取文件或内容不是有效的 TOML 时返回错误。
pub fn load_config(config_path: PathBuf) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}
