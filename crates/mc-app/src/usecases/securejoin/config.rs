use std::time::Duration;

use mc_core::AppConfig;

/// 安全加入配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecureJoinConfig {
    /// 加入超时; `None` waits until the handshake ends or is cancelled
    pub join_timeout: Option<Duration>,
}

impl SecureJoinConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            join_timeout: config
                .join_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}
