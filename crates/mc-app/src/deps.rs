//! # Application Dependencies / 应用依赖
//!
//! Dependency grouping for the Secure Join orchestrator.
//! 仅用于参数打包，不是 Builder 模式。

use std::sync::Arc;

use mc_core::ports::*;

/// All ports the Secure Join use cases need (non-Builder, just parameter grouping)
/// 安全加入依赖分组
///
/// All dependencies are required - no defaults, no optional fields.
/// 所有依赖都是必需的 - 无默认值，无可选字段。
#[derive(Clone)]
pub struct SecureJoinDeps {
    // Storage dependencies / 存储依赖
    pub token_store: Arc<dyn TokenStorePort>,
    pub peerstates: Arc<dyn PeerstateRepositoryPort>,

    // Messenger dependencies / 通讯依赖
    pub contacts: Arc<dyn ContactPort>,
    pub chats: Arc<dyn ChatPort>,
    pub transport: Arc<dyn HandshakeTransportPort>,

    // Account dependencies / 账户依赖
    pub identity: Arc<dyn SelfIdentityPort>,
    pub connectivity: Arc<dyn ConnectivityPort>,
}
