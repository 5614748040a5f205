//! # Dependency Injection / 依赖注入模块
//!
//! Assembles a [`SecureJoinOrchestrator`] for one account.
//!
//! Token and peerstate storage are created here on top of SQLite. Contacts,
//! chats, the outgoing transport, the own key and connectivity belong to the
//! messenger that embeds this crate and are passed in as [`ExternalPorts`].
//!
//! ## Prohibited / 禁止事项
//!
//! ❌ **No business logic / 禁止包含任何业务逻辑**
//! ❌ **No configuration validation / 禁止做配置验证**

use std::path::Path;
use std::sync::Arc;

use mc_app::{SecureJoinConfig, SecureJoinDeps, SecureJoinOrchestrator};
use mc_core::config::AppConfig;
use mc_core::ports::*;
use mc_infra::db::executor::DieselSqliteExecutor;
use mc_infra::db::mappers::{PeerstateRowMapper, TokenRowMapper};
use mc_infra::db::pool::{init_db_pool, DbPool};
use mc_infra::db::repositories::{DieselPeerstateRepository, DieselTokenStore};

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
/// 依赖注入错误（基础设施初始化失败）
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),
}

/// Ports implemented by the embedding messenger
/// 由宿主通讯程序实现的端口
#[derive(Clone)]
pub struct ExternalPorts {
    pub contacts: Arc<dyn ContactPort>,
    pub chats: Arc<dyn ChatPort>,
    pub transport: Arc<dyn HandshakeTransportPort>,
    pub identity: Arc<dyn SelfIdentityPort>,
    pub connectivity: Arc<dyn ConnectivityPort>,
}

/// Create SQLite database connection pool
/// 创建 SQLite 数据库连接池
///
/// # Errors / 错误
///
/// Returns `WiringError::DatabaseInit` if the parent directory cannot be
/// created, the path is not valid UTF-8, or pool creation/migration fails.
fn create_db_pool(db_path: &Path) -> WiringResult<DbPool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            WiringError::DatabaseInit(format!("Failed to create DB directory: {}", e))
        })?;
    }

    let db_url = db_path
        .to_str()
        .ok_or_else(|| WiringError::DatabaseInit("Invalid database path".to_string()))?;

    init_db_pool(db_url)
        .map_err(|e| WiringError::DatabaseInit(format!("Failed to initialize DB: {:#}", e)))
}

/// Storage layer implementations / 存储层实现
struct StorageLayer {
    token_store: Arc<dyn TokenStorePort>,
    peerstates: Arc<dyn PeerstateRepositoryPort>,
}

fn create_storage_layer(pool: DbPool) -> StorageLayer {
    let token_store = DieselTokenStore::new(DieselSqliteExecutor::new(pool.clone()), TokenRowMapper);
    let peerstates =
        DieselPeerstateRepository::new(DieselSqliteExecutor::new(pool), PeerstateRowMapper);

    StorageLayer {
        token_store: Arc::new(token_store),
        peerstates: Arc::new(peerstates),
    }
}

/// Build the per-account orchestrator
/// 构建账户的安全加入编排器
pub fn build_orchestrator(
    config: &AppConfig,
    external: ExternalPorts,
) -> WiringResult<SecureJoinOrchestrator> {
    let pool = create_db_pool(&config.database_path)?;
    let storage = create_storage_layer(pool);

    let deps = SecureJoinDeps {
        token_store: storage.token_store,
        peerstates: storage.peerstates,
        contacts: external.contacts,
        chats: external.chats,
        transport: external.transport,
        identity: external.identity,
        connectivity: external.connectivity,
    };

    tracing::info!(
        database = %config.database_path.display(),
        "Secure join orchestrator assembled"
    );
    Ok(SecureJoinOrchestrator::new(
        deps,
        SecureJoinConfig::from_app_config(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::qr::uri::ParsedQr;
    use mc_core::Fingerprint;
    use mc_infra::memory::{
        ChannelOutbox, InMemoryChats, InMemoryContacts, StaticConnectivity, StaticIdentity,
    };
    use tempfile::TempDir;

    const FPR: &str = "A1B2C3D4E5F60718293A4B5C6D7E8F9001122334";

    fn external_ports() -> ExternalPorts {
        let (transport, _outbox) = ChannelOutbox::new();
        ExternalPorts {
            contacts: Arc::new(InMemoryContacts::new()),
            chats: Arc::new(InMemoryChats::new()),
            transport: Arc::new(transport),
            identity: Arc::new(StaticIdentity::new(
                "alice@example.org",
                "Alice",
                Fingerprint::normalized(FPR),
            )),
            connectivity: Arc::new(StaticConnectivity::new(true)),
        }
    }

    fn config_in(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::empty();
        config.addr = "alice@example.org".to_string();
        config.display_name = "Alice".to_string();
        config.database_path = dir.path().join("nested").join("alice.db");
        config
    }

    #[tokio::test]
    async fn test_build_orchestrator_creates_database_and_issues_invites() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let orchestrator = build_orchestrator(&config, external_ports()).unwrap();
        assert!(config.database_path.exists());

        let first = orchestrator.generate_qr(None).await.unwrap();
        let parsed = ParsedQr::parse(&first).unwrap();
        assert!(parsed.has_tokens());
        assert_eq!(parsed.addr.as_deref(), Some("alice@example.org"));

        // tokens are persisted and reused
        assert_eq!(orchestrator.generate_qr(None).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_tokens_survive_a_rebuild() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let first = build_orchestrator(&config, external_ports())
            .unwrap()
            .generate_qr(None)
            .await
            .unwrap();
        let second = build_orchestrator(&config, external_ports())
            .unwrap()
            .generate_qr(None)
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_database_location_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut config = config_in(&dir);
        config.database_path = blocker.join("alice.db");

        let err = build_orchestrator(&config, external_ports())
            .err()
            .expect("wiring must fail");
        assert!(matches!(err, WiringError::DatabaseInit(_)));
    }
}
