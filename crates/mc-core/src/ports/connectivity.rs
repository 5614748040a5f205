use async_trait::async_trait;

#[async_trait]
pub trait ConnectivityPort: Send + Sync {
    /// Whether the account can currently reach its mail server.
    async fn is_online(&self) -> bool;
}
