use async_trait::async_trait;
use std::future::Future;

/// Supplies the bearer token the signaling server authenticates with.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> anyhow::Result<String>;
}

/// A token known up front.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn fetch_token(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

/// Adapts an async closure, e.g. a call into the auth service.
pub struct FnTokenProvider<F>(F);

impl<F, Fut> FnTokenProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> TokenProvider for FnTokenProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send,
{
    async fn fetch_token(&self) -> anyhow::Result<String> {
        (self.0)().await
    }
}
