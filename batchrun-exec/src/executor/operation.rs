use std::future::Future;

use async_trait::async_trait;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The work applied to each identifier.
///
/// The executor never times out a call: an operation that hangs stalls the run,
/// so implementations that talk to a remote service should carry their own timeout.
/// Rate-limit failures are recognised by their message (`"rate limit"`, with an
/// optional `"retry in N seconds"` hint).
#[async_trait]
pub trait Operation<T>: Send + Sync {
    async fn call(&self, id: &str) -> Result<T, BoxError>;
}

/// Adapts a closure returning a future into an [`Operation`].
pub struct OperationFn<F> {
    f: F,
}

impl<F> OperationFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, T, E> Operation<T> for OperationFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    E: Into<BoxError>,
    T: Send + 'static,
{
    async fn call(&self, id: &str) -> Result<T, BoxError> {
        (self.f)(id.to_string()).await.map_err(Into::into)
    }
}
