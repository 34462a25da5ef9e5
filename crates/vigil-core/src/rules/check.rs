//! The [`Check`] trait and closure adapters.

use crate::error::RuleError;
use crate::model::Model;
use crate::session::ValidationSession;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Something evaluated against the root model of a session.
///
/// Validators produce a [`RuleOutput`](super::RuleOutput), disablers a `bool`.
#[async_trait]
pub trait Check<T>: Send + Sync {
    async fn check(&self, model: &Model, session: &ValidationSession) -> Result<T, RuleError>;
}

/// Adapter for synchronous closures.
pub struct SyncFn<F>(pub F);

#[async_trait]
impl<T, F> Check<T> for SyncFn<F>
where
    T: Send + 'static,
    F: Fn(&Model, &ValidationSession) -> Result<T, RuleError> + Send + Sync,
{
    async fn check(&self, model: &Model, session: &ValidationSession) -> Result<T, RuleError> {
        (self.0)(model, session)
    }
}

/// Adapter for closures returning a future.
///
/// The closure receives owned handles so the future can be `'static`.
pub struct AsyncFn<F, Fut> {
    f: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFn<F, Fut> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> Check<T> for AsyncFn<F, Fut>
where
    T: Send + 'static,
    F: Fn(Model, ValidationSession) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, RuleError>> + Send + 'static,
{
    async fn check(&self, model: &Model, session: &ValidationSession) -> Result<T, RuleError> {
        (self.f)(model.clone(), session.clone()).await
    }
}
