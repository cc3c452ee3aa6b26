//! Request and response interceptor chains.
//!
//! Interceptors run strictly in registration order, one at a time. Each
//! registration returns an [`InterceptorHandle`]; removing through it finds
//! the registered function by identity, so removing twice is a no-op.
//!
//! - [`RequestInterceptors`] fold the [`RequestConfig`] through every
//!   interceptor, each one receiving the previous output.
//! - [`ResponseInterceptors`] hold success/error pairs. Success transforms
//!   fold the [`Payload`]. Error transforms each receive the *original*
//!   error and the value returned by the last one is the result.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use fata_core::{Error, Payload, RequestConfig, ResponseHead, Result};
use futures_util::future::BoxFuture;

type RequestFn =
    dyn Fn(RequestConfig) -> BoxFuture<'static, Result<RequestConfig>> + Send + Sync;

type SuccessFn = dyn Fn(
        Arc<RequestConfig>,
        Arc<ResponseHead>,
        Payload,
    ) -> BoxFuture<'static, Result<Payload>>
    + Send
    + Sync;

type ErrorFn =
    dyn Fn(Arc<RequestConfig>, Error) -> BoxFuture<'static, Result<Payload>> + Send + Sync;

type Chain<F> = Arc<Mutex<Vec<Arc<F>>>>;

fn snapshot<F: ?Sized>(chain: &Chain<F>) -> Vec<Arc<F>> {
    chain
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn push<F: ?Sized>(chain: &Chain<F>, entry: Arc<F>) {
    chain
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(entry);
}

/// Remove the first entry that is `entry`; returns `true` if one was found.
fn remove_entry<F: ?Sized>(chain: &Weak<Mutex<Vec<Arc<F>>>>, entry: &Arc<F>) -> bool {
    let Some(chain) = chain.upgrade() else {
        return false;
    };
    let mut entries = chain.lock().unwrap_or_else(PoisonError::into_inner);
    match entries.iter().position(|candidate| Arc::ptr_eq(candidate, entry)) {
        Some(index) => {
            entries.remove(index);
            true
        }
        None => false,
    }
}

/// Remover returned by interceptor registration.
///
/// Dropping the handle keeps the interceptor registered.
pub struct InterceptorHandle {
    remove: Box<dyn Fn() -> bool + Send + Sync>,
}

impl InterceptorHandle {
    /// Remove the interceptor(s) registered with this handle.
    ///
    /// Returns `true` if anything was removed; later calls return `false`.
    pub fn remove(&self) -> bool {
        (self.remove)()
    }
}

impl fmt::Debug for InterceptorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorHandle").finish_non_exhaustive()
    }
}

/// Ordered chain of request transforms.
#[derive(Clone, Default)]
pub struct RequestInterceptors {
    chain: Chain<RequestFn>,
}

impl RequestInterceptors {
    /// Append a transform.
    pub fn register<F, Fut>(&self, interceptor: F) -> InterceptorHandle
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestConfig>> + Send + 'static,
    {
        let entry: Arc<RequestFn> =
            Arc::new(move |config| -> BoxFuture<'static, Result<RequestConfig>> {
                Box::pin(interceptor(config))
            });
        push(&self.chain, Arc::clone(&entry));

        let chain = Arc::downgrade(&self.chain);
        InterceptorHandle {
            remove: Box::new(move || remove_entry(&chain, &entry)),
        }
    }

    /// Number of registered transforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no transform is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feed `config` through every transform, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing transform and returns its error.
    pub async fn exec(&self, mut config: RequestConfig) -> Result<RequestConfig> {
        for interceptor in snapshot(&self.chain) {
            config = interceptor(config).await?;
        }
        Ok(config)
    }
}

impl fmt::Debug for RequestInterceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInterceptors")
            .field("len", &self.len())
            .finish()
    }
}

/// Success and error transforms, registered in pairs.
#[derive(Clone, Default)]
pub struct ResponseInterceptors {
    success: Chain<SuccessFn>,
    error: Chain<ErrorFn>,
}

impl ResponseInterceptors {
    /// Append a success transform and an error transform at the same position.
    ///
    /// The handle removes both, each searched in its own list.
    pub fn register<S, SFut, E, EFut>(&self, on_success: S, on_error: E) -> InterceptorHandle
    where
        S: Fn(Arc<RequestConfig>, Arc<ResponseHead>, Payload) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = Result<Payload>> + Send + 'static,
        E: Fn(Arc<RequestConfig>, Error) -> EFut + Send + Sync + 'static,
        EFut: Future<Output = Result<Payload>> + Send + 'static,
    {
        let success: Arc<SuccessFn> = Arc::new(
            move |config, head, data| -> BoxFuture<'static, Result<Payload>> {
                Box::pin(on_success(config, head, data))
            },
        );
        let error: Arc<ErrorFn> =
            Arc::new(move |config, err| -> BoxFuture<'static, Result<Payload>> {
                Box::pin(on_error(config, err))
            });
        push(&self.success, Arc::clone(&success));
        push(&self.error, Arc::clone(&error));

        let success_chain = Arc::downgrade(&self.success);
        let error_chain = Arc::downgrade(&self.error);
        InterceptorHandle {
            remove: Box::new(move || {
                let removed_success = remove_entry(&success_chain, &success);
                let removed_error = remove_entry(&error_chain, &error);
                removed_success || removed_error
            }),
        }
    }

    /// Number of registered pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.success
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no pair is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold `data` through every success transform, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing transform and returns its error.
    pub async fn run_success(
        &self,
        config: &Arc<RequestConfig>,
        head: &Arc<ResponseHead>,
        mut data: Payload,
    ) -> Result<Payload> {
        for interceptor in snapshot(&self.success) {
            data = interceptor(Arc::clone(config), Arc::clone(head), data).await?;
        }
        Ok(data)
    }

    /// Give every error transform the original `err`; the last result wins.
    ///
    /// # Errors
    ///
    /// Returns `err` itself when no error transform is registered, or the
    /// error of the first failing transform.
    pub async fn run_error(&self, config: &Arc<RequestConfig>, err: Error) -> Result<Payload> {
        let mut recovered = None;
        for interceptor in snapshot(&self.error) {
            recovered = Some(interceptor(Arc::clone(config), err.clone()).await?);
        }
        recovered.ok_or(err)
    }
}

impl fmt::Debug for ResponseInterceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseInterceptors")
            .field("len", &self.len())
            .finish()
    }
}

/// The two chains a client owns.
#[derive(Debug, Clone, Default)]
pub struct Interceptors {
    /// Applied to the request configuration before dispatch.
    pub request: RequestInterceptors,
    /// Applied to the decoded payload or to the failure.
    pub response: ResponseInterceptors,
}
