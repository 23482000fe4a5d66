use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::deferral::error::{DeferralError, abandoned};

pub type DeferralKey = String;

/// `Ok(None)` is a resolution without a value.
pub type DeferralOutcome<T> = Result<Option<T>, DeferralError>;

/// Awaitable handle to a deferral's eventual outcome.
///
/// Clones share a single settlement: every holder observes the same value or
/// the same rejection. A rejected outcome that no holder inspects is simply
/// dropped; handling the `Err` arm is the awaiting caller's job.
#[must_use = "a deferral only reports its outcome when awaited"]
pub struct Deferred<T> {
    inner: Shared<BoxFuture<'static, DeferralOutcome<T>>>,
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn ready(outcome: DeferralOutcome<T>) -> Self {
        Self {
            inner: future::ready(outcome).boxed().shared(),
        }
    }

    /// Already resolved with no value.
    pub fn settled_empty() -> Self {
        Self::ready(Ok(None))
    }

    /// Pending handle plus the capability that settles it.
    pub(crate) fn channel() -> (Settler<T>, Self) {
        let (tx, rx) = oneshot::channel::<DeferralOutcome<T>>();
        let inner = async move {
            match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(abandoned("deferral was dropped before it settled")),
            }
        }
        .boxed()
        .shared();

        (Settler { tx }, Self { inner })
    }

    /// Outcome if the deferral has already settled, without waiting.
    pub fn try_outcome(&self) -> Option<DeferralOutcome<T>> {
        self.clone().now_or_never()
    }

    /// True when both handles refer to the same still-pending deferral.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Deferred<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Future for Deferred<T>
where
    T: Clone,
{
    type Output = DeferralOutcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

pub(crate) struct Settler<T> {
    tx: oneshot::Sender<DeferralOutcome<T>>,
}

impl<T> Settler<T> {
    pub(crate) fn resolve(self, value: Option<T>) {
        self.settle(Ok(value));
    }

    pub(crate) fn reject(self, error: DeferralError) {
        self.settle(Err(error));
    }

    // Nobody left to observe the outcome when the send fails.
    fn settle(self, outcome: DeferralOutcome<T>) {
        let _ = self.tx.send(outcome);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferralSnapshot {
    pub version: u64,
    pub keys: Vec<DeferralKey>,
}
