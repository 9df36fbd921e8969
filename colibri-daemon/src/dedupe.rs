// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Coalescing of concurrent identical requests.
//!
//! A [Group] runs at most one piece of work per key at a time. Callers arriving while the work
//! for their key is in flight wait for that work instead of starting their own, and all of
//! them receive the same result. Once the work completes its key is forgotten, so the next
//! caller starts fresh.
//!
//! The work runs in its own task. Callers that stop waiting do not cancel it for the others.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::task::JoinError;
use tracing::Instrument;

type SharedResult<T, E> = Shared<BoxFuture<'static, Result<T, Arc<E>>>>;

/// A group of in-flight calls, keyed by string.
pub struct Group<T, E> {
    calls: Arc<Mutex<HashMap<String, SharedResult<T, E>>>>,
}

impl<T, E> Clone for Group<T, E> {
    fn clone(&self) -> Self {
        Group {
            calls: self.calls.clone(),
        }
    }
}

impl<T, E> Default for Group<T, E> {
    fn default() -> Self {
        Group {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Handle to the result of a call registered in a [Group].
#[must_use = "a call does nothing unless awaited"]
pub struct Call<T, E> {
    inner: SharedResult<T, E>,
}

impl<T: Clone, E> Future for Call<T, E> {
    type Output = Result<T, Arc<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T, E> Group<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: From<JoinError> + Send + Sync + 'static,
{
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call for `key`.
    ///
    /// If a call for `key` is in flight, a handle to it is returned together with `true` and
    /// `make_fut` is not invoked. Otherwise `make_fut` is invoked once, the future it returns
    /// is spawned in the current span and a handle to it is returned together with `false`.
    ///
    /// Must be called within a tokio runtime.
    pub fn start<F, Fut>(&self, key: String, make_fut: F) -> (Call<T, E>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(inner) = calls.get(&key) {
            return (
                Call {
                    inner: inner.clone(),
                },
                true,
            );
        }

        let fut = make_fut();
        let guard = ForgetOnDrop {
            calls: self.calls.clone(),
            key: key.clone(),
        };
        let handle = tokio::spawn(
            async move {
                let res = fut.await.map_err(Arc::new);
                // Forget the key before the result becomes visible to the waiters.
                drop(guard);
                res
            }
            .in_current_span(),
        );
        let inner = async move {
            match handle.await {
                Ok(res) => res,
                Err(e) => Err(Arc::new(E::from(e))),
            }
        }
        .boxed()
        .shared();

        calls.insert(key, inner.clone());
        (Call { inner }, false)
    }

    /// Runs `make_fut` for `key`, or joins the call already in flight for it.
    ///
    /// Returns the result and whether it was shared with another caller.
    pub async fn work<F, Fut>(&self, key: String, make_fut: F) -> (Result<T, Arc<E>>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (call, shared) = self.start(key, make_fut);
        (call.await, shared)
    }

    /// Number of calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Removes a key from the group when dropped, including when the work panics.
struct ForgetOnDrop<T, E> {
    calls: Arc<Mutex<HashMap<String, SharedResult<T, E>>>>,
    key: String,
}

impl<T, E> Drop for ForgetOnDrop<T, E> {
    fn drop(&mut self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("failed: {0}")]
        Failed(String),
        #[error("panicked")]
        Panicked(#[from] JoinError),
    }

    type TestGroup = Group<u32, TestError>;

    async fn explode() -> Result<u32, TestError> {
        panic!("work panicked")
    }

    fn counting<Fut>(
        counter: &Arc<AtomicUsize>,
        fut: Fut,
    ) -> impl FnOnce() -> Fut + use<Fut> {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            fut
        }
    }

    #[test_log::test(tokio::test)]
    async fn should_coalesce_concurrent_calls() {
        let group = TestGroup::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<u32>();

        let (first, first_shared) = group.start(
            "key".into(),
            counting(&counter, async move { Ok(rx.await.unwrap_or_default()) }),
        );
        let (second, second_shared) =
            group.start("key".into(), counting(&counter, async { Ok(0) }));

        assert!(!first_shared);
        assert!(second_shared);
        assert_eq!(group.in_flight(), 1);

        tx.send(42).unwrap();
        assert_eq!(first.await.unwrap(), 42);
        assert_eq!(second.await.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(group.in_flight(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn should_start_fresh_call_after_completion() {
        let group = TestGroup::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let (res, shared) = group
            .work("key".into(), counting(&counter, async { Ok(1) }))
            .await;
        assert_eq!(res.unwrap(), 1);
        assert!(!shared);

        let (res, shared) = group
            .work("key".into(), counting(&counter, async { Ok(2) }))
            .await;
        assert_eq!(res.unwrap(), 2);
        assert!(!shared);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test_log::test(tokio::test)]
    async fn should_not_coalesce_different_keys() {
        let group = TestGroup::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let (a, a_shared) = group.start("a".into(), counting(&counter, async { Ok(1) }));
        let (b, b_shared) = group.start("b".into(), counting(&counter, async { Ok(2) }));
        assert!(!a_shared && !b_shared);
        assert_eq!(group.in_flight(), 2);

        assert_eq!(a.await.unwrap(), 1);
        assert_eq!(b.await.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test_log::test(tokio::test)]
    async fn should_forget_key_after_lock_poisoned() {
        let group = TestGroup::new();
        let (tx, rx) = oneshot::channel::<u32>();
        let (call, _) = group.start("key".into(), || async move {
            Ok(rx.await.unwrap_or_default())
        });

        let calls = group.calls.clone();
        let poisoner = std::thread::spawn(move || {
            let _guard = calls.lock().unwrap();
            panic!("poison the lock");
        });
        assert!(poisoner.join().is_err());
        assert!(group.calls.is_poisoned());

        tx.send(7).unwrap();
        assert_eq!(call.await.unwrap(), 7);
        assert_eq!(group.in_flight(), 0);

        let (res, shared) = group.work("key".into(), || async { Ok(8) }).await;
        assert_eq!(res.unwrap(), 8);
        assert!(!shared);
    }

    #[test_log::test(tokio::test)]
    async fn should_share_errors_with_all_waiters() {
        let group = TestGroup::new();
        let (tx, rx) = oneshot::channel::<()>();

        let (first, _) = group.start("key".into(), || async move {
            let _ = rx.await;
            Err(TestError::Failed("boom".into()))
        });
        let (second, shared) = group.start("key".into(), || async { Ok(0) });
        assert!(shared);

        tx.send(()).unwrap();
        let first = first.await.unwrap_err();
        let second = second.await.unwrap_err();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(&*first, TestError::Failed(msg) if msg == "boom"));
    }

    #[test_log::test(tokio::test)]
    async fn should_turn_panic_into_error() {
        let group = TestGroup::new();

        let (res, _) = group.work("key".into(), explode).await;
        assert!(matches!(&*res.unwrap_err(), TestError::Panicked(e) if e.is_panic()));
        assert_eq!(group.in_flight(), 0);

        let (res, shared) = group.work("key".into(), || async { Ok(7) }).await;
        assert_eq!(res.unwrap(), 7);
        assert!(!shared);
    }

    #[test_log::test(tokio::test)]
    async fn should_keep_working_when_waiter_gives_up() {
        let group = TestGroup::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<u32>();

        let (abandoned, _) = group.start(
            "key".into(),
            counting(&counter, async move { Ok(rx.await.unwrap_or_default()) }),
        );
        drop(abandoned);

        let (late, shared) = group.start("key".into(), counting(&counter, async { Ok(0) }));
        assert!(shared);

        tx.send(5).unwrap();
        assert_eq!(late.await.unwrap(), 5);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
