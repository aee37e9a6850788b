// One-time asynchronous initialization shared by every caller

use crate::error::CoreError;
use futures_util::future::{LocalBoxFuture, Shared};
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Mutex;

type SharedInit = Shared<LocalBoxFuture<'static, Result<(), String>>>;

enum InitState {
    NotStarted,
    InProgress(SharedInit),
    Completed(Result<(), String>),
}

/// Observable state of an [`InitGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    NotStarted,
    InProgress,
    Ready,
    Failed,
}

/// Lazy singleton with an async guard.
///
/// The first call to [`InitGuard::ensure_initialized`] starts the
/// initialization future; calls made while it is pending await the same
/// future, and later calls get the stored outcome. A failed initialization
/// stays failed for the lifetime of the guard.
pub struct InitGuard {
    state: Mutex<InitState>,
}

impl Default for InitGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl InitGuard {
    pub fn new() -> Self {
        Self { state: Mutex::new(InitState::NotStarted) }
    }

    pub fn status(&self) -> InitStatus {
        match self.state.lock() {
            Ok(state) => match &*state {
                InitState::NotStarted => InitStatus::NotStarted,
                InitState::InProgress(_) => InitStatus::InProgress,
                InitState::Completed(Ok(())) => InitStatus::Ready,
                InitState::Completed(Err(_)) => InitStatus::Failed,
            },
            Err(_) => InitStatus::Failed,
        }
    }

    pub async fn ensure_initialized<F, Fut>(&self, init: F) -> Result<(), CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), CoreError>> + 'static,
    {
        // The lock is released before awaiting.
        let pending = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| CoreError::Init("initialization state poisoned".to_string()))?;
            match &*state {
                InitState::Completed(result) => return result.clone().map_err(CoreError::Init),
                InitState::InProgress(pending) => pending.clone(),
                InitState::NotStarted => {
                    let pending = init()
                        .map(|result| result.map_err(|e| e.to_string()))
                        .boxed_local()
                        .shared();
                    *state = InitState::InProgress(pending.clone());
                    pending
                }
            }
        };

        let result = pending.await;
        if let Ok(mut state) = self.state.lock() {
            if matches!(*state, InitState::InProgress(_)) {
                *state = InitState::Completed(result.clone());
            }
        }
        result.map_err(CoreError::Init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join3;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_init(
        counter: &Rc<Cell<u32>>,
        outcome: Result<(), &'static str>,
    ) -> impl FnOnce() -> LocalBoxFuture<'static, Result<(), CoreError>> {
        let counter = counter.clone();
        move || {
            async move {
                counter.set(counter.get() + 1);
                tokio::task::yield_now().await;
                outcome.map_err(|e| CoreError::Init(e.to_string()))
            }
            .boxed_local()
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_initialization() {
        let guard = InitGuard::new();
        let counter = Rc::new(Cell::new(0));

        let (a, b, c) = join3(
            guard.ensure_initialized(counting_init(&counter, Ok(()))),
            guard.ensure_initialized(counting_init(&counter, Ok(()))),
            guard.ensure_initialized(counting_init(&counter, Ok(()))),
        )
        .await;

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(counter.get(), 1);
        assert_eq!(guard.status(), InitStatus::Ready);

        guard.ensure_initialized(counting_init(&counter, Ok(()))).await.unwrap();
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_not_retried() {
        let guard = InitGuard::new();
        let counter = Rc::new(Cell::new(0));

        let first = guard.ensure_initialized(counting_init(&counter, Err("relay unreachable"))).await;
        assert!(matches!(first, Err(CoreError::Init(ref msg)) if msg.contains("relay unreachable")));
        assert_eq!(guard.status(), InitStatus::Failed);

        let second = guard.ensure_initialized(counting_init(&counter, Ok(()))).await;
        assert!(second.is_err());
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_starts_not_started() {
        assert_eq!(InitGuard::new().status(), InitStatus::NotStarted);
    }
}
