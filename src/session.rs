use crate::base::{IxError, IxResult};
use rocket::tokio::time::sleep;
use std::future::Future;
use std::time::Duration;

// Guards a client call against a just-expired or still-hydrating session: when
// no token is available, wait once for a refresh to land, re-check, and only
// then give up. The action runs at most once.
pub struct FreshSession {
    delay: Duration,
}

impl Default for FreshSession {
    fn default() -> Self {
        FreshSession {
            delay: Duration::from_secs(1),
        }
    }
}

impl FreshSession {
    pub fn new(delay: Duration) -> Self {
        FreshSession { delay }
    }

    pub async fn run<P, PF, A, AF, T>(&self, fetch_token: P, action: A) -> IxResult<T>
    where
        P: Fn() -> PF,
        PF: Future<Output = IxResult<Option<String>>>,
        A: FnOnce(String) -> AF,
        AF: Future<Output = IxResult<T>>,
    {
        if let Some(token) = present(fetch_token().await?) {
            return action(token).await;
        }
        sleep(self.delay).await;
        match present(fetch_token().await?) {
            Some(token) => action(token).await,
            None => Err(IxError::NoActiveSession),
        }
    }
}

fn present(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}
