use invodex::base::IxError;
use invodex::session::FreshSession;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[rocket::async_test]
async fn uses_present_token_immediately() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let guard = FreshSession::new(Duration::from_millis(5));
    let f = Arc::clone(&fetches);
    let result = guard
        .run(
            move || {
                let f = Arc::clone(&f);
                async move {
                    f.fetch_add(1, Ordering::SeqCst);
                    Ok::<Option<String>, IxError>(Some(String::from("token-1")))
                }
            },
            |token| async move { Ok::<String, IxError>(token) },
        )
        .await
        .unwrap();
    assert_eq!("token-1", &result);
    assert_eq!(1, fetches.load(Ordering::SeqCst));
}

#[rocket::async_test]
async fn waits_once_for_a_refresh() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let guard = FreshSession::new(Duration::from_millis(5));
    let f = Arc::clone(&fetches);
    let result = guard
        .run(
            move || {
                let f = Arc::clone(&f);
                async move {
                    let call = f.fetch_add(1, Ordering::SeqCst);
                    if call == 0 {
                        Ok::<Option<String>, IxError>(None)
                    } else {
                        Ok(Some(String::from("fresh")))
                    }
                }
            },
            |token| async move { Ok::<String, IxError>(token) },
        )
        .await
        .unwrap();
    assert_eq!("fresh", &result);
    assert_eq!(2, fetches.load(Ordering::SeqCst));
}

#[rocket::async_test]
async fn gives_up_after_one_retry() {
    let action_runs = Arc::new(AtomicUsize::new(0));
    let guard = FreshSession::new(Duration::from_millis(5));
    let a = Arc::clone(&action_runs);
    let result: Result<String, _> = guard
        .run(
            || async { Ok::<Option<String>, IxError>(None) },
            move |token| async move {
                a.fetch_add(1, Ordering::SeqCst);
                Ok::<String, IxError>(token)
            },
        )
        .await;
    assert!(matches!(result, Err(IxError::NoActiveSession)));
    assert_eq!(0, action_runs.load(Ordering::SeqCst));
}

#[rocket::async_test]
async fn propagates_provider_errors_without_retry() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let guard = FreshSession::default();
    let f = Arc::clone(&fetches);
    let result: Result<String, _> = guard
        .run(
            move || {
                let f = Arc::clone(&f);
                async move {
                    f.fetch_add(1, Ordering::SeqCst);
                    Err::<Option<String>, IxError>(IxError::Unauthenticated)
                }
            },
            |token| async move { Ok::<String, IxError>(token) },
        )
        .await;
    assert!(matches!(result, Err(IxError::Unauthenticated)));
    assert_eq!(1, fetches.load(Ordering::SeqCst));
}

#[rocket::async_test]
async fn empty_token_counts_as_absent() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let guard = FreshSession::new(Duration::from_millis(5));
    let f = Arc::clone(&fetches);
    let result = guard
        .run(
            move || {
                let f = Arc::clone(&f);
                async move {
                    let call = f.fetch_add(1, Ordering::SeqCst);
                    if call == 0 {
                        Ok::<Option<String>, IxError>(Some(String::new()))
                    } else {
                        Ok(Some(String::from("real")))
                    }
                }
            },
            |token| async move { Ok::<String, IxError>(token) },
        )
        .await
        .unwrap();
    assert_eq!("real", &result);
    assert_eq!(2, fetches.load(Ordering::SeqCst));
}
