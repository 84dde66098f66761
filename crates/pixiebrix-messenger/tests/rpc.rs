//! End-to-end calls between realms over the in-process host.

use std::sync::Arc;
use std::time::Duration;

use pixiebrix_messenger::{CallContext, LocalHost, Method, Realm, RealmOptions, RetryConfig};
use pixiebrix_protocols::{ContextKind, Endpoint, MessengerError, SerializedError, Target};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep, timeout};

struct Delay;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DelayArgs {
    label: String,
    millis: u64,
}

impl Method for Delay {
    const NAME: &'static str = "DELAY";
    type Args = DelayArgs;
    type Output = String;
}

struct FrameName;

impl Method for FrameName {
    const NAME: &'static str = "FRAME_NAME";
    const CONTEXTS: &'static [ContextKind] = &[ContextKind::ContentScript];
    type Args = ();
    type Output = String;
}

struct Version;

impl Method for Version {
    const NAME: &'static str = "VERSION";
    type Args = ();
    type Output = u32;
}

fn retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(150),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

fn background(host: &Arc<LocalHost>) -> Arc<Realm> {
    let options = RealmOptions::new(ContextKind::Background, Endpoint::Background).with_retry(retry());
    Realm::new(options, host.clone(), host.clone()).unwrap()
}

fn frame(host: &Arc<LocalHost>, tab_id: u64, frame_id: u64) -> Arc<Realm> {
    host.open_frame(tab_id, frame_id, Some("https://example.com"));
    let options = RealmOptions::new(ContextKind::ContentScript, Endpoint::frame(tab_id, frame_id))
        .with_retry(retry());
    Realm::new(options, host.clone(), host.clone()).unwrap()
}

async fn delayed(_ctx: CallContext, args: DelayArgs) -> Result<String, SerializedError> {
    sleep(Duration::from_millis(args.millis)).await;
    Ok(args.label)
}

#[tokio::test]
async fn test_concurrent_calls_get_their_own_results() {
    let host = LocalHost::new();
    let bg = background(&host);
    let cs = frame(&host, 1, 0);
    cs.register::<Delay, _, _>(delayed).unwrap();
    bg.start();
    cs.start();

    let method = bg.method::<Delay>(Target::tab(1, 0));
    let slow = method.call(DelayArgs {
        label: "slow".to_string(),
        millis: 60,
    });
    let fast = method.call(DelayArgs {
        label: "fast".to_string(),
        millis: 5,
    });

    // The fast response arrives first; each caller still gets its own.
    let (slow, fast) = tokio::join!(slow, fast);
    assert_eq!(slow.unwrap(), "slow");
    assert_eq!(fast.unwrap(), "fast");
    assert_eq!(bg.dispatcher().outstanding(), 0);
}

#[tokio::test]
async fn test_second_registration_is_rejected() {
    let host = LocalHost::new();
    let bg = background(&host);
    let cs = frame(&host, 1, 0);
    cs.register::<Version, _, _>(|_ctx, ()| async { Ok(1) }).unwrap();

    let err = cs.register::<Version, _, _>(|_ctx, ()| async { Ok(2) }).unwrap_err();
    assert!(matches!(err, MessengerError::DuplicateRegistration { .. }));

    bg.start();
    cs.start();
    let version = bg.method::<Version>(Target::tab(1, 0)).call(()).await.unwrap();
    assert_eq!(version, 1);
}

#[tokio::test]
async fn test_method_restricted_to_content_scripts() {
    let host = LocalHost::new();
    let bg = background(&host);
    let err = bg
        .register::<FrameName, _, _>(|_ctx, ()| async { Ok(String::new()) })
        .unwrap_err();
    assert!(matches!(err, MessengerError::WrongContext { .. }));
}

#[tokio::test]
async fn test_broadcast_isolates_failing_frame() {
    let host = LocalHost::new();
    let bg = background(&host);
    let frames: Vec<Arc<Realm>> = (0..3).map(|frame_id| frame(&host, 7, frame_id)).collect();

    for realm in &frames {
        let endpoint = realm.endpoint().clone();
        realm
            .register::<FrameName, _, _>(move |_ctx, ()| {
                let endpoint = endpoint.clone();
                async move {
                    match endpoint {
                        Endpoint::Frame { frame_id: 1, .. } => {
                            Err(SerializedError::new("Error", "frame crashed"))
                        }
                        other => Ok(other.to_string()),
                    }
                }
            })
            .unwrap();
        realm.start();
    }
    bg.start();

    let outcomes = bg.broadcast::<FrameName>(7).call(()).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].result.as_deref().unwrap(), "tab 7 frame 0");
    assert!(matches!(
        &outcomes[1].result,
        Err(MessengerError::Handler(error)) if error.message == "frame crashed"
    ));
    assert_eq!(outcomes[1].endpoint, Endpoint::frame(7, 1));
    assert_eq!(outcomes[2].result.as_deref().unwrap(), "tab 7 frame 2");
}

#[tokio::test]
async fn test_broadcast_to_empty_tab() {
    let host = LocalHost::new();
    let bg = background(&host);
    bg.start();

    let outcomes = bg.broadcast::<FrameName>(42).call(()).await.unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(host.post_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unready_frame_becomes_unreachable() {
    let host = LocalHost::new();
    let bg = background(&host);
    bg.start();
    // Known to the topology, but its content script never starts listening.
    host.open_frame(3, 0, None);

    let started = Instant::now();
    let err = bg.method::<Version>(Target::tab(3, 0)).call(()).await.unwrap_err();
    let waited = started.elapsed();

    match err {
        MessengerError::TargetUnreachable { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("Expected TargetUnreachable, got {:?}", other),
    }
    assert_eq!(host.post_count(), 4);
    // 50 + 100 + 150
    assert!(waited >= retry().max_total_delay(), "{:?}", waited);
    assert!(waited < retry().max_total_delay() + Duration::from_millis(20), "{:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn test_late_listener_is_reached_by_retry() {
    let host = LocalHost::new();
    let bg = background(&host);
    let cs = frame(&host, 3, 0);
    cs.register::<Version, _, _>(|_ctx, ()| async { Ok(9) }).unwrap();
    bg.start();

    let call = tokio::spawn({
        let bg = bg.clone();
        async move { bg.method::<Version>(Target::tab(3, 0)).call(()).await }
    });

    sleep(Duration::from_millis(60)).await;
    cs.start();

    assert_eq!(call.await.unwrap().unwrap(), 9);
}

#[tokio::test]
async fn test_invalidation_rejects_all_outstanding_calls() {
    let host = LocalHost::new();
    let bg = background(&host);
    let cs = frame(&host, 1, 0);
    cs.register::<Delay, _, _>(delayed).unwrap();
    bg.start();
    cs.start();

    let calls: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|label| {
            let bg = bg.clone();
            tokio::spawn(async move {
                bg.method::<Delay>(Target::tab(1, 0))
                    .call(DelayArgs {
                        label: label.to_string(),
                        millis: 60_000,
                    })
                    .await
            })
        })
        .collect();

    while bg.dispatcher().outstanding() < 2 {
        tokio::task::yield_now().await;
    }
    let posted = host.post_count();

    host.invalidate(&Endpoint::Background);

    for call in calls {
        let result = timeout(Duration::from_secs(1), call).await.unwrap().unwrap();
        assert!(matches!(result, Err(MessengerError::ContextInvalidated)));
    }
    assert_eq!(bg.dispatcher().outstanding(), 0);

    let err = bg.method::<Version>(Target::tab(1, 0)).call(()).await.unwrap_err();
    assert!(matches!(err, MessengerError::ContextInvalidated));
    assert_eq!(host.post_count(), posted);
}

#[tokio::test]
async fn test_this_context_stays_off_the_transport() {
    let host = LocalHost::new();
    let bg = background(&host);
    bg.register::<Version, _, _>(|ctx, ()| async move {
        assert!(ctx.local);
        Ok(3)
    })
    .unwrap();
    bg.start();

    assert_eq!(bg.method::<Version>(Target::This).call(()).await.unwrap(), 3);
    assert_eq!(bg.method::<Version>(Target::Background).call(()).await.unwrap(), 3);
    bg.notifier::<Version>(Target::This).notify(()).unwrap();
    tokio::task::yield_now().await;

    assert_eq!(host.post_count(), 0);
}

#[tokio::test]
async fn test_page_targets() {
    let host = LocalHost::new();
    let bg = background(&host);
    let sidebar = Realm::new(
        RealmOptions::new(ContextKind::Sidebar, Endpoint::page("sidebar")).with_retry(retry()),
        host.clone(),
        host.clone(),
    )
    .unwrap();
    sidebar.register::<Version, _, _>(|_ctx, ()| async { Ok(5) }).unwrap();
    bg.start();

    let err = bg.method::<Version>(Target::page("sidebar")).call(()).await.unwrap_err();
    assert!(matches!(err, MessengerError::TargetNotFound(_)));

    host.open_page("sidebar");
    sidebar.start();
    assert_eq!(bg.method::<Version>(Target::page("sidebar")).call(()).await.unwrap(), 5);
}
