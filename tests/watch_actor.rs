// File: tests/watch_actor.rs
use serial_test::serial;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use todotxt_store::context::TestContext;
use todotxt_store::model::NewTask;
use todotxt_store::notifier::RecordingSink;
use todotxt_store::{ProviderEvent, TodoTxtProvider, spawn_watch_actor};
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

const DEBOUNCE: Duration = Duration::from_millis(50);

async fn wait_for_reload(rx: &mut UnboundedReceiver<ProviderEvent>, within: Duration) -> bool {
    tokio::time::timeout(within, async {
        while let Some(event) = rx.recv().await {
            if event == ProviderEvent::Reloaded {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

#[tokio::test]
#[serial]
async fn test_external_edit_is_picked_up() {
    let ctx = TestContext::new();
    let path = ctx.file("todo.txt");
    fs::write(&path, "A @Home\n").unwrap();
    let mut provider = TodoTxtProvider::open(&path, Arc::new(RecordingSink::new()));
    let mut rx = provider.subscribe();
    let provider = Arc::new(Mutex::new(provider));

    let handle = spawn_watch_actor(provider.clone(), DEBOUNCE).await;
    assert!(handle.is_watching());

    fs::write(&path, "A @Home\nB @Garden\n").unwrap();
    assert!(wait_for_reload(&mut rx, Duration::from_secs(5)).await);
    assert!(provider.lock().await.list("Garden").is_some());

    handle.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_own_write_is_not_reloaded() {
    let ctx = TestContext::new();
    let path = ctx.file("todo.txt");
    fs::write(&path, "@Home\n").unwrap();
    let mut provider = TodoTxtProvider::open(&path, Arc::new(RecordingSink::new()));
    let mut rx = provider.subscribe();
    let provider = Arc::new(Mutex::new(provider));

    let handle = spawn_watch_actor(provider.clone(), DEBOUNCE).await;
    provider
        .lock()
        .await
        .create_task(NewTask::new("Dishes", "Home"))
        .unwrap();

    assert!(!wait_for_reload(&mut rx, DEBOUNCE * 10).await);
    assert_eq!(provider.lock().await.tasks_in("Home").len(), 1);

    handle.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_no_reload_after_shutdown() {
    let ctx = TestContext::new();
    let path = ctx.file("todo.txt");
    fs::write(&path, "@Home\n").unwrap();
    let mut provider = TodoTxtProvider::open(&path, Arc::new(RecordingSink::new()));
    let mut rx = provider.subscribe();
    let provider = Arc::new(Mutex::new(provider));

    let handle = spawn_watch_actor(provider.clone(), DEBOUNCE).await;
    handle.shutdown().await;

    fs::write(&path, "@Home\n@Work\n").unwrap();
    assert!(!wait_for_reload(&mut rx, DEBOUNCE * 10).await);
    assert!(provider.lock().await.list("Work").is_none());
}
