//! Integration tests for core-async on native platforms.

use core_async::{sync, task, time};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_spawned_task_runs() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let handle = task::spawn(async move {
        c.fetch_add(1, Ordering::SeqCst);
    });

    for _ in 0..10 {
        if handle.is_finished() {
            break;
        }
        task::yield_now().await;
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abort_stops_periodic_task() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&ticks);
    let handle = task::spawn(async move {
        loop {
            time::sleep(time::Duration::from_secs(5)).await;
            t.fetch_add(1, Ordering::SeqCst);
        }
    });

    time::sleep(time::Duration::from_secs(11)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 2);

    handle.abort();
    assert!(handle.is_aborted());
    time::sleep(time::Duration::from_secs(30)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_mutex_serializes_updates() {
    let value = Arc::new(sync::Mutex::new(0u32));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let v = Arc::clone(&value);
        handles.push(task::spawn(async move {
            let mut guard = v.lock().await;
            *guard += 1;
        }));
    }

    for _ in 0..100 {
        if handles.iter().all(|h| h.is_finished()) {
            break;
        }
        time::sleep(time::Duration::from_millis(1)).await;
    }
    assert_eq!(*value.lock().await, 8);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_elapses() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
    })
    .await;
    assert!(result.is_err());
}
