use std::sync::{Arc, Mutex};
use std::time::Duration;

use learnify::config::QueueSettings;
use learnify::data_models::{Notification, NotificationPayload, NotificationVariant};
use learnify::notifications::NotificationQueue;

mod test_helpers {
    use super::*;

    pub fn record(queue: &NotificationQueue) -> Arc<Mutex<Vec<Vec<Notification>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = queue.subscribe(move |entries: &[Notification]| {
            sink.lock().unwrap().push(entries.to_vec());
        });
        seen
    }

    pub fn titles(entries: &[Notification]) -> Vec<String> {
        entries
            .iter()
            .map(|n| n.title.clone().unwrap_or_default())
            .collect()
    }

    pub fn titled(title: &str) -> NotificationPayload {
        NotificationPayload::new().title(title)
    }

    pub async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

use test_helpers::*;

#[tokio::test(start_paused = true)]
async fn test_enqueue_inserts_newest_first_and_notifies() {
    let queue = NotificationQueue::default();
    let seen = record(&queue);

    let first = queue.enqueue(titled("Quiz created"));
    let second = queue.enqueue(
        NotificationPayload::new()
            .title("Upload failed")
            .description("The PDF could not be read")
            .destructive(),
    );

    assert_ne!(first.id(), second.id());
    assert!(second.id() > first.id());

    let entries = queue.snapshot();
    assert_eq!(titles(&entries), vec!["Upload failed", "Quiz created"]);
    assert!(entries.iter().all(|n| n.visible));
    assert_eq!(entries[0].variant, NotificationVariant::Destructive);
    assert_eq!(
        entries[0].description.as_deref(),
        Some("The PDF could not be read")
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(titles(&seen[0]), vec!["Quiz created"]);
    assert_eq!(titles(&seen[1]), vec!["Upload failed", "Quiz created"]);
}

#[tokio::test(start_paused = true)]
async fn test_payload_is_optional() {
    let queue = NotificationQueue::default();
    let handle = queue.enqueue(NotificationPayload::new());

    let entry = queue.get(handle.id()).unwrap();
    assert!(entry.title.is_none());
    assert!(entry.description.is_none());
    assert!(entry.visible);
}

#[tokio::test(start_paused = true)]
async fn test_capacity_evicts_oldest_first() {
    let queue = NotificationQueue::default();

    let handles: Vec<_> = (1..=6)
        .map(|i| queue.enqueue(titled(&i.to_string())))
        .collect();

    assert_eq!(queue.len(), 5);
    assert_eq!(titles(&queue.snapshot()), vec!["6", "5", "4", "3", "2"]);
    assert!(queue.get(handles[0].id()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_removed_after_lifetime_regardless_of_dismissal() {
    let queue = NotificationQueue::default();
    let seen = record(&queue);

    let kept = queue.enqueue(titled("kept"));
    let dismissed = queue.enqueue(titled("dismissed"));
    dismissed.dismiss();

    advance(4999).await;
    assert_eq!(queue.len(), 2);
    assert!(!queue.get(dismissed.id()).unwrap().visible);
    assert!(queue.get(kept.id()).unwrap().visible);

    advance(2).await;
    assert!(queue.is_empty());

    let seen = seen.lock().unwrap();
    // enqueue, enqueue, dismiss, then one removal per entry
    assert_eq!(seen.len(), 5);
    for snapshot in &seen[..3] {
        assert!(snapshot.iter().any(|n| n.id == kept.id()));
    }
    assert!(seen[4].is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lifetime_counts_from_each_enqueue() {
    let queue = NotificationQueue::default();

    queue.enqueue(titled("early"));
    advance(3000).await;
    queue.enqueue(titled("late"));

    advance(2001).await;
    assert_eq!(titles(&queue.snapshot()), vec!["late"]);

    advance(3000).await;
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_is_idempotent() {
    let queue = NotificationQueue::default();
    let handle = queue.enqueue(titled("Saved"));
    let seen = record(&queue);

    handle.dismiss();
    handle.dismiss();
    queue.dismiss(handle.id());

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(!queue.get(handle.id()).unwrap().visible);
    assert_eq!(queue.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_unknown_id_is_silent() {
    let queue = NotificationQueue::new(QueueSettings {
        capacity: 1,
        lifetime: Duration::from_millis(5000),
    });
    let evicted = queue.enqueue(titled("first"));
    queue.enqueue(titled("second"));
    let seen = record(&queue);

    evicted.dismiss();
    queue.dismiss(evicted.id());

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(titles(&queue.snapshot()), vec!["second"]);
}

#[tokio::test(start_paused = true)]
async fn test_evicted_entry_timer_is_a_noop() {
    let queue = NotificationQueue::new(QueueSettings {
        capacity: 1,
        lifetime: Duration::from_millis(5000),
    });
    queue.enqueue(titled("first"));
    advance(1000).await;
    queue.enqueue(titled("second"));
    let seen = record(&queue);

    advance(4500).await;
    assert_eq!(titles(&queue.snapshot()), vec!["second"]);
    assert!(seen.lock().unwrap().is_empty());

    advance(1000).await;
    assert!(queue.is_empty());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_stops_only_that_observer() {
    let queue = NotificationQueue::default();
    let kept = record(&queue);

    let count = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&count);
    let subscription = queue.subscribe(move |_: &[Notification]| {
        *counter.lock().unwrap() += 1;
    });

    queue.enqueue(titled("one"));
    subscription.unsubscribe();
    subscription.unsubscribe();
    queue.enqueue(titled("two"));
    advance(5001).await;

    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(kept.lock().unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_all_is_one_change() {
    let queue = NotificationQueue::default();
    queue.enqueue(titled("a"));
    queue.enqueue(titled("b"));
    let seen = record(&queue);

    queue.dismiss_all();
    queue.dismiss_all();

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(queue.snapshot().iter().all(|n| !n.visible));
}

#[tokio::test(start_paused = true)]
async fn test_update_replaces_payload_but_not_lifetime() {
    let queue = NotificationQueue::default();
    let handle = queue.enqueue(titled("Uploading"));

    advance(3000).await;
    handle.update(titled("Uploaded").description("past-paper-2019.pdf"));

    let entry = queue.get(handle.id()).unwrap();
    assert_eq!(entry.title.as_deref(), Some("Uploaded"));
    assert_eq!(entry.description.as_deref(), Some("past-paper-2019.pdf"));

    advance(2001).await;
    assert!(queue.get(handle.id()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_observer_can_call_back_into_queue() {
    let queue = Arc::new(NotificationQueue::default());
    let seen = record(&queue);

    let inner = Arc::downgrade(&queue);
    let _auto_dismiss = queue.subscribe(move |entries: &[Notification]| {
        if let (Some(queue), Some(newest)) = (inner.upgrade(), entries.first()) {
            if newest.visible {
                queue.dismiss(newest.id);
            }
        }
    });

    queue.enqueue(titled("flash"));

    assert!(!queue.snapshot()[0].visible);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0][0].visible);
    assert!(!seen[1][0].visible);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_clears_timers_and_observers() {
    let queue = NotificationQueue::default();
    let seen = record(&queue);
    queue.enqueue(titled("lingering"));

    queue.shutdown();
    queue.enqueue(titled("ignored"));
    advance(10_000).await;

    assert_eq!(titles(&queue.snapshot()), vec!["lingering"]);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_handle_outlives_queue() {
    let queue = NotificationQueue::default();
    let handle = queue.enqueue(titled("orphan"));
    drop(queue);

    handle.dismiss();
    handle.update(titled("still orphaned"));
}

#[tokio::test(start_paused = true)]
async fn test_removed_at_exactly_the_lifetime() {
    let queue = NotificationQueue::default();
    let handle = queue.enqueue(titled("boundary"));

    advance(4999).await;
    assert!(queue.get(handle.id()).is_some());

    advance(1).await;
    // the removal task shares this deadline; let it run
    tokio::task::yield_now().await;
    assert!(queue.get(handle.id()).is_none());
}

#[test]
fn test_enqueue_from_thread_outside_runtime() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let queue = Arc::new(rt.block_on(async {
        NotificationQueue::new(QueueSettings {
            capacity: 5,
            lifetime: Duration::from_millis(50),
        })
    }));
    let seen = record(&queue);

    let ui = Arc::clone(&queue);
    let id = std::thread::spawn(move || ui.enqueue(titled("from the ui thread")).id())
        .join()
        .unwrap();
    assert!(queue.get(id).is_some());

    rt.block_on(async { tokio::time::sleep(Duration::from_millis(300)).await });
    assert!(queue.is_empty());
    assert_eq!(seen.lock().unwrap().len(), 2);
}
