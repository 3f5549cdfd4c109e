//! Per-download progress fan-out.
//!
//! Every download publishes into its own channel, which keeps one unbounded
//! queue per observer so a slow reader never loses events. A late observer
//! first sees the latest event, then live ones. When the last observer
//! leaves, a grace timer starts and the download is cancelled if nobody
//! re-attaches in time.

use crate::domain::progress::ProgressEvent;
use crate::ports::ProgressSink;
use futures::Stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct Fanout {
    last: Option<ProgressEvent>,
    finished: bool,
    observers: Vec<mpsc::UnboundedSender<ProgressEvent>>,
}

#[derive(Debug)]
pub struct DownloadChannel {
    id: Uuid,
    fanout: Mutex<Fanout>,
    subscribers: AtomicUsize,
    cancel: CancellationToken,
    grace: Duration,
}

impl DownloadChannel {
    fn new(id: Uuid, grace: Duration) -> Self {
        Self {
            id,
            fanout: Mutex::new(Fanout::default()),
            subscribers: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
            grace,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.fanout).finished
    }

    /// Publish an event. Dropped once the terminal event has gone out.
    pub fn publish(&self, event: ProgressEvent) {
        let mut fanout = lock(&self.fanout);
        if fanout.finished {
            tracing::debug!(download = %self.id, "dropping event after terminal event");
            return;
        }
        fanout.finished = event.is_terminal();
        // A failed send means the observer is gone.
        fanout
            .observers
            .retain(|observer| observer.send(event.clone()).is_ok());
        if fanout.finished {
            // Closing the queues ends every observer's stream after the terminal event.
            fanout.observers.clear();
        }
        fanout.last = Some(event);
    }

    /// Attach a new observer.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            // Seeded under the same lock as `publish`, so the observer sees
            // every later event exactly once.
            let mut fanout = lock(&self.fanout);
            if let Some(last) = &fanout.last {
                let _ = sender.send(last.clone());
            }
            if !fanout.finished {
                fanout.observers.push(sender);
            }
        }

        self.subscribers.fetch_add(1, Ordering::SeqCst);
        Subscription {
            channel: self.clone(),
            receiver,
            done: false,
        }
    }

    fn schedule_abandon_check(self: &Arc<Self>) {
        if self.grace.is_zero() {
            tracing::info!(download = %self.id, "last observer left, cancelling");
            self.cancel.cancel();
            return;
        }

        let channel = Arc::downgrade(self);
        let grace = self.grace;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if let Some(channel) = channel.upgrade() {
                        if channel.subscriber_count() == 0 && !channel.is_finished() {
                            tracing::info!(
                                download = %channel.id,
                                "no observer re-attached, cancelling"
                            );
                            channel.cancel.cancel();
                        }
                    }
                });
            }
            Err(_) => self.cancel.cancel(),
        }
    }
}

impl ProgressSink for DownloadChannel {
    fn emit(&self, event: ProgressEvent) {
        self.publish(event);
    }
}

/// One observer's view of a download.
#[derive(Debug)]
pub struct Subscription {
    channel: Arc<DownloadChannel>,
    receiver: mpsc::UnboundedReceiver<ProgressEvent>,
    done: bool,
}

impl Subscription {
    pub fn download_id(&self) -> Uuid {
        self.channel.id()
    }

    /// Next event, or `None` once the terminal event has been handed out.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        if self.done {
            return None;
        }

        let event = self.receiver.recv().await?;
        if event.is_terminal() {
            self.done = true;
        }
        Some(event)
    }

    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let event = subscription.next_event().await?;
            Some((event, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let previous = self.channel.subscribers.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 && !self.channel.is_finished() {
            self.channel.schedule_abandon_check();
        }
    }
}

/// Registry of live and recently finished downloads.
#[derive(Debug)]
pub struct DownloadHub {
    channels: Mutex<HashMap<Uuid, Arc<DownloadChannel>>>,
    grace: Duration,
}

impl DownloadHub {
    pub fn new(grace: Duration) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            grace,
        }
    }

    pub fn open(&self, id: Uuid) -> Arc<DownloadChannel> {
        let channel = Arc::new(DownloadChannel::new(id, self.grace));
        lock(&self.channels).insert(id, channel.clone());
        channel
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<DownloadChannel>> {
        lock(&self.channels).get(id).cloned()
    }

    pub fn remove(&self, id: &Uuid) {
        lock(&self.channels).remove(id);
    }

    pub fn len(&self) -> usize {
        lock(&self.channels).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
