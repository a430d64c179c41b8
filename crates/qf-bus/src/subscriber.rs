use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;

use qf_events::Event;

/// Process-unique subscriber identity; registration idempotency keys on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

impl SubscriberId {
    fn next() -> Self {
        SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Event-processing logic hosted by a subscriber worker.
///
/// All three hooks run on the worker thread, strictly sequentially.
pub trait EventHandler: Send + 'static {
    /// Handle one dequeued event. Errors are forwarded to [`on_error`]
    /// (`Self::on_error`); the worker never terminates on an error.
    fn on_event(&mut self, event: &Arc<Event>) -> anyhow::Result<()>;

    /// Called when `on_event` returned an error. The event still counts as
    /// completed for barrier accounting.
    fn on_error(&mut self, error: anyhow::Error, event: &Arc<Event>) {
        tracing::warn!(kind = ?event.kind(), %error, "subscriber handler error");
    }

    /// Called exactly once after the shutdown sentinel is observed, before
    /// the worker exits. Flush-and-close work belongs here.
    fn cleanup(&mut self) {}
}

enum WorkerMessage {
    Event(Arc<Event>),
    Shutdown,
}

struct Shared {
    name: String,
    id: SubscriberId,
    running: AtomicBool,
    dropped: AtomicU64,
    pending: Mutex<u64>,
    idle: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, u64> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle to a subscriber worker.
///
/// `receive` is the bus-facing enqueue; `wait_until_idle` and `shutdown`
/// implement the barrier and teardown protocol.
#[derive(Clone)]
pub struct SubscriberHandle {
    shared: Arc<Shared>,
    sender: Sender<WorkerMessage>,
}

impl SubscriberHandle {
    pub fn id(&self) -> SubscriberId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Enqueue an event; non-blocking. Events received after shutdown began
    /// are dropped and counted.
    pub fn receive(&self, event: Arc<Event>) {
        if !self.shared.running.load(Ordering::Acquire) {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                subscriber = %self.shared.name,
                kind = ?event.kind(),
                "dropping event received after shutdown"
            );
            return;
        }

        {
            let mut pending = self.shared.lock_pending();
            *pending += 1;
        }

        if self.sender.send(WorkerMessage::Event(event)).is_err() {
            // Worker already exited; undo the pending increment.
            let mut pending = self.shared.lock_pending();
            *pending -= 1;
            if *pending == 0 {
                self.shared.idle.notify_all();
            }
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Block until the queue is empty and no event is being handled.
    pub fn wait_until_idle(&self) {
        let mut pending = self.shared.lock_pending();
        while *pending > 0 {
            pending = self
                .shared
                .idle
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether the subscriber is idle right now (snapshot, no blocking).
    pub fn is_idle(&self) -> bool {
        *self.shared.lock_pending() == 0
    }

    /// Events dropped because they arrived after shutdown began.
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting events, drain the queue, run `cleanup`, join the
    /// worker. Idempotent; only the first caller joins.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);
        // Sentinel sits behind any already-queued events, so the worker
        // drains before exiting. Send failure means the worker is gone.
        let _ = self.sender.send(WorkerMessage::Shutdown);

        let handle = {
            let mut worker = self
                .shared
                .worker
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            worker.take()
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(subscriber = %self.shared.name, "subscriber worker panicked");
            }
        }
    }
}

/// Spawn a worker thread around `handler` and return its handle.
pub fn spawn_subscriber<H: EventHandler>(name: impl Into<String>, handler: H) -> SubscriberHandle {
    let name = name.into();
    let (sender, receiver) = mpsc::channel();

    let shared = Arc::new(Shared {
        name: name.clone(),
        id: SubscriberId::next(),
        running: AtomicBool::new(true),
        dropped: AtomicU64::new(0),
        pending: Mutex::new(0),
        idle: Condvar::new(),
        worker: Mutex::new(None),
    });

    let worker_shared = Arc::clone(&shared);
    let join = std::thread::Builder::new()
        .name(name)
        .spawn(move || worker_loop(handler, receiver, worker_shared))
        .expect("failed to spawn subscriber worker thread");

    *shared.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(join);

    SubscriberHandle { shared, sender }
}

fn worker_loop<H: EventHandler>(
    mut handler: H,
    receiver: Receiver<WorkerMessage>,
    shared: Arc<Shared>,
) {
    loop {
        match receiver.recv() {
            Ok(WorkerMessage::Event(event)) => {
                if let Err(error) = handler.on_event(&event) {
                    handler.on_error(error, &event);
                }
                let mut pending = shared.lock_pending();
                *pending -= 1;
                if *pending == 0 {
                    shared.idle.notify_all();
                }
            }
            Ok(WorkerMessage::Shutdown) | Err(_) => {
                handler.cleanup();
                return;
            }
        }
    }
}
