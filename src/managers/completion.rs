//! Mailbox through which asynchronous results return to the owning thread.
//!
//! Snapshot captures and rule compilation finish on other tasks. They never
//! touch the registry directly: they post a [`Completion`] and the owner
//! drains its [`Inbox`] and applies the results itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::services::content_filter::CompiledRules;
use crate::types::errors::{EngineError, FilterError};
use crate::types::snapshot::Snapshot;
use crate::types::tab::{RequestToken, TabId};

/// Result of an asynchronous request, tagged with what it was issued for.
#[derive(Debug)]
pub enum Completion {
    SnapshotCaptured {
        tab: TabId,
        token: RequestToken,
        result: Result<Snapshot, EngineError>,
    },
    RulesCompiled {
        requested_by: Option<TabId>,
        token: RequestToken,
        result: Result<CompiledRules, FilterError>,
    },
}

/// Called after each post so an event loop can wake up and drain the inbox.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Sending half. Cheap to clone and safe to move into tasks.
#[derive(Clone)]
pub struct Mailbox {
    tx: UnboundedSender<Completion>,
    outstanding: Arc<AtomicUsize>,
    runtime: Handle,
    waker: Option<Waker>,
}

/// Receiving half, owned by the thread that owns the tab registry.
pub struct Inbox {
    rx: UnboundedReceiver<Completion>,
    outstanding: Arc<AtomicUsize>,
}

impl Mailbox {
    /// Creates a connected mailbox/inbox pair. Work is spawned on `runtime`.
    pub fn channel(runtime: Handle) -> (Mailbox, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outstanding = Arc::new(AtomicUsize::new(0));
        (
            Mailbox {
                tx,
                outstanding: outstanding.clone(),
                runtime,
                waker: None,
            },
            Inbox { rx, outstanding },
        )
    }

    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = Some(waker);
        self
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Records that a completion will be posted later.
    pub fn expect_completion(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    pub fn post(&self, completion: Completion) {
        if self.tx.send(completion).is_err() {
            debug!("inbox closed, dropping completion");
            return;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}

impl Inbox {
    /// Requests issued whose completion has not been taken yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn try_next(&mut self) -> Option<Completion> {
        let completion = self.rx.try_recv().ok()?;
        self.settle_one();
        Some(completion)
    }

    pub async fn next(&mut self) -> Option<Completion> {
        let completion = self.rx.recv().await?;
        self.settle_one();
        Some(completion)
    }

    fn settle_one(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}
