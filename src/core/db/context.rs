/// Cancellation Context Module
///
/// A [`Context`] carries a cancellation signal and an optional deadline into
/// each CRUD call. Clones share one signal. Children derived with
/// [`Context::with_timeout`] or [`Context::with_deadline`] get their own
/// signal: canceling a parent cancels its children, never the reverse.
use crate::core::DriverError;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// One node of the cancellation tree.
#[derive(Debug)]
struct CancelNode {
    sender: watch::Sender<bool>,
    children: Mutex<Vec<Weak<CancelNode>>>,
}

impl CancelNode {
    fn root() -> Arc<Self> {
        let (sender, _) = watch::channel(false);
        Arc::new(CancelNode {
            sender,
            children: Mutex::new(Vec::new()),
        })
    }

    fn children(&self) -> MutexGuard<'_, Vec<Weak<CancelNode>>> {
        self.children.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a child that starts canceled if this node already is.
    fn child(&self) -> Arc<Self> {
        let mut children = self.children();
        // Read under the lock: `cancel` flips the flag before draining.
        let (sender, _) = watch::channel(*self.sender.borrow());
        let node = Arc::new(CancelNode {
            sender,
            children: Mutex::new(Vec::new()),
        });
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&node));
        node
    }

    fn cancel(&self) {
        if self.sender.send_replace(true) {
            return;
        }
        let children = std::mem::take(&mut *self.children());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    node: Arc<CancelNode>,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never canceled and has no deadline.
    pub fn background() -> Self {
        Context {
            node: CancelNode::root(),
            deadline: None,
        }
    }

    /// A child context whose deadline is `timeout` from now, or the parent's
    /// deadline if that is earlier.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A child context with the earlier of `deadline` and the parent's deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Context {
            node: self.node.child(),
            deadline: Some(deadline),
        }
    }

    /// Cancels this context, its clones, and every child derived from it.
    /// The parent it was derived from is unaffected.
    pub fn cancel(&self) {
        self.node.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.node.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drives `work` until it completes, the context is canceled, or the
    /// deadline elapses. `work` is dropped (aborting it) in the latter cases.
    pub(crate) async fn run<T, F>(&self, work: F) -> Result<T, DriverError>
    where
        F: Future<Output = Result<T, DriverError>>,
    {
        let mut cancelled = self.node.sender.subscribe();
        if *cancelled.borrow_and_update() {
            return Err(DriverError::Cancelled);
        }
        let deadline = self.deadline;

        tokio::select! {
            biased;
            _ = cancelled.wait_for(|c| *c) => Err(DriverError::Cancelled),
            _ = sleep_until(deadline) => Err(DriverError::DeadlineExceeded),
            result = work => result,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
