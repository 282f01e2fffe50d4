//! Document service contract.
//!
//! # Responsibility
//! - Define the key-document service seam the store talks to.
//! - Provide tagged delivery sinks so late callbacks can be recognized.
//!
//! # Invariants
//! - Services never call into the store directly; they push results into
//!   sinks, and the store applies them from its own event queue.
//! - Sinks are `Send`; a service may settle from any thread.
//! - Dropping a [`Subscription`] cancels it.

use crate::model::plan::PlanId;
use crate::sync::error::ServiceError;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;

/// Slash-separated document address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// `artifacts/<app>/users/<user>/day_planner_data/<plan>`
    pub fn for_plan(app_id: &str, user_id: &str, plan_id: &PlanId) -> Self {
        Self(format!("{}{plan_id}", Self::plan_prefix(app_id, user_id)))
    }

    /// Common prefix of every plan document owned by one user.
    pub fn plan_prefix(app_id: &str, user_id: &str) -> String {
        format!("artifacts/{app_id}/users/{user_id}/day_planner_data/")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time copy of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: DocumentPath,
    pub exists: bool,
    pub data: Option<Value>,
}

impl Snapshot {
    pub fn found(path: DocumentPath, data: Value) -> Self {
        Self {
            path,
            exists: true,
            data: Some(data),
        }
    }

    pub fn missing(path: DocumentPath) -> Self {
        Self {
            path,
            exists: false,
            data: None,
        }
    }
}

/// Result of a subscription callback.
pub type SnapshotResult = Result<Snapshot, ServiceError>;
/// Result of a write attempt.
pub type WriteResult = Result<(), ServiceError>;

/// Event queued for the owning store.
#[derive(Debug)]
pub(crate) enum StoreEvent {
    Snapshot {
        generation: u64,
        result: SnapshotResult,
    },
    WriteSettled {
        plan_id: PlanId,
        seq: u64,
        result: WriteResult,
    },
}

/// Receives snapshots for one subscription, tagged with its generation.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    tx: Sender<StoreEvent>,
    generation: u64,
}

impl SnapshotSink {
    pub(crate) fn new(tx: Sender<StoreEvent>, generation: u64) -> Self {
        Self { tx, generation }
    }

    /// Queues a snapshot or error. Delivery after the store is gone is a no-op.
    pub fn deliver(&self, result: SnapshotResult) {
        let _ = self.tx.send(StoreEvent::Snapshot {
            generation: self.generation,
            result,
        });
    }
}

/// Receives the outcome of one write, tagged with the plan it targeted.
#[derive(Debug)]
pub struct WriteSink {
    tx: Sender<StoreEvent>,
    plan_id: PlanId,
    seq: u64,
}

impl WriteSink {
    pub(crate) fn new(tx: Sender<StoreEvent>, plan_id: PlanId, seq: u64) -> Self {
        Self { tx, plan_id, seq }
    }

    /// Queues the write outcome. Consumes the sink: a write settles once.
    pub fn settle(self, result: WriteResult) {
        let _ = self.tx.send(StoreEvent::WriteSettled {
            plan_id: self.plan_id,
            seq: self.seq,
            result,
        });
    }
}

/// Handle to an active subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Generic key-document service.
pub trait DocumentService {
    /// Starts delivering snapshots of `path` into `sink`, beginning with the
    /// current state. Errors are delivered through the sink as well.
    fn subscribe(&self, path: &DocumentPath, sink: SnapshotSink) -> Subscription;

    /// Replaces the document at `path`; the outcome is settled into `sink`.
    fn write(&self, path: &DocumentPath, document: Value, sink: WriteSink);
}

#[cfg(test)]
mod tests {
    use super::{DocumentPath, Subscription};
    use crate::model::plan::PlanId;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn plan_path_is_scoped_by_app_user_and_plan() {
        let path = DocumentPath::for_plan("dairy", "u1", &PlanId::new("north").unwrap());
        assert_eq!(
            path.as_str(),
            "artifacts/dairy/users/u1/day_planner_data/north"
        );
    }

    #[test]
    fn subscription_cancels_once_on_unsubscribe_or_drop() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let subscription = Subscription::new(move || counter.set(counter.get() + 1));
        subscription.unsubscribe();
        assert_eq!(calls.get(), 1);

        let counter = Rc::clone(&calls);
        drop(Subscription::new(move || counter.set(counter.get() + 1)));
        assert_eq!(calls.get(), 2);
    }
}
