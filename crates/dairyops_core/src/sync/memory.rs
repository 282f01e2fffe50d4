//! In-process document service.
//!
//! # Responsibility
//! - Hold documents in memory and fan out snapshots to subscribers.
//! - Optionally defer every callback until `flush`, to model network latency.
//! - Inject subscribe/write failures.
//!
//! # Invariants
//! - Callbacks are delivered in the order they were produced.
//! - A successful write is echoed to every subscriber of the path, the
//!   writer's own subscription included.
//! - Clones share state; the service is single-threaded.

use crate::sync::document::{
    DocumentPath, DocumentService, Snapshot, SnapshotResult, SnapshotSink, Subscription,
    WriteResult, WriteSink,
};
use crate::sync::error::ServiceError;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

struct Subscriber {
    id: u64,
    path: DocumentPath,
    sink: SnapshotSink,
}

enum Delivery {
    Snapshot(SnapshotSink, SnapshotResult),
    Write(WriteSink, WriteResult),
}

#[derive(Default)]
struct MemoryState {
    documents: BTreeMap<DocumentPath, Value>,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
    deferred: bool,
    pending: VecDeque<Delivery>,
    write_failure: Option<ServiceError>,
    subscribe_failure: Option<ServiceError>,
    write_log: Vec<(DocumentPath, Value)>,
}

impl MemoryState {
    fn dispatch(&mut self, delivery: Delivery) {
        if self.deferred {
            self.pending.push_back(delivery);
        } else {
            deliver(delivery);
        }
    }

    fn snapshot_of(&self, path: &DocumentPath) -> Snapshot {
        match self.documents.get(path) {
            Some(value) => Snapshot::found(path.clone(), value.clone()),
            None => Snapshot::missing(path.clone()),
        }
    }

    fn broadcast(&mut self, path: &DocumentPath) {
        let snapshot = self.snapshot_of(path);
        let sinks: Vec<SnapshotSink> = self
            .subscribers
            .iter()
            .filter(|subscriber| &subscriber.path == path)
            .map(|subscriber| subscriber.sink.clone())
            .collect();
        for sink in sinks {
            self.dispatch(Delivery::Snapshot(sink, Ok(snapshot.clone())));
        }
    }
}

fn deliver(delivery: Delivery) {
    match delivery {
        Delivery::Snapshot(sink, result) => sink.deliver(result),
        Delivery::Write(sink, result) => sink.settle(result),
    }
}

/// Shared in-memory document service.
#[derive(Clone, Default)]
pub struct MemoryDocumentService {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryDocumentService {
    /// Service that delivers every callback immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Service that queues every callback until [`flush`](Self::flush).
    pub fn deferred() -> Self {
        let service = Self::default();
        service.state.borrow_mut().deferred = true;
        service
    }

    /// Delivers queued callbacks in order. Returns how many were delivered.
    pub fn flush(&self) -> usize {
        let pending: Vec<Delivery> = self.state.borrow_mut().pending.drain(..).collect();
        let delivered = pending.len();
        pending.into_iter().for_each(deliver);
        delivered
    }

    /// Delivers only the oldest queued callback.
    pub fn flush_one(&self) -> bool {
        let next = self.state.borrow_mut().pending.pop_front();
        match next {
            Some(delivery) => {
                deliver(delivery);
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Makes every following write fail with `error` (`None` to stop).
    pub fn fail_writes(&self, error: Option<ServiceError>) {
        self.state.borrow_mut().write_failure = error;
    }

    /// Makes every following subscribe fail with `error` (`None` to stop).
    pub fn fail_subscriptions(&self, error: Option<ServiceError>) {
        self.state.borrow_mut().subscribe_failure = error;
    }

    /// Writes as another client would, notifying subscribers.
    pub fn put_document(&self, path: &DocumentPath, document: Value) {
        let mut state = self.state.borrow_mut();
        state.documents.insert(path.clone(), document);
        state.broadcast(path);
    }

    /// Deletes as another client would, notifying subscribers.
    pub fn remove_document(&self, path: &DocumentPath) {
        let mut state = self.state.borrow_mut();
        state.documents.remove(path);
        state.broadcast(path);
    }

    pub fn document(&self, path: &DocumentPath) -> Option<Value> {
        self.state.borrow().documents.get(path).cloned()
    }

    /// Every write accepted from stores, in order.
    pub fn writes(&self) -> Vec<(DocumentPath, Value)> {
        self.state.borrow().write_log.clone()
    }

    pub fn writes_to(&self, path: &DocumentPath) -> usize {
        self.state
            .borrow()
            .write_log
            .iter()
            .filter(|(written, _)| written == path)
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

impl DocumentService for MemoryDocumentService {
    fn subscribe(&self, path: &DocumentPath, sink: SnapshotSink) -> Subscription {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.subscribe_failure.clone() {
            state.dispatch(Delivery::Snapshot(sink, Err(err)));
            return Subscription::detached();
        }

        state.next_subscriber_id += 1;
        let id = state.next_subscriber_id;
        let initial = state.snapshot_of(path);
        state.subscribers.push(Subscriber {
            id,
            path: path.clone(),
            sink: sink.clone(),
        });
        state.dispatch(Delivery::Snapshot(sink, Ok(initial)));

        let weak: Weak<RefCell<MemoryState>> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state
                    .borrow_mut()
                    .subscribers
                    .retain(|subscriber| subscriber.id != id);
            }
        })
    }

    fn write(&self, path: &DocumentPath, document: Value, sink: WriteSink) {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.write_failure.clone() {
            state.dispatch(Delivery::Write(sink, Err(err)));
            return;
        }

        state.write_log.push((path.clone(), document.clone()));
        state.documents.insert(path.clone(), document);
        state.dispatch(Delivery::Write(sink, Ok(())));
        state.broadcast(path);
    }
}
