//! Synchronized schedule store.
//!
//! # Responsibility
//! - Own the ordered task list of the active plan.
//! - Apply local mutations optimistically and persist them asynchronously.
//! - Reconcile remote snapshots by wholesale replacement.
//!
//! # Invariants
//! - Only this type mutates the task list; remote results reach it through
//!   its event queue and are applied one at a time in `process_events`.
//! - A snapshot whose subscription generation is stale is discarded.
//! - A write completion for a plan that is no longer active only releases
//!   the saving indicator; it never touches the active plan's status.
//! - Failed writes never roll back local state.
//! - No version stamping: a slow write can still overwrite a newer remote
//!   snapshot (last write observed wins).

use crate::config::PlannerConfig;
use crate::interchange::csv::{parse_import, ExportPayload, PendingImport};
use crate::model::plan::{PlanDocument, PlanId};
use crate::model::task::{default_schedule, Task, TaskDraft, TaskField, TaskId};
use crate::sync::document::{
    DocumentPath, DocumentService, Snapshot, SnapshotResult, SnapshotSink, StoreEvent,
    Subscription, WriteResult, WriteSink,
};
use crate::sync::error::{MutationError, ServiceError, ServiceErrorCode, StoreError};
use crate::sync::identity::{IdentityProvider, UserIdentity};
use chrono::{NaiveDate, Utc};
use log::{debug, error, info, warn};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

/// Subscription lifecycle of the active plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unsubscribed,
    Subscribing,
    Synced,
}

impl SyncState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Unsubscribed => "unsubscribed",
            Self::Subscribing => "subscribing",
            Self::Synced => "synced",
        }
    }
}

/// Where a task-list change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Remote,
    /// The active plan changed and the list was reset.
    PlanSwitch,
}

/// Notification delivered to observers after each applied change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    TasksChanged { origin: ChangeOrigin, count: usize },
    StateChanged(SyncState),
    /// The sticky status was set or cleared.
    StatusChanged,
}

type Observer = Box<dyn FnMut(&StoreChange)>;

/// Mutable, synchronized task collection for one active plan.
pub struct ScheduleStore<D: DocumentService> {
    documents: D,
    app_id: String,
    save_floor: Duration,
    identity: Option<UserIdentity>,
    plan_id: PlanId,
    active: bool,
    tasks: Vec<Task>,
    state: SyncState,
    subscription: Option<Subscription>,
    generation: u64,
    events_tx: Sender<StoreEvent>,
    events_rx: Receiver<StoreEvent>,
    next_write_seq: u64,
    writes_in_flight: usize,
    saving_until: Option<Instant>,
    status: Option<StoreError>,
    observers: Vec<Observer>,
}

impl<D: DocumentService> ScheduleStore<D> {
    /// Creates an inactive store on the configured default plan, seeded with
    /// the default dairy day.
    pub fn new(config: &PlannerConfig, documents: D) -> Self {
        Self::with_tasks(config, documents, default_schedule())
    }

    /// Creates an inactive store seeded with `tasks`.
    pub fn with_tasks(config: &PlannerConfig, documents: D, tasks: Vec<Task>) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            documents,
            app_id: config.app_id.clone(),
            save_floor: config.save_indicator_floor(),
            identity: None,
            plan_id: config.plan_id(),
            active: false,
            tasks,
            state: SyncState::Unsubscribed,
            subscription: None,
            generation: 0,
            events_tx,
            events_rx,
            next_write_seq: 0,
            writes_in_flight: 0,
            saving_until: None,
            status: None,
            observers: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// Sticky error, if any.
    pub fn status(&self) -> Option<&StoreError> {
        self.status.as_ref()
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    /// Whether the saving indicator is raised at `now`.
    pub fn is_saving_at(&self, now: Instant) -> bool {
        self.writes_in_flight > 0 || self.saving_until.is_some_and(|until| now < until)
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving_at(Instant::now())
    }

    pub fn writes_in_flight(&self) -> usize {
        self.writes_in_flight
    }

    /// Registers a change observer.
    pub fn add_observer(&mut self, observer: impl FnMut(&StoreChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Establishes the user identity through `provider`.
    ///
    /// # Errors
    /// - [`StoreError::AuthFailure`]; it is also kept as sticky status and
    ///   sync does not start. There is no automatic retry.
    pub fn authenticate(
        &mut self,
        provider: &dyn IdentityProvider,
        custom_token: Option<&str>,
    ) -> Result<(), StoreError> {
        match provider.establish(custom_token) {
            Ok(identity) => {
                self.set_identity(identity);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=auth module=store status=error error_code=auth_failure error={}",
                    err
                );
                let store_error = StoreError::from(err);
                self.set_status(Some(store_error.clone()));
                Err(store_error)
            }
        }
    }

    /// Sets the identity and starts syncing if a plan is active.
    pub fn set_identity(&mut self, identity: UserIdentity) {
        let changed = self.identity.as_ref() != Some(&identity);
        self.identity = Some(identity);
        if changed && self.state != SyncState::Unsubscribed {
            self.stop_subscription();
        }
        self.ensure_subscribed();
    }

    /// Makes `plan_id` the active plan.
    ///
    /// Switching to another plan cancels the old subscription, resets the
    /// task list to empty and subscribes to the new plan once an identity is
    /// present. Re-activating the current plan only resumes syncing.
    pub fn activate(&mut self, plan_id: PlanId) {
        if plan_id != self.plan_id {
            info!(
                "event=plan_switch module=store status=start generation={}",
                self.generation
            );
            self.stop_subscription();
            self.plan_id = plan_id;
            self.tasks.clear();
            self.set_status(None);
            self.notify(StoreChange::TasksChanged {
                origin: ChangeOrigin::PlanSwitch,
                count: 0,
            });
        }
        self.active = true;
        self.ensure_subscribed();
    }

    /// Re-subscribes the active plan; the user-initiated retry path.
    pub fn reload(&mut self) {
        self.stop_subscription();
        self.ensure_subscribed();
    }

    /// Cancels syncing. Local state is kept.
    pub fn teardown(&mut self) {
        self.active = false;
        self.stop_subscription();
    }

    /// Applies every queued remote event in delivery order.
    ///
    /// Returns the number of events taken off the queue, including discarded
    /// stale ones.
    pub fn process_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            processed += 1;
            match event {
                StoreEvent::Snapshot { generation, result } => {
                    self.handle_snapshot(generation, result);
                }
                StoreEvent::WriteSettled {
                    plan_id,
                    seq,
                    result,
                } => self.handle_write_settled(&plan_id, seq, result),
            }
        }
        processed
    }

    /// Appends a task built from `draft`.
    ///
    /// # Errors
    /// - [`MutationError::EmptyResource`] when neither the draft nor
    ///   `resource_fallback` names a resource.
    pub fn add_task(
        &mut self,
        draft: TaskDraft,
        resource_fallback: &str,
    ) -> Result<TaskId, MutationError> {
        let task = draft
            .into_task(resource_fallback)
            .ok_or(MutationError::EmptyResource)?;
        let id = task.id.clone();
        self.tasks.push(task);
        self.commit_local();
        Ok(id)
    }

    /// Replaces one field of one task in place.
    pub fn edit_task(
        &mut self,
        id: &TaskId,
        field: TaskField,
        value: impl Into<String>,
    ) -> Result<(), MutationError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| MutationError::TaskNotFound(id.clone()))?;
        task.set_field(field, value);
        self.commit_local();
        Ok(())
    }

    /// Inserts an empty 08:00-09:00 row directly after `target`.
    pub fn insert_after(&mut self, target: &TaskId, resource: &str) -> Result<TaskId, MutationError> {
        let index = self
            .position(target)
            .ok_or_else(|| MutationError::TaskNotFound(target.clone()))?;
        let task = Task::blank(resource);
        let id = task.id.clone();
        self.tasks.insert(index + 1, task);
        self.commit_local();
        Ok(id)
    }

    /// Removes one task and returns it.
    pub fn delete_task(&mut self, id: &TaskId) -> Result<Task, MutationError> {
        let index = self
            .position(id)
            .ok_or_else(|| MutationError::TaskNotFound(id.clone()))?;
        let removed = self.tasks.remove(index);
        self.commit_local();
        Ok(removed)
    }

    /// Parses CSV text for the two-phase import. Nothing is applied.
    ///
    /// # Errors
    /// - [`StoreError::ImportParseFailure`] when no line parsed; the current
    ///   schedule is untouched.
    pub fn parse_import(&self, text: &str) -> Result<PendingImport, StoreError> {
        parse_import(text).map_err(|err| {
            warn!(
                "event=import module=store status=rejected error_code=import_parse_failure"
            );
            StoreError::from(err)
        })
    }

    /// Replaces the whole schedule with a confirmed import.
    pub fn commit_import(&mut self, pending: PendingImport) -> usize {
        self.tasks = pending.into_tasks();
        info!(
            "event=import module=store status=ok tasks={}",
            self.tasks.len()
        );
        self.commit_local();
        self.tasks.len()
    }

    /// Exports the active plan as CSV dated `date`.
    pub fn export_csv(&self, date: NaiveDate) -> ExportPayload {
        ExportPayload::new(&self.plan_id, date, &self.tasks)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == id)
    }

    fn commit_local(&mut self) {
        self.notify(StoreChange::TasksChanged {
            origin: ChangeOrigin::Local,
            count: self.tasks.len(),
        });
        self.persist();
    }

    fn ensure_subscribed(&mut self) {
        if !self.active || self.state != SyncState::Unsubscribed {
            return;
        }
        let Some(path) = self.document_path() else {
            debug!("event=subscribe module=store status=waiting reason=no_identity");
            return;
        };

        self.generation += 1;
        let sink = SnapshotSink::new(self.events_tx.clone(), self.generation);
        self.subscription = Some(self.documents.subscribe(&path, sink));
        info!(
            "event=subscribe module=store status=start generation={}",
            self.generation
        );
        self.set_state(SyncState::Subscribing);
    }

    fn stop_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if self.state != SyncState::Unsubscribed {
            // Anything still queued for the old subscription is now stale.
            self.generation += 1;
            info!(
                "event=unsubscribe module=store status=ok generation={}",
                self.generation
            );
            self.set_state(SyncState::Unsubscribed);
        }
    }

    fn handle_snapshot(&mut self, generation: u64, result: SnapshotResult) {
        if generation != self.generation || self.state == SyncState::Unsubscribed {
            debug!(
                "event=snapshot module=store status=discarded reason=stale generation={} active_generation={}",
                generation, self.generation
            );
            return;
        }

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    "event=snapshot module=store status=error error_code={} error={}",
                    err.code.as_str(),
                    err
                );
                self.set_status(Some(StoreError::from_subscribe(err)));
                return;
            }
        };

        if self.state == SyncState::Subscribing {
            self.set_state(SyncState::Synced);
        }
        self.apply_snapshot(snapshot);
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if !snapshot.exists {
            info!("event=snapshot module=store status=missing action=create_document");
            self.set_status(None);
            self.persist();
            return;
        }

        let decoded = match snapshot.data.map(PlanDocument::from_value) {
            Some(Ok(document)) => document,
            Some(Err(err)) => {
                error!(
                    "event=snapshot module=store status=error error_code=invalid_document error={}",
                    err
                );
                self.set_status(Some(StoreError::GenericSync(format!(
                    "unreadable plan document at {}: {err}",
                    snapshot.path
                ))));
                return;
            }
            None => PlanDocument {
                tasks: None,
                last_updated: None,
            },
        };

        if let Some(tasks) = decoded.tasks {
            self.tasks = tasks;
            info!(
                "event=snapshot module=store status=applied tasks={}",
                self.tasks.len()
            );
            self.notify(StoreChange::TasksChanged {
                origin: ChangeOrigin::Remote,
                count: self.tasks.len(),
            });
        } else {
            debug!("event=snapshot module=store status=ignored reason=no_tasks_field");
        }
        self.set_status(None);
    }

    fn persist(&mut self) {
        if !self.active {
            debug!("event=persist module=store status=skipped reason=inactive");
            return;
        }
        let Some(path) = self.document_path() else {
            debug!("event=persist module=store status=skipped reason=no_identity");
            return;
        };

        let document = PlanDocument::snapshot_of(&self.tasks, Utc::now().timestamp_millis());
        let value = match document.to_value() {
            Ok(value) => value,
            Err(err) => {
                error!(
                    "event=persist module=store status=error error_code=encode_failed error={}",
                    err
                );
                self.set_status(Some(StoreError::SaveFailure(ServiceError::new(
                    ServiceErrorCode::Internal,
                    err.to_string(),
                ))));
                return;
            }
        };

        self.next_write_seq += 1;
        let seq = self.next_write_seq;
        self.writes_in_flight += 1;
        self.set_status(None);
        debug!(
            "event=persist module=store status=start seq={} tasks={}",
            seq,
            self.tasks.len()
        );
        let sink = WriteSink::new(self.events_tx.clone(), self.plan_id.clone(), seq);
        self.documents.write(&path, value, sink);
    }

    fn handle_write_settled(&mut self, plan_id: &PlanId, seq: u64, result: WriteResult) {
        self.writes_in_flight = self.writes_in_flight.saturating_sub(1);
        let floor_end = Instant::now() + self.save_floor;
        self.saving_until = Some(match self.saving_until {
            Some(existing) if existing > floor_end => existing,
            _ => floor_end,
        });

        if plan_id != &self.plan_id {
            debug!(
                "event=persist module=store status=discarded reason=plan_switched seq={}",
                seq
            );
            return;
        }

        match result {
            Ok(()) => {
                debug!("event=persist module=store status=ok seq={}", seq);
                self.set_status(None);
            }
            Err(err) => {
                error!(
                    "event=persist module=store status=error seq={} error_code={} error={}",
                    seq,
                    err.code.as_str(),
                    err
                );
                self.set_status(Some(StoreError::SaveFailure(err)));
            }
        }
    }

    fn document_path(&self) -> Option<DocumentPath> {
        self.identity
            .as_ref()
            .map(|identity| DocumentPath::for_plan(&self.app_id, identity.user_id(), &self.plan_id))
    }

    fn set_state(&mut self, state: SyncState) {
        if self.state == state {
            return;
        }
        debug!(
            "event=state_change module=store from={} to={}",
            self.state.as_str(),
            state.as_str()
        );
        self.state = state;
        self.notify(StoreChange::StateChanged(state));
    }

    fn set_status(&mut self, status: Option<StoreError>) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.notify(StoreChange::StatusChanged);
    }

    fn notify(&mut self, change: StoreChange) {
        for observer in &mut self.observers {
            observer(&change);
        }
    }
}
