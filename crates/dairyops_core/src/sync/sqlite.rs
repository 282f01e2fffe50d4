//! SQLite-backed local document service.
//!
//! # Responsibility
//! - Persist documents as JSON text keyed by path.
//! - Notify subscribers of a path after every successful write.
//!
//! # Invariants
//! - Callbacks are delivered synchronously inside `subscribe`/`write`; the
//!   store still applies them only from its own event queue.
//! - Storage failures surface as `unavailable`, undecodable bodies as
//!   `internal`.

use crate::db::{DbError, DbResult};
use crate::sync::document::{
    DocumentPath, DocumentService, Snapshot, SnapshotSink, Subscription, WriteSink,
};
use crate::sync::error::{ServiceError, ServiceErrorCode};
use log::error;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Subscribers = RefCell<Vec<(u64, DocumentPath, SnapshotSink)>>;

/// Document service over a connection carrying the `documents` schema.
pub struct SqliteDocumentService {
    conn: Connection,
    subscribers: Rc<Subscribers>,
    next_subscriber_id: Cell<u64>,
}

impl SqliteDocumentService {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            subscribers: Rc::new(RefCell::new(Vec::new())),
            next_subscriber_id: Cell::new(0),
        }
    }

    /// Reads one document.
    pub fn read(&self, path: &DocumentPath) -> Result<Snapshot, ServiceError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE path = ?1;",
                [path.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_error)?;

        match body {
            Some(body) => {
                let value: Value = serde_json::from_str(&body).map_err(|err| {
                    ServiceError::new(
                        ServiceErrorCode::Internal,
                        format!("stored document at {path} is not JSON: {err}"),
                    )
                })?;
                Ok(Snapshot::found(path.clone(), value))
            }
            None => Ok(Snapshot::missing(path.clone())),
        }
    }

    /// Lists stored document paths starting with `prefix`, sorted.
    pub fn paths_with_prefix(&self, prefix: &str) -> DbResult<Vec<DocumentPath>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM documents WHERE substr(path, 1, length(?1)) = ?1 ORDER BY path;")?;
        let rows = stmt.query_map([prefix], |row| row.get::<_, String>(0))?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(DocumentPath::new(row.map_err(DbError::from)?));
        }
        Ok(paths)
    }

    fn store(&self, path: &DocumentPath, document: &Value) -> Result<(), ServiceError> {
        let body = serde_json::to_string(document).map_err(|err| {
            ServiceError::new(ServiceErrorCode::Internal, err.to_string())
        })?;
        self.conn
            .execute(
                "INSERT INTO documents (path, body, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now') * 1000)
                 ON CONFLICT(path) DO UPDATE SET
                    body = excluded.body,
                    updated_at = excluded.updated_at;",
                params![path.as_str(), body],
            )
            .map_err(storage_error)?;
        Ok(())
    }

    fn notify(&self, path: &DocumentPath) {
        let result = self.read(path);
        for (_, subscribed_path, sink) in self.subscribers.borrow().iter() {
            if subscribed_path == path {
                sink.deliver(result.clone());
            }
        }
    }
}

impl DocumentService for SqliteDocumentService {
    fn subscribe(&self, path: &DocumentPath, sink: SnapshotSink) -> Subscription {
        let id = self.next_subscriber_id.get() + 1;
        self.next_subscriber_id.set(id);

        sink.deliver(self.read(path));
        self.subscribers
            .borrow_mut()
            .push((id, path.clone(), sink));

        let weak: Weak<Subscribers> = Rc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = weak.upgrade() {
                subscribers
                    .borrow_mut()
                    .retain(|(subscriber_id, _, _)| *subscriber_id != id);
            }
        })
    }

    fn write(&self, path: &DocumentPath, document: Value, sink: WriteSink) {
        match self.store(path, &document) {
            Ok(()) => {
                sink.settle(Ok(()));
                self.notify(path);
            }
            Err(err) => {
                error!(
                    "event=document_write module=sqlite status=error error_code={}",
                    err.code.as_str()
                );
                sink.settle(Err(err));
            }
        }
    }
}

fn storage_error(err: rusqlite::Error) -> ServiceError {
    ServiceError::new(ServiceErrorCode::Unavailable, err.to_string())
}
