//! Storage backends: the persistence seam below models.
//!
//! The engine is storage-agnostic. A [`Backend`] receives fully-walked
//! canonical documents and pre-sanitized filters; it never sees raw input.
//! Timeouts are forwarded opaquely for backends that talk to a remote store.

use crate::{Error, Map, ObjectId, Result, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of a persist call.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistResult {
    /// Identifier assigned by the backend on insert; `None` for updates.
    pub id: Option<Value>,
    /// Number of existing documents matched by an update.
    pub matched: u64,
}

/// A persistence collaborator.
///
/// `persist` with an identifier is an update of the existing document and
/// reports how many documents matched; without one it is an insert and must
/// return the assigned identifier. `load` returns the first document
/// matching the filter.
pub trait Backend: Send + Sync {
    fn persist(
        &self,
        doc: &Map,
        id: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<PersistResult>;

    fn load(&self, filter: &Map, timeout: Option<Duration>) -> Result<Map>;
}

/// In-memory backend keyed by identifier, for tests and embedded use.
///
/// Filters match by top-level key equality. Timeouts are ignored, there is
/// nothing to wait on.
#[derive(Default)]
pub struct MemoryBackend {
    docs: Mutex<BTreeMap<String, Map>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Map>>> {
        self.docs
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))
    }
}

impl Backend for MemoryBackend {
    fn persist(
        &self,
        doc: &Map,
        id: Option<&Value>,
        _timeout: Option<Duration>,
    ) -> Result<PersistResult> {
        let mut docs = self.lock()?;

        let mut body = doc.clone();
        body.remove("_id");

        match id {
            Some(id) => {
                let key = id.to_string();
                if !docs.contains_key(&key) {
                    return Ok(PersistResult {
                        id: None,
                        matched: 0,
                    });
                }
                tracing::debug!(id = %key, "memory store update");
                docs.insert(key, body);
                Ok(PersistResult {
                    id: None,
                    matched: 1,
                })
            }
            None => {
                let id = Value::ObjectId(ObjectId::new());
                tracing::debug!(id = %id, "memory store insert");
                docs.insert(id.to_string(), body);
                Ok(PersistResult {
                    id: Some(id),
                    matched: 0,
                })
            }
        }
    }

    fn load(&self, filter: &Map, _timeout: Option<Duration>) -> Result<Map> {
        let docs = self.lock()?;

        for (key, body) in docs.iter() {
            let matches = filter.iter().all(|(field, want)| {
                if field == "_id" {
                    return want.to_string() == *key;
                }
                body.get(field) == Some(want)
            });
            if matches {
                let mut out = body.clone();
                let id = ObjectId::parse_str(key)
                    .map(Value::ObjectId)
                    .unwrap_or_else(|_| Value::String(key.clone()));
                out.insert("_id".to_string(), id);
                return Ok(out);
            }
        }

        Err(Error::DocumentNotFound)
    }
}
