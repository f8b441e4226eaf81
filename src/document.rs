//! Documents: stateful handles over a model's canonical maps.
//!
//! A document keeps three snapshots of its content:
//!
//!   - `prev`: the state before the last successful save
//!   - `cur`: the state as of the last successful save
//!   - `next`: the pending state, mutated by [`Document::set`]
//!
//! Saves rotate the snapshots forward; [`Document::rollback`] persists
//! `prev` again and is atomic, restoring all three snapshots on failure.

use crate::hooks::HookOp;
use crate::model::Model;
use crate::walk::WalkOptions;
use crate::{path, Error, Map, Result, Value};
use std::fmt;
use std::time::Duration;

pub struct Document {
    model: Model,
    id: Option<Value>,
    prev: Map,
    cur: Map,
    next: Map,
}

impl Document {
    pub(crate) fn from_canonical(model: Model, id: Option<Value>, canonical: Map) -> Self {
        Self {
            model,
            id,
            prev: canonical.clone(),
            cur: canonical.clone(),
            next: canonical,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The backend-assigned identifier, present once the document has been
    /// inserted or was loaded from storage.
    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Read a value from the pending state by dotted path.
    pub fn get(&self, field_path: &str) -> Option<&Value> {
        path::get(&self.next, field_path)
    }

    /// Write a value into the pending state by dotted path.
    ///
    /// The path must be covered by the schema's field closure, and the
    /// resulting pending state must pass full validation; on a validation
    /// failure the pending state is reverted to the last saved state
    /// entirely. Path errors (undeclared or structurally invalid paths)
    /// leave the pending state untouched.
    pub fn set(&mut self, field_path: &str, value: impl Into<Value>) -> Result<()> {
        let segments: Vec<&str> = field_path.split('.').collect();
        if !self.model.schema().has_field_path(&segments) {
            return Err(Error::UndefinedPath(field_path.to_string()));
        }

        // apply to a scratch copy so a structural error cannot leave
        // half-built containers behind
        let mut candidate = self.next.clone();
        path::set(&mut candidate, field_path, value.into())?;
        self.next = candidate;

        if let Err(err) = self
            .model
            .schema()
            .walk_map(&self.next, &WalkOptions::strict())
        {
            self.next = self.cur.clone();
            return Err(err);
        }
        Ok(())
    }

    /// Validate the pending state without persisting it.
    pub fn validate(&self) -> Result<()> {
        let schema = self.model.schema_handle();
        let mut working = self.next.clone();
        schema.hooks().run_pre(HookOp::Validate, &mut working)?;

        let outcome = schema.walk_map(&working, &WalkOptions::strict()).map(|_| ());
        schema
            .hooks()
            .run_post(HookOp::Validate, &working, outcome.as_ref().err())?;
        outcome
    }

    /// Persist the pending state.
    pub fn save(&mut self) -> Result<()> {
        self.save_with_timeout(None)
    }

    /// Persist with an explicit backend timeout.
    ///
    /// Runs pre-save hooks on a working copy, walks it in full validation
    /// configuration, and hands the canonical result to the backend: an
    /// update when the document has an identifier, an insert otherwise.
    /// Pre-hook and validation failures return directly; post-save hooks
    /// observe operational outcomes only, and an erroring post hook replaces
    /// the outcome. On success the snapshots rotate forward.
    pub fn save_with_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let schema = self.model.schema_handle();

        let mut working = self.next.clone();
        schema.hooks().run_pre(HookOp::Save, &mut working)?;

        let mut canonical = schema.walk_map(&working, &WalkOptions::strict())?;
        canonical.remove("_id");

        let outcome = self.persist_canonical(&canonical, timeout);
        schema
            .hooks()
            .run_post(HookOp::Save, &canonical, outcome.as_ref().err())?;
        outcome?;

        self.prev = std::mem::replace(&mut self.cur, canonical.clone());
        self.next = canonical;
        Ok(())
    }

    fn persist_canonical(&mut self, canonical: &Map, timeout: Option<Duration>) -> Result<()> {
        match &self.id {
            Some(id) => {
                let result = self.model.backend().persist(canonical, Some(id), timeout)?;
                if result.matched < 1 {
                    return Err(Error::UpdateFailed(id.to_string()));
                }
            }
            None => {
                let result = self.model.backend().persist(canonical, None, timeout)?;
                let id = result.id.ok_or(Error::InsertFailed)?;
                tracing::debug!(model = self.model.name(), id = %id, "inserted document");
                self.id = Some(id);
            }
        }
        Ok(())
    }

    /// Persist the state from before the last save, atomically.
    ///
    /// On failure every snapshot, and the identifier, is restored to its
    /// value from before the rollback attempt.
    pub fn rollback(&mut self) -> Result<()> {
        self.rollback_with_timeout(None)
    }

    pub fn rollback_with_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let snapshot = (
            self.prev.clone(),
            self.cur.clone(),
            self.next.clone(),
            self.id.clone(),
        );

        self.cur = self.prev.clone();
        self.next = self.prev.clone();

        if let Err(err) = self.save_with_timeout(timeout) {
            (self.prev, self.cur, self.next, self.id) = snapshot;
            return Err(err);
        }
        Ok(())
    }

    /// Render the last saved state as a plain map, with the identifier
    /// under `_id` and all virtual getters applied.
    pub fn to_object(&self) -> Result<Map> {
        let mut out = self.cur.clone();
        if let Some(id) = &self.id {
            out.insert("_id".to_string(), id.clone());
        }
        self.model.schema().apply_getters(&mut out)?;
        Ok(out)
    }

    /// Render the last saved state as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.to_object().map(|map| Value::Map(map).to_json())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("model", &self.model.name())
            .field("id", &self.id)
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::{FieldDef, FieldType, ObjectId, Schema};
    use serde_json::json;
    use std::sync::Arc;

    fn person_model() -> Model {
        let schema = Schema::new()
            .with_field("name", FieldDef::required(FieldType::String))
            .with_field("age", FieldDef::new(FieldType::Int));
        Model::new("people", &schema, Arc::new(MemoryBackend::new())).unwrap()
    }

    fn person(model: &Model) -> Document {
        model
            .document(Value::from_json(json!({"name": "foo", "age": 3})))
            .unwrap()
    }

    #[test]
    fn set_rejects_undeclared_path() {
        let model = person_model();
        let mut doc = person(&model);

        assert_eq!(
            doc.set("nope", "x"),
            Err(Error::UndefinedPath("nope".into()))
        );
        assert_eq!(doc.get("nope"), None);
    }

    #[test]
    fn set_reverts_pending_state_on_invalid_value() {
        let model = person_model();
        let mut doc = person(&model);

        assert!(matches!(
            doc.set("age", "old"),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(doc.get("age"), Some(&Value::Int(3)));
    }

    #[test]
    fn save_inserts_then_updates() {
        let model = person_model();
        let mut doc = person(&model);

        assert_eq!(doc.id(), None);
        doc.save().unwrap();
        let id = doc.id().cloned().unwrap();
        assert!(matches!(id, Value::ObjectId(_)));

        doc.set("age", 4).unwrap();
        doc.save().unwrap();
        assert_eq!(doc.id(), Some(&id));

        let mut filter = Map::new();
        filter.insert("_id".into(), id);
        let loaded = model.hydrate(&filter).unwrap();
        assert_eq!(loaded.get("age"), Some(&Value::Int(4)));
    }

    #[test]
    fn save_with_stale_id_fails() {
        let model = person_model();
        let ghost = ObjectId::new();
        let mut doc = model
            .document(Value::from_json(json!({
                "id": ghost.to_hex(),
                "name": "foo"
            })))
            .unwrap();

        assert_eq!(doc.save(), Err(Error::UpdateFailed(ghost.to_hex())));
    }

    #[test]
    fn save_requires_valid_document() {
        let model = person_model();
        let mut doc = model.empty();
        assert_eq!(doc.save(), Err(Error::RequiredField("name".into())));
        assert_eq!(doc.id(), None);
    }

    #[test]
    fn snapshots_rotate_on_save() {
        let model = person_model();
        let mut doc = person(&model);
        doc.save().unwrap();

        doc.set("age", 4).unwrap();
        doc.save().unwrap();

        assert_eq!(doc.prev.get("age"), Some(&Value::Int(3)));
        assert_eq!(doc.cur.get("age"), Some(&Value::Int(4)));
        assert_eq!(doc.next.get("age"), Some(&Value::Int(4)));
    }

    #[test]
    fn rollback_restores_previous_saved_state() {
        let model = person_model();
        let mut doc = person(&model);
        doc.save().unwrap();
        doc.set("age", 4).unwrap();
        doc.save().unwrap();

        doc.rollback().unwrap();
        assert_eq!(doc.get("age"), Some(&Value::Int(3)));

        let mut filter = Map::new();
        filter.insert("_id".into(), doc.id().cloned().unwrap());
        let loaded = model.hydrate(&filter).unwrap();
        assert_eq!(loaded.get("age"), Some(&Value::Int(3)));
    }

    #[test]
    fn to_object_applies_getters() {
        let model = person_model();
        let mut doc = person(&model);
        doc.save().unwrap();

        let obj = doc.to_object().unwrap();
        let hex = doc.id().map(Value::to_string).unwrap();
        assert_eq!(obj.get("id"), Some(&Value::String(hex)));
        assert_eq!(obj.get("name"), Some(&Value::from("foo")));
    }

    #[test]
    fn to_object_before_save_fails_loudly() {
        let model = person_model();
        let doc = person(&model);
        assert_eq!(
            doc.to_object().err(),
            Some(Error::VirtualSourceMissing("_id".into()))
        );
    }

    #[test]
    fn validate_runs_validate_hooks() {
        let mut schema = Schema::new().with_field("name", FieldDef::required(FieldType::String));
        schema.pre(HookOp::Validate, |_| Err(Error::custom("blocked")));
        let model = Model::new("people", &schema, Arc::new(MemoryBackend::new())).unwrap();

        let doc = model
            .document(Value::from_json(json!({"name": "foo"})))
            .unwrap();
        assert_eq!(doc.validate(), Err(Error::custom("blocked")));
    }
}
