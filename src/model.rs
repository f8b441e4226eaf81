//! Models: a named binding of a schema to a storage backend.

use crate::document::Document;
use crate::hooks::HookOp;
use crate::storage::Backend;
use crate::virtuals::Virtual;
use crate::walk::WalkOptions;
use crate::{Map, Result, Schema, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A registered model. Cheap to clone; clones share the schema and backend.
///
/// Registration deep-copies the schema, so the caller's template stays
/// untouched, and installs the stock `id` to `_id` alias unless the schema
/// opted out or already carries its own.
#[derive(Clone)]
pub struct Model {
    name: String,
    schema: Arc<Schema>,
    backend: Arc<dyn Backend>,
}

impl Model {
    /// Register a model over a schema and backend. Initializes the schema
    /// copy, failing on invalid field definitions.
    pub fn new(
        name: impl Into<String>,
        schema: &Schema,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        let mut schema = schema.clone();
        if schema.exposes_id() {
            // first registration wins, so a caller-supplied alias survives
            schema.virtual_field(Virtual::object_id_alias("id", "_id"));
        }
        schema.init()?;

        Ok(Self {
            name: name.into(),
            schema: Arc::new(schema),
            backend,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn schema_handle(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Build a document from raw input, walking it in load configuration:
    /// setters and identifier casting apply, defaults and validation do not.
    pub fn document(&self, raw: Value) -> Result<Document> {
        let mut canonical = self.schema.walk(&raw, &[], &WalkOptions::hydrate())?;
        let id = canonical.remove("_id");
        Ok(Document::from_canonical(self.clone(), id, canonical))
    }

    /// Build an empty, unsaved document.
    pub fn empty(&self) -> Document {
        Document::from_canonical(self.clone(), None, Map::new())
    }

    /// Load the first document matching a filter.
    pub fn hydrate(&self, filter: &Map) -> Result<Document> {
        self.hydrate_with_timeout(filter, None)
    }

    /// Load with an explicit backend timeout.
    pub fn hydrate_with_timeout(
        &self,
        filter: &Map,
        timeout: Option<Duration>,
    ) -> Result<Document> {
        let mut filter = self.schema.sanitize_filter(filter)?;
        self.schema.hooks().run_pre(HookOp::FindOne, &mut filter)?;

        let loaded = self.backend.load(&filter, timeout);
        self.schema.hooks().run_post(
            HookOp::FindOne,
            loaded.as_ref().unwrap_or(&filter),
            loaded.as_ref().err(),
        )?;

        self.document(Value::Map(loaded?))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::{Error, FieldDef, FieldType, ObjectId};
    use serde_json::json;

    fn person_model() -> Model {
        let schema = Schema::new()
            .with_field("name", FieldDef::required(FieldType::String))
            .with_field("age", FieldDef::new(FieldType::Int));
        Model::new("people", &schema, Arc::new(MemoryBackend::new())).unwrap()
    }

    #[test]
    fn registration_leaves_template_untouched() {
        let template = Schema::new().with_field("name", FieldDef::required(FieldType::String));
        let model = Model::new("people", &template, Arc::new(MemoryBackend::new())).unwrap();

        assert_eq!(template.virtuals().len(), 0);
        assert_eq!(model.schema().virtuals().len(), 1);
    }

    #[test]
    fn id_alias_can_be_disabled() {
        let template = Schema::new()
            .with_field("name", FieldDef::required(FieldType::String))
            .without_id_alias();
        let model = Model::new("people", &template, Arc::new(MemoryBackend::new())).unwrap();
        assert_eq!(model.schema().virtuals().len(), 0);
    }

    #[test]
    fn registration_fails_on_invalid_schema() {
        let bad = Schema::new().with_field("", FieldDef::new(FieldType::String));
        assert_eq!(
            Model::new("bad", &bad, Arc::new(MemoryBackend::new())).err(),
            Some(Error::EmptyFieldName)
        );
    }

    #[test]
    fn document_casts_id_alias_on_the_way_in() {
        let model = person_model();
        let hex = "5d2f8c7e9a1b3c4d5e6f7a8b";
        let doc = model
            .document(Value::from_json(json!({"id": hex, "name": "foo"})))
            .unwrap();

        assert_eq!(
            doc.id(),
            Some(&Value::ObjectId(ObjectId::parse_str(hex).unwrap()))
        );
        assert_eq!(doc.get("name"), Some(&Value::from("foo")));
    }

    #[test]
    fn document_does_not_require_fields_on_load() {
        let model = person_model();
        let doc = model.document(Value::from_json(json!({"age": 3}))).unwrap();
        assert_eq!(doc.get("name"), None);
    }

    #[test]
    fn hydrate_remaps_alias_in_filter() {
        let model = person_model();
        let mut doc = model
            .document(Value::from_json(json!({"name": "foo"})))
            .unwrap();
        doc.save().unwrap();
        let hex = doc.id().unwrap().to_string();

        let mut filter = Map::new();
        filter.insert("id".into(), Value::from(hex));
        let loaded = model.hydrate(&filter).unwrap();
        assert_eq!(loaded.get("name"), Some(&Value::from("foo")));
        assert_eq!(loaded.id(), doc.id());
    }

    #[test]
    fn hydrate_miss_is_not_found() {
        let model = person_model();
        let mut filter = Map::new();
        filter.insert("name".into(), Value::from("nobody"));
        assert_eq!(model.hydrate(&filter).err(), Some(Error::DocumentNotFound));
    }
}
