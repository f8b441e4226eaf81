//! Schema definition: field types, field definitions, and the schema itself.
//!
//! Schemas are built through an explicit construction API, initialized once,
//! and read-only afterwards. A registered model deep-copies its schema so
//! per-registration customization never touches a shared template.

use crate::hooks::{HookOp, HookRegistry};
use crate::virtuals::Virtual;
use crate::{Error, Map, Result, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Field types supported in schemas.
#[derive(Clone)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    /// Arbitrary value, skips all type checks
    Mixed,
    /// Opaque 12-byte identifier, hex-encoded at the boundary
    ObjectId,
    /// Nested schema (sub-document)
    Embedded(Arc<Schema>),
}

impl FieldType {
    /// Wrap a schema as an embedded field type.
    pub fn embedded(schema: Schema) -> Self {
        FieldType::Embedded(Arc::new(schema))
    }

    /// The declared type name, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Int => "Int",
            FieldType::Float => "Float",
            FieldType::Bool => "Bool",
            FieldType::Mixed => "Mixed",
            FieldType::ObjectId => "ObjectID",
            FieldType::Embedded(_) => "Schema",
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A custom validator run against a resolved field value.
///
/// Returns a message describing the violation; the walk engine qualifies it
/// with the field's document path.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync>;

/// Definition of a single schema field.
#[derive(Clone)]
pub struct FieldDef {
    field_type: FieldType,
    is_array: bool,
    required: bool,
    unique: bool,
    default: Option<Value>,
    validators: Vec<ValidatorFn>,
    meta: Map,
}

impl FieldDef {
    /// Create an optional field of the given element type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_array: false,
            required: false,
            unique: false,
            default: None,
            validators: Vec::new(),
            meta: Map::new(),
        }
    }

    /// Create a required field.
    pub fn required(field_type: FieldType) -> Self {
        let mut def = Self::new(field_type);
        def.required = true;
        def
    }

    /// Create an optional field.
    pub fn optional(field_type: FieldType) -> Self {
        Self::new(field_type)
    }

    /// Mark the field as an array of its element type. Elements are
    /// validated pointwise with the index appended to the path.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Set the default value injected when the field is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the field as unique. The engine carries the flag for storage
    /// collaborators (index creation); it is not enforced during walks.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Append a custom validator. Validators run in registration order and
    /// the first failure aborts the walk.
    pub fn validator<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validate));
        self
    }

    /// Attach free-form metadata.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn element_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_array_field(&self) -> bool {
        self.is_array
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn metadata(&self) -> &Map {
        &self.meta
    }

    pub(crate) fn validators(&self) -> &[ValidatorFn] {
        &self.validators
    }

    fn init(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyFieldName);
        }
        if let FieldType::Embedded(schema) = &self.field_type {
            schema
                .init()
                .map_err(|e| Error::InvalidField(name.to_string(), e.to_string()))?;
        }
        Ok(())
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("type", &self.field_type)
            .field("is_array", &self.is_array)
            .field("required", &self.required)
            .field("unique", &self.unique)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// A keyed collection of field definitions plus virtual-field and hook
/// configuration.
pub struct Schema {
    fields: BTreeMap<String, FieldDef>,
    virtuals: BTreeMap<String, Virtual>,
    hooks: HookRegistry,
    expose_id: bool,
    initialized: AtomicBool,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            virtuals: BTreeMap::new(),
            hooks: HookRegistry::default(),
            expose_id: true,
            initialized: AtomicBool::new(false),
        }
    }

    /// Builder-style method to declare a field.
    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.add_field(name, def);
        self
    }

    /// Declare a field.
    pub fn add_field(&mut self, name: impl Into<String>, def: FieldDef) -> &mut Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Disable the default `id` to `_id` alias registered by models.
    pub fn without_id_alias(mut self) -> Self {
        self.expose_id = false;
        self
    }

    pub(crate) fn exposes_id(&self) -> bool {
        self.expose_id
    }

    /// Get a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Iterate declared fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldDef)> {
        self.fields.iter()
    }

    /// Register a virtual field. Empty names are ignored and the first
    /// registration for a name wins.
    pub fn virtual_field(&mut self, config: Virtual) -> &mut Self {
        if config.name().is_empty() {
            return self;
        }
        if !self.virtuals.contains_key(config.name()) {
            self.virtuals.insert(config.name().to_string(), config);
        }
        self
    }

    pub(crate) fn virtuals(&self) -> &BTreeMap<String, Virtual> {
        &self.virtuals
    }

    /// Register a synchronous pre hook for an operation.
    pub fn pre<F>(&mut self, op: HookOp, handler: F) -> &mut Self
    where
        F: Fn(&mut Map) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.add_pre(op, handler, false);
        self
    }

    /// Register a detached pre hook. It runs on a background worker with a
    /// snapshot of the document; errors are logged and discarded.
    pub fn pre_detached<F>(&mut self, op: HookOp, handler: F) -> &mut Self
    where
        F: Fn(&mut Map) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.add_pre(op, handler, true);
        self
    }

    /// Register a synchronous post hook for an operation.
    pub fn post<F>(&mut self, op: HookOp, handler: F) -> &mut Self
    where
        F: Fn(&Map, Option<&Error>) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.add_post(op, handler, false);
        self
    }

    /// Register a detached post hook.
    pub fn post_detached<F>(&mut self, op: HookOp, handler: F) -> &mut Self
    where
        F: Fn(&Map, Option<&Error>) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.add_post(op, handler, true);
        self
    }

    pub(crate) fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Initialize the schema, validating every field definition and
    /// recursively initializing embedded schemas.
    ///
    /// Idempotent: a second call is a no-op. Failure is a construction-time
    /// error and the schema must not be used afterwards.
    pub fn init(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        for (name, field) in &self.fields {
            field.init(name)?;
        }
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Check whether a dotted field path is covered by the schema's field
    /// closure. Array fields require a numeric index segment followed by at
    /// least one deeper segment; scalar fields terminate the path.
    pub fn has_field_path(&self, segments: &[&str]) -> bool {
        let Some((first, rest)) = segments.split_first() else {
            return false;
        };
        let Some(field) = self.fields.get(*first) else {
            return false;
        };
        if rest.is_empty() {
            return true;
        }

        let mut rest = rest;
        if field.is_array_field() {
            let index = rest[0];
            let numeric = !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit());
            if !numeric || rest.len() < 2 {
                return false;
            }
            rest = &rest[1..];
        }

        match field.element_type() {
            FieldType::Embedded(schema) => schema.has_field_path(rest),
            _ => false,
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Schema {
    /// Deep copy. The copy starts uninitialized so per-registration
    /// customization can still happen before first use.
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            virtuals: self.virtuals.clone(),
            hooks: self.hooks.clone(),
            expose_id: self.expose_id,
            initialized: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("virtuals", &self.virtuals.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address_schema() -> Schema {
        Schema::new()
            .with_field("street", FieldDef::required(FieldType::String))
            .with_field("zip", FieldDef::optional(FieldType::String))
    }

    #[test]
    fn init_is_idempotent() {
        let schema = address_schema();
        schema.init().unwrap();
        schema.init().unwrap();
    }

    #[test]
    fn init_rejects_empty_field_name() {
        let schema = Schema::new().with_field("", FieldDef::new(FieldType::String));
        assert_eq!(schema.init(), Err(Error::EmptyFieldName));
    }

    #[test]
    fn init_recurses_into_embedded() {
        let bad_inner = Schema::new().with_field("", FieldDef::new(FieldType::Int));
        let schema = Schema::new().with_field(
            "inner",
            FieldDef::new(FieldType::embedded(bad_inner)),
        );
        assert!(matches!(schema.init(), Err(Error::InvalidField(name, _)) if name == "inner"));
    }

    #[test]
    fn clone_is_independent() {
        let original = address_schema();
        original.init().unwrap();

        let mut copy = original.clone();
        copy.virtual_field(Virtual::object_id_alias("id", "_id"));
        copy.init().unwrap();

        assert_eq!(copy.virtuals().len(), 1);
        assert_eq!(original.virtuals().len(), 0);
    }

    #[test]
    fn first_virtual_registration_wins() {
        let mut schema = address_schema();
        schema.virtual_field(Virtual::object_id_alias("id", "_id"));
        schema.virtual_field(Virtual::object_id_alias("id", "other"));
        assert_eq!(schema.virtuals().len(), 1);

        let config = schema.virtuals().get("id").unwrap();
        let mut doc = Map::new();
        config
            .set(Value::from("5d2f8c7e9a1b3c4d5e6f7a8b"), &mut doc)
            .unwrap();
        assert!(doc.contains_key("_id"));
    }

    #[test]
    fn field_path_closure() {
        let schema = Schema::new()
            .with_field("name", FieldDef::required(FieldType::String))
            .with_field("tags", FieldDef::new(FieldType::String).array())
            .with_field(
                "addresses",
                FieldDef::new(FieldType::embedded(address_schema())).array(),
            )
            .with_field("home", FieldDef::new(FieldType::embedded(address_schema())));

        assert!(schema.has_field_path(&["name"]));
        assert!(schema.has_field_path(&["tags"]));
        assert!(schema.has_field_path(&["home", "street"]));
        assert!(schema.has_field_path(&["addresses", "0", "street"]));

        assert!(!schema.has_field_path(&[]));
        assert!(!schema.has_field_path(&["nope"]));
        assert!(!schema.has_field_path(&["name", "deeper"]));
        assert!(!schema.has_field_path(&["tags", "0"])); // scalar arrays are set whole
        assert!(!schema.has_field_path(&["addresses", "street"])); // missing index
        assert!(!schema.has_field_path(&["addresses", "x", "street"]));
    }

    #[test]
    fn field_def_builder() {
        let def = FieldDef::required(FieldType::String)
            .unique()
            .default_value("n/a")
            .meta("label", "Name")
            .validator(|v| {
                if v.as_str().is_some_and(|s| s.is_empty()) {
                    Err("must not be empty".into())
                } else {
                    Ok(())
                }
            });

        assert!(def.is_required());
        assert!(def.is_unique());
        assert_eq!(def.default(), Some(&Value::from("n/a")));
        assert_eq!(def.metadata().get("label"), Some(&Value::from("Name")));
        assert_eq!(def.validators().len(), 1);
    }
}
