//! The walk engine: the recursive validating/transforming traversal.
//!
//! One procedure serves defaulting, type validation, custom validation and
//! identifier casting behind a single option bundle, so lighter call sites
//! (filter sanitization, hydration) can opt out of required/default
//! semantics while reusing identical coercion logic.
//!
//! Fields are walked in name order, which makes the first-error-wins
//! contract deterministic.

use crate::schema::{FieldDef, FieldType, Schema};
use crate::{Error, Map, ObjectId, Result, Value};

/// The option bundle controlling a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Run the virtual setter pass over the decoded input
    pub apply_setters: bool,
    /// Inject field defaults for absent values
    pub apply_defaults: bool,
    /// Parse hex strings into identifiers for `ObjectId` fields
    pub cast_object_ids: bool,
    /// Error on type mismatches instead of silently dropping the value
    pub validate_types: bool,
    /// Run custom validators
    pub validate_custom: bool,
    /// Error on absent required fields
    pub validate_required: bool,
}

impl WalkOptions {
    /// Everything on: the save/validate configuration.
    pub fn strict() -> Self {
        Self {
            apply_setters: true,
            apply_defaults: true,
            cast_object_ids: true,
            validate_types: true,
            validate_custom: true,
            validate_required: true,
        }
    }

    /// Load configuration: setters, identifier casting and type checks, but
    /// no defaults, required checks or custom validators, so documents can
    /// be built up incrementally after hydration.
    pub fn hydrate() -> Self {
        Self {
            apply_setters: true,
            apply_defaults: false,
            cast_object_ids: true,
            validate_types: true,
            validate_custom: false,
            validate_required: false,
        }
    }

    /// Filter-grade sanitization: setters and identifier casting only.
    pub fn relaxed() -> Self {
        Self {
            apply_setters: true,
            apply_defaults: false,
            cast_object_ids: true,
            validate_types: false,
            validate_custom: false,
            validate_required: false,
        }
    }
}

impl Schema {
    /// Walk an input tree against this schema, producing the canonical
    /// output map or the first encountered error.
    ///
    /// Undeclared input keys are dropped, absent optional fields are
    /// omitted (no null placeholders), and `_id` is carried through
    /// unconditionally.
    pub fn walk(&self, input: &Value, path: &[String], options: &WalkOptions) -> Result<Map> {
        let document = match input {
            Value::Map(map) => map.clone(),
            _ => return Err(Error::NotADocument),
        };

        let document = if options.apply_setters {
            self.apply_setters(document, path)?
        } else {
            document
        };

        let mut output = Map::new();

        // the identifier field is schema-exempt
        if let Some(id) = document.get("_id") {
            output.insert("_id".to_string(), id.clone());
        }

        for (name, field) in self.fields() {
            let mut field_path = path.to_vec();
            field_path.push(name.clone());

            match field.walk(document.get(name), &field_path, options)? {
                Some(value) => {
                    output.insert(name.clone(), value);
                }
                None => {
                    if field.is_required() && options.validate_required {
                        return Err(Error::RequiredField(field_path.join(".")));
                    }
                }
            }
        }

        Ok(output)
    }

    /// Convenience wrapper for walking a map at the document root.
    pub fn walk_map(&self, input: &Map, options: &WalkOptions) -> Result<Map> {
        self.walk(&Value::Map(input.clone()), &[], options)
    }
}

impl FieldDef {
    /// Walk a single field's value, array-aware.
    pub(crate) fn walk(
        &self,
        value: Option<&Value>,
        path: &[String],
        options: &WalkOptions,
    ) -> Result<Option<Value>> {
        if self.is_array_field() {
            self.walk_array(value, path, options)
        } else {
            self.walk_single(value, path, options)
        }
    }

    fn walk_array(
        &self,
        value: Option<&Value>,
        path: &[String],
        options: &WalkOptions,
    ) -> Result<Option<Value>> {
        let value = match value {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        };
        let Some(value) = value else {
            if options.validate_required && self.is_required() {
                return Err(Error::RequiredField(path.join(".")));
            }
            return Ok(None);
        };

        let Value::Array(items) = value else {
            if options.validate_types {
                return Err(Error::NotAnArray(path.join(".")));
            }
            return Ok(None);
        };

        // walk each element at path.index; a nil element of a required
        // field is an error, nil elements of optional fields are dropped
        let mut output = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let mut item_path = path.to_vec();
            item_path.push(index.to_string());
            match self.walk_single(Some(item), &item_path, options)? {
                Some(walked) => output.push(walked),
                None => {
                    if options.validate_required && self.is_required() {
                        return Err(Error::RequiredField(item_path.join(".")));
                    }
                }
            }
        }

        Ok(Some(Value::Array(output)))
    }

    fn walk_single(
        &self,
        value: Option<&Value>,
        path: &[String],
        options: &WalkOptions,
    ) -> Result<Option<Value>> {
        let mut value = match value {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.clone()),
        };

        if value.is_none() && options.apply_defaults {
            value = self.default().cloned();
        }

        let Some(value) = value else {
            return Ok(None);
        };

        match (self.element_type(), value) {
            // mixed allows anything, untouched
            (FieldType::Mixed, v) => self.finish(v, path, options),

            (FieldType::String, v @ Value::String(_)) => self.finish(v, path, options),
            (FieldType::Int, v @ Value::Int(_)) => self.finish(v, path, options),
            (FieldType::Float, v @ Value::Float(_)) => self.finish(v, path, options),
            (FieldType::Bool, v @ Value::Bool(_)) => self.finish(v, path, options),
            (FieldType::ObjectId, v @ Value::ObjectId(_)) => self.finish(v, path, options),

            // a string can potentially be an identifier
            (FieldType::ObjectId, Value::String(hex)) => {
                if !options.cast_object_ids {
                    return self.finish(Value::String(hex), path, options);
                }
                match ObjectId::parse_str(&hex) {
                    Ok(id) => self.finish(Value::ObjectId(id), path, options),
                    Err(_) if options.validate_types => {
                        Err(Error::InvalidObjectId(path.join(".")))
                    }
                    Err(_) => Ok(None),
                }
            }

            // maps recurse into the embedded schema with the extended path
            (FieldType::Embedded(schema), v @ Value::Map(_)) => {
                let sub = schema.walk(&v, path, options)?;
                self.finish(Value::Map(sub), path, options)
            }

            (expected, got) => {
                if options.validate_types {
                    Err(Error::TypeMismatch {
                        path: path.join("."),
                        expected: expected.name().to_string(),
                        got: got.type_name().to_string(),
                    })
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Run custom validators against the resolved value, in registration
    /// order, first failure wins.
    fn finish(&self, value: Value, path: &[String], options: &WalkOptions) -> Result<Option<Value>> {
        if options.validate_custom {
            for validator in self.validators() {
                validator(&value).map_err(|message| Error::ValidatorFailed {
                    path: path.join("."),
                    message,
                })?;
            }
        }
        Ok(Some(value))
    }
}
