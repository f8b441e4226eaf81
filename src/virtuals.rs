//! Virtual fields: bidirectional aliases between exposed names and storage
//! fields.
//!
//! A virtual's setter consumes an input key and decides the real destination
//! key(s) and any value coercion; its getter derives the alias value from
//! the full canonical document. Virtuals never cascade: a setter's output is
//! not re-scanned for further virtual matches in the same pass.

use crate::{Error, Map, ObjectId, Result, Schema, Value};
use std::fmt;
use std::sync::Arc;

/// Resolves a virtual field from the full document.
pub type GetterFn = Arc<dyn Fn(&Map) -> Result<Value> + Send + Sync>;

/// Writes a virtual field's raw value into the in-progress document.
pub type SetterFn = Arc<dyn Fn(Value, &mut Map) -> Result<()> + Send + Sync>;

/// Configuration of a single virtual field.
#[derive(Clone)]
pub struct Virtual {
    name: String,
    get: GetterFn,
    set: SetterFn,
}

impl Virtual {
    /// Create a virtual field from a getter/setter pair.
    pub fn new<G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&Map) -> Result<Value> + Send + Sync + 'static,
        S: Fn(Value, &mut Map) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    /// A stock virtual aliasing `alias` to an identifier stored under
    /// `field`: the setter parses hex strings into identifiers, the getter
    /// encodes the identifier back to hex.
    pub fn object_id_alias(alias: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        let get_field = field.clone();

        Self::new(
            alias,
            move |doc| match doc.get(&get_field) {
                None | Some(Value::Null) => {
                    Err(Error::VirtualSourceMissing(get_field.clone()))
                }
                Some(Value::ObjectId(id)) => Ok(Value::String(id.to_hex())),
                Some(other) => Ok(Value::String(other.to_string())),
            },
            move |value, doc| {
                let id = match value {
                    Value::ObjectId(id) => id,
                    Value::String(hex) => ObjectId::parse_str(&hex)?,
                    other => return Err(Error::MalformedObjectId(other.to_string())),
                };
                doc.insert(field.clone(), Value::ObjectId(id));
                Ok(())
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the getter against a document.
    pub fn get(&self, doc: &Map) -> Result<Value> {
        (self.get)(doc)
    }

    /// Invoke the setter with a raw value and the in-progress document.
    pub fn set(&self, value: Value, doc: &mut Map) -> Result<()> {
        (self.set)(value, doc)
    }
}

impl fmt::Debug for Virtual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Virtual").field("name", &self.name).finish()
    }
}

/// Qualify a setter failure with the full dotted path of the alias key.
fn qualify_setter_error(err: Error, path: &[String], key: &str) -> Error {
    let mut segments = path.to_vec();
    segments.push(key.to_string());
    Error::VirtualRejected {
        path: segments.join("."),
        message: err.to_string(),
    }
}

impl Schema {
    /// Setter pass: replace every input key that matches a registered
    /// virtual by invoking its setter; all other keys pass through. Setter
    /// failures carry the dotted path of the offending alias.
    pub(crate) fn apply_setters(&self, doc: Map, path: &[String]) -> Result<Map> {
        let mut out = Map::new();
        for (key, value) in doc {
            if let Some(config) = self.virtuals().get(&key) {
                config
                    .set(value, &mut out)
                    .map_err(|err| qualify_setter_error(err, path, &key))?;
            } else {
                out.insert(key, value);
            }
        }
        Ok(out)
    }

    /// Getter pass: inject every registered virtual's value into the
    /// document. A getter whose source field is absent fails loudly, since
    /// it signals a decode of an incomplete document.
    pub(crate) fn apply_getters(&self, doc: &mut Map) -> Result<()> {
        for config in self.virtuals().values() {
            let value = config.get(doc)?;
            doc.insert(config.name().to_string(), value);
        }
        Ok(())
    }

    /// Sanitize a query filter: deep-walk the tree, remapping virtual
    /// aliases through their setters at every map level. Unknown keys
    /// (including operator-style keys) pass through unchanged.
    pub fn sanitize_filter(&self, filter: &Map) -> Result<Map> {
        let mut out = Map::new();
        for (key, value) in filter {
            let value = self.sanitize_filter_value(value)?;
            if let Some(config) = self.virtuals().get(key) {
                config
                    .set(value, &mut out)
                    .map_err(|err| qualify_setter_error(err, &[], key))?;
            } else {
                out.insert(key.clone(), value);
            }
        }
        Ok(out)
    }

    fn sanitize_filter_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.sanitize_filter_value(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Map(map) => self.sanitize_filter(map).map(Value::Map),
            other => Ok(other.clone()),
        }
    }
}
