//! # docshape
//!
//! A schema-driven document shaping and validation engine.
//!
//! This crate provides the core logic of a document mapper: schemas describe
//! the shape of string-keyed document trees, and a single recursive walk
//! applies defaults, casts identifiers, validates types and custom rules,
//! and prunes undeclared fields in one deterministic pass.
//!
//! ## Design Principles
//!
//! - **Fail fast**: the first violation found in a depth-first walk is
//!   returned, never a combined report
//! - **Deterministic**: documents are `BTreeMap`-backed, so walk order and
//!   error ordering never depend on insertion order
//! - **Storage-agnostic**: persistence sits behind the [`Backend`] trait;
//!   the engine never talks to a database directly
//!
//! ## Core Concepts
//!
//! ### Schemas
//!
//! A [`Schema`] is an explicit map of field names to [`FieldDef`]s: element
//! type, array flag, required flag, default value, custom validators, and
//! free-form metadata. Schemas nest through [`FieldType::Embedded`].
//!
//! ### The Walk
//!
//! [`Schema::walk`] traverses raw input against the schema under a
//! [`WalkOptions`] bundle. Three presets cover the engine's needs:
//! [`WalkOptions::strict`] for saves, [`WalkOptions::hydrate`] for loads,
//! and [`WalkOptions::relaxed`] for filter-grade coercion.
//!
//! ### Virtuals
//!
//! [`Virtual`] fields alias exposed names to storage fields through
//! getter/setter pairs. Models install a stock `id` to `_id` alias that
//! converts between hex strings and [`ObjectId`]s.
//!
//! ### Documents
//!
//! A [`Document`] tracks three snapshots of its content (previous, current,
//! pending). [`Document::set`] validates eagerly and reverts on failure;
//! [`Document::save`] rotates the snapshots forward; [`Document::rollback`]
//! atomically re-persists the previous state.
//!
//! ### Hooks
//!
//! [`HookOp`]-keyed pre and post handlers run around operations, in
//! registration order, fail-fast. Detached hooks run on a background worker
//! and can never fail the operation that scheduled them.
//!
//! ## Quick Start
//!
//! ```rust
//! use docshape::{FieldDef, FieldType, MemoryBackend, Model, Schema, Value};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! // 1. Define a schema
//! let schema = Schema::new()
//!     .with_field("name", FieldDef::required(FieldType::String))
//!     .with_field("state", FieldDef::new(FieldType::String).default_value("new"));
//!
//! // 2. Register a model over a backend
//! let model = Model::new("users", &schema, Arc::new(MemoryBackend::new())).unwrap();
//!
//! // 3. Build and save a document
//! let mut user = model
//!     .document(Value::from_json(json!({"name": "Alice"})))
//!     .unwrap();
//! user.save().unwrap();
//! assert!(user.id().is_some());
//!
//! // 4. Defaults were applied during the save walk
//! assert_eq!(user.get("state"), Some(&Value::from("new")));
//! ```

pub mod document;
pub mod error;
pub mod hooks;
pub mod model;
pub mod oid;
pub mod path;
pub mod schema;
pub mod storage;
pub mod value;
pub mod virtuals;
pub mod walk;

// Re-export main types at crate root
pub use document::Document;
pub use error::{Error, Result};
pub use hooks::{HookOp, HookRegistry, PostHookFn, PreHookFn};
pub use model::Model;
pub use oid::ObjectId;
pub use schema::{FieldDef, FieldType, Schema, ValidatorFn};
pub use storage::{Backend, MemoryBackend, PersistResult};
pub use value::{Map, Value};
pub use virtuals::{GetterFn, SetterFn, Virtual};
pub use walk::WalkOptions;
