//! Lifecycle hooks: handlers that run around persistence operations.
//!
//! Hooks are kept in registration order and run fail-fast: the first
//! erroring synchronous handler aborts the chain and the surrounding
//! operation. Detached hooks instead run on a shared background worker with
//! a snapshot of the document; their errors are logged and discarded, and
//! they can never fail the operation that scheduled them.

use crate::{Error, Map, Result};
use std::fmt;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};

/// The closed set of operations hooks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookOp {
    Save,
    Validate,
    Remove,
    Find,
    FindOne,
    FindOneAndUpdate,
    FindOneAndDelete,
    Update,
    Count,
}

impl HookOp {
    pub fn name(&self) -> &'static str {
        match self {
            HookOp::Save => "save",
            HookOp::Validate => "validate",
            HookOp::Remove => "remove",
            HookOp::Find => "find",
            HookOp::FindOne => "findOne",
            HookOp::FindOneAndUpdate => "findOneAndUpdate",
            HookOp::FindOneAndDelete => "findOneAndDelete",
            HookOp::Update => "update",
            HookOp::Count => "count",
        }
    }
}

impl fmt::Display for HookOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pre hook: runs before the operation and may mutate the document.
pub type PreHookFn = std::sync::Arc<dyn Fn(&mut Map) -> Result<()> + Send + Sync>;

/// A post hook: runs after the operation with the document and the
/// operation's outcome.
pub type PostHookFn =
    std::sync::Arc<dyn Fn(&Map, Option<&Error>) -> Result<()> + Send + Sync>;

#[derive(Clone)]
struct PreHook {
    op: HookOp,
    handler: PreHookFn,
    detached: bool,
}

#[derive(Clone)]
struct PostHook {
    op: HookOp,
    handler: PostHookFn,
    detached: bool,
}

/// Ordered hook storage for one schema.
#[derive(Clone, Default)]
pub struct HookRegistry {
    pre: Vec<PreHook>,
    post: Vec<PostHook>,
}

impl HookRegistry {
    pub(crate) fn add_pre<F>(&mut self, op: HookOp, handler: F, detached: bool)
    where
        F: Fn(&mut Map) -> Result<()> + Send + Sync + 'static,
    {
        self.pre.push(PreHook {
            op,
            handler: std::sync::Arc::new(handler),
            detached,
        });
    }

    pub(crate) fn add_post<F>(&mut self, op: HookOp, handler: F, detached: bool)
    where
        F: Fn(&Map, Option<&Error>) -> Result<()> + Send + Sync + 'static,
    {
        self.post.push(PostHook {
            op,
            handler: std::sync::Arc::new(handler),
            detached,
        });
    }

    /// Run all pre hooks registered for `op` in registration order.
    pub(crate) fn run_pre(&self, op: HookOp, doc: &mut Map) -> Result<()> {
        for hook in self.pre.iter().filter(|h| h.op == op) {
            if hook.detached {
                let handler = hook.handler.clone();
                let mut snapshot = doc.clone();
                dispatch_detached(Box::new(move || {
                    if let Err(error) = handler(&mut snapshot) {
                        tracing::warn!(op = %op, %error, "detached pre hook failed");
                    }
                }));
            } else {
                (hook.handler)(doc)?;
            }
        }
        Ok(())
    }

    /// Run all post hooks registered for `op`, handing each the document and
    /// the operation outcome.
    pub(crate) fn run_post(&self, op: HookOp, doc: &Map, outcome: Option<&Error>) -> Result<()> {
        for hook in self.post.iter().filter(|h| h.op == op) {
            if hook.detached {
                let handler = hook.handler.clone();
                let snapshot = doc.clone();
                let outcome = outcome.cloned();
                dispatch_detached(Box::new(move || {
                    if let Err(error) = handler(&snapshot, outcome.as_ref()) {
                        tracing::warn!(op = %op, %error, "detached post hook failed");
                    }
                }));
            } else {
                (hook.handler)(doc, outcome)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .finish()
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

static DETACHED_WORKER: OnceLock<Mutex<mpsc::Sender<Job>>> = OnceLock::new();

/// Hand a job to the shared detached-hook worker thread. The worker is
/// started lazily on first use and lives for the rest of the process.
fn dispatch_detached(job: Job) {
    let sender = DETACHED_WORKER.get_or_init(|| {
        let (tx, rx) = mpsc::channel::<Job>();
        let spawned = std::thread::Builder::new()
            .name("docshape-hooks".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            });
        if let Err(error) = spawned {
            tracing::warn!(%error, "failed to start detached hook worker");
        }
        Mutex::new(tx)
    });

    let Ok(sender) = sender.lock() else {
        tracing::warn!("detached hook worker lock poisoned, dropping hook");
        return;
    };
    if sender.send(job).is_err() {
        tracing::warn!("detached hook worker gone, dropping hook");
    }
}
