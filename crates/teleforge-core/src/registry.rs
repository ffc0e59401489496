//! The endpoint-to-handler table.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::handler::{HandlerFn, MiddlewareFn};

struct Entry {
    handler: HandlerFn,
    middleware: Vec<MiddlewareFn>,
}

/// Maps endpoints (commands, category markers, callback uniques) to their
/// handlers and per-handler middleware.
///
/// Registration happens during setup; dispatch reads dominate afterwards,
/// so the table sits behind a read/write lock rather than a mutex.
#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry::default()
    }

    /// Installs `handler` for `endpoint`. A later registration for the same
    /// endpoint replaces the earlier one.
    pub(crate) fn register(
        &self,
        endpoint: String,
        handler: HandlerFn,
        middleware: Vec<MiddlewareFn>,
    ) {
        self.entries.write().insert(endpoint, Entry { handler, middleware });
    }

    /// Fetches the handler and middleware chain for `endpoint`, cloning the
    /// shared function pointers out so dispatch never holds the lock across
    /// an await point.
    pub(crate) fn lookup(&self, endpoint: &str) -> Option<(HandlerFn, Vec<MiddlewareFn>)> {
        let entries = self.entries.read();
        let entry = entries.get(endpoint)?;
        Some((entry.handler.clone(), entry.middleware.clone()))
    }

    pub(crate) fn contains(&self, endpoint: &str) -> bool {
        self.entries.read().contains_key(endpoint)
    }
}
