//! Entries-built hooks.
//!
//! Hooks run after a page of entries is fetched and before it is rendered.
//! They may reorder, drop or rewrite the records in place.

use crate::config::DatasourceConfig;
use crate::filter::FilterSpec;
use crate::model::Entry;

/// Context tag passed to hooks during front-end rendering.
pub const FRONTEND_CONTEXT: &str = "/frontend/";

/// Receives freshly fetched entries.
pub trait EntriesBuiltHook: Send + Sync {
    /// Called once per execution with the fetched records.
    fn entries_built(
        &self,
        context: &str,
        datasource: &DatasourceConfig,
        records: &mut Vec<Entry>,
        filters: &FilterSpec,
    );
}

/// Ordered set of entries-built hooks.
#[derive(Default)]
pub struct HookRegistry {
    /// Hooks in registration order, with a name for diagnostics.
    hooks: Vec<(String, Box<dyn EntriesBuiltHook>)>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook. Hooks run in registration order.
    pub fn register(&mut self, name: &str, hook: Box<dyn EntriesBuiltHook>) {
        tracing::debug!(hook = name, "registered entries-built hook");
        self.hooks.push((name.to_string(), hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Notify every hook in order.
    pub fn notify(
        &self,
        context: &str,
        datasource: &DatasourceConfig,
        records: &mut Vec<Entry>,
        filters: &FilterSpec,
    ) {
        for (name, hook) in &self.hooks {
            tracing::trace!(hook = %name, context, records = records.len(), "entries built");
            hook.entries_built(context, datasource, records, filters);
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}
