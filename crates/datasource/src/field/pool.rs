//! Per-invocation field cache.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;

use super::Field;
use crate::error::DatasourceResult;
use crate::model::FieldId;
use crate::repository::FieldRegistry;

/// Maps field ids to resolved fields for the duration of one retrieval.
///
/// Each id is looked up at most once; ids the registry does not know are
/// remembered as missing so they are not looked up again either.
#[derive(Debug, Default)]
pub struct FieldPool {
    fields: HashMap<FieldId, Option<Arc<Field>>>,
    lookups: usize,
}

impl FieldPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolved field, if present.
    pub fn get(&self, id: FieldId) -> Option<Arc<Field>> {
        self.fields.get(&id).cloned().flatten()
    }

    /// Resolve every id not yet in the pool with one registry call.
    pub fn preload(&mut self, ids: &[FieldId], registry: &dyn FieldRegistry) -> DatasourceResult<()> {
        let mut missing: Vec<FieldId> = Vec::new();
        for id in ids {
            if !self.fields.contains_key(id) && !missing.contains(id) {
                missing.push(*id);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        let fetched = registry
            .fetch(&missing)
            .with_context(|| format!("failed to fetch fields {missing:?}"))?;
        self.lookups += 1;

        for field in fetched {
            self.fields.insert(field.id, Some(Arc::new(field)));
        }
        for id in missing {
            self.fields.entry(id).or_insert_with(|| {
                tracing::debug!(field_id = id, "field not found in registry");
                None
            });
        }
        Ok(())
    }

    /// Resolve a single field, looking it up only if it is not yet known.
    pub fn resolve(
        &mut self,
        id: FieldId,
        registry: &dyn FieldRegistry,
    ) -> DatasourceResult<Option<Arc<Field>>> {
        self.preload(&[id], registry)?;
        Ok(self.get(id))
    }

    /// Number of registry round trips made by this pool.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}
