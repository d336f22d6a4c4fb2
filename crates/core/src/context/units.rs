//! Cached unit master list.

use moka::sync::Cache;
use pagu_shared::types::UnitId;
use std::sync::Arc;
use std::time::Duration;

use crate::context::settings::Unit;
use crate::store::{ProposalStore, StoreResult};

/// Default time-to-live of cached units (120 minutes).
pub const DEFAULT_TTL_SECS: u64 = 7200;

/// Default cache capacity (number of units).
const DEFAULT_CAPACITY: u64 = 10_000;

/// Read-through cache of units in front of the store.
///
/// Writes that change a unit must call [`UnitDirectory::invalidate`].
#[derive(Clone)]
pub struct UnitDirectory {
    by_id: Cache<UnitId, Unit>,
    all: Cache<(), Arc<Vec<Unit>>>,
}

impl UnitDirectory {
    /// Creates a directory whose entries expire after `ttl_secs`.
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        Self {
            by_id: Cache::builder()
                .max_capacity(DEFAULT_CAPACITY)
                .time_to_live(ttl)
                .build(),
            all: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Looks a unit up, reading through to the store on a miss.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, store: &dyn ProposalStore, id: &UnitId) -> StoreResult<Option<Unit>> {
        if let Some(unit) = self.by_id.get(id) {
            return Ok(Some(unit));
        }
        let unit = store.get_unit(id).await?;
        if let Some(unit) = &unit {
            self.by_id.insert(id.clone(), unit.clone());
        }
        Ok(unit)
    }

    /// Every unit, cached as one list.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, store: &dyn ProposalStore) -> StoreResult<Arc<Vec<Unit>>> {
        if let Some(units) = self.all.get(&()) {
            return Ok(units);
        }
        let units = Arc::new(store.list_units().await?);
        for unit in units.iter() {
            self.by_id.insert(unit.id.clone(), unit.clone());
        }
        self.all.insert((), Arc::clone(&units));
        Ok(units)
    }

    /// Drops one unit and the cached list.
    pub fn invalidate(&self, id: &UnitId) {
        self.by_id.invalidate(id);
        self.all.invalidate_all();
    }

    /// Drops everything.
    pub fn invalidate_all(&self) {
        self.by_id.invalidate_all();
        self.all.invalidate_all();
    }
}

impl Default for UnitDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}
