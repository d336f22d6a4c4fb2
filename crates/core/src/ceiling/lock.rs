//! Per-unit serialization of ceiling-checked writes.
//!
//! A ceiling check reads the unit's active Initial total and then writes.
//! Holding the unit's lock across both keeps two concurrent submissions from
//! passing the check together.

use pagu_shared::types::UnitId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held for the duration of one ceiling-checked write.
pub type CeilingPermit = OwnedMutexGuard<()>;

/// One async lock per unit, created on first use.
#[derive(Debug, Default)]
pub struct CeilingLocks {
    units: Mutex<HashMap<UnitId, Arc<AsyncMutex<()>>>>,
}

impl CeilingLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `unit`'s ceiling.
    pub async fn acquire(&self, unit: &UnitId) -> CeilingPermit {
        let lock = {
            let mut units = self.units.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(units.entry(unit.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_unit_is_exclusive() {
        let locks = CeilingLocks::new();
        let unit = UnitId::parse("U1").unwrap();

        let held = locks.acquire(&unit).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire(&unit)).await;
        assert!(second.is_err());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(20), locks.acquire(&unit)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_units_do_not_contend() {
        let locks = CeilingLocks::new();
        let _u1 = locks.acquire(&UnitId::parse("U1").unwrap()).await;
        let other = tokio::time::timeout(
            Duration::from_millis(20),
            locks.acquire(&UnitId::parse("U2").unwrap()),
        )
        .await;
        assert!(other.is_ok());
    }
}
