use crate::model::{Confirmation, Driver, OptimisticPatch, PatchMap, Vehicle};
use crate::selectors::{merge_drivers, merge_vehicles};

/// Authoritative drivers/vehicles plus the optimistic patch map.
///
/// Pure state: every mutation is a named operation and nothing here talks to
/// the network or owns a timer.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationStore {
    drivers: Vec<Driver>,
    vehicles: Vec<Vehicle>,
    /// Last vehicle list received from the feed, applied or not.
    feed_vehicles: Vec<Vehicle>,
    /// `feed_vehicles` is newer than `vehicles` and waits for the patch map
    /// to drain.
    feed_deferred: bool,
    optimistic: PatchMap,
}

impl ReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn feed_vehicles(&self) -> &[Vehicle] {
        &self.feed_vehicles
    }

    pub fn optimistic(&self) -> &PatchMap {
        &self.optimistic
    }

    pub fn patch(&self, driver_id: &str) -> Option<&OptimisticPatch> {
        self.optimistic.get(driver_id)
    }

    /// True while any action is unconfirmed.
    pub fn has_pending(&self) -> bool {
        !self.optimistic.is_empty()
    }

    /// Replace the driver list with an authoritative fetch.
    pub fn set_drivers(&mut self, drivers: Vec<Driver>) {
        self.drivers = drivers;
    }

    /// Replace the vehicle list with authoritative data.
    pub fn set_vehicles(&mut self, vehicles: Vec<Vehicle>) {
        self.vehicles = vehicles;
        self.feed_deferred = false;
    }

    /// Record a feed snapshot. The authoritative vehicle list is only
    /// overwritten when no patch is outstanding, so an in-flight action is
    /// never visibly reverted. A withheld snapshot is applied as soon as the
    /// last patch is cleared. Returns whether the overwrite happened.
    pub fn apply_feed_vehicles(&mut self, vehicles: Vec<Vehicle>) -> bool {
        if self.has_pending() {
            self.feed_vehicles = vehicles;
            self.feed_deferred = true;
            false
        } else {
            self.feed_vehicles = vehicles.clone();
            self.vehicles = vehicles;
            self.feed_deferred = false;
            true
        }
    }

    /// True while a withheld feed snapshot is waiting to be applied.
    pub fn has_deferred_feed(&self) -> bool {
        self.feed_deferred
    }

    /// Merge `update` into the driver's patch, creating it if absent.
    ///
    /// The stored value is replaced, never edited in place. A merge that
    /// ends up with no fields removes the entry instead of storing it empty.
    pub fn set_optimistic(&mut self, driver_id: &str, update: OptimisticPatch) {
        let merged = match self.optimistic.get(driver_id) {
            Some(existing) => existing.merged(&update),
            None => update,
        };
        if merged.is_empty() {
            self.optimistic.remove(driver_id);
        } else {
            self.optimistic.insert(driver_id.to_string(), merged);
        }
    }

    /// Drop the driver's patch unconditionally. Returns whether one existed.
    pub fn clear_optimistic(&mut self, driver_id: &str) -> bool {
        let removed = self.optimistic.remove(driver_id).is_some();
        self.promote_deferred_feed();
        removed
    }

    /// Drop every patch. Returns how many were removed.
    pub fn clear_all_optimistic(&mut self) -> usize {
        let removed = self.optimistic.len();
        self.optimistic.clear();
        self.promote_deferred_feed();
        removed
    }

    /// Retire patches that the given confirmations fully agree with.
    ///
    /// A patch survives if any of its fields is missing from, or differs
    /// from, its confirmation. Running the same list twice is a no-op the
    /// second time. Returns how many patches were removed.
    pub fn clear_confirmed_optimistic(&mut self, confirmations: &[Confirmation]) -> usize {
        let mut removed = 0;
        for confirmation in confirmations {
            let confirmed = self
                .optimistic
                .get(&confirmation.driver_id)
                .is_some_and(|patch| patch.is_confirmed_by(confirmation));
            if confirmed {
                self.optimistic.remove(&confirmation.driver_id);
                removed += 1;
            }
        }
        self.promote_deferred_feed();
        removed
    }

    /// Once nothing is pending, the withheld snapshot replaces the vehicle
    /// rows so the merged view lands on confirmed data instead of the rows
    /// from before the action.
    fn promote_deferred_feed(&mut self) {
        if self.feed_deferred && !self.has_pending() {
            self.vehicles = self.feed_vehicles.clone();
            self.feed_deferred = false;
        }
    }

    pub fn merged_drivers(&self) -> Vec<Driver> {
        merge_drivers(&self.drivers, &self.vehicles, &self.optimistic)
    }

    pub fn merged_vehicles(&self) -> Vec<Vehicle> {
        merge_vehicles(&self.vehicles, &self.drivers, &self.optimistic)
    }
}
