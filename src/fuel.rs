//! Fuel consumption estimate.
//!
//! The heater does not meter fuel; the estimate integrates the reported
//! pump pulse rate times the configured volume per pulse:
//!
//! ```text
//!   rate  [ml/h] = pump_hz × injected_per_pulse_ml × 3600
//!   Δvol  [ml]   = pump_hz × injected_per_pulse_ml × Δt
//! ```
//!
//! Daily and total counters only grow, except on an explicit reset or a
//! local-day rollover (daily only).  Both are persisted as a postcard blob.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};

const FUEL_NAMESPACE: &str = "fuel";
const FUEL_KEY: &str = "counters";

/// Persisted counter state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FuelRecord {
    pub daily_ml: f64,
    pub total_ml: f64,
    /// Local day the daily counter belongs to.
    pub last_day: Option<u32>,
}

/// Current consumption figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConsumptionCounters {
    pub hourly_ml_per_h: f64,
    pub daily_ml: f64,
    pub total_ml: f64,
}

pub struct FuelAccountant {
    injected_per_pulse_ml: f64,
    hourly_ml_per_h: f64,
    daily_ml: f64,
    total_ml: f64,
    current_day: Option<u32>,
}

impl FuelAccountant {
    pub fn new(injected_per_pulse_ml: f32) -> Self {
        Self {
            injected_per_pulse_ml: f64::from(injected_per_pulse_ml),
            hourly_ml_per_h: 0.0,
            daily_ml: 0.0,
            total_ml: 0.0,
            current_day: None,
        }
    }

    pub fn set_injected_per_pulse(&mut self, ml: f32) {
        self.injected_per_pulse_ml = f64::from(ml);
    }

    /// Integrate `pump_hz` over `elapsed_s` seconds.
    ///
    /// Non-finite or negative inputs contribute nothing.
    pub fn accumulate(&mut self, pump_hz: f32, elapsed_s: f32) {
        let hz = if pump_hz.is_finite() && pump_hz > 0.0 {
            f64::from(pump_hz)
        } else {
            0.0
        };
        self.hourly_ml_per_h = hz * self.injected_per_pulse_ml * 3600.0;

        if !(elapsed_s.is_finite() && elapsed_s > 0.0) {
            return;
        }
        let delta = hz * self.injected_per_pulse_ml * f64::from(elapsed_s);
        self.daily_ml += delta;
        self.total_ml += delta;
    }

    /// Zero the lifetime total.  The daily counter is kept.
    pub fn reset_total(&mut self) {
        info!("fuel: total reset (was {:.1} ml)", self.total_ml);
        self.total_ml = 0.0;
    }

    pub fn reset_daily(&mut self) {
        info!("fuel: daily reset (was {:.1} ml)", self.daily_ml);
        self.daily_ml = 0.0;
    }

    /// Zero the daily counter when the local day changes.
    ///
    /// Without a wall clock (`None`) nothing happens.  Returns `true` when
    /// the counter was rolled over.
    pub fn roll_day(&mut self, day: Option<u32>) -> bool {
        let Some(day) = day else {
            return false;
        };
        match self.current_day {
            Some(current) if current == day => false,
            Some(_) => {
                info!("fuel: new day {day}, daily was {:.1} ml", self.daily_ml);
                self.daily_ml = 0.0;
                self.current_day = Some(day);
                true
            }
            None => {
                self.current_day = Some(day);
                false
            }
        }
    }

    pub fn counters(&self) -> ConsumptionCounters {
        ConsumptionCounters {
            hourly_ml_per_h: self.hourly_ml_per_h,
            daily_ml: self.daily_ml,
            total_ml: self.total_ml,
        }
    }

    pub fn record(&self) -> FuelRecord {
        FuelRecord {
            daily_ml: self.daily_ml,
            total_ml: self.total_ml,
            last_day: self.current_day,
        }
    }

    pub fn restore(&mut self, record: FuelRecord) {
        let clean = |v: f64| if v.is_finite() && v >= 0.0 { v } else { 0.0 };
        self.daily_ml = clean(record.daily_ml);
        self.total_ml = clean(record.total_ml);
        self.current_day = record.last_day;
    }

    // ── Persistence ───────────────────────────────────────────

    /// Restore counters from storage.  Returns `false` on first boot.
    pub fn load(&mut self, storage: &impl StoragePort) -> Result<bool, StorageError> {
        if !storage.exists(FUEL_NAMESPACE, FUEL_KEY) {
            return Ok(false);
        }
        let mut buf = [0u8; 64];
        let n = storage.read(FUEL_NAMESPACE, FUEL_KEY, &mut buf)?;
        let record: FuelRecord = postcard::from_bytes(&buf[..n]).map_err(|e| {
            warn!("fuel: stored counters unreadable: {e}");
            StorageError::Corrupted
        })?;
        self.restore(record);
        info!(
            "fuel: restored daily {:.1} ml, total {:.1} ml",
            self.daily_ml, self.total_ml
        );
        Ok(true)
    }

    pub fn save(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(&self.record()).map_err(|_| StorageError::IoError)?;
        storage.write(FUEL_NAMESPACE, FUEL_KEY, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStore(HashMap<String, Vec<u8>>);

    impl StoragePort for MemStore {
        fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
            let v = self.0.get(&format!("{ns}/{key}")).ok_or(StorageError::NotFound)?;
            buf[..v.len()].copy_from_slice(v);
            Ok(v.len())
        }
        fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
            self.0.insert(format!("{ns}/{key}"), data.to_vec());
            Ok(())
        }
        fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
            self.0.remove(&format!("{ns}/{key}"));
            Ok(())
        }
        fn exists(&self, ns: &str, key: &str) -> bool {
            self.0.contains_key(&format!("{ns}/{key}"))
        }
    }

    #[test]
    fn one_hour_at_two_hertz() {
        let mut f = FuelAccountant::new(0.022);
        f.accumulate(2.0, 3600.0);
        let c = f.counters();
        assert!((c.hourly_ml_per_h - 158.4).abs() < 1e-3);
        assert!((c.daily_ml - 158.4).abs() < 1e-3);
        assert!((c.total_ml - 158.4).abs() < 1e-3);
    }

    #[test]
    fn reset_total_keeps_daily_and_rate() {
        let mut f = FuelAccountant::new(0.022);
        f.accumulate(2.0, 3600.0);
        f.reset_total();
        let c = f.counters();
        assert_eq!(c.total_ml, 0.0);
        assert!(c.daily_ml > 150.0);
        assert!(c.hourly_ml_per_h > 150.0);
    }

    #[test]
    fn bad_inputs_never_decrease_counters() {
        let mut f = FuelAccountant::new(0.022);
        f.accumulate(2.0, 10.0);
        let before = f.counters();
        f.accumulate(-5.0, 10.0);
        f.accumulate(f32::NAN, 10.0);
        f.accumulate(2.0, -3.0);
        assert_eq!(f.counters().total_ml, before.total_ml);
        assert_eq!(f.counters().daily_ml, before.daily_ml);
    }

    #[test]
    fn day_rollover() {
        let mut f = FuelAccountant::new(0.022);
        assert!(!f.roll_day(None));
        assert!(!f.roll_day(Some(100)));
        f.accumulate(1.0, 100.0);
        assert!(!f.roll_day(Some(100)));
        assert!(!f.roll_day(None));
        assert!(f.counters().daily_ml > 0.0);
        assert!(f.roll_day(Some(101)));
        assert_eq!(f.counters().daily_ml, 0.0);
        assert!(f.counters().total_ml > 0.0);
    }

    #[test]
    fn persists_through_storage() {
        let mut store = MemStore::default();
        let mut f = FuelAccountant::new(0.022);
        assert!(!f.load(&store).unwrap());

        f.roll_day(Some(7));
        f.accumulate(2.0, 600.0);
        f.save(&mut store).unwrap();

        let mut g = FuelAccountant::new(0.022);
        assert!(g.load(&store).unwrap());
        assert_eq!(g.record(), f.record());
    }

    #[test]
    fn corrupt_blob_reported() {
        let mut store = MemStore::default();
        store.write(FUEL_NAMESPACE, FUEL_KEY, &[0xFF; 3]).unwrap();
        let mut f = FuelAccountant::new(0.022);
        assert_eq!(f.load(&store), Err(StorageError::Corrupted));
    }
}
