//! ESP32 clock adapter.
//!
//! Implements [`ClockPort`] for the heater controller.
//!
//! - **`feature = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic) and
//!   reads the local calendar day from the SNTP-synchronised system clock.
//! - **otherwise**: uses `std::time::Instant` for host-side testing and
//!   simulation; no wall clock is reported.

use crate::app::ports::ClockPort;

/// Clock adapter for the ESP32 platform.
pub struct Esp32Clock {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32Clock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(feature = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(feature = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Local calendar date as `(year, month 1-12, day 1-31)`.  `None` if the
    /// wall clock is not synced (e.g. pre-SNTP).
    #[cfg(feature = "espidf")]
    fn local_date(&self) -> Option<(i32, u32, u32)> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01)
        const EPOCH_2020: i64 = 1_577_836_800;
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        Some((tm.tm_year + 1900, (tm.tm_mon + 1) as u32, tm.tm_mday as u32))
    }

    /// On non-ESP targets (simulation) there is no wall clock.
    #[cfg(not(feature = "espidf"))]
    fn local_date(&self) -> Option<(i32, u32, u32)> {
        None
    }
}

impl ClockPort for Esp32Clock {
    fn monotonic_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    fn local_day(&self) -> Option<u32> {
        let (y, m, d) = self.local_date()?;
        days_from_civil(y, m, d)
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
///
/// `None` for dates before the epoch or out-of-range fields.
pub fn days_from_civil(year: i32, month: u32, day: u32) -> Option<u32> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let y = i64::from(if month <= 2 { year - 1 } else { year });
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146_097 + doe - 719_468;
    u32::try_from(days).ok()
}
