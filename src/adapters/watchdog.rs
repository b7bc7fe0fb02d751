//! Task Watchdog Timer (TWDT) adapter.
//!
//! Resets the device if the main loop stalls.  A hung controller could
//! leave the heater running on a stale command, so the loop feeds the
//! watchdog once per iteration and the timeout is a few control periods.

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

/// Timeout as a multiple of the control interval.
pub const TIMEOUT_CONTROL_PERIODS: u32 = 10;

pub struct Watchdog {
    timeout_ms: u32,
    subscribed: bool,
    feeds: u64,
}

impl Watchdog {
    /// Timeout for a given control interval, never below 5 s.
    pub fn timeout_for(send_interval_ms: u32) -> u32 {
        send_interval_ms
            .saturating_mul(TIMEOUT_CONTROL_PERIODS)
            .max(5_000)
    }

    /// Configure the TWDT and subscribe the current task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(feature = "espidf")]
        let subscribed = unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                warn!(
                    "TWDT reconfigure returned {} (may already be configured)",
                    ret
                );
            }
            let ret = esp_task_wdt_add(core::ptr::null_mut());
            if ret != ESP_OK {
                warn!("Watchdog: failed to subscribe ({})", ret);
            }
            ret == ESP_OK
        };

        #[cfg(not(feature = "espidf"))]
        let subscribed = {
            if timeout_ms == 0 {
                warn!("Watchdog(sim): zero timeout");
            }
            true
        };

        if subscribed {
            info!("Watchdog: subscribed ({} ms timeout)", timeout_ms);
        }
        Self {
            timeout_ms,
            subscribed,
            feeds: 0,
        }
    }

    pub fn feed(&mut self) {
        if !self.subscribed {
            return;
        }
        #[cfg(feature = "espidf")]
        unsafe {
            esp_task_wdt_reset();
        }
        self.feeds += 1;
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}
