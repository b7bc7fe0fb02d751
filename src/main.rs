//! Sunster Heater Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartTransport   LogEventSink    NvsAdapter     Esp32Clock     │
//! │  (Transport)     (EventSink)     (Config+NVS)   (ClockPort)    │
//! │  Watchdog        LogTelemetrySink                              │
//! │                  (TelemetrySink)                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Mode FSM · Predictive PI · Voltage guard · Fuel       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) · HeaterLink (sole UART writer)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use sunster::adapters::log_sink::{LogEventSink, LogTelemetrySink};
use sunster::adapters::nvs::NvsAdapter;
use sunster::adapters::time::Esp32Clock;
use sunster::adapters::uart::UartTransport;
use sunster::adapters::watchdog::Watchdog;
use sunster::app::ports::{ClockPort, ConfigPort, PollTask, SchedulerDelegate};
use sunster::app::routes::TelemetryRoutes;
use sunster::app::service::AppService;
use sunster::config::HeaterConfig;
use sunster::protocol::HeaterLink;
use sunster::scheduler::Scheduler;

/// Main loop period.  Short enough to drain the UART FIFO between frames.
const LOOP_PERIOD_MS: u32 = 20;

// ── Scheduler delegate ────────────────────────────────────────
//
// The scheduler knows nothing about the service; this delegate latches
// which tasks are due and the loop body runs them in cycle order.

#[derive(Default)]
struct DueTasks {
    control: bool,
    publish: bool,
}

impl SchedulerDelegate for DueTasks {
    fn on_schedule_fired(&mut self, _label: &str, task: PollTask) {
        match task {
            PollTask::Control => self.control = true,
            PollTask::Publish => self.publish = true,
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Sunster heater v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = NvsAdapter::new()?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            HeaterConfig::default()
        }
    };

    // ── 3. Construct adapters ─────────────────────────────────
    let clock = Esp32Clock::new();
    let uart = UartTransport::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio16,
    )?;
    let mut link = HeaterLink::new(uart, config.passive_sniff);
    let mut log_sink = LogEventSink::new();
    let mut entities = LogTelemetrySink::new();
    let routes = TelemetryRoutes::all_fields();
    let mut watchdog = Watchdog::new(Watchdog::timeout_for(config.send_interval_ms));

    let mut sched = Scheduler::for_config(&config);
    let mut due = DueTasks::default();

    // ── 4. Construct app service ──────────────────────────────
    let mut app = AppService::new(config);
    app.load_fuel(&nvs);
    app.start(&mut log_sink);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    let mut rx_buf = [0u8; 128];
    let mut intervals = (app.config().send_interval_ms, app.config().polling_interval_ms);

    loop {
        let now_ms = clock.monotonic_ms();

        // Status bytes are applied before any tick computes a command.
        loop {
            let n = link.receive(&mut rx_buf);
            if n == 0 {
                break;
            }
            app.on_bytes(&rx_buf[..n], now_ms);
        }

        sched.tick(now_ms, &mut due);

        if core::mem::take(&mut due.control) {
            app.tick(now_ms, clock.local_day(), &mut link, &mut log_sink);
        }
        if core::mem::take(&mut due.publish) {
            app.publish(now_ms, &mut nvs, &mut log_sink);
            app.publish_routes(now_ms, &routes, &mut entities);
        }

        // Follow runtime interval changes.
        let current = (app.config().send_interval_ms, app.config().polling_interval_ms);
        if current != intervals {
            sched.set_interval(PollTask::Control, current.0);
            sched.set_interval(PollTask::Publish, current.1);
            intervals = current;
        }

        // Config auto-save (5 s debounce after last change).
        app.auto_save_if_needed(now_ms, &nvs);
        app.save_fuel_if_dirty(&mut nvs);

        watchdog.feed();
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
