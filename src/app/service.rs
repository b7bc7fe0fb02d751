//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the mode machine, the safety guard, the fuel
//! accountant and the telemetry store.  It exposes a hardware-agnostic
//! API; all I/O flows through port traits and the [`HeaterLink`] injected
//! at call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  UART bytes ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          AppService          │
//!  AppCommand ──▶ │ Telemetry · Fuel · Safety    │ ──▶ TelemetrySink
//!                 │ Mode FSM · Predictive PI     │
//!                 └──────────────┬───────────────┘
//!                                ▼
//!                    HeaterLink (command frame)
//! ```
//!
//! ## Control tick ordering
//!
//! 1. apply a pending mode selection
//! 2. communication timeout check
//! 3. fuel accounting over the elapsed interval
//! 4. mode update (predictive PI / antifreeze / manual)
//! 5. voltage guard evaluation and override
//! 6. command frame to the link (withheld when sniffing)
//!
//! Status bytes that arrived before the tick have already been decoded by
//! [`AppService::on_bytes`], so every step sees the same telemetry.

use log::{debug, info, warn};

use crate::config::{validate_config, HeaterConfig, Setpoint};
use crate::control::HeaterCommand;
use crate::error::{Error, Result, SensorError};
use crate::fsm::context::ModeContext;
use crate::fsm::modes::build_mode_table;
use crate::fsm::{ControlMode, Fsm};
use crate::fuel::FuelAccountant;
use crate::protocol::messages::{parse_command, parse_status};
use crate::protocol::{
    Address, CommandOpcode, ControllerCommand, DecoderStats, FrameDecoder, HeaterFrame,
    HeaterLink, Transport,
};
use crate::safety::{GuardTransition, SafetyState, VoltageGuard, VoltageInput};
use crate::telemetry::{LinkChange, TelemetryStore};

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetrySnapshot};
use super::ports::{ConfigPort, EventSink, StoragePort, TelemetrySink};
use super::routes::TelemetryRoutes;

/// Config changes are persisted this long after the last change.
pub const AUTO_SAVE_DELAY_MS: u64 = 5_000;

/// Plausible range for an external temperature sensor (°C).
const EXTERNAL_TEMPERATURE_RANGE: (f32, f32) = (-50.0, 100.0);

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: ModeContext,
    guard: VoltageGuard,
    fuel: FuelAccountant,
    telemetry: TelemetryStore,
    decoder: FrameDecoder,
    /// Last external reading and when it arrived.
    external_temperature: Option<(f32, u64)>,
    pending_mode: Option<ControlMode>,
    /// Output after the safety overlay.
    commanded: HeaterCommand,
    degraded: bool,
    last_tick_ms: Option<u64>,
    tick_count: u64,
    config_dirty: bool,
    dirty_since_ms: u64,
    fuel_dirty: bool,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// An invalid configuration is replaced by the defaults.  Does **not**
    /// start the mode machine; call [`start`](Self::start) next.
    pub fn new(config: HeaterConfig) -> Self {
        let config = match validate_config(&config) {
            Ok(()) => config,
            Err(e) => {
                warn!("Invalid configuration ({e}), using defaults");
                HeaterConfig::default()
            }
        };
        let guard = VoltageGuard::new(&config);
        let fuel = FuelAccountant::new(config.injected_per_pulse_ml);
        let fsm = Fsm::new(build_mode_table(), config.control_mode);
        let ctx = ModeContext::new(config);

        Self {
            fsm,
            ctx,
            guard,
            fuel,
            telemetry: TelemetryStore::new(),
            decoder: FrameDecoder::new(),
            external_temperature: None,
            pending_mode: None,
            commanded: HeaterCommand::OFF,
            degraded: false,
            last_tick_ms: None,
            tick_count: 0,
            config_dirty: false,
            dirty_since_ms: 0,
            fuel_dirty: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter the configured initial mode.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_mode()));
        info!(
            "AppService started in {}{}",
            self.fsm.current_mode().as_str(),
            if self.ctx.config.passive_sniff {
                " (passive sniff)"
            } else {
                ""
            }
        );
    }

    // ── Inbound bytes ─────────────────────────────────────────

    /// Decode bytes read from the UART and apply every complete frame.
    /// Returns the number of frames decoded.
    pub fn on_bytes(&mut self, data: &[u8], now_ms: u64) -> usize {
        let Self {
            decoder, telemetry, ..
        } = self;
        let mut frames = 0;
        decoder.feed(data, |frame| {
            frames += 1;
            Self::apply_frame(telemetry, &frame, now_ms);
        });
        frames
    }

    fn apply_frame(telemetry: &mut TelemetryStore, frame: &HeaterFrame, now_ms: u64) {
        match frame.address {
            Address::Heater => match parse_status(frame) {
                Ok(t) => telemetry.apply(t, now_ms),
                Err(e) => debug!("status frame ignored: {e}"),
            },
            // Our own echo, or the other controller when sniffing.
            Address::Controller => match parse_command(frame) {
                Ok(cmd) => telemetry.observe_command(cmd),
                Err(e) => debug!("command frame ignored: {e}"),
            },
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle and hand the resulting command to the
    /// link.  Returns the command after the safety overlay.
    pub fn tick<T: Transport>(
        &mut self,
        now_ms: u64,
        local_day: Option<u32>,
        link: &mut HeaterLink<T>,
        sink: &mut impl EventSink,
    ) -> HeaterCommand {
        self.tick_count += 1;

        // 1. Pending mode selection
        if let Some(mode) = self.pending_mode.take() {
            let from = self.fsm.current_mode();
            if self.fsm.select(mode, &mut self.ctx) {
                sink.emit(&AppEvent::ModeChanged { from, to: mode });
            }
        }

        // 2. Link health
        match self.telemetry.check_link(now_ms) {
            Some(LinkChange::Lost) => sink.emit(&AppEvent::LinkLost),
            Some(LinkChange::Restored) => sink.emit(&AppEvent::LinkRestored),
            None => {}
        }

        // 3. Fuel
        let elapsed_s = self
            .last_tick_ms
            .map_or(0.0, |last| now_ms.saturating_sub(last) as f32 / 1000.0);
        self.last_tick_ms = Some(now_ms);
        if self.fuel.roll_day(local_day) {
            self.fuel_dirty = true;
            sink.emit(&AppEvent::ConsumptionReset {
                total: false,
                daily: true,
            });
        }
        self.fuel
            .accumulate(self.telemetry.pump_frequency_hz(now_ms), elapsed_s);

        // 4. Mode update
        self.ctx.now_ms = now_ms;
        self.ctx.temperature_c = self.temperature_input(now_ms);
        let requested = self.fsm.tick(&mut self.ctx);
        let degraded = self.is_degraded();
        if degraded != self.degraded {
            if degraded {
                warn!("{}, control degraded", Error::from(SensorError::TemperatureUnavailable));
            } else {
                info!("Temperature input restored");
            }
            self.degraded = degraded;
        }

        // 5. Voltage guard
        let heater = self.telemetry.fresh(now_ms).copied();
        let input = heater.map(|t| VoltageInput {
            voltage: t.input_voltage,
            running: t.run_state.is_active(),
            starting: requested.on && !t.run_state.is_active(),
        });
        match self.guard.evaluate(input, now_ms) {
            Some(GuardTransition::Tripped(fault)) => sink.emit(&AppEvent::FaultDetected(fault)),
            Some(GuardTransition::Cleared) => sink.emit(&AppEvent::FaultCleared),
            None => {}
        }
        self.commanded = if self.guard.is_fault() {
            HeaterCommand::OFF
        } else {
            requested
        };

        // 6. Transmit
        let opcode = CommandOpcode::for_command(self.commanded, heater.map(|t| t.run_state));
        let frame = ControllerCommand::new(
            opcode,
            self.commanded,
            self.ctx.config.target_temperature_c,
        );
        link.send(&frame);

        self.commanded
    }

    /// Emit a telemetry snapshot and persist the fuel counters.
    pub fn publish(
        &mut self,
        now_ms: u64,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        sink.emit(&AppEvent::Telemetry(self.snapshot(now_ms)));
        self.save_fuel(storage);
    }

    /// Push every routed field to the host's telemetry sink.
    pub fn publish_routes(
        &self,
        now_ms: u64,
        routes: &TelemetryRoutes,
        sink: &mut impl TelemetrySink,
    ) {
        routes.publish(&self.snapshot(now_ms), sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a host request.  Rejections are logged, emitted as
    /// [`AppEvent::CommandRejected`] and returned; prior values are kept.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let result = self.apply_command(cmd, now_ms, sink);
        if let Err(e) = result {
            warn!("Command rejected: {e}");
            sink.emit(&AppEvent::CommandRejected(e));
        }
        result
    }

    fn apply_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            AppCommand::SelectMode(mode) => {
                info!("Mode {} requested", mode.as_str());
                self.pending_mode = Some(mode);
            }
            AppCommand::SetManualPower(percent) => {
                if !(10.0..=100.0).contains(&percent) {
                    return Err(Error::Config("manual power must be 10–100"));
                }
                if self.effective_mode() != ControlMode::Manual {
                    return Err(Error::Config("power level only applies in Manual mode"));
                }
                info!("Manual power {percent:.0}%");
                self.ctx.manual_power_percent = percent;
            }
            AppCommand::SetSetpoint(setpoint, value) => {
                let before = setpoint.get(&self.ctx.config);
                setpoint.apply(&mut self.ctx.config, value)?;
                self.sync_components();
                if (before - value).abs() > f32::EPSILON {
                    info!("{setpoint:?}: {before} -> {value}");
                    self.mark_config_dirty(now_ms);
                    sink.emit(&AppEvent::SetpointChanged { setpoint, value });
                }
            }
            AppCommand::SetPowerSwitch(on) => {
                if on != self.ctx.power_switch {
                    info!("Power switch {}", if on { "on" } else { "off" });
                }
                self.ctx.power_switch = on;
            }
            AppCommand::ResetTotalConsumption => {
                self.fuel.reset_total();
                self.fuel_dirty = true;
                sink.emit(&AppEvent::ConsumptionReset {
                    total: true,
                    daily: false,
                });
            }
            AppCommand::ResetDailyConsumption => {
                self.fuel.reset_daily();
                self.fuel_dirty = true;
                sink.emit(&AppEvent::ConsumptionReset {
                    total: false,
                    daily: true,
                });
            }
            AppCommand::ExternalTemperature(reading) => {
                let (lo, hi) = EXTERNAL_TEMPERATURE_RANGE;
                self.external_temperature = match reading {
                    Some(t) if t.is_finite() && (lo..=hi).contains(&t) => Some((t, now_ms)),
                    Some(t) => {
                        debug!("External temperature {t} implausible, ignored");
                        None
                    }
                    None => None,
                };
            }
            AppCommand::UpdateConfig(config) => {
                validate_config(&config)?;
                if config.passive_sniff != self.ctx.config.passive_sniff {
                    warn!("passive_sniff change takes effect after restart");
                }
                self.ctx.config = config;
                self.sync_components();
                self.mark_config_dirty(now_ms);
                info!("Configuration updated at runtime");
            }
            AppCommand::SaveConfig => {
                self.config_dirty = true;
                self.dirty_since_ms = now_ms.saturating_sub(AUTO_SAVE_DELAY_MS);
                info!("Explicit config save requested");
            }
        }
        Ok(())
    }

    /// Current value of a setting.
    pub fn get_value(&self, setpoint: Setpoint) -> f32 {
        setpoint.get(&self.ctx.config)
    }

    /// Change a setting; shorthand for [`AppCommand::SetSetpoint`].
    pub fn set_value(
        &mut self,
        setpoint: Setpoint,
        value: f32,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.handle_command(AppCommand::SetSetpoint(setpoint, value), now_ms, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a snapshot of every exposed value.
    pub fn snapshot(&self, now_ms: u64) -> TelemetrySnapshot {
        let heater = self.telemetry.latest().copied();
        TelemetrySnapshot {
            mode: self.fsm.current_mode(),
            connected: self.telemetry.is_connected(now_ms),
            heater,
            state_duration_s: self.telemetry.state_duration_s(now_ms),
            cooling_down: self.telemetry.cooling_down(),
            low_voltage_fault: heater.is_some_and(|t| t.low_voltage_fault)
                || self.guard.is_fault(),
            consumption: self.fuel.counters(),
            controller: self.ctx.controller.outputs(),
            temperature_c: self.ctx.temperature_c,
            commanded: self.commanded,
            power_switch: self.ctx.power_switch,
            safety: self.safety_state(),
            degraded: self.is_degraded(),
            passive_sniff: self.ctx.config.passive_sniff,
        }
    }

    pub fn safety_state(&self) -> SafetyState {
        SafetyState {
            voltage_ok: !self.guard.is_fault(),
            antifreeze_band: self.ctx.antifreeze.band(),
        }
    }

    /// The active control law is running on held or fallback output.
    pub fn is_degraded(&self) -> bool {
        match self.fsm.current_mode() {
            ControlMode::Manual => false,
            ControlMode::Automatic => self.ctx.controller.is_degraded(),
            ControlMode::Antifreeze => self.ctx.antifreeze.is_degraded(),
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.fsm.current_mode()
    }

    /// Mode that will be active after the next tick.
    pub fn effective_mode(&self) -> ControlMode {
        self.pending_mode.unwrap_or_else(|| self.fsm.current_mode())
    }

    /// Command after the safety overlay, as of the last tick.
    pub fn commanded(&self) -> HeaterCommand {
        self.commanded
    }

    /// Command the active mode asked for, before the safety overlay.
    pub fn requested(&self) -> HeaterCommand {
        self.ctx.requested
    }

    pub fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &HeaterConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// External sample while fresh, else the heat-exchanger reading while
    /// the link is up.
    fn temperature_input(&self, now_ms: u64) -> Option<f32> {
        let max_age_ms = (self.ctx.config.external_temperature_max_age_s * 1000.0) as u64;
        if let Some((t, at)) = self.external_temperature {
            if now_ms.saturating_sub(at) <= max_age_ms {
                return Some(t);
            }
        }
        self.telemetry
            .fresh(now_ms)
            .map(|t| t.heat_exchanger_temperature_c)
    }

    fn sync_components(&mut self) {
        self.guard.update_thresholds(&self.ctx.config);
        self.fuel
            .set_injected_per_pulse(self.ctx.config.injected_per_pulse_ml);
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified; restarts the auto-save delay.
    pub fn mark_config_dirty(&mut self, now_ms: u64) {
        self.config_dirty = true;
        self.dirty_since_ms = now_ms;
    }

    /// Save once [`AUTO_SAVE_DELAY_MS`] have passed since the last change.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if now_ms.saturating_sub(self.dirty_since_ms) < AUTO_SAVE_DELAY_MS {
            return false;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty (call before a controlled restart).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config force-saved");
            }
            Err(e) => {
                warn!("Config force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Fuel persistence ──────────────────────────────────────

    /// Restore fuel counters saved by a previous run.
    pub fn load_fuel(&mut self, storage: &impl StoragePort) {
        match self.fuel.load(storage) {
            Ok(true) => {}
            Ok(false) => info!("No stored fuel counters, starting from zero"),
            Err(e) => warn!("Fuel counters not restored: {e}"),
        }
    }

    pub fn save_fuel(&mut self, storage: &mut impl StoragePort) {
        match self.fuel.save(storage) {
            Ok(()) => self.fuel_dirty = false,
            Err(e) => warn!("Fuel counters not saved: {e}"),
        }
    }

    /// Persist counters right after a reset or day rollover.
    pub fn save_fuel_if_dirty(&mut self, storage: &mut impl StoragePort) {
        if self.fuel_dirty {
            self.save_fuel(storage);
        }
    }
}
