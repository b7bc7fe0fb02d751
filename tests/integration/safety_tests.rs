//! Voltage guard end to end: the override wins over every mode and only
//! lets go after the recovery debounce.

use crate::mock_bus::{drain, status, status_bytes, EventLog, MockBus};

use sunster::app::commands::AppCommand;
use sunster::app::events::AppEvent;
use sunster::app::service::AppService;
use sunster::config::HeaterConfig;
use sunster::control::HeaterCommand;
use sunster::error::SafetyFault;
use sunster::fsm::ControlMode;
use sunster::protocol::messages::HeaterState;
use sunster::protocol::{CommandOpcode, HeaterLink};

struct Rig {
    app: AppService,
    link: HeaterLink<MockBus>,
    log: EventLog,
}

impl Rig {
    fn new(mode: ControlMode) -> Self {
        let mut app = AppService::new(HeaterConfig {
            control_mode: mode,
            ..Default::default()
        });
        let mut log = EventLog::new();
        app.start(&mut log);
        Self {
            app,
            link: HeaterLink::new(MockBus::new(), false),
            log,
        }
    }

    /// One main-loop pass: heater reports, controller ticks.
    fn step(&mut self, now_ms: u64, state: HeaterState, voltage_dv: u16) -> HeaterCommand {
        // Cold cabin so every mode wants heat.
        self.app
            .handle_command(AppCommand::ExternalTemperature(Some(1.0)), now_ms, &mut self.log)
            .unwrap();
        self.link
            .transport_mut()
            .inject(&status_bytes(state, voltage_dv));
        drain(&mut self.app, &mut self.link, now_ms);
        self.app.tick(now_ms, None, &mut self.link, &mut self.log)
    }

    fn faults(&self) -> usize {
        self.log
            .count(|e| matches!(e, AppEvent::FaultDetected(SafetyFault::LowVoltage)))
    }

    fn clears(&self) -> usize {
        self.log.count(|e| matches!(e, AppEvent::FaultCleared))
    }
}

#[test]
fn low_voltage_overrides_every_mode_and_recovers() {
    for mode in ControlMode::ALL {
        let mut rig = Rig::new(mode);

        let cmd = rig.step(0, HeaterState::StableCombustion, 126);
        assert!(cmd.on, "{mode:?} should want heat");

        // Sag below min_voltage_operate while running.
        let cmd = rig.step(1_000, HeaterState::StableCombustion, 110);
        assert_eq!(cmd, HeaterCommand::OFF, "{mode:?} not overridden");
        assert_eq!(rig.faults(), 1);
        assert_eq!(
            rig.link.transport().last_opcode(),
            Some(CommandOpcode::Stop as u8)
        );
        assert!(rig.app.requested().on, "{mode:?} request must survive");

        let snap = rig.app.snapshot(1_000);
        assert!(snap.low_voltage_fault);
        assert!(!snap.safety.voltage_ok);

        // Healthy again from 2 s; released only after 10 s of it.
        for t in (2_000..12_000).step_by(1_000) {
            let cmd = rig.step(t, HeaterState::StableCombustion, 125);
            assert_eq!(cmd, HeaterCommand::OFF, "{mode:?} released early at {t}");
        }
        let cmd = rig.step(12_000, HeaterState::StableCombustion, 125);
        assert!(cmd.on, "{mode:?} not released");
        assert_eq!(rig.clears(), 1);
        assert!(rig.app.safety_state().voltage_ok);
    }
}

#[test]
fn dip_during_recovery_restarts_debounce() {
    let mut rig = Rig::new(ControlMode::Manual);
    rig.step(0, HeaterState::StableCombustion, 110);
    assert_eq!(rig.faults(), 1);

    for t in (1_000..=6_000).step_by(1_000) {
        rig.step(t, HeaterState::StableCombustion, 125);
    }
    // Below min_voltage_start but above min_voltage_operate.
    rig.step(7_000, HeaterState::StableCombustion, 120);
    for t in (8_000..18_000).step_by(1_000) {
        assert_eq!(
            rig.step(t, HeaterState::StableCombustion, 125),
            HeaterCommand::OFF
        );
    }
    assert!(rig.step(18_000, HeaterState::StableCombustion, 125).on);
    assert_eq!(rig.faults(), 1);
    assert_eq!(rig.clears(), 1);
}

#[test]
fn start_refused_below_start_threshold() {
    let mut rig = Rig::new(ControlMode::Manual);
    // 12.0 V is fine for running but too low to start.
    let cmd = rig.step(0, HeaterState::Off, 120);
    assert_eq!(cmd, HeaterCommand::OFF);
    assert_eq!(rig.faults(), 1);
}

#[test]
fn running_tolerates_voltage_between_thresholds() {
    let mut rig = Rig::new(ControlMode::Manual);
    let cmd = rig.step(0, HeaterState::StableCombustion, 118);
    assert!(cmd.on);
    assert_eq!(rig.faults(), 0);
}

#[test]
fn guard_holds_state_without_fresh_telemetry() {
    let mut rig = Rig::new(ControlMode::Manual);
    rig.step(0, HeaterState::StableCombustion, 110);
    assert_eq!(rig.faults(), 1);

    // Link silent: no voltage, no recovery.
    let mut link_log = EventLog::new();
    let cmd = rig
        .app
        .tick(60_000, None, &mut rig.link, &mut link_log);
    assert_eq!(cmd, HeaterCommand::OFF);
    assert_eq!(rig.clears(), 0);
}

#[test]
fn heater_reported_low_voltage_is_exposed() {
    let mut rig = Rig::new(ControlMode::Manual);
    let mut frame = status(HeaterState::StableCombustion, 126, 0);
    frame.error_code = 1;
    rig.link
        .transport_mut()
        .inject(&frame.to_frame().encode());
    drain(&mut rig.app, &mut rig.link, 0);

    let snap = rig.app.snapshot(0);
    assert!(snap.low_voltage_fault);
    assert!(snap.safety.voltage_ok);
}
