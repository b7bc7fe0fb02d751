//! Wire-level behaviour: what the controller puts on the bus, and what it
//! makes of what it reads.

use crate::mock_bus::{drain, running_status, status_bytes, EventLog, MockBus};

use sunster::app::commands::AppCommand;
use sunster::app::events::AppEvent;
use sunster::app::service::AppService;
use sunster::config::HeaterConfig;
use sunster::protocol::messages::{encode_command, HeaterState};
use sunster::protocol::{CommandOpcode, ControllerCommand, HeaterLink};
use sunster::telemetry::RunState;

fn make(config: HeaterConfig) -> (AppService, HeaterLink<MockBus>, EventLog) {
    let sniff = config.passive_sniff;
    let mut app = AppService::new(config);
    let mut log = EventLog::new();
    app.start(&mut log);
    (app, HeaterLink::new(MockBus::new(), sniff), log)
}

#[test]
fn manual_default_sends_start_at_eighty_percent() {
    let (mut app, mut link, mut log) = make(HeaterConfig::default());

    app.tick(0, None, &mut link, &mut log);

    // 0xAA, controller address, 11-byte payload, start opcode,
    // power step 8, target 20 °C, zero padding, checksum.
    let expected: [u8; 16] = [
        0xAA, 0x66, 0x0B, 0x06, 0x08, 0x14, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x93,
    ];
    assert_eq!(link.transport().last_frame(), Some(&expected[..]));
    assert_eq!(link.frames_sent(), 1);
}

#[test]
fn opcode_follows_heater_state() {
    let (mut app, mut link, mut log) = make(HeaterConfig::default());

    link.transport_mut()
        .inject(&status_bytes(HeaterState::Off, 126));
    drain(&mut app, &mut link, 0);
    app.tick(0, None, &mut link, &mut log);
    assert_eq!(link.transport().last_opcode(), Some(CommandOpcode::Start as u8));

    link.transport_mut().inject(&running_status());
    drain(&mut app, &mut link, 1_000);
    app.tick(1_000, None, &mut link, &mut log);
    assert_eq!(
        link.transport().last_opcode(),
        Some(CommandOpcode::Running as u8)
    );

    app.handle_command(AppCommand::SetPowerSwitch(false), 1_500, &mut log)
        .unwrap();
    link.transport_mut().inject(&running_status());
    drain(&mut app, &mut link, 2_000);
    app.tick(2_000, None, &mut link, &mut log);
    assert_eq!(link.transport().last_opcode(), Some(CommandOpcode::Stop as u8));
    assert_eq!(link.transport().last_power_step(), Some(1));
}

#[test]
fn manual_power_reaches_the_wire() {
    let (mut app, mut link, mut log) = make(HeaterConfig::default());
    app.handle_command(AppCommand::SetManualPower(40.0), 0, &mut log)
        .unwrap();
    app.tick(0, None, &mut link, &mut log);
    assert_eq!(link.transport().last_power_step(), Some(4));
}

#[test]
fn sniff_mode_never_writes() {
    let (mut app, mut link, mut log) = make(HeaterConfig {
        passive_sniff: true,
        ..Default::default()
    });

    // Another controller drives the heater.
    let theirs = ControllerCommand {
        opcode: CommandOpcode::Running,
        power_step: 6,
        target_c: 22,
    };
    for i in 0..5u64 {
        let now = i * 1_000;
        link.transport_mut()
            .inject(&encode_command(&theirs).encode());
        link.transport_mut().inject(&running_status());
        assert_eq!(drain(&mut app, &mut link, now), 2);
        app.tick(now, None, &mut link, &mut log);
    }

    assert!(link.transport().written.is_empty());
    assert_eq!(link.sends_suppressed(), 5);
    assert_eq!(app.telemetry().observed_command(), Some(theirs));

    // Our decision is still computed and exposed.
    let snap = app.snapshot(4_000);
    assert!(snap.passive_sniff);
    assert!(snap.commanded.on);
    assert_eq!(snap.heater.map(|h| h.run_state), Some(RunState::Running));
}

#[test]
fn own_echo_is_observed_not_applied_as_status() {
    let (mut app, mut link, mut log) = make(HeaterConfig::default());
    app.tick(0, None, &mut link, &mut log);

    let echo = link.transport().last_frame().unwrap().to_vec();
    assert_eq!(app.on_bytes(&echo, 10), 1);
    assert!(app.telemetry().latest().is_none());
    assert_eq!(
        app.telemetry().observed_command().map(|c| c.power_step),
        Some(8)
    );
}

#[test]
fn decoder_recovers_from_noise_between_frames() {
    let (mut app, mut link, _log) = make(HeaterConfig::default());

    let mut bytes = vec![0x00, 0xAA, 0x13];
    bytes.extend(running_status());
    bytes.extend([0xAA, 0x77]);
    bytes.extend(running_status());
    link.transport_mut().inject(&bytes);

    assert_eq!(drain(&mut app, &mut link, 0), 2);
    let stats = app.decoder_stats();
    assert_eq!(stats.frames, 2);
    assert!(stats.header_errors >= 2);
}

#[test]
fn corrupted_status_is_dropped_whole() {
    let (mut app, mut link, _log) = make(HeaterConfig::default());

    let mut bad = running_status();
    bad[6] ^= 0x40; // voltage high byte
    link.transport_mut().inject(&bad);
    assert_eq!(drain(&mut app, &mut link, 0), 0);
    assert!(app.telemetry().latest().is_none());
    assert_eq!(app.decoder_stats().checksum_errors, 1);
}

#[test]
fn link_timeout_clears_heater_values() {
    let (mut app, mut link, mut log) = make(HeaterConfig::default());

    link.transport_mut().inject(&running_status());
    drain(&mut app, &mut link, 0);
    app.tick(0, None, &mut link, &mut log);
    assert!(app.snapshot(0).connected);
    assert_eq!(log.count(|e| matches!(e, AppEvent::LinkRestored)), 1);

    app.tick(5_001, None, &mut link, &mut log);
    assert_eq!(log.count(|e| matches!(e, AppEvent::LinkLost)), 1);
    assert!(!app.snapshot(5_001).connected);

    link.transport_mut().inject(&running_status());
    drain(&mut app, &mut link, 7_000);
    app.tick(7_000, None, &mut link, &mut log);
    assert_eq!(log.count(|e| matches!(e, AppEvent::LinkRestored)), 2);
}
