//! Concrete mode handler functions and table builder.
//!
//! Each mode is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!            select                  select
//!  MANUAL ◀─────────▶ AUTOMATIC ◀─────────▶ ANTIFREEZE
//!    ▲                                          │
//!    └──────────────────select──────────────────┘
//!
//!  MANUAL      fixed power, no feedback          ┐ gated by the
//!  AUTOMATIC   predictive PI on temperature      ┘ power switch
//!  ANTIFREEZE  banded thermostat, always active
//! ```

use super::context::ModeContext;
use super::{ControlMode, ModeDescriptor};
use crate::control::antifreeze::AntifreezeBands;
use crate::control::predictive::PiParams;
use crate::control::HeaterCommand;
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static mode table.  Called once at startup.
pub fn build_mode_table() -> [ModeDescriptor; ControlMode::COUNT] {
    [
        // Index 0 — Manual
        ModeDescriptor {
            id: ControlMode::Manual,
            name: "Manual",
            on_enter: Some(manual_enter),
            on_exit: None,
            on_update: manual_update,
        },
        // Index 1 — Automatic
        ModeDescriptor {
            id: ControlMode::Automatic,
            name: "Automatic",
            on_enter: Some(automatic_enter),
            on_exit: Some(automatic_exit),
            on_update: automatic_update,
        },
        // Index 2 — Antifreeze
        ModeDescriptor {
            id: ControlMode::Antifreeze,
            name: "Antifreeze",
            on_enter: Some(antifreeze_enter),
            on_exit: None,
            on_update: antifreeze_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  MANUAL
// ═══════════════════════════════════════════════════════════════════════════

fn manual_enter(ctx: &mut ModeContext) {
    info!("MANUAL: {:.0}% power", ctx.manual_power_percent);
}

fn manual_update(ctx: &mut ModeContext) -> HeaterCommand {
    if !ctx.power_switch {
        return HeaterCommand::OFF;
    }
    HeaterCommand::from_output(ctx.manual_power_percent)
}

// ═══════════════════════════════════════════════════════════════════════════
//  AUTOMATIC
// ═══════════════════════════════════════════════════════════════════════════

fn automatic_enter(ctx: &mut ModeContext) {
    ctx.controller.reset();
    info!(
        "AUTOMATIC: target {:.1}°C, kp {:.2}, ki {:.2}",
        ctx.config.target_temperature_c, ctx.config.kp, ctx.config.ki
    );
}

fn automatic_exit(ctx: &mut ModeContext) {
    info!(
        "AUTOMATIC: leaving after {} ticks (integral {:.1})",
        ctx.ticks_in_mode,
        ctx.controller.integral()
    );
}

fn automatic_update(ctx: &mut ModeContext) -> HeaterCommand {
    let params = PiParams::from_config(&ctx.config);
    let command = ctx.controller.evaluate(&params, ctx.temperature_c, ctx.now_ms);
    // The controller keeps tracking so its outputs stay meaningful; the
    // switch only gates what is sent.
    if ctx.power_switch {
        command
    } else {
        HeaterCommand::OFF
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ANTIFREEZE
// ═══════════════════════════════════════════════════════════════════════════

fn antifreeze_enter(ctx: &mut ModeContext) {
    ctx.antifreeze.reset();
    info!(
        "ANTIFREEZE: bands {:.1}/{:.1}/{:.1}/{:.1}°C",
        ctx.config.antifreeze_temp_on,
        ctx.config.antifreeze_temp_medium,
        ctx.config.antifreeze_temp_low,
        ctx.config.antifreeze_temp_off
    );
}

fn antifreeze_update(ctx: &mut ModeContext) -> HeaterCommand {
    let bands = AntifreezeBands::from_config(&ctx.config);
    ctx.antifreeze
        .evaluate(&bands, ctx.temperature_c, ctx.config.sensor_grace_s, ctx.now_ms)
}

#[cfg(test)]
mod tests {
    use super::super::Fsm;
    use super::*;
    use crate::config::HeaterConfig;

    fn setup(mode: ControlMode) -> (Fsm, ModeContext) {
        let mut fsm = Fsm::new(build_mode_table(), mode);
        let mut ctx = ModeContext::new(HeaterConfig::default());
        fsm.start(&mut ctx);
        (fsm, ctx)
    }

    #[test]
    fn manual_commands_default_power() {
        let (mut fsm, mut ctx) = setup(ControlMode::Manual);
        assert_eq!(fsm.tick(&mut ctx), HeaterCommand::on(80));
        ctx.manual_power_percent = 40.0;
        assert_eq!(fsm.tick(&mut ctx), HeaterCommand::on(40));
        assert_eq!(ctx.requested, HeaterCommand::on(40));
    }

    #[test]
    fn manual_ignores_temperature() {
        let (mut fsm, mut ctx) = setup(ControlMode::Manual);
        ctx.temperature_c = Some(50.0);
        assert!(fsm.tick(&mut ctx).on);
    }

    #[test]
    fn power_switch_gates_manual_and_automatic() {
        for mode in [ControlMode::Manual, ControlMode::Automatic] {
            let (mut fsm, mut ctx) = setup(mode);
            ctx.power_switch = false;
            ctx.temperature_c = Some(5.0);
            assert_eq!(fsm.tick(&mut ctx), HeaterCommand::OFF, "{mode:?}");
        }
    }

    #[test]
    fn antifreeze_ignores_power_switch() {
        let (mut fsm, mut ctx) = setup(ControlMode::Antifreeze);
        ctx.power_switch = false;
        ctx.temperature_c = Some(1.0);
        assert_eq!(fsm.tick(&mut ctx), HeaterCommand::on(100));
    }

    #[test]
    fn automatic_heats_cold_cabin() {
        let (mut fsm, mut ctx) = setup(ControlMode::Automatic);
        ctx.temperature_c = Some(12.0);
        assert!(fsm.tick(&mut ctx).on);
    }

    #[test]
    fn entering_automatic_resets_controller() {
        let (mut fsm, mut ctx) = setup(ControlMode::Automatic);
        for i in 0..20u64 {
            ctx.now_ms = i * 1000;
            ctx.temperature_c = Some(10.0);
            fsm.tick(&mut ctx);
        }
        assert!(ctx.controller.integral() > 0.0);
        fsm.select(ControlMode::Manual, &mut ctx);
        fsm.select(ControlMode::Automatic, &mut ctx);
        assert_eq!(ctx.controller.integral(), 0.0);
    }
}
