//! Predictive PI controller for Automatic mode.
//!
//! A plain PI loop on cabin temperature overshoots badly: the heater keeps
//! pushing hot air for minutes after it is told to back off.  Instead the
//! error is taken against a *projected* temperature:
//!
//! ```text
//!   slope      = least-squares fit over the last slope_window_s   (°C/s)
//!   predicted  = current + slope × t_lookahead_s
//!   error      = target − predicted
//!   integral  += error × dt                 (clamped to ±INTEGRAL_LIMIT)
//!   output     = kp × error + ki × integral (%)
//! ```
//!
//! The output drives an on/off decision with hysteresis and a minimum
//! on-time; while on, it also sets the power level.

use heapless::Deque;
use log::{info, warn};
use serde::Serialize;

use super::HeaterCommand;
use crate::config::{HeaterConfig, MAX_SLOPE_WINDOW_S, MIN_SEND_INTERVAL_MS};

/// Anti-windup bound on the integral term.
pub const INTEGRAL_LIMIT: f32 = 100.0;

/// Samples kept for the slope fit: the widest allowed window at the
/// fastest allowed control cadence, plus the sample at the window edge.
pub const HISTORY_CAPACITY: usize =
    (MAX_SLOPE_WINDOW_S * 1000 / MIN_SEND_INTERVAL_MS) as usize + 1;

/// Controller tuning, read from the configuration each evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiParams {
    pub target_c: f32,
    pub kp: f32,
    pub ki: f32,
    pub min_on_time_s: f32,
    pub t_lookahead_s: f32,
    pub slope_window_s: f32,
    pub off_threshold: f32,
    pub on_threshold: f32,
    pub sensor_grace_s: f32,
    pub fallback_percent: f32,
}

impl PiParams {
    pub fn from_config(cfg: &HeaterConfig) -> Self {
        Self {
            target_c: cfg.target_temperature_c,
            kp: cfg.kp,
            ki: cfg.ki,
            min_on_time_s: cfg.min_on_time_s,
            t_lookahead_s: cfg.t_lookahead_s,
            slope_window_s: cfg.slope_window_s,
            off_threshold: cfg.output_off_threshold,
            on_threshold: cfg.output_on_threshold,
            sensor_grace_s: cfg.sensor_grace_s,
            fallback_percent: cfg.default_power_percent,
        }
    }
}

/// Intermediate values exposed to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PredictiveOutputs {
    pub pi_output: f32,
    pub predicted_temperature_c: f32,
    /// °C per second
    pub slope: f32,
}

pub struct PredictiveController {
    history: Deque<(u64, f32), HISTORY_CAPACITY>,
    integral: f32,
    heater_on: bool,
    on_since_ms: u64,
    last_eval_ms: Option<u64>,
    last_sample_ms: Option<u64>,
    last_command: HeaterCommand,
    outputs: PredictiveOutputs,
    degraded: bool,
}

impl Default for PredictiveController {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictiveController {
    pub fn new() -> Self {
        Self {
            history: Deque::new(),
            integral: 0.0,
            heater_on: false,
            on_since_ms: 0,
            last_eval_ms: None,
            last_sample_ms: None,
            last_command: HeaterCommand::OFF,
            outputs: PredictiveOutputs::default(),
            degraded: false,
        }
    }

    /// Clear the loop state when Automatic is (re-)entered.  Temperature
    /// history is kept: it describes the cabin, not the controller.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.heater_on = false;
        self.last_eval_ms = None;
        self.last_command = HeaterCommand::OFF;
        self.degraded = false;
    }

    /// Run one evaluation.  `temperature` is `None` when no input is fresh.
    pub fn evaluate(&mut self, p: &PiParams, temperature: Option<f32>, now_ms: u64) -> HeaterCommand {
        match temperature.filter(|t| t.is_finite()) {
            Some(t) => self.evaluate_sample(p, t, now_ms),
            None => self.evaluate_without_sample(p, now_ms),
        }
    }

    pub fn outputs(&self) -> PredictiveOutputs {
        self.outputs
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn is_heater_on(&self) -> bool {
        self.heater_on
    }

    /// Running on held or fallback output because the input is missing.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    // ── Internals ─────────────────────────────────────────────

    fn evaluate_sample(&mut self, p: &PiParams, t: f32, now_ms: u64) -> HeaterCommand {
        if self.degraded {
            info!("automatic: temperature input restored ({t:.1}°C)");
            self.degraded = false;
        }
        self.record(t, now_ms, p.slope_window_s);

        let slope = self.slope();
        let predicted = t + slope * p.t_lookahead_s;
        let error = p.target_c - predicted;

        let dt = self
            .last_eval_ms
            .map_or(0.0, |last| now_ms.saturating_sub(last) as f32 / 1000.0);
        self.integral = (self.integral + error * dt).clamp(-INTEGRAL_LIMIT, INTEGRAL_LIMIT);
        let output = p.kp * error + p.ki * self.integral;

        if output >= p.on_threshold {
            if !self.heater_on {
                info!("automatic: ON (output {output:.1}%, predicted {predicted:.1}°C)");
                self.heater_on = true;
                self.on_since_ms = now_ms;
            }
        } else if output <= p.off_threshold && self.heater_on {
            let on_for_s = now_ms.saturating_sub(self.on_since_ms) as f32 / 1000.0;
            if on_for_s >= p.min_on_time_s {
                info!("automatic: OFF (output {output:.1}%, predicted {predicted:.1}°C)");
                self.heater_on = false;
            }
        }

        self.outputs = PredictiveOutputs {
            pi_output: output,
            predicted_temperature_c: predicted,
            slope,
        };
        self.last_eval_ms = Some(now_ms);
        self.last_sample_ms = Some(now_ms);
        self.last_command = if self.heater_on {
            HeaterCommand::from_output(output)
        } else {
            HeaterCommand::OFF
        };
        self.last_command
    }

    fn evaluate_without_sample(&mut self, p: &PiParams, now_ms: u64) -> HeaterCommand {
        // Keep the integral from absorbing the gap once samples return.
        self.last_eval_ms = Some(now_ms);

        let grace_ms = (p.sensor_grace_s * 1000.0) as u64;
        let within_grace = self
            .last_sample_ms
            .is_some_and(|t| now_ms.saturating_sub(t) < grace_ms);

        if !self.degraded {
            warn!("automatic: temperature input lost, holding last command");
            self.degraded = true;
        }
        if within_grace {
            return self.last_command;
        }

        let fallback = HeaterCommand::from_output(p.fallback_percent);
        if self.last_command != fallback {
            warn!(
                "automatic: no temperature for {:.0}s, fallback to {}%",
                p.sensor_grace_s, fallback.power_percent
            );
        }
        if !self.heater_on {
            self.heater_on = true;
            self.on_since_ms = now_ms;
        }
        self.last_command = fallback;
        fallback
    }

    fn record(&mut self, t: f32, now_ms: u64, window_s: f32) {
        let window_ms = (window_s * 1000.0) as u64;
        while self
            .history
            .front()
            .is_some_and(|(ts, _)| now_ms.saturating_sub(*ts) > window_ms)
        {
            self.history.pop_front();
        }
        if self.history.is_full() {
            warn!("automatic: slope history full, oldest sample dropped");
            self.history.pop_front();
        }
        // Cannot fail: a slot was freed above if needed.
        let _ = self.history.push_back((now_ms, t));
    }

    /// Least-squares slope in °C/s; zero with fewer than two samples.
    fn slope(&self) -> f32 {
        let n = self.history.len();
        let Some(&(t0, _)) = self.history.front() else {
            return 0.0;
        };
        if n < 2 {
            return 0.0;
        }
        let (mut sx, mut sy, mut sxx, mut sxy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for &(ts, temp) in &self.history {
            let x = (ts - t0) as f64 / 1000.0;
            let y = f64::from(temp);
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
        }
        let n = n as f64;
        let denom = n * sxx - sx * sx;
        if denom.abs() < 1e-9 {
            return 0.0;
        }
        ((n * sxy - sx * sy) / denom) as f32
    }
}
