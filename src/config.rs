// Timeouts, topics, base geometry and servo configuration
//
// Compile-time defaults live here as constants; the runtime binary can
// override most of them from the command line.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::motor::ServoPair;
use crate::swerve::Corners;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "swerve/cmd/drive"; // commands
pub const TOPIC_STATE_MODULES: &str = "swerve/state/modules"; // per-module telemetry
pub const TOPIC_HEALTH: &str = "swerve/state/health"; // health status

// Base geometry (ratio only, any unit)
pub const BASE_WIDTH: f64 = 1.0;
pub const BASE_LENGTH: f64 = 1.0;

// Pivot encoder counts per full steering revolution (STS3215 resolution)
pub const COUNTS_PER_PIVOT_REVOLUTION: f64 = 4096.0;

// Pivot P gain applied to simulated modules when none is given
pub const SIM_PIVOT_P: f64 = 0.004;

// Serial port for the Feetech servo bus
pub const MOTOR_PORT: &str = "/dev/ttyUSB0";

// Servo ids per corner
pub const SERVO_IDS: Corners<ServoPair> = Corners {
    front_left: ServoPair { pivot: 1, drive: 2 },
    front_right: ServoPair { pivot: 3, drive: 4 },
    rear_left: ServoPair { pivot: 5, drive: 6 },
    rear_right: ServoPair { pivot: 7, drive: 8 },
};

/// Where module commands go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Simulated modules, no hardware
    Sim,
    /// Feetech servos on a serial bus
    Feetech,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "swerve-runtime", about = "Swerve drive runtime over Zenoh")]
pub struct RuntimeArgs {
    #[arg(long, value_enum, default_value_t = Backend::Sim)]
    pub backend: Backend,

    /// Serial port of the servo bus (feetech backend)
    #[arg(long, default_value = MOTOR_PORT)]
    pub port: String,

    #[arg(long, default_value_t = BASE_WIDTH)]
    pub base_width: f64,

    #[arg(long, default_value_t = BASE_LENGTH)]
    pub base_length: f64,

    #[arg(long, default_value_t = COUNTS_PER_PIVOT_REVOLUTION)]
    pub counts_per_rev: f64,

    #[arg(long, default_value_t = LOOP_HZ, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub loop_hz: u64,

    /// Pivot P gain applied to every module at startup
    #[arg(long)]
    pub pivot_p: Option<f64>,
}

impl RuntimeArgs {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.loop_hz as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = RuntimeArgs::try_parse_from(["swerve-runtime"]).unwrap();
        assert_eq!(args.backend, Backend::Sim);
        assert_eq!(args.port, MOTOR_PORT);
        assert_eq!(args.counts_per_rev, COUNTS_PER_PIVOT_REVOLUTION);
        assert_eq!(args.tick_period(), Duration::from_millis(20));
        assert!(args.pivot_p.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = RuntimeArgs::try_parse_from([
            "swerve-runtime",
            "--backend",
            "feetech",
            "--base-width",
            "2",
            "--loop-hz",
            "100",
            "--pivot-p",
            "32",
        ])
        .unwrap();
        assert_eq!(args.backend, Backend::Feetech);
        assert_eq!(args.base_width, 2.0);
        assert_eq!(args.tick_period(), Duration::from_millis(10));
        assert_eq!(args.pivot_p, Some(32.0));
    }

    #[test]
    fn test_tick_period_keeps_fractional_milliseconds() {
        let args = RuntimeArgs::try_parse_from(["swerve-runtime", "--loop-hz", "60"]).unwrap();
        let period = args.tick_period().as_secs_f64();
        assert!((period - 1.0 / 60.0).abs() < 1e-6, "{}", period);

        let args = RuntimeArgs::try_parse_from(["swerve-runtime", "--loop-hz", "600"]).unwrap();
        let period = args.tick_period().as_secs_f64();
        assert!((period - 1.0 / 600.0).abs() < 1e-6, "{}", period);
    }

    #[test]
    fn test_zero_loop_rate_rejected() {
        assert!(RuntimeArgs::try_parse_from(["swerve-runtime", "--loop-hz", "0"]).is_err());
    }
}
