// Capability contract for one swerve module (pivot axis + drive axis)
//
// Adapters implement the motion and encoder primitives. Tuning setters default
// to an explicit Unsupported error, so an adapter only overrides what its
// hardware can actually do. stop/zero/reset are derived from the primitives.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{Result, SwerveError};
use super::pid::PidTerm;

/// Steering or propulsion half of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Pivot,
    Drive,
}

/// Which output mode a ramp rate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopMode {
    Open,
    Closed,
}

/// Snapshot of a module, read fresh from the adapter each time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    pub pivot_position: f64,
    pub drive_position: f64,
    pub pivot_speed: f64,
    pub drive_speed: f64,
}

/// One physical (or simulated) wheel unit.
///
/// Every call is synchronous and individually fallible. An adapter that cannot
/// honor a call must return [`SwerveError::Unsupported`] rather than ignore it.
pub trait SwerveModule {
    /// Open-loop motor output, negative is reverse
    fn set_motor_speed(&mut self, axis: Axis, speed: f64) -> Result<()>;

    /// Currently set (or measured) motor output
    fn motor_speed(&mut self, axis: Axis) -> Result<f64>;

    /// Raw encoder reading in native units
    fn encoder_position(&mut self, axis: Axis) -> Result<f64>;

    fn zero_encoder(&mut self, axis: Axis) -> Result<()>;

    fn stop_motor(&mut self, axis: Axis) -> Result<()>;

    /// Closed-loop position target in native encoder units
    fn set_reference(&mut self, axis: Axis, reference: f64) -> Result<()>;

    /// Time in seconds to go from zero to full output
    fn set_ramp_rate(&mut self, axis: Axis, mode: LoopMode, seconds: f64) -> Result<()> {
        let _ = seconds;
        Err(SwerveError::unsupported::<Self>(format!(
            "set_ramp_rate({:?}, {:?})",
            axis, mode
        )))
    }

    fn set_pid_term(&mut self, axis: Axis, term: PidTerm, value: f64) -> Result<()> {
        let _ = value;
        Err(SwerveError::unsupported::<Self>(format!(
            "set_pid_term({:?}, {:?})",
            axis, term
        )))
    }

    fn set_output_limits(&mut self, axis: Axis, min: f64, max: f64) -> Result<()> {
        let _ = (min, max);
        Err(SwerveError::unsupported::<Self>(format!(
            "set_output_limits({:?})",
            axis
        )))
    }

    /// Called once per runtime tick so adapters can advance simulation or poll
    fn update(&mut self, dt: Duration) -> Result<()> {
        let _ = dt;
        Ok(())
    }

    /// Stop both motors
    fn stop(&mut self) -> Result<()> {
        self.stop_motor(Axis::Pivot)?;
        self.stop_motor(Axis::Drive)
    }

    /// Zero both encoders
    fn zero(&mut self) -> Result<()> {
        self.zero_encoder(Axis::Pivot)?;
        self.zero_encoder(Axis::Drive)
    }

    /// Stop, then zero
    fn reset(&mut self) -> Result<()> {
        self.stop()?;
        self.zero()
    }

    fn state(&mut self) -> Result<ModuleState> {
        Ok(ModuleState {
            pivot_position: self.encoder_position(Axis::Pivot)?,
            drive_position: self.encoder_position(Axis::Drive)?,
            pivot_speed: self.motor_speed(Axis::Pivot)?,
            drive_speed: self.motor_speed(Axis::Drive)?,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{Call, RecordingModule};
    use super::*;

    #[test]
    fn test_composite_operations_call_primitives_in_order() {
        let mut module = RecordingModule::default();
        module.reset().unwrap();
        assert_eq!(
            module.calls,
            vec![
                Call::Stop(Axis::Pivot),
                Call::Stop(Axis::Drive),
                Call::ZeroEncoder(Axis::Pivot),
                Call::ZeroEncoder(Axis::Drive),
            ]
        );
    }

    #[test]
    fn test_reset_stops_at_first_failure() {
        let mut module = RecordingModule::failing_on("zero_encoder");
        assert!(module.reset().is_err());
        assert_eq!(
            module.calls,
            vec![Call::Stop(Axis::Pivot), Call::Stop(Axis::Drive)]
        );
    }

    #[test]
    fn test_default_tuning_setters_are_unsupported() {
        let mut module = RecordingModule::default();
        let err = module
            .set_ramp_rate(Axis::Drive, LoopMode::Closed, 0.5)
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("set_ramp_rate(Drive, Closed)"));

        let err = module.set_output_limits(Axis::Pivot, -1.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("RecordingModule"));
        assert!(module.calls.is_empty());
    }

    #[test]
    fn test_state_reads_both_axes() {
        let mut module = RecordingModule::with_pivot_position(12.0);
        module.drive_position = 3.0;
        let state = module.state().unwrap();
        assert_eq!(state.pivot_position, 12.0);
        assert_eq!(state.drive_position, 3.0);
    }
}
