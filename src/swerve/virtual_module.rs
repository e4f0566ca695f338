// Simulated swerve module
//
// Every primitive is supported. Encoders integrate motor output over time and
// closed-loop axes are driven by a PID against their own encoder. A non-zero
// ramp rate is the time in seconds to slew from zero to full output.

use std::time::Duration;

use super::encoder::{Encoder, VirtualEncoder};
use super::error::Result;
use super::module::{Axis, LoopMode, SwerveModule};
use super::pid::{Pid, PidTerm};

/// Encoder counts per second at full output
pub const DEFAULT_COUNTS_PER_SECOND: f64 = 4096.0;

#[derive(Debug, Clone, Default)]
struct VirtualAxis {
    speed: f64,
    demand: f64,
    encoder: VirtualEncoder,
    pid: Pid,
    open_ramp: f64,
    closed_ramp: f64,
    reference: Option<f64>,
}

impl VirtualAxis {
    fn active_ramp(&self) -> f64 {
        match self.reference {
            Some(_) => self.closed_ramp,
            None => self.open_ramp,
        }
    }

    /// Move the output toward the demand, at most `dt / ramp` per call
    fn slew(&mut self, dt: f64) {
        let ramp = self.active_ramp();
        if ramp > 0.0 {
            let step = dt / ramp;
            self.speed += (self.demand - self.speed).clamp(-step, step);
        } else {
            self.speed = self.demand;
        }
    }

    fn close_loop(&mut self) {
        if let Some(reference) = self.reference {
            self.demand = self.pid.output(self.encoder.position(), reference);
            self.slew(0.0);
        }
    }

    fn open_loop(&mut self, speed: f64) {
        self.reference = None;
        self.pid.reset();
        self.demand = speed;
        self.slew(0.0);
    }

    /// Stop ignores the ramp
    fn halt(&mut self) {
        self.open_loop(0.0);
        self.speed = 0.0;
    }

    fn step(&mut self, dt: f64, counts_per_second: f64) {
        self.slew(dt);
        self.encoder.advance(self.speed * counts_per_second * dt);
        self.close_loop();
    }
}

#[derive(Debug, Clone)]
pub struct VirtualSwerveModule {
    pivot: VirtualAxis,
    drive: VirtualAxis,
    counts_per_second: f64,
}

impl VirtualSwerveModule {
    pub fn new() -> Self {
        Self::with_counts_per_second(DEFAULT_COUNTS_PER_SECOND)
    }

    pub fn with_counts_per_second(counts_per_second: f64) -> Self {
        Self {
            pivot: VirtualAxis::default(),
            drive: VirtualAxis::default(),
            counts_per_second,
        }
    }

    fn axis(&self, axis: Axis) -> &VirtualAxis {
        match axis {
            Axis::Pivot => &self.pivot,
            Axis::Drive => &self.drive,
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut VirtualAxis {
        match axis {
            Axis::Pivot => &mut self.pivot,
            Axis::Drive => &mut self.drive,
        }
    }

    /// Applied output, which lags the demand while ramping
    pub fn speed(&self, axis: Axis) -> f64 {
        self.axis(axis).speed
    }

    pub fn position(&self, axis: Axis) -> f64 {
        self.axis(axis).encoder.position()
    }

    /// Active closed-loop target, if any
    pub fn reference(&self, axis: Axis) -> Option<f64> {
        self.axis(axis).reference
    }

    pub fn ramp_rate(&self, axis: Axis, mode: LoopMode) -> f64 {
        let axis = self.axis(axis);
        match mode {
            LoopMode::Open => axis.open_ramp,
            LoopMode::Closed => axis.closed_ramp,
        }
    }

    pub fn pid_term(&self, axis: Axis, term: PidTerm) -> f64 {
        self.axis(axis).pid.term(term)
    }

    /// Ramp both outputs over `dt`, advance the encoders at those outputs,
    /// then re-run any closed loops against the new positions
    pub fn simulate(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        for axis in [&mut self.pivot, &mut self.drive] {
            axis.step(dt, self.counts_per_second);
        }
    }
}

impl Default for VirtualSwerveModule {
    fn default() -> Self {
        Self::new()
    }
}

impl SwerveModule for VirtualSwerveModule {
    fn set_motor_speed(&mut self, axis: Axis, speed: f64) -> Result<()> {
        self.axis_mut(axis).open_loop(speed);
        Ok(())
    }

    fn motor_speed(&mut self, axis: Axis) -> Result<f64> {
        Ok(self.speed(axis))
    }

    fn encoder_position(&mut self, axis: Axis) -> Result<f64> {
        self.axis_mut(axis).encoder.get()
    }

    fn zero_encoder(&mut self, axis: Axis) -> Result<()> {
        self.axis_mut(axis).encoder.zero()
    }

    fn stop_motor(&mut self, axis: Axis) -> Result<()> {
        self.axis_mut(axis).halt();
        Ok(())
    }

    fn set_reference(&mut self, axis: Axis, reference: f64) -> Result<()> {
        let axis = self.axis_mut(axis);
        axis.reference = Some(reference);
        axis.close_loop();
        Ok(())
    }

    fn set_ramp_rate(&mut self, axis: Axis, mode: LoopMode, seconds: f64) -> Result<()> {
        let axis = self.axis_mut(axis);
        match mode {
            LoopMode::Open => axis.open_ramp = seconds,
            LoopMode::Closed => axis.closed_ramp = seconds,
        }
        Ok(())
    }

    fn set_pid_term(&mut self, axis: Axis, term: PidTerm, value: f64) -> Result<()> {
        self.axis_mut(axis).pid.set_term(term, value);
        Ok(())
    }

    fn set_output_limits(&mut self, axis: Axis, min: f64, max: f64) -> Result<()> {
        self.axis_mut(axis).pid.set_output_limits(min, max);
        Ok(())
    }

    fn update(&mut self, dt: Duration) -> Result<()> {
        self.simulate(dt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_loop_integrates_position() {
        let mut module = VirtualSwerveModule::with_counts_per_second(1000.0);
        module.set_motor_speed(Axis::Drive, 0.5).unwrap();
        module.simulate(Duration::from_millis(200));
        assert!((module.position(Axis::Drive) - 100.0).abs() < 1e-9);
        assert_eq!(module.position(Axis::Pivot), 0.0);
    }

    #[test]
    fn test_closed_loop_converges_on_reference() {
        let mut module = VirtualSwerveModule::with_counts_per_second(1000.0);
        module.set_pid_term(Axis::Pivot, PidTerm::P, 0.01).unwrap();
        module.set_reference(Axis::Pivot, 90.0).unwrap();
        assert!(module.speed(Axis::Pivot) > 0.0);

        for _ in 0..200 {
            module.simulate(Duration::from_millis(20));
        }
        assert!((module.position(Axis::Pivot) - 90.0).abs() < 0.5);
    }

    #[test]
    fn test_open_loop_command_clears_reference() {
        let mut module = VirtualSwerveModule::new();
        module.set_reference(Axis::Pivot, 10.0).unwrap();
        assert_eq!(module.reference(Axis::Pivot), Some(10.0));
        module.stop_motor(Axis::Pivot).unwrap();
        assert_eq!(module.reference(Axis::Pivot), None);
        assert_eq!(module.speed(Axis::Pivot), 0.0);
    }

    #[test]
    fn test_tuning_setters_are_stored() {
        let mut module = VirtualSwerveModule::new();
        module.set_ramp_rate(Axis::Drive, LoopMode::Open, 0.25).unwrap();
        module.set_pid_term(Axis::Drive, PidTerm::IZone, 5.0).unwrap();
        module.set_output_limits(Axis::Pivot, -0.5, 0.5).unwrap();

        assert_eq!(module.ramp_rate(Axis::Drive, LoopMode::Open), 0.25);
        assert_eq!(module.ramp_rate(Axis::Drive, LoopMode::Closed), 0.0);
        assert_eq!(module.pid_term(Axis::Drive, PidTerm::IZone), 5.0);

        module.set_pid_term(Axis::Pivot, PidTerm::P, 100.0).unwrap();
        module.set_reference(Axis::Pivot, 1000.0).unwrap();
        assert_eq!(module.speed(Axis::Pivot), 0.5);
    }

    #[test]
    fn test_open_ramp_limits_output_change() {
        let mut module = VirtualSwerveModule::with_counts_per_second(1000.0);
        module.set_ramp_rate(Axis::Drive, LoopMode::Open, 2.0).unwrap();
        module.set_motor_speed(Axis::Drive, 1.0).unwrap();
        assert_eq!(module.speed(Axis::Drive), 0.0);

        module.simulate(Duration::from_millis(20));
        assert!((module.speed(Axis::Drive) - 0.01).abs() < 1e-9);
        assert!((module.position(Axis::Drive) - 0.2).abs() < 1e-9);

        for _ in 0..200 {
            module.simulate(Duration::from_millis(20));
        }
        assert_eq!(module.speed(Axis::Drive), 1.0);
    }

    #[test]
    fn test_closed_ramp_applies_only_with_reference() {
        let mut module = VirtualSwerveModule::new();
        module.set_ramp_rate(Axis::Pivot, LoopMode::Closed, 1.0).unwrap();

        module.set_motor_speed(Axis::Pivot, 0.5).unwrap();
        assert_eq!(module.speed(Axis::Pivot), 0.5);

        module.stop_motor(Axis::Pivot).unwrap();
        module.set_pid_term(Axis::Pivot, PidTerm::P, 1.0).unwrap();
        module.set_reference(Axis::Pivot, 1000.0).unwrap();
        assert_eq!(module.speed(Axis::Pivot), 0.0);

        module.simulate(Duration::from_millis(100));
        assert!((module.speed(Axis::Pivot) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_stop_ignores_ramp() {
        let mut module = VirtualSwerveModule::new();
        module.set_motor_speed(Axis::Drive, 0.8).unwrap();
        module.set_ramp_rate(Axis::Drive, LoopMode::Open, 5.0).unwrap();
        module.stop_motor(Axis::Drive).unwrap();
        assert_eq!(module.speed(Axis::Drive), 0.0);
    }

    #[test]
    fn test_zero_keeps_speed() {
        let mut module = VirtualSwerveModule::new();
        module.set_motor_speed(Axis::Drive, 0.4).unwrap();
        module.simulate(Duration::from_millis(50));
        module.zero().unwrap();
        assert_eq!(module.position(Axis::Drive), 0.0);
        assert_eq!(module.speed(Axis::Drive), 0.4);
    }
}
