// PID feedback primitive used by module adapters for closed-loop axes

use serde::{Deserialize, Serialize};

/// Tunable terms of a PID loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PidTerm {
    P,
    I,
    D,
    /// Feed-forward, scaled by the target
    FF,
    /// Error band inside which the integral term accumulates (0 = always)
    IZone,
}

/// PID controller with feed-forward, integral zone and output clamping.
#[derive(Debug, Clone)]
pub struct Pid {
    p: f64,
    i: f64,
    d: f64,
    ff: f64,
    izone: f64,

    out_min: f64,
    out_max: f64,

    integral: f64,
    prev_error: f64,
    first_update: bool,
}

impl Pid {
    pub fn new(p: f64, i: f64, d: f64) -> Self {
        Self {
            p,
            i,
            d,
            ff: 0.0,
            izone: 0.0,

            out_min: -1.0,
            out_max: 1.0,

            integral: 0.0,
            prev_error: 0.0,
            first_update: true,
        }
    }

    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.set_output_limits(min, max);
        self
    }

    pub fn set_term(&mut self, term: PidTerm, value: f64) {
        match term {
            PidTerm::P => self.p = value,
            PidTerm::I => self.i = value,
            PidTerm::D => self.d = value,
            PidTerm::FF => self.ff = value,
            PidTerm::IZone => self.izone = value.abs(),
        }
    }

    pub fn term(&self, term: PidTerm) -> f64 {
        match term {
            PidTerm::P => self.p,
            PidTerm::I => self.i,
            PidTerm::D => self.d,
            PidTerm::FF => self.ff,
            PidTerm::IZone => self.izone,
        }
    }

    /// Reversed limits are swapped
    pub fn set_output_limits(&mut self, min: f64, max: f64) {
        if min > max {
            self.out_min = max;
            self.out_max = min;
        } else {
            self.out_min = min;
            self.out_max = max;
        }
    }

    pub fn output_limits(&self) -> (f64, f64) {
        (self.out_min, self.out_max)
    }

    /// Clear integrator and derivative history
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.first_update = true;
    }

    /// Compute the controller output for one step.
    pub fn output(&mut self, measured: f64, target: f64) -> f64 {
        let error = target - measured;

        if self.izone == 0.0 || error.abs() <= self.izone {
            self.integral += error;
        } else {
            self.integral = 0.0;
        }

        let derivative = if self.first_update {
            self.first_update = false;
            0.0
        } else {
            error - self.prev_error
        };
        self.prev_error = error;

        let out = self.p * error + self.i * self.integral + self.d * derivative + self.ff * target;
        out.clamp(self.out_min, self.out_max)
    }
}

impl Default for Pid {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}
