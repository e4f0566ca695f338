// Swerve inverse kinematics for a four-module base
// Converts drive intent (forward, strafe, rotation) into a steering angle and a
// normalized speed for each corner module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Corner of the base a module is mounted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPosition {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelPosition {
    /// All positions, in the order modules are commanded each tick
    pub const ALL: [WheelPosition; 4] = [
        WheelPosition::FrontLeft,
        WheelPosition::FrontRight,
        WheelPosition::RearLeft,
        WheelPosition::RearRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WheelPosition::FrontLeft => "FrontLeft",
            WheelPosition::FrontRight => "FrontRight",
            WheelPosition::RearLeft => "RearLeft",
            WheelPosition::RearRight => "RearRight",
        }
    }
}

impl fmt::Display for WheelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Base dimensions. Only the width:length ratio matters, so any unit works.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseGeometry {
    width: f64,
    length: f64,
}

impl BaseGeometry {
    /// Non-positive (or NaN) dimensions fall back to a 1:1 base
    pub fn new(width: f64, length: f64) -> Self {
        if width > 0.0 && length > 0.0 {
            Self { width, length }
        } else {
            Self::square()
        }
    }

    pub fn square() -> Self {
        Self {
            width: 1.0,
            length: 1.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// R = sqrt(length² + width²)
    pub fn diagonal(&self) -> f64 {
        self.length.hypot(self.width)
    }
}

impl Default for BaseGeometry {
    fn default() -> Self {
        Self::square()
    }
}

/// Unscaled operator input, conventionally in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveInput {
    pub forward: f64,
    pub strafe: f64,
    pub rotation: f64,
}

impl DriveInput {
    pub fn new(forward: f64, strafe: f64, rotation: f64) -> Self {
        Self {
            forward,
            strafe,
            rotation,
        }
    }

    /// Remap forward/strafe by a heading in degrees.
    ///
    /// Both remapped terms are built from the original forward/strafe and carry
    /// the same sign on the sine term, so this is not a pure rotation. Existing
    /// tuning depends on it; see DESIGN.md before changing.
    pub fn field_centric(self, heading_degrees: f64) -> Self {
        let (sin, cos) = heading_degrees.to_radians().sin_cos();
        Self {
            forward: self.forward * cos + self.strafe * sin,
            strafe: self.forward * sin + self.strafe * cos,
            rotation: self.rotation,
        }
    }
}

/// Target for one module
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelCommand {
    pub angle_degrees: f64,
    /// Upper-clamped to 1; never negative since it is a magnitude
    pub speed: f64,
}

/// Stateless inverse kinematics over a fixed base geometry
#[derive(Debug, Clone, Copy, Default)]
pub struct SwerveKinematics {
    geometry: BaseGeometry,
}

impl SwerveKinematics {
    pub fn new(geometry: BaseGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> BaseGeometry {
        self.geometry
    }

    /// Per-corner (x, y) components of the wheel vector
    pub fn wheel_vector(&self, position: WheelPosition, input: DriveInput) -> (f64, f64) {
        let r = self.geometry.diagonal();
        let along = input.rotation * (self.geometry.length / r);
        let across = input.rotation * (self.geometry.width / r);

        match position {
            WheelPosition::FrontLeft => (input.strafe + along, input.forward - across),
            WheelPosition::FrontRight => (input.strafe + along, input.forward + across),
            WheelPosition::RearRight => (input.strafe - along, input.forward + across),
            WheelPosition::RearLeft => (input.strafe - along, input.forward - across),
        }
    }

    /// Robot-centric wheel angle in degrees.
    ///
    /// atan2 takes (x, y), not (y, x): zero degrees points straight forward.
    pub fn wheel_angle(&self, position: WheelPosition, input: DriveInput) -> f64 {
        let (x, y) = self.wheel_vector(position, input);
        x.atan2(y).to_degrees()
    }

    /// Field-centric wheel angle in degrees, `heading` in [0, 360)
    pub fn wheel_angle_field_centric(
        &self,
        position: WheelPosition,
        input: DriveInput,
        heading: f64,
    ) -> f64 {
        self.wheel_angle(position, input.field_centric(heading))
    }

    /// Wheel speed, clamped to at most 1
    pub fn wheel_speed(&self, position: WheelPosition, input: DriveInput) -> f64 {
        let (x, y) = self.wheel_vector(position, input);
        let speed = x.hypot(y);
        if speed > 1.0 { 1.0 } else { speed }
    }

    /// Angle from the heading-remapped input, speed from the raw input
    pub fn wheel_command(
        &self,
        position: WheelPosition,
        input: DriveInput,
        heading: f64,
    ) -> WheelCommand {
        WheelCommand {
            angle_degrees: self.wheel_angle_field_centric(position, input, heading),
            speed: self.wheel_speed(position, input),
        }
    }
}

/// Convert an angle to sensor units
pub fn degrees_to_units(angle_degrees: f64, counts_per_revolution: f64) -> f64 {
    (counts_per_revolution / 360.0) * angle_degrees
}

/// Convert sensor units to an angle
pub fn units_to_degrees(units: f64, counts_per_revolution: f64) -> f64 {
    (360.0 / counts_per_revolution) * units
}
