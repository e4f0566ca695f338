// Swerve drive core for a four-module base
//
// Provides:
// - Inverse kinematics (drive intent -> per-wheel angle and speed)
// - The drive coordinator (encoder-domain conversion + shortest pivot routing)
// - Module/encoder capability traits, a PID primitive and a simulated module

mod corners;
pub mod drive;
pub mod encoder;
mod error;
pub mod kinematics;
pub mod module;
pub mod pid;
pub mod virtual_module;

pub use corners::Corners;
pub use drive::{SwerveDrive, SwerveDriveBuilder, pivot_reference};
pub use encoder::{Encoder, OffsetEncoder, PositionSource, VirtualEncoder};
pub use error::{Result, SwerveError};
pub use kinematics::{
    BaseGeometry, DriveInput, SwerveKinematics, WheelCommand, WheelPosition, degrees_to_units,
    units_to_degrees,
};
pub use module::{Axis, LoopMode, ModuleState, SwerveModule};
pub use pid::{Pid, PidTerm};
pub use virtual_module::VirtualSwerveModule;
