// Serial-servo hardware for swerve modules
//
// Provides:
// - Feetech STS3215 serial protocol implementation
// - A swerve module adapter driving one pivot servo and one drive servo

pub mod feetech;
mod module;

pub use feetech::{FeetechBus, FeetechError};
pub use module::{FeetechSwerveModule, MAX_RAW_VELOCITY, ServoPair, ServoPosition, SharedBus};
