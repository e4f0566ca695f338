// Message types exchanged over Zenoh, all JSON

use serde::{Deserialize, Serialize};

use crate::swerve::{Corners, ModuleState, WheelPosition};

/// Command from teleop/navigation -> runtime.
/// A heading switches the drive to field-centric mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub forward: f64,
    pub strafe: f64,
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

/// State of one module as published by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleTelemetry {
    pub position: WheelPosition,
    #[serde(flatten)]
    pub state: ModuleState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveTelemetry {
    pub modules: Vec<ModuleTelemetry>,
}

impl From<&Corners<ModuleState>> for DriveTelemetry {
    fn from(states: &Corners<ModuleState>) -> Self {
        Self {
            modules: states
                .iter()
                .map(|(position, state)| ModuleTelemetry {
                    position,
                    state: *state,
                })
                .collect(),
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    HardwareFault,
}
