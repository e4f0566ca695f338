// Error types shared by the drive coordinator and module adapters

use std::fmt;

use super::kinematics::WheelPosition;
use crate::motor::FeetechError;

/// Errors raised by the swerve drive and by module/encoder adapters
#[derive(Debug, thiserror::Error)]
pub enum SwerveError {
    #[error("the following modules are missing: {}", PositionList(.missing))]
    MissingModules { missing: Vec<WheelPosition> },

    #[error("counts per pivot revolution must be positive and finite, got {counts}")]
    InvalidPivotScale { counts: f64 },

    #[error("{operation} is not supported by {module}")]
    Unsupported {
        module: &'static str,
        operation: String,
    },

    #[error("Motor bus error: {0}")]
    Bus(#[from] FeetechError),
}

impl SwerveError {
    /// Build an `Unsupported` error naming the adapter type `M`
    pub fn unsupported<M: ?Sized>(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            module: std::any::type_name::<M>(),
            operation: operation.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

pub type Result<T> = std::result::Result<T, SwerveError>;

struct PositionList<'a>(&'a [WheelPosition]);

impl fmt::Display for PositionList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, position) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", position)?;
        }
        write!(f, "]")
    }
}
