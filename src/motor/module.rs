// Swerve module built from two Feetech servos on a shared bus
//
// The pivot servo runs in position mode and the drive servo in velocity mode.
// Servo position registers cannot be rewritten, so both encoders zero by
// keeping an offset. Calls the servos cannot honor return Unsupported.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

use serialport::SerialPort;
use tracing::{debug, info, warn};

use super::feetech::{FeetechBus, FeetechError, OperatingMode, Register, STEPS_PER_REVOLUTION};
use crate::swerve::{
    Axis, Encoder, OffsetEncoder, PidTerm, PositionSource, Result, SwerveError, SwerveModule,
};

/// Maximum raw velocity command (safety limit)
pub const MAX_RAW_VELOCITY: i16 = 3000;

/// One bus shared by every module on the base
pub type SharedBus<P = Box<dyn SerialPort>> = Rc<RefCell<FeetechBus<P>>>;

/// Servo ids of one module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoPair {
    pub pivot: u8,
    pub drive: u8,
}

/// Present-position register of one servo
pub struct ServoPosition<P> {
    bus: SharedBus<P>,
    id: u8,
}

impl<P: Read + Write> PositionSource for ServoPosition<P> {
    fn read_raw(&mut self) -> Result<f64> {
        Ok(self.bus.borrow_mut().present_position(self.id)? as f64)
    }
}

pub struct FeetechSwerveModule<P: Read + Write = Box<dyn SerialPort>> {
    bus: SharedBus<P>,
    ids: ServoPair,
    pivot_encoder: OffsetEncoder<ServoPosition<P>>,
    drive_encoder: OffsetEncoder<ServoPosition<P>>,
}

impl<P: Read + Write> FeetechSwerveModule<P> {
    pub fn new(bus: SharedBus<P>, ids: ServoPair) -> Self {
        let source = |id| ServoPosition {
            bus: Rc::clone(&bus),
            id,
        };
        Self {
            pivot_encoder: OffsetEncoder::new(source(ids.pivot)),
            drive_encoder: OffsetEncoder::new(source(ids.drive)),
            bus,
            ids,
        }
    }

    /// Put the pivot servo in position mode and the drive servo in velocity mode.
    ///
    /// Must be called before commanding the module.
    pub fn initialize(&mut self) -> Result<()> {
        info!(
            "Initializing servos pivot={} drive={}",
            self.ids.pivot, self.ids.drive
        );
        let mut bus = self.bus.borrow_mut();

        for id in [self.ids.pivot, self.ids.drive] {
            if !bus.ping(id)? {
                warn!("Servo {} not responding to ping", id);
                return Err(FeetechError::Timeout { id }.into());
            }
            debug!("Servo {} responding", id);
        }

        // Mode changes need torque off
        for id in [self.ids.pivot, self.ids.drive] {
            bus.set_torque(id, false)?;
        }
        bus.set_operating_mode(self.ids.pivot, OperatingMode::Position)?;
        bus.set_operating_mode(self.ids.drive, OperatingMode::Velocity)?;
        for id in [self.ids.pivot, self.ids.drive] {
            bus.set_torque(id, true)?;
        }

        Ok(())
    }

    fn servo(&self, axis: Axis) -> u8 {
        match axis {
            Axis::Pivot => self.ids.pivot,
            Axis::Drive => self.ids.drive,
        }
    }

    fn encoder(&mut self, axis: Axis) -> &mut OffsetEncoder<ServoPosition<P>> {
        match axis {
            Axis::Pivot => &mut self.pivot_encoder,
            Axis::Drive => &mut self.drive_encoder,
        }
    }
}

impl<P: Read + Write> SwerveModule for FeetechSwerveModule<P> {
    fn set_motor_speed(&mut self, axis: Axis, speed: f64) -> Result<()> {
        if axis == Axis::Pivot {
            return Err(SwerveError::unsupported::<Self>("set_motor_speed(Pivot)"));
        }
        let raw = (speed.clamp(-1.0, 1.0) * MAX_RAW_VELOCITY as f64).round() as i16;
        self.bus
            .borrow_mut()
            .set_goal_velocity(self.ids.drive, raw)?;
        Ok(())
    }

    fn motor_speed(&mut self, axis: Axis) -> Result<f64> {
        let raw = self.bus.borrow_mut().present_velocity(self.servo(axis))?;
        Ok(raw as f64 / MAX_RAW_VELOCITY as f64)
    }

    fn encoder_position(&mut self, axis: Axis) -> Result<f64> {
        self.encoder(axis).get()
    }

    fn zero_encoder(&mut self, axis: Axis) -> Result<()> {
        self.encoder(axis).zero()
    }

    fn stop_motor(&mut self, axis: Axis) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        match axis {
            // Hold where it is
            Axis::Pivot => {
                let present = bus.present_position(self.ids.pivot)?;
                bus.set_goal_position(self.ids.pivot, present)?;
            }
            Axis::Drive => bus.set_goal_velocity(self.ids.drive, 0)?,
        }
        Ok(())
    }

    fn set_reference(&mut self, axis: Axis, reference: f64) -> Result<()> {
        if axis == Axis::Drive {
            return Err(SwerveError::unsupported::<Self>("set_reference(Drive)"));
        }
        let steps = f64::from(STEPS_PER_REVOLUTION);
        let goal = (reference + self.pivot_encoder.offset())
            .rem_euclid(steps)
            .round() as u16;
        self.bus
            .borrow_mut()
            .set_goal_position(self.ids.pivot, goal)?;
        Ok(())
    }

    fn set_pid_term(&mut self, axis: Axis, term: PidTerm, value: f64) -> Result<()> {
        let register = match term {
            PidTerm::P => Register::PCoefficient,
            PidTerm::I => Register::ICoefficient,
            PidTerm::D => Register::DCoefficient,
            PidTerm::FF | PidTerm::IZone => {
                return Err(SwerveError::unsupported::<Self>(format!(
                    "set_pid_term({:?}, {:?})",
                    axis, term
                )));
            }
        };
        let value = value.round().clamp(0.0, 255.0) as u8;
        self.bus
            .borrow_mut()
            .write_byte(self.servo(axis), register, value)?;
        Ok(())
    }
}

impl<P: Read + Write> Drop for FeetechSwerveModule<P> {
    fn drop(&mut self) {
        // Safety: never leave a drive servo spinning
        if let Ok(mut bus) = self.bus.try_borrow_mut() {
            if let Err(e) = bus.set_goal_velocity(self.ids.drive, 0) {
                warn!("Failed to stop servo {} on drop: {}", self.ids.drive, e);
            }
        }
    }
}
