// Four-module swerve drive coordinator
//
// Each call to drive() is one control tick: compute every module's wheel
// command, convert the angle to pivot encoder units, route the pivot the short
// way around, and dispatch. Modules are commanded in a fixed order and the
// first hardware error aborts the rest of the tick (no rollback).

use std::time::Duration;

use tracing::{debug, info, warn};

use super::corners::Corners;
use super::error::{Result, SwerveError};
use super::kinematics::{BaseGeometry, DriveInput, SwerveKinematics, WheelPosition, degrees_to_units};
use super::module::{Axis, ModuleState, SwerveModule};

/// Borrowed module handle; modules are owned by the caller
pub type ModuleRef<'a> = &'a mut dyn SwerveModule;

/// One-shot per-module setup applied at construction
pub type Configurator<'a> = Box<dyn FnMut(&mut dyn SwerveModule) -> Result<()> + 'a>;

/// Pivot closed-loop reference for a target angle.
///
/// The reroute `counts - |delta|` drops the sign of the original delta, so a
/// large negative delta still turns the positive way. Kept as-is; see DESIGN.md.
pub fn pivot_reference(current_position: f64, target_angle: f64, counts_per_revolution: f64) -> f64 {
    let target = degrees_to_units(target_angle, counts_per_revolution);
    let half = counts_per_revolution / 2.0;

    let mut delta = target - (current_position % counts_per_revolution);
    if delta > half || delta < -half {
        delta = counts_per_revolution - delta.abs();
    }

    current_position + delta
}

/// Coordinates exactly four swerve modules
pub struct SwerveDrive<'a> {
    modules: Corners<ModuleRef<'a>>,
    kinematics: SwerveKinematics,
    counts_per_pivot_revolution: f64,
}

impl<'a> SwerveDrive<'a> {
    /// Build a drive from four module slots.
    ///
    /// Fails with [`SwerveError::MissingModules`] naming every empty slot.
    /// Non-positive base dimensions fall back to a 1:1 base.
    pub fn new(
        base_width: f64,
        base_length: f64,
        counts_per_pivot_revolution: f64,
        modules: Corners<Option<ModuleRef<'a>>>,
    ) -> Result<Self> {
        Self::build(base_width, base_length, counts_per_pivot_revolution, modules, None)
    }

    /// Like [`SwerveDrive::new`], then runs `configure` once on each module
    /// (FrontLeft, FrontRight, RearLeft, RearRight) before returning.
    pub fn with_configurator<F>(
        base_width: f64,
        base_length: f64,
        counts_per_pivot_revolution: f64,
        modules: Corners<Option<ModuleRef<'a>>>,
        configure: F,
    ) -> Result<Self>
    where
        F: FnMut(&mut dyn SwerveModule) -> Result<()> + 'a,
    {
        Self::build(
            base_width,
            base_length,
            counts_per_pivot_revolution,
            modules,
            Some(Box::new(configure)),
        )
    }

    pub fn builder() -> SwerveDriveBuilder<'a> {
        SwerveDriveBuilder::default()
    }

    fn build(
        base_width: f64,
        base_length: f64,
        counts_per_pivot_revolution: f64,
        modules: Corners<Option<ModuleRef<'a>>>,
        configure: Option<Configurator<'a>>,
    ) -> Result<Self> {
        let missing: Vec<WheelPosition> = modules
            .iter()
            .filter(|(_, module)| module.is_none())
            .map(|(position, _)| position)
            .collect();

        let mut modules = match modules {
            Corners {
                front_left: Some(front_left),
                front_right: Some(front_right),
                rear_left: Some(rear_left),
                rear_right: Some(rear_right),
            } => Corners::new(front_left, front_right, rear_left, rear_right),
            _ => return Err(SwerveError::MissingModules { missing }),
        };

        if !(counts_per_pivot_revolution.is_finite() && counts_per_pivot_revolution > 0.0) {
            return Err(SwerveError::InvalidPivotScale {
                counts: counts_per_pivot_revolution,
            });
        }

        let geometry = BaseGeometry::new(base_width, base_length);
        if geometry.width() != base_width || geometry.length() != base_length {
            warn!(
                "Invalid base dimensions {}x{}, using a 1:1 base",
                base_width, base_length
            );
        }

        if let Some(mut configure) = configure {
            for (position, module) in modules.iter_mut() {
                debug!("Configuring {} module", position);
                configure(&mut **module)?;
            }
        }

        info!(
            "Swerve drive ready: base {}x{}, {} counts per pivot revolution",
            geometry.width(),
            geometry.length(),
            counts_per_pivot_revolution
        );

        Ok(Self {
            modules,
            kinematics: SwerveKinematics::new(geometry),
            counts_per_pivot_revolution,
        })
    }

    /// Robot-centric drive (heading 0)
    pub fn drive(&mut self, forward: f64, strafe: f64, rotation: f64) -> Result<()> {
        self.drive_field_centric(forward, strafe, rotation, 0.0)
    }

    /// Field-centric drive, `heading` in degrees
    pub fn drive_field_centric(
        &mut self,
        forward: f64,
        strafe: f64,
        rotation: f64,
        heading: f64,
    ) -> Result<()> {
        let input = DriveInput::new(forward, strafe, rotation);
        let counts = self.counts_per_pivot_revolution;

        for (position, module) in self.modules.iter_mut() {
            let command = self.kinematics.wheel_command(position, input, heading);
            let current = module.encoder_position(Axis::Pivot)?;
            let reference = pivot_reference(current, command.angle_degrees, counts);

            debug!(
                "{}: angle={:.2} speed={:.3} pivot {:.1} -> {:.1}",
                position, command.angle_degrees, command.speed, current, reference
            );

            module.set_reference(Axis::Pivot, reference)?;
            module.set_motor_speed(Axis::Drive, command.speed)?;
        }

        Ok(())
    }

    /// Stop both motors on every module; encoders untouched
    pub fn stop(&mut self) -> Result<()> {
        debug!("Stopping all modules");
        for (_, module) in self.modules.iter_mut() {
            module.stop()?;
        }
        Ok(())
    }

    /// Zero both encoders on every module; motor outputs untouched
    pub fn zero(&mut self) -> Result<()> {
        info!("Zeroing all module encoders");
        for (_, module) in self.modules.iter_mut() {
            module.zero()?;
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.stop()?;
        self.zero()
    }

    /// Forward one tick period to every module's update hook
    pub fn update(&mut self, dt: Duration) -> Result<()> {
        for (_, module) in self.modules.iter_mut() {
            module.update(dt)?;
        }
        Ok(())
    }

    /// Read every module's current state
    pub fn states(&mut self) -> Result<Corners<ModuleState>> {
        Ok(Corners::new(
            self.modules.front_left.state()?,
            self.modules.front_right.state()?,
            self.modules.rear_left.state()?,
            self.modules.rear_right.state()?,
        ))
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    pub fn counts_per_pivot_revolution(&self) -> f64 {
        self.counts_per_pivot_revolution
    }
}

/// Slot-by-slot construction of a [`SwerveDrive`]
pub struct SwerveDriveBuilder<'a> {
    base_width: f64,
    base_length: f64,
    counts_per_pivot_revolution: f64,
    modules: Corners<Option<ModuleRef<'a>>>,
    configure: Option<Configurator<'a>>,
}

impl Default for SwerveDriveBuilder<'_> {
    fn default() -> Self {
        Self {
            base_width: 1.0,
            base_length: 1.0,
            counts_per_pivot_revolution: 360.0,
            modules: Corners::default(),
            configure: None,
        }
    }
}

impl<'a> SwerveDriveBuilder<'a> {
    pub fn base(mut self, width: f64, length: f64) -> Self {
        self.base_width = width;
        self.base_length = length;
        self
    }

    pub fn counts_per_pivot_revolution(mut self, counts: f64) -> Self {
        self.counts_per_pivot_revolution = counts;
        self
    }

    /// Bind a module to a corner, replacing any earlier binding
    pub fn module(mut self, position: WheelPosition, module: ModuleRef<'a>) -> Self {
        *self.modules.get_mut(position) = Some(module);
        self
    }

    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnMut(&mut dyn SwerveModule) -> Result<()> + 'a,
    {
        self.configure = Some(Box::new(configure));
        self
    }

    pub fn build(self) -> Result<SwerveDrive<'a>> {
        SwerveDrive::build(
            self.base_width,
            self.base_length,
            self.counts_per_pivot_revolution,
            self.modules,
            self.configure,
        )
    }
}
