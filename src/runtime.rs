// Periodic drive loop with watchdog
// Note: the watchdog stops the base when commands stop arriving, so a crashed
// teleop or planner never leaves the robot driving on its last command.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{
    Backend, CMD_TIMEOUT, RuntimeArgs, SERVO_IDS, SIM_PIVOT_P, TOPIC_CMD_DRIVE, TOPIC_HEALTH,
    TOPIC_STATE_MODULES,
};
use crate::messages::{DriveCommand, DriveTelemetry, RuntimeHealth};
use crate::motor::{FeetechBus, FeetechSwerveModule, SharedBus};
use crate::swerve::{self, Axis, Corners, PidTerm, SwerveDrive, SwerveModule, VirtualSwerveModule};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct Runtime {
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    timeout: Duration,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(timeout: Duration) -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            timeout,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: DriveCommand) {
        self.on_command_at(cmd, Instant::now());
    }

    pub fn on_command_at(&mut self, cmd: DriveCommand, received_at: Instant) {
        debug!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = received_at;
    }

    /// Run one control tick against the drive and return the resulting health.
    ///
    /// A stale or missing command stops the base. A failed tick is reported as
    /// `HardwareFault`; the next tick tries again.
    pub fn tick(&mut self, drive: &mut SwerveDrive<'_>) -> RuntimeHealth {
        let cmd_age = self.cmd_received_at.elapsed();

        let result = match self.latest_cmd {
            Some(cmd) if cmd_age <= self.timeout => {
                self.health = RuntimeHealth::Ok;
                match cmd.heading {
                    Some(heading) => {
                        drive.drive_field_centric(cmd.forward, cmd.strafe, cmd.rotation, heading)
                    }
                    None => drive.drive(cmd.forward, cmd.strafe, cmd.rotation),
                }
            }
            _ => {
                // Watchdog triggered - stop the robot
                if self.health == RuntimeHealth::Ok {
                    warn!("Command stale ({:?} old), stopping drive", cmd_age);
                }
                self.health = RuntimeHealth::CmdStale;
                drive.stop()
            }
        };

        if let Err(e) = result {
            if self.health != RuntimeHealth::HardwareFault {
                warn!("Drive tick failed: {}", e);
            }
            self.health = RuntimeHealth::HardwareFault;
        }

        self.health
    }
}

fn build_drive<'a>(
    args: &RuntimeArgs,
    modules: Corners<Option<&'a mut dyn SwerveModule>>,
    pivot_p: Option<f64>,
) -> swerve::Result<SwerveDrive<'a>> {
    match pivot_p {
        Some(p) => SwerveDrive::with_configurator(
            args.base_width,
            args.base_length,
            args.counts_per_rev,
            modules,
            move |module| module.set_pid_term(Axis::Pivot, PidTerm::P, p),
        ),
        None => SwerveDrive::new(
            args.base_width,
            args.base_length,
            args.counts_per_rev,
            modules,
        ),
    }
}

pub async fn run(args: RuntimeArgs) -> Result<(), BoxError> {
    match args.backend {
        Backend::Sim => {
            info!("Using simulated modules");
            let mut modules = Corners::from_fn(|_| VirtualSwerveModule::new());
            let slots = modules
                .each_mut()
                .map(|_, m| Some(m as &mut dyn SwerveModule));
            let pivot_p = args.pivot_p.unwrap_or(SIM_PIVOT_P);
            let mut drive = build_drive(&args, slots, Some(pivot_p))?;
            drive_loop(&mut drive, &args).await
        }
        Backend::Feetech => {
            info!("Opening servo bus on {}", args.port);
            let bus: SharedBus = Rc::new(RefCell::new(FeetechBus::open(&args.port)?));
            let mut modules = SERVO_IDS.map(|_, ids| FeetechSwerveModule::new(Rc::clone(&bus), ids));
            for (position, module) in modules.iter_mut() {
                info!("Initializing {} module", position);
                module.initialize()?;
            }
            let slots = modules
                .each_mut()
                .map(|_, m| Some(m as &mut dyn SwerveModule));
            let mut drive = build_drive(&args, slots, args.pivot_p)?;
            drive_loop(&mut drive, &args).await
        }
    }
}

async fn drive_loop(drive: &mut SwerveDrive<'_>, args: &RuntimeArgs) -> Result<(), BoxError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_modules = session.declare_publisher(TOPIC_STATE_MODULES).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let period = args.tick_period();
    let mut runtime = Runtime::new(CMD_TIMEOUT);
    let mut tick = interval(period);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        args.loop_hz,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}, {}", TOPIC_STATE_MODULES, TOPIC_HEALTH);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down, resetting drive");
                drive.reset()?;
                return Ok(());
            }
            _ = tick.tick() => {}
        }

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 2. Command the modules (includes watchdog logic)
        let health = runtime.tick(drive);
        if let Err(e) = drive.update(period) {
            warn!("Module update failed: {}", e);
        }

        // 3. Publish module telemetry
        match drive.states() {
            Ok(states) => {
                let telemetry_json = serde_json::to_string(&DriveTelemetry::from(&states))?;
                pub_modules.put(telemetry_json).await?;
            }
            Err(e) => warn!("Failed to read module states: {}", e),
        }

        // 4. Publish health
        let health_json = serde_json::to_string(&health)?;
        pub_health.put(health_json).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swerve::module::mock::RecordingModule;
    use crate::swerve::ModuleState;

    fn command(forward: f64, heading: Option<f64>) -> DriveCommand {
        DriveCommand {
            forward,
            strafe: 0.0,
            rotation: 0.0,
            heading,
        }
    }

    fn sim_drive(modules: &mut Corners<VirtualSwerveModule>) -> SwerveDrive<'_> {
        let slots = modules
            .each_mut()
            .map(|_, m| Some(m as &mut dyn SwerveModule));
        SwerveDrive::new(1.0, 1.0, 4096.0, slots).unwrap()
    }

    #[test]
    fn test_stale_until_first_command() {
        let mut modules = Corners::from_fn(|_| VirtualSwerveModule::new());
        let mut drive = sim_drive(&mut modules);
        let mut runtime = Runtime::new(CMD_TIMEOUT);

        assert_eq!(runtime.tick(&mut drive), RuntimeHealth::CmdStale);
        for (_, state) in drive.states().unwrap().iter() {
            assert_eq!(state, &ModuleState::default());
        }
    }

    #[test]
    fn test_fresh_command_drives() {
        let mut modules = Corners::from_fn(|_| VirtualSwerveModule::new());
        let mut drive = sim_drive(&mut modules);
        let mut runtime = Runtime::new(CMD_TIMEOUT);

        runtime.on_command(command(0.5, None));
        assert_eq!(runtime.tick(&mut drive), RuntimeHealth::Ok);
        drop(drive);

        for (_, module) in modules.iter() {
            assert_eq!(module.speed(Axis::Drive), 0.5);
            assert_eq!(module.reference(Axis::Pivot), Some(0.0));
        }
    }

    #[test]
    fn test_heading_selects_field_centric() {
        let mut modules = Corners::from_fn(|_| VirtualSwerveModule::new());
        let mut drive = sim_drive(&mut modules);
        let mut runtime = Runtime::new(CMD_TIMEOUT);

        runtime.on_command(command(1.0, Some(90.0)));
        runtime.tick(&mut drive);
        drop(drive);

        // Forward at heading 90 is a quarter turn of the pivot
        let reference = modules.front_left.reference(Axis::Pivot).unwrap();
        assert!((reference - 1024.0).abs() < 1e-6, "{}", reference);
    }

    #[test]
    fn test_old_command_trips_watchdog() {
        let mut modules = Corners::from_fn(|_| VirtualSwerveModule::new());
        let mut drive = sim_drive(&mut modules);
        let mut runtime = Runtime::new(CMD_TIMEOUT);

        runtime.on_command(command(0.5, None));
        assert_eq!(runtime.tick(&mut drive), RuntimeHealth::Ok);

        let old = Instant::now()
            .checked_sub(CMD_TIMEOUT * 4)
            .unwrap();
        runtime.on_command_at(command(0.5, None), old);
        assert_eq!(runtime.tick(&mut drive), RuntimeHealth::CmdStale);
        drop(drive);

        for (_, module) in modules.iter() {
            assert_eq!(module.speed(Axis::Drive), 0.0);
        }
    }

    #[test]
    fn test_hardware_fault_reported_and_recovers() {
        let mut modules = Corners::from_fn(|_| RecordingModule::default());
        modules.rear_left.fail_on = Some("set_reference");
        let mut runtime = Runtime::new(CMD_TIMEOUT);
        runtime.on_command(command(0.5, None));

        {
            let slots = modules
                .each_mut()
                .map(|_, m| Some(m as &mut dyn SwerveModule));
            let mut drive = SwerveDrive::new(1.0, 1.0, 360.0, slots).unwrap();
            assert_eq!(runtime.tick(&mut drive), RuntimeHealth::HardwareFault);
        }
        // The failing module aborts the tick before RearRight is reached
        assert_eq!(modules.front_right.references().len(), 1);
        assert!(modules.rear_right.calls.is_empty());

        modules.rear_left.fail_on = None;
        let slots = modules
            .each_mut()
            .map(|_, m| Some(m as &mut dyn SwerveModule));
        let mut drive = SwerveDrive::new(1.0, 1.0, 360.0, slots).unwrap();
        assert_eq!(runtime.tick(&mut drive), RuntimeHealth::Ok);
    }

    #[test]
    fn test_configured_sim_pivot_tracks_reference() {
        let args = RuntimeArgs {
            backend: Backend::Sim,
            port: String::new(),
            base_width: 1.0,
            base_length: 1.0,
            counts_per_rev: 4096.0,
            loop_hz: 50,
            pivot_p: None,
        };
        let mut modules = Corners::from_fn(|_| VirtualSwerveModule::new());
        let slots = modules
            .each_mut()
            .map(|_, m| Some(m as &mut dyn SwerveModule));
        let mut drive = build_drive(&args, slots, Some(SIM_PIVOT_P)).unwrap();

        for _ in 0..100 {
            drive.drive(0.0, 1.0, 0.0).unwrap();
            drive.update(args.tick_period()).unwrap();
        }
        for (_, state) in drive.states().unwrap().iter() {
            assert!((state.pivot_position - 1024.0).abs() < 5.0, "{:?}", state);
        }
    }
}
