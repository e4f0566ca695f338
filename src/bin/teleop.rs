// Keyboard teleop: WASD move, Z/X rotate, R/F speed, H field-centric, J/K heading, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use swerve_zenoh_runtime::config::TOPIC_CMD_DRIVE;
use swerve_zenoh_runtime::messages::DriveCommand;
use tracing::info;

const SPEEDS: [f64; 3] = [0.25, 0.5, 1.0]; // fraction of full output
const HEADING_STEP: f64 = 15.0; // degrees
const INPUT_TIMEOUT_MS: u64 = 100; // Reset inputs after this much time with no key

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: WASD=move, Z/X=rotate, R/F=speed, H=field-centric, J/K=heading, Q=quit");
    info!("Speed: LOW, robot-centric");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;
    let mut field_centric = false;
    let mut heading = 0.0f64;

    let mut forward = 0.0;
    let mut strafe = 0.0;
    let mut rotation = 0.0;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let speed = SPEEDS[speed_idx];

                match code {
                    KeyCode::Char('w') if pressed => {
                        forward = speed;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        forward = -speed;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        strafe = speed;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        strafe = -speed;
                        last_movement_input = Instant::now();
                    }

                    // Rotation (clockwise positive)
                    KeyCode::Char('x') if pressed => {
                        rotation = speed;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('z') if pressed => {
                        rotation = -speed;
                        last_movement_input = Instant::now();
                    }

                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(SPEEDS.len() - 1);
                        print_mode(speed_idx, field_centric, heading);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_mode(speed_idx, field_centric, heading);
                    }

                    KeyCode::Char('h') if pressed => {
                        field_centric = !field_centric;
                        print_mode(speed_idx, field_centric, heading);
                    }
                    KeyCode::Char('k') if pressed => {
                        heading = (heading + HEADING_STEP).rem_euclid(360.0);
                        print_mode(speed_idx, field_centric, heading);
                    }
                    KeyCode::Char('j') if pressed => {
                        heading = (heading - HEADING_STEP).rem_euclid(360.0);
                        print_mode(speed_idx, field_centric, heading);
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            forward = 0.0;
            strafe = 0.0;
            rotation = 0.0;
        }

        // Always publish at ~50Hz
        let cmd = DriveCommand {
            forward,
            strafe,
            rotation,
            heading: field_centric.then_some(heading),
        };
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_mode(idx: usize, field_centric: bool, heading: f64) {
    let label = ["LOW", "MED", "HIGH"][idx];
    if field_centric {
        info!("Speed: {}, field-centric at {:.0}°", label, heading);
    } else {
        info!("Speed: {}, robot-centric", label);
    }
}
