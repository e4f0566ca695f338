// Feetech STS-series servo bus
//
// Every exchange is one instruction packet followed (except for broadcasts) by
// one status packet:
//   instruction: [0xFF, 0xFF, id, len, instruction, params..., checksum]
//   status:      [0xFF, 0xFF, id, len, error, params..., checksum]
// `len` counts everything after itself; the checksum is the inverted low byte
// of the sum of id, len and the body.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Position resolution of the STS3215
pub const STEPS_PER_REVOLUTION: u16 = 4096;

const HEADER: [u8; 2] = [0xFF, 0xFF];

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

/// Control table addresses used by the swerve adapter
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    PCoefficient = 21,
    DCoefficient = 22,
    ICoefficient = 23,
    OperatingMode = 33,
    TorqueEnable = 40,
    GoalPosition = 42,
    GoalVelocity = 46,
    Lock = 55,
    PresentPosition = 56,
    PresentVelocity = 58,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Position = 0,
    Velocity = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum FeetechError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from servo {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("Checksum mismatch for servo {id}")]
    ChecksumMismatch { id: u8 },

    #[error("Servo {id} reported error status 0x{status:02X}")]
    MotorError { id: u8, status: u8 },

    #[error("Timeout waiting for servo {id}")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, FeetechError>;

fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Frame an instruction packet
pub fn encode_packet(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(params.len() + 6);
    packet.extend_from_slice(&HEADER);
    packet.push(id);
    packet.push((params.len() + 2) as u8);
    packet.push(instruction as u8);
    packet.extend_from_slice(params);
    packet.push(checksum(&packet[2..]));
    packet
}

/// Bit 15 carries the sign, bits 0-14 the magnitude
pub fn to_sign_magnitude(value: i16) -> u16 {
    if value < 0 {
        0x8000 | value.unsigned_abs()
    } else {
        value as u16
    }
}

pub fn from_sign_magnitude(raw: u16) -> i16 {
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 == 0 { magnitude } else { -magnitude }
}

/// Servo bus over any byte stream; a serial port by default
pub struct FeetechBus<P = Box<dyn SerialPort>> {
    port: P,
}

impl FeetechBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;
        Ok(Self::new(port))
    }
}

impl<P: Read + Write> FeetechBus<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn send(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<()> {
        let packet = encode_packet(id, instruction, params);
        self.port.write_all(&packet)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, id: u8, buf: &mut [u8]) -> Result<()> {
        self.port.read_exact(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::UnexpectedEof => {
                FeetechError::Timeout { id }
            }
            _ => FeetechError::Io(e),
        })
    }

    /// Read one status packet and return its parameter bytes
    fn receive(&mut self, id: u8) -> Result<Vec<u8>> {
        let mut head = [0u8; 4];
        self.read_exact(id, &mut head)?;

        if head[..2] != HEADER {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("bad header {:02X?}", &head[..2]),
            });
        }
        if head[2] != id {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("reply came from servo {}", head[2]),
            });
        }
        let len = head[3] as usize;
        if len < 2 {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("length {} too short", len),
            });
        }

        let mut body = vec![0u8; len];
        self.read_exact(id, &mut body)?;

        let (payload, received) = body.split_at(len - 1);
        let expected = !head[2..]
            .iter()
            .chain(payload)
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        if expected != received[0] {
            return Err(FeetechError::ChecksumMismatch { id });
        }

        let status = payload[0];
        if status != 0 {
            return Err(FeetechError::MotorError { id, status });
        }

        Ok(payload[1..].to_vec())
    }

    fn transact(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<Vec<u8>> {
        self.send(id, instruction, params)?;
        self.receive(id)
    }

    /// `Ok(false)` when the servo does not answer
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        match self.transact(id, Instruction::Ping, &[]) {
            Ok(_) => Ok(true),
            Err(FeetechError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn read_word(&mut self, id: u8, register: Register) -> Result<u16> {
        let data = self.transact(id, Instruction::Read, &[register as u8, 2])?;
        match data.as_slice() {
            [lo, hi, ..] => Ok(u16::from_le_bytes([*lo, *hi])),
            _ => Err(FeetechError::InvalidResponse {
                id,
                reason: format!("expected 2 bytes, got {}", data.len()),
            }),
        }
    }

    pub fn write_byte(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        debug!("servo {} {:?} <- {}", id, register, value);
        self.transact(id, Instruction::Write, &[register as u8, value])?;
        Ok(())
    }

    pub fn write_word(&mut self, id: u8, register: Register, value: u16) -> Result<()> {
        debug!("servo {} {:?} <- {}", id, register, value);
        let [lo, hi] = value.to_le_bytes();
        self.transact(id, Instruction::Write, &[register as u8, lo, hi])?;
        Ok(())
    }

    pub fn set_torque(&mut self, id: u8, enabled: bool) -> Result<()> {
        let flag = u8::from(enabled);
        self.write_byte(id, Register::TorqueEnable, flag)?;
        self.write_byte(id, Register::Lock, flag)
    }

    /// Torque must be off while changing mode
    pub fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        self.write_byte(id, Register::OperatingMode, mode as u8)
    }

    pub fn set_goal_position(&mut self, id: u8, steps: u16) -> Result<()> {
        self.write_word(id, Register::GoalPosition, steps % STEPS_PER_REVOLUTION)
    }

    pub fn set_goal_velocity(&mut self, id: u8, velocity: i16) -> Result<()> {
        self.write_word(id, Register::GoalVelocity, to_sign_magnitude(velocity))
    }

    pub fn present_position(&mut self, id: u8) -> Result<u16> {
        self.read_word(id, Register::PresentPosition)
    }

    pub fn present_velocity(&mut self, id: u8) -> Result<i16> {
        Ok(from_sign_magnitude(
            self.read_word(id, Register::PresentVelocity)?,
        ))
    }
}
