// Position sensor abstraction with offset-based zeroing

use super::error::Result;

/// A raw position sensor.
///
/// Readings are native sensor units; conversion to degrees happens in the
/// drive, not here.
pub trait Encoder {
    fn get(&mut self) -> Result<f64>;

    /// Redefine the current position as `value`
    fn set(&mut self, value: f64) -> Result<()>;

    fn zero(&mut self) -> Result<()> {
        self.set(0.0)
    }
}

/// A sensor that can only be read (analog absolute encoders, servo position registers)
pub trait PositionSource {
    fn read_raw(&mut self) -> Result<f64>;
}

impl<F> PositionSource for F
where
    F: FnMut() -> Result<f64>,
{
    fn read_raw(&mut self) -> Result<f64> {
        self()
    }
}

/// Encoder over a read-only source. Setting the position stores an offset
/// from the raw reading instead of writing to the sensor.
#[derive(Debug, Clone)]
pub struct OffsetEncoder<S> {
    source: S,
    offset: f64,
}

impl<S: PositionSource> OffsetEncoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            offset: 0.0,
        }
    }

    /// Amount subtracted from every raw reading
    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl<S: PositionSource> Encoder for OffsetEncoder<S> {
    fn get(&mut self) -> Result<f64> {
        Ok(self.source.read_raw()? - self.offset)
    }

    fn set(&mut self, value: f64) -> Result<()> {
        self.offset = self.source.read_raw()? - value;
        Ok(())
    }
}

/// In-memory encoder for simulated modules
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VirtualEncoder {
    position: f64,
}

impl VirtualEncoder {
    pub fn new(position: f64) -> Self {
        Self { position }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn advance(&mut self, delta: f64) {
        self.position += delta;
    }
}

impl Encoder for VirtualEncoder {
    fn get(&mut self) -> Result<f64> {
        Ok(self.position)
    }

    fn set(&mut self, value: f64) -> Result<()> {
        self.position = value;
        Ok(())
    }
}
