//! WAV rendering of the simulated output pin
//!
//! Writes one 16-bit mono sample per sampling event, so the file plays back at
//! the sampling rate and the pin waveform can be inspected in any audio editor
//! or fed to a frequency counter.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::{PinMode, PinOutput, PulseSink};
use crate::{Result, SiderealError};

/// Sample value for a high pin; low is the negation
const PIN_HIGH_LEVEL: i16 = i16::MAX / 2;

/// Pulse sink that records the pin level to a WAV file
pub struct WavPulseWriter {
    pin: PinOutput,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    samples_written: u64,
}

impl WavPulseWriter {
    /// Create the WAV file
    ///
    /// `sampling_rate` is rounded to the nearest integer sample rate.
    pub fn create<P: AsRef<Path>>(path: P, sampling_rate: f64, mode: PinMode) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sampling_rate.round() as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path.as_ref(), spec).map_err(|e| {
            SiderealError::AudioFileError(format!("Failed to create WAV file: {}", e))
        })?;
        Ok(WavPulseWriter {
            pin: PinOutput::new(mode),
            writer: Some(writer),
            samples_written: 0,
        })
    }

    /// Samples written so far
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}

impl PulseSink for WavPulseWriter {
    fn on_event(&mut self, pulse: bool) -> Result<()> {
        let level = self.pin.drive(pulse);
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SiderealError::AudioFileError("WAV file already finalized".into()))?;
        writer
            .write_sample(if level { PIN_HIGH_LEVEL } else { -PIN_HIGH_LEVEL })
            .map_err(|e| SiderealError::AudioFileError(format!("Failed to write sample: {}", e)))?;
        self.samples_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|e| {
                SiderealError::AudioFileError(format!("Failed to finalize WAV file: {}", e))
            })?;
        }
        Ok(())
    }
}
