//! CSV logging of drift samples

use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::DriftSample;

/// Writes one CSV row per drift sample, with a header row
pub struct CsvDriftLog<T: Write> {
    writer: csv::Writer<T>,
    rows: usize,
}

impl CsvDriftLog<File> {
    /// Create (or truncate) a CSV file
    pub fn create(path: impl AsRef<Path>) -> crate::Result<Self> {
        Ok(CsvDriftLog {
            writer: csv::Writer::from_path(path)?,
            rows: 0,
        })
    }
}

impl<T: Write> CsvDriftLog<T> {
    /// Log into an arbitrary writer
    pub fn from_writer(inner: T) -> Self {
        CsvDriftLog {
            writer: csv::Writer::from_writer(inner),
            rows: 0,
        }
    }

    /// Append a sample
    pub fn record(&mut self, sample: &DriftSample) -> crate::Result<()> {
        self.writer.serialize(sample)?;
        self.rows += 1;
        Ok(())
    }

    /// Number of samples written
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> crate::Result<T> {
        self.writer
            .into_inner()
            .map_err(|e| crate::SiderealError::Io(e.into_error()))
    }

    /// Flush buffered rows
    pub fn flush(&mut self) -> crate::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
