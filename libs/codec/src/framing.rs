//! Streaming Trace File Writer
//!
//! Emits the file framing incrementally:
//!
//! ```text
//! [ <header>, [
//! <event>,
//! <event>
//! ]]
//! ```
//!
//! The header and the body opener are written on construction and each event
//! is appended as soon as it is handed over, so nothing is buffered beyond the
//! underlying writer. Closing brackets are written by `finish`, or by `Drop`
//! when the owner never got that far, so the file is always a complete JSON
//! document even if its content stops early.
//!
//! The one exception is a failed write or flush: the stream may then end
//! inside a record, so the writer is poisoned and never appends the closing
//! brackets. Such a file is reported as truncated by the reader rather than
//! silently parsing with a damaged last event.

use crate::error::{Result, TraceFileError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use types::{TraceEvent, TraceHeader};

pub struct TraceFileWriter<W: Write> {
    writer: Option<W>,
    events_written: u64,
    /// Set once the underlying stream failed mid-write
    poisoned: bool,
}

impl TraceFileWriter<BufWriter<File>> {
    /// Create (truncate) `path` and write the header
    pub fn create(path: impl AsRef<Path>, header: &TraceHeader) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), header)
    }
}

impl<W: Write> TraceFileWriter<W> {
    pub fn new(mut writer: W, header: &TraceHeader) -> Result<Self> {
        writer.write_all(b"[")?;
        serde_json::to_writer(&mut writer, header)?;
        writer.write_all(b",[")?;
        Ok(Self {
            writer: Some(writer),
            events_written: 0,
            poisoned: false,
        })
    }

    /// Append one event in its canonical array form
    pub fn write_event(&mut self, event: &TraceEvent) -> Result<()> {
        if self.poisoned {
            return Err(TraceFileError::Poisoned);
        }
        let writer = self.writer.as_mut().ok_or(TraceFileError::Closed)?;

        // Encode fully before touching the stream so a serialization failure
        // never leaves half an event behind.
        let mut record = Vec::with_capacity(64);
        if self.events_written > 0 {
            record.push(b',');
        }
        record.push(b'\n');
        serde_json::to_writer(&mut record, event)?;

        if let Err(e) = writer.write_all(&record) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.events_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(TraceFileError::Poisoned);
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writer.flush().map_err(|e| {
            self.poisoned = true;
            e.into()
        })
    }

    /// Close body and outer arrays and flush. Later calls are no-ops.
    pub fn finish(&mut self) -> Result<()> {
        self.close().map(|_| ())
    }

    /// Finish and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?.ok_or(TraceFileError::Closed)
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    pub fn is_finished(&self) -> bool {
        self.writer.is_none()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn close(&mut self) -> Result<Option<W>> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(None);
        };
        if self.poisoned {
            tracing::warn!(
                events = self.events_written,
                "Trace file left unterminated after write failure"
            );
            return Err(TraceFileError::Poisoned);
        }
        writer.write_all(b"\n]]")?;
        writer.flush()?;
        Ok(Some(writer))
    }
}

impl<W: Write> Drop for TraceFileWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "Failed to close trace file on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::EventKind;

    fn header() -> TraceHeader {
        TraceHeader::new("unit", [EventKind::LatencyMeasurement]).with_timestamp(5)
    }

    #[test]
    fn test_empty_body_is_valid_json() {
        let writer = TraceFileWriter::new(Vec::new(), &header()).unwrap();
        let bytes = writer.into_inner().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[1], serde_json::json!([]));
        assert_eq!(value[0]["description"], "unit");
    }

    #[test]
    fn test_events_are_comma_separated() {
        let mut writer = TraceFileWriter::new(Vec::new(), &header()).unwrap();
        writer.write_event(&TraceEvent::latency(10)).unwrap();
        writer.write_event(&TraceEvent::latency(20)).unwrap();
        assert_eq!(writer.events_written(), 2);

        let bytes = writer.into_inner().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[1], serde_json::json!([[4, 10], [4, 20]]));
    }

    #[test]
    fn test_write_after_finish_rejected() {
        let mut writer = TraceFileWriter::new(Vec::new(), &header()).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
        assert!(writer.is_finished());
        assert!(matches!(
            writer.write_event(&TraceEvent::latency(1)),
            Err(TraceFileError::Closed)
        ));
    }

    #[test]
    fn test_drop_closes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.trace");
        {
            let mut writer = TraceFileWriter::create(&path, &header()).unwrap();
            writer.write_event(&TraceEvent::throughput(3, 500)).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[1], serde_json::json!([[5, 3, 500]]));
    }

    /// Accepts `budget` bytes, then fails every write
    struct ShortWriter {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let room = self.budget - self.written.len();
            if room == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            let n = room.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// `[` header `,[`
    fn opener_len() -> usize {
        serde_json::to_vec(&header()).unwrap().len() + 3
    }

    #[test]
    fn test_failed_write_never_closes_partial_record() {
        let sink = ShortWriter {
            // room for the opener plus part of the first record
            budget: opener_len() + 6,
            written: Vec::new(),
        };
        let mut writer = TraceFileWriter::new(sink, &header()).unwrap();

        assert!(matches!(
            writer.write_event(&TraceEvent::throughput(3, 500)),
            Err(TraceFileError::Io(_))
        ));
        assert!(writer.is_poisoned());
        assert_eq!(writer.events_written(), 0);
        assert!(matches!(
            writer.write_event(&TraceEvent::latency(1)),
            Err(TraceFileError::Poisoned)
        ));
        assert!(matches!(writer.finish(), Err(TraceFileError::Poisoned)));
        assert!(writer.is_finished());
        // later calls stay no-ops
        assert!(writer.finish().is_ok());
    }

    #[test]
    fn test_poisoned_file_reads_as_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poisoned.trace");
        let sink = ShortWriter {
            budget: opener_len() + 6,
            written: Vec::new(),
        };
        let mut writer = TraceFileWriter::new(sink, &header()).unwrap();
        writer.write_event(&TraceEvent::throughput(3, 500)).unwrap_err();
        let written = writer.writer.as_ref().unwrap().written.clone();
        drop(writer);

        std::fs::write(&path, &written).unwrap();
        let result = crate::read_all(&path);
        assert!(matches!(result, Err(ref e) if e.is_malformed()));
    }
}
