//! Trace file writer stage
//!
//! Terminal stage of every pipeline. The header and body opener are on disk as
//! soon as the writer exists; each applied event is appended in arrival order
//! and `on_stop` closes the framing, including after a failed write.

use crate::actor::{Handler, MailboxActor};
use crate::error::Result;
use codec::TraceFileWriter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use types::{TraceEvent, TraceHeader};

pub struct TraceWriter<W: Write> {
    file: TraceFileWriter<W>,
    target: String,
}

impl TraceWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, header: &TraceHeader) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let file = TraceFileWriter::create(&path, header)?;
        info!(
            path = %path.display(),
            description = %header.description,
            kinds = header.kinds().len(),
            "Trace file opened"
        );
        Ok(Self {
            file,
            target: path.display().to_string(),
        })
    }
}

impl<W: Write> TraceWriter<W> {
    /// Writer over an arbitrary byte sink, labelled `target` in logs
    pub fn new(writer: W, header: &TraceHeader, target: impl Into<String>) -> Result<Self> {
        Ok(Self {
            file: TraceFileWriter::new(writer, header)?,
            target: target.into(),
        })
    }

    pub fn events_written(&self) -> u64 {
        self.file.events_written()
    }
}

impl<W: Write + Send + 'static> Handler<TraceEvent> for TraceWriter<W> {
    fn apply(&mut self, event: TraceEvent) -> Result<()> {
        self.file.write_event(&event)?;
        Ok(())
    }

    fn on_stop(&mut self) -> Result<()> {
        let result = self.file.finish();
        match &result {
            Ok(()) => info!(
                target_file = %self.target,
                events = self.file.events_written(),
                "Trace file closed"
            ),
            Err(e) => warn!(
                target_file = %self.target,
                error = %e,
                "Trace file closed after write failure"
            ),
        }
        Ok(result?)
    }
}

/// Open `path` and start a writer actor for it
pub fn spawn_writer(
    path: impl AsRef<Path>,
    header: &TraceHeader,
) -> Result<MailboxActor<TraceEvent>> {
    let writer = TraceWriter::create(path, header)?;
    MailboxActor::spawn("trace-writer", writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, ActorState};
    use parking_lot::Mutex;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use types::EventKind;

    fn wait_until(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// In-memory sink that starts failing once `failing` is set
    struct FlakySink {
        bytes: Arc<Mutex<Vec<u8>>>,
        failing: Arc<AtomicBool>,
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.bytes.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_spawned_writer_produces_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("writer.trace");
        let header = TraceHeader::new("writer", [EventKind::LatencyMeasurement]);

        let actor = spawn_writer(&path, &header).unwrap();
        for micros in 0..100 {
            assert!(actor.send(TraceEvent::latency(micros)));
        }
        assert!(actor.stop());

        let (read_header, events) = codec::read_all(&path).unwrap();
        assert_eq!(read_header, header);
        assert_eq!(events.len(), 100);
        assert_eq!(events[99], TraceEvent::latency(99));
    }

    #[test]
    fn test_write_failure_terminates_writer() {
        let bytes = Arc::new(Mutex::new(Vec::new()));
        let header = TraceHeader::new("flaky", [EventKind::LatencyMeasurement]);
        let failing = Arc::new(AtomicBool::new(false));
        let sink = FlakySink {
            bytes: Arc::clone(&bytes),
            failing: Arc::clone(&failing),
        };
        let writer = TraceWriter::new(sink, &header, "flaky").unwrap();
        let actor = MailboxActor::spawn("flaky-writer", writer).unwrap();

        assert!(actor.send(TraceEvent::latency(1)));
        wait_until(|| actor.processed() == 1);
        failing.store(true, Ordering::SeqCst);

        actor.send(TraceEvent::latency(2));
        actor.send(TraceEvent::latency(3));
        wait_until(|| actor.state() == ActorState::Terminated);
        assert!(!actor.send(TraceEvent::latency(4)));
        assert!(!actor.stop());
        assert_eq!(actor.processed(), 1);

        let text = String::from_utf8(bytes.lock().clone()).unwrap();
        assert!(text.ends_with("[4,1]"), "unexpected content: {text}");
    }
}
