//! Streaming Trace File Reader
//!
//! Pulls one event at a time from a `[ header, [ event, ... ] ]` file without
//! ever materializing the body. The header is validated on construction; after
//! that the reader alternates between expecting an event (or the body close)
//! and being done:
//!
//! ```text
//! open ──'[' header ',' '['──> ExpectEventOrEnd{first} ──']' ']' EOF──> Done
//!                                   │   ▲                               ▲
//!                                   └───┘ event / ',' event             │
//!                                   └──────── malformed ────────────────┘
//! ```
//!
//! Each value is handed to `serde_json` straight off the stream. Objects and
//! arrays end on their closing delimiter, so nothing past the value is
//! consumed and structural tokens can be checked byte by byte around them.

use crate::error::{Result, TraceFileError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use types::{TraceEvent, TraceHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    ExpectEventOrEnd { first: bool },
    Done,
}

/// Lazy, finite, non-restartable sequence of events from one trace file
pub struct TraceEventIterator<R: BufRead> {
    reader: Option<R>,
    header: TraceHeader,
    state: ReadState,
    events_read: u64,
}

impl TraceEventIterator<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: BufRead> TraceEventIterator<R> {
    /// Validate the outer opener, the header and the body opener
    pub fn from_reader(mut reader: R) -> Result<Self> {
        expect(&mut reader, b'[', "'['", 0)?;
        let header: TraceHeader = read_value(&mut reader)?;
        expect(&mut reader, b',', "','", 0)?;
        expect(&mut reader, b'[', "'['", 0)?;

        Ok(Self {
            reader: Some(reader),
            header,
            state: ReadState::ExpectEventOrEnd { first: true },
            events_read: 0,
        })
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    pub fn events_read(&self) -> u64 {
        self.events_read
    }

    pub fn is_done(&self) -> bool {
        self.state == ReadState::Done
    }

    /// Next event, `Ok(None)` once the body closed cleanly, or the error that
    /// ended the stream. Every outcome after the first `None` or error is
    /// `Ok(None)`.
    pub fn next_event(&mut self) -> Result<Option<TraceEvent>> {
        match self.step() {
            Ok(event) => Ok(event),
            Err(e) => {
                self.state = ReadState::Done;
                self.reader = None;
                Err(e)
            }
        }
    }

    fn step(&mut self) -> Result<Option<TraceEvent>> {
        let first = match self.state {
            ReadState::ExpectEventOrEnd { first } => first,
            ReadState::Done => return Ok(None),
        };
        let Some(reader) = self.reader.as_mut() else {
            self.state = ReadState::Done;
            return Ok(None);
        };

        match peek_token(reader)? {
            Some(b']') => {
                reader.consume(1);
                expect(reader, b']', "']'", self.events_read)?;
                if let Some(trailing) = peek_token(reader)? {
                    return Err(TraceFileError::malformed(
                        "end of stream",
                        Some(trailing),
                        self.events_read,
                    ));
                }
                self.state = ReadState::Done;
                self.reader = None;
                tracing::debug!(events = self.events_read, "Trace file fully read");
                Ok(None)
            }
            Some(b',') if !first => {
                reader.consume(1);
                self.read_event()
            }
            Some(b'[') if first => self.read_event(),
            found => Err(TraceFileError::malformed(
                if first { "event or ']'" } else { "',' or ']'" },
                found,
                self.events_read,
            )),
        }
    }

    fn read_event(&mut self) -> Result<Option<TraceEvent>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let event: TraceEvent = read_value(reader)?;
        self.events_read += 1;
        self.state = ReadState::ExpectEventOrEnd { first: false };
        Ok(Some(event))
    }
}

impl<R: BufRead> Iterator for TraceEventIterator<R> {
    type Item = Result<TraceEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

impl<R: BufRead> std::iter::FusedIterator for TraceEventIterator<R> {}

/// Read a whole capture into memory
pub fn read_all(path: impl AsRef<Path>) -> Result<(TraceHeader, Vec<TraceEvent>)> {
    let mut iter = TraceEventIterator::open(path)?;
    let mut events = Vec::new();
    while let Some(event) = iter.next_event()? {
        events.push(event);
    }
    Ok((iter.header().clone(), events))
}

/// Skip whitespace and return the next byte without consuming it
fn peek_token<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    loop {
        let (skip, next) = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            (skip, buf.get(skip).copied())
        };
        reader.consume(skip);
        if next.is_some() {
            return Ok(next);
        }
    }
}

fn expect<R: BufRead>(
    reader: &mut R,
    token: u8,
    expected: &'static str,
    events_read: u64,
) -> Result<()> {
    match peek_token(reader)? {
        Some(found) if found == token => {
            reader.consume(1);
            Ok(())
        }
        found => Err(TraceFileError::malformed(expected, found, events_read)),
    }
}

fn read_value<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut de = serde_json::Deserializer::from_reader(&mut *reader);
    Ok(T::deserialize(&mut de)?)
}
