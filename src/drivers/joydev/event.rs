use packed_struct::{
    types::{Integer, SizedInteger},
    PackedStruct, PackingError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::js_report::{
    JsEventReport, JS_EVENT_AXIS, JS_EVENT_BUTTON, JS_EVENT_SIZE, JS_EVENT_TYPE_MASK,
};

/// Errors that can occur while decoding a raw event record
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Truncated record: expected {expected} bytes, got {got}")]
    TruncatedRecord { expected: usize, got: usize },
    #[error("Unable to unpack record: {0}")]
    Unpack(#[from] PackingError),
}

/// Logical kind of a raw event, resolved from the low 7 bits of the record's
/// `kind_flags` byte through a [KindTable].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Digital,
    Analog,
    Misc,
    Unknown(u8),
}

/// Maps the numeric event type of a record to an [EventKind]. Profiles may
/// override the joystick interface numbering, e.g. to accept scan code records
/// as [EventKind::Misc].
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct KindTable {
    #[serde(default)]
    pub digital: Vec<u8>,
    #[serde(default)]
    pub analog: Vec<u8>,
    #[serde(default)]
    pub misc: Vec<u8>,
}

impl KindTable {
    /// Event type numbers used by the joydev interface
    pub fn joydev() -> Self {
        Self {
            digital: vec![JS_EVENT_BUTTON],
            analog: vec![JS_EVENT_AXIS],
            misc: vec![],
        }
    }

    /// Returns the kind of the given event type number
    pub fn kind_of(&self, event_type: u8) -> EventKind {
        if self.digital.contains(&event_type) {
            EventKind::Digital
        } else if self.analog.contains(&event_type) {
            EventKind::Analog
        } else if self.misc.contains(&event_type) {
            EventKind::Misc
        } else {
            EventKind::Unknown(event_type)
        }
    }
}

/// A single decoded event record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEvent {
    /// Event timestamp in milliseconds
    pub timestamp: u32,
    /// Axis or button number
    pub code: u8,
    pub kind: EventKind,
    pub value: i16,
    /// True if this event replays the initial device state
    pub init: bool,
    /// Untouched flags byte as read from the device
    pub kind_flags: u8,
}

/// Decode one raw event record from the given buffer. Fails with
/// [DecodeError::TruncatedRecord] if fewer than [JS_EVENT_SIZE] bytes are
/// available. Any trailing bytes are ignored.
pub fn decode(buf: &[u8], kinds: &KindTable) -> Result<RawEvent, DecodeError> {
    if buf.len() < JS_EVENT_SIZE {
        return Err(DecodeError::TruncatedRecord {
            expected: JS_EVENT_SIZE,
            got: buf.len(),
        });
    }
    let mut record = [0u8; JS_EVENT_SIZE];
    record.copy_from_slice(&buf[..JS_EVENT_SIZE]);
    let report = JsEventReport::unpack(&record)?;

    Ok(RawEvent {
        timestamp: report.time.to_primitive(),
        code: report.number,
        kind: kinds.kind_of(report.event_type()),
        value: report.value.to_primitive(),
        init: report.is_init(),
        kind_flags: report.kind_flags,
    })
}

/// Encode the given event back into its wire representation
pub fn encode(event: &RawEvent) -> Result<[u8; JS_EVENT_SIZE], DecodeError> {
    let report = JsEventReport {
        time: Integer::from_primitive(event.timestamp),
        value: Integer::from_primitive(event.value),
        kind_flags: event.kind_flags,
        number: event.code,
    };
    Ok(report.pack()?)
}

impl RawEvent {
    /// Returns the event type number with the initialization flag stripped
    pub fn event_type(&self) -> u8 {
        self.kind_flags & JS_EVENT_TYPE_MASK
    }
}
