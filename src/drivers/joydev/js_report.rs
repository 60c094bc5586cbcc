//! Reference: https://www.kernel.org/doc/html/latest/input/joydev/joystick-api.html
use packed_struct::prelude::*;

/// Size in bytes of a single `struct js_event` record
pub const JS_EVENT_SIZE: usize = 8;

/// Flag set by the kernel on events replayed to describe the initial state
/// of every axis and button after the device is opened.
pub const JS_EVENT_INIT: u8 = 0x80;

/// Mask for the event type bits of the `kind_flags` byte
pub const JS_EVENT_TYPE_MASK: u8 = 0x7f;

/// Event type numbers used by the joydev interface
pub const JS_EVENT_BUTTON: u8 = 0x01;
pub const JS_EVENT_AXIS: u8 = 0x02;

// JsEventReport
//
// struct js_event {
//     __u32 time;     /* event timestamp in milliseconds */
//     __s16 value;    /* value */
//     __u8 type;      /* event type */
//     __u8 number;    /* axis/button number */
// };
//
// Button 0 pressed at 0x0001e240 ms
// 40 e2 01 00 01 00 01 00
//
// Axis 3 pushed fully negative (initialization replay)
// 00 00 00 00 01 80 82 03
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "8")]
pub struct JsEventReport {
    // BYTE 0-3
    #[packed_field(bytes = "0..=3", endian = "lsb")]
    pub time: Integer<u32, packed_bits::Bits<32>>,
    // BYTE 4-5
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub value: Integer<i16, packed_bits::Bits<16>>,
    // BYTE 6
    #[packed_field(bytes = "6")]
    pub kind_flags: u8,
    // BYTE 7
    #[packed_field(bytes = "7")]
    pub number: u8,
}

impl JsEventReport {
    /// Returns true if the kernel marked this event as an initialization replay
    pub fn is_init(&self) -> bool {
        self.kind_flags & JS_EVENT_INIT != 0
    }

    /// Returns the event type with the initialization flag stripped
    pub fn event_type(&self) -> u8 {
        self.kind_flags & JS_EVENT_TYPE_MASK
    }
}
