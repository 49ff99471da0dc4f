//! HID Mouse Descriptor
//!
//! Report descriptor and SDP record registered with the HID device profile.
//! Hosts parse incoming reports against these bytes, so they must not change.

use crate::domain::settings::HidSettings;

/// Report ID used for every mouse report (descriptor declares none)
pub const REPORT_ID: u8 = 0x00;

/// Bytes per mouse report: buttons, X, Y
pub const REPORT_LEN: usize = 3;

/// 3-button relative mouse with 8-bit X/Y in -127..127.
///
/// ```text
/// [0]    : Button bitfield (bit 0 = left, bit 1 = right, bit 2 = middle)
/// [1]    : X displacement (i8)
/// [2]    : Y displacement (i8)
/// ```
pub const MOUSE_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x03, //     Usage Maximum (3)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x03, //     Report Count (3)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Var, Abs)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x05, //     Report Size (5)
    0x81, 0x03, //     Input (Const, Var, Abs) - padding
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x06, //     Input (Data, Var, Rel)
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// SDP application record announced when registering the HID app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpSettings {
    pub name: String,
    pub description: String,
    pub provider: String,
    pub subclass: u8,
    pub descriptor: &'static [u8],
}

impl SdpSettings {
    pub fn from_settings(hid: &HidSettings) -> Self {
        Self {
            name: hid.device_name.clone(),
            description: hid.description.clone(),
            provider: hid.provider.clone(),
            subclass: hid.subclass,
            descriptor: MOUSE_REPORT_DESCRIPTOR,
        }
    }
}
