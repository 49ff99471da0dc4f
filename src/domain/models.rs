use serde::{Deserialize, Serialize};
use std::fmt;

/// One gyroscope reading as delivered by the sensor feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularSample {
    /// Angular velocity per axis, rad/s
    pub values: [f32; 3],
    /// Monotonic timestamp, nanoseconds
    pub timestamp_nanos: i64,
}

impl AngularSample {
    pub fn new(values: [f32; 3], timestamp_nanos: i64) -> Self {
        Self {
            values,
            timestamp_nanos,
        }
    }
}

/// Relative pointer movement, each axis already clamped to [-127, 127].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerDelta {
    pub dx: i8,
    pub dy: i8,
}

impl PointerDelta {
    pub fn new(dx: i8, dy: i8) -> Self {
        Self { dx, dy }
    }
}

/// Three-byte relative mouse report: button bitfield, X, Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseReport {
    pub buttons: u8,
    pub dx: i8,
    pub dy: i8,
}

impl MouseReport {
    pub const LEFT_BUTTON: u8 = 0x01;

    pub fn movement(delta: PointerDelta) -> Self {
        Self {
            buttons: 0,
            dx: delta.dx,
            dy: delta.dy,
        }
    }

    pub fn left_press() -> Self {
        Self {
            buttons: Self::LEFT_BUTTON,
            dx: 0,
            dy: 0,
        }
    }

    pub fn release() -> Self {
        Self::default()
    }

    /// Wire layout as registered in the report descriptor.
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.buttons, self.dx as u8, self.dy as u8]
    }
}

/// Identity of a bonded HID host (Bluetooth address or platform handle).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection states reported by the HID profile. Only the terminal ones
/// change which peer reports are addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// Callbacks raised by the transport on its own context.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    ProfileReady,
    ProfileLost,
    ConnectionStateChanged { peer: PeerId, state: PeerState },
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Sample(AngularSample),
    Click,
    Transport(TransportEvent),
    LogMessage(StatusMessage),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>, severity: MessageSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
