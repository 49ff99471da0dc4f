//! HID Transport
//!
//! Boundary to the platform HID device profile. Calls are fire-and-forget;
//! completion and peer state changes come back as [`TransportEvent`]s on the
//! sender the transport was built with.
//!
//! [`TransportEvent`]: crate::domain::models::TransportEvent

use crate::domain::models::PeerId;
use crate::infrastructure::hid::descriptor::SdpSettings;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HID device profile is not available")]
    Unavailable,
    #[error("HID application is not registered")]
    NotRegistered,
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
    #[error("failed to send report to {peer}: {reason}")]
    SendFailed { peer: PeerId, reason: String },
}

pub trait HidTransport: Send + Sync {
    /// Ask the platform for the HID device profile. Completion is signalled
    /// with `TransportEvent::ProfileReady`.
    fn request_profile(&self) -> Result<(), TransportError>;

    fn register_app(&self, sdp: &SdpSettings) -> Result<(), TransportError>;

    fn unregister_app(&self) -> Result<(), TransportError>;

    /// Previously paired hosts, in platform order.
    fn bonded_devices(&self) -> Result<Vec<PeerId>, TransportError>;

    fn connect(&self, peer: &PeerId) -> Result<(), TransportError>;

    fn send_report(&self, peer: &PeerId, report_id: u8, data: &[u8]) -> Result<(), TransportError>;
}
