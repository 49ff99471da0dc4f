//! HID Module
//!
//! Presents the process to a paired host as a Bluetooth HID mouse.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │  ConnectionLifecycle │ writes │      SharedLink      │
//! │ - profile request    ├───────▶│ phase + peer         │
//! │ - app registration   │        └──────────┬───────────┘
//! │ - peer attach/detach │                   │ reads
//! └──────────┬───────────┘        ┌──────────▼───────────┐
//!            │                    │    ReportSequencer   │
//!            │                    │ - movement reports   │
//!            │                    │ - click + release    │
//!            ▼                    └──────────┬───────────┘
//! ┌─────────────────────────────────────────▼───────────┐
//! │                 HidTransport (platform)              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`descriptor`] - Report descriptor and SDP record
//! - [`transport`] - Platform boundary trait and errors
//! - [`lifecycle`] - Registration and peer state machine
//! - [`sequencer`] - Report construction and click timing
//! - [`loopback`] - Logging transport for hosts without a HID stack

pub mod descriptor;
pub mod lifecycle;
pub mod loopback;
pub mod sequencer;
pub mod transport;

pub use lifecycle::{ConnectionLifecycle, LinkChange, SharedLink};
pub use loopback::LoopbackTransport;
pub use sequencer::ReportSequencer;
pub use transport::{HidTransport, TransportError};
