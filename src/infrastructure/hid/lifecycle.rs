//! HID Connection Lifecycle
//!
//! Drives profile acquisition, app registration and peer attach/detach:
//!
//! ```text
//! Unregistered ──start──▶ Registering ──ProfileReady──▶ Registered { peer }
//!                              ▲                              │
//!                              └────────ProfileLost───────────┘
//!                 any state ──teardown──▶ TornDown (terminal)
//! ```
//!
//! The phase lives in a [`SharedLink`] so the report path can read the
//! connected peer from other tasks.

use crate::domain::models::{
    AppEvent, MessageSeverity, PeerId, PeerState, StatusMessage, TransportEvent,
};
use crate::domain::settings::HidSettings;
use crate::infrastructure::hid::descriptor::SdpSettings;
use crate::infrastructure::hid::transport::HidTransport;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkPhase {
    #[default]
    Unregistered,
    Registering,
    Registered {
        peer: Option<PeerId>,
    },
    TornDown,
}

/// Link phase shared between the lifecycle (sole writer) and the report path.
#[derive(Debug, Clone, Default)]
pub struct SharedLink(Arc<Mutex<LinkPhase>>);

impl SharedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LinkPhase {
        self.lock().clone()
    }

    /// The peer reports may be addressed to, if registered and attached.
    pub fn connected_peer(&self) -> Option<PeerId> {
        match &*self.lock() {
            LinkPhase::Registered { peer } => peer.clone(),
            _ => None,
        }
    }

    /// Run `f` against the connected peer while holding the link, so teardown
    /// cannot complete in the middle of a send.
    pub fn with_connected_peer<R>(&self, f: impl FnOnce(&PeerId) -> R) -> Option<R> {
        match &*self.lock() {
            LinkPhase::Registered { peer: Some(peer) } => Some(f(peer)),
            _ => None,
        }
    }

    /// Run `f` unless teardown has begun, holding the link for the duration.
    pub fn unless_torn_down<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let guard = self.lock();
        if matches!(*guard, LinkPhase::TornDown) {
            return None;
        }
        let result = f();
        drop(guard);
        Some(result)
    }

    fn set(&self, phase: LinkPhase) -> LinkPhase {
        std::mem::replace(&mut *self.lock(), phase)
    }

    fn lock(&self) -> MutexGuard<'_, LinkPhase> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Effect of a transport event on the peer reports go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkChange {
    Unchanged,
    PeerAttached(PeerId),
    PeerLost,
}

pub struct ConnectionLifecycle {
    transport: Arc<dyn HidTransport>,
    link: SharedLink,
    sdp: SdpSettings,
    event_sender: mpsc::UnboundedSender<AppEvent>,
    connect_confirm_delay: Duration,
    // Set once the platform accepted the app; a lost profile does not clear it
    app_registered: bool,
}

impl ConnectionLifecycle {
    pub fn new(
        transport: Arc<dyn HidTransport>,
        link: SharedLink,
        settings: &HidSettings,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            transport,
            link,
            sdp: SdpSettings::from_settings(settings),
            event_sender,
            connect_confirm_delay: Duration::from_millis(settings.connect_confirm_delay_ms),
            app_registered: false,
        }
    }

    #[cfg(test)]
    pub fn link(&self) -> &SharedLink {
        &self.link
    }

    /// Request the HID profile. Runs once; later calls are ignored.
    pub fn start(&mut self) {
        if self.link.phase() != LinkPhase::Unregistered {
            debug!("HID lifecycle already started");
            return;
        }

        info!("Requesting HID device profile");
        self.link.set(LinkPhase::Registering);
        if let Err(e) = self.transport.request_profile() {
            error!("HID profile request failed: {}", e);
            self.link.set(LinkPhase::Unregistered);
            self.send_log("HID transport not available!", MessageSeverity::Error);
        }
    }

    pub fn handle_event(&mut self, event: TransportEvent) -> LinkChange {
        match event {
            TransportEvent::ProfileReady => {
                self.on_profile_ready();
                LinkChange::Unchanged
            }
            TransportEvent::ProfileLost => self.on_profile_lost(),
            TransportEvent::ConnectionStateChanged { peer, state } => {
                self.on_connection_state_changed(peer, state)
            }
        }
    }

    fn on_profile_ready(&mut self) {
        match self.link.phase() {
            LinkPhase::Registering => {}
            LinkPhase::TornDown => {
                debug!("HID profile ready after teardown, ignoring");
                return;
            }
            phase => {
                warn!("Unexpected HID profile callback in {:?}", phase);
                return;
            }
        }

        if let Err(e) = self.transport.register_app(&self.sdp) {
            error!("Failed to register HID application: {}", e);
            self.send_log("HID registration failed", MessageSeverity::Error);
            return;
        }
        self.app_registered = true;
        self.link.set(LinkPhase::Registered { peer: None });
        info!("HID profile initialized as '{}'", self.sdp.name);

        self.connect_to_bonded_peer();
    }

    fn connect_to_bonded_peer(&self) {
        let bonded = match self.transport.bonded_devices() {
            Ok(bonded) => bonded,
            Err(e) => {
                error!("Could not list bonded devices: {}", e);
                return;
            }
        };

        let Some(peer) = bonded.into_iter().next() else {
            warn!("No paired devices found");
            self.send_log("No paired devices", MessageSeverity::Warning);
            return;
        };

        info!("Connecting to {}", peer);
        if let Err(e) = self.transport.connect(&peer) {
            error!("Connection error: {}", e);
            return;
        }
        self.schedule_connect_confirmation(peer);
    }

    /// Report whether a peer attached once the confirmation delay has passed.
    fn schedule_connect_confirmation(&self, requested: PeerId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No async runtime, skipping connect confirmation");
            return;
        };
        let link = self.link.clone();
        let event_sender = self.event_sender.clone();
        let delay = self.connect_confirm_delay;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let (message, severity) = match link.phase() {
                LinkPhase::Registered { peer: Some(peer) } => {
                    info!("Connected with {}", peer);
                    (format!("Connected with {}", peer), MessageSeverity::Success)
                }
                LinkPhase::TornDown => return,
                _ => {
                    warn!("{} did not connect within {:?}", requested, delay);
                    (format!("No connection to {}", requested), MessageSeverity::Warning)
                }
            };
            let _ = event_sender.send(AppEvent::LogMessage(StatusMessage::new(message, severity)));
        });
    }

    fn on_profile_lost(&mut self) -> LinkChange {
        warn!("HID profile disconnected");
        match self.link.phase() {
            LinkPhase::TornDown | LinkPhase::Unregistered | LinkPhase::Registering => {
                LinkChange::Unchanged
            }
            LinkPhase::Registered { peer } => {
                self.link.set(LinkPhase::Registering);
                if peer.is_some() {
                    LinkChange::PeerLost
                } else {
                    LinkChange::Unchanged
                }
            }
        }
    }

    fn on_connection_state_changed(&mut self, peer: PeerId, state: PeerState) -> LinkChange {
        if !matches!(self.link.phase(), LinkPhase::Registered { .. }) {
            debug!("Ignoring {:?} for {} while not registered", state, peer);
            return LinkChange::Unchanged;
        }

        match state {
            PeerState::Connected => {
                info!("Peer connected: {}", peer);
                self.send_log(&format!("Connected to {}", peer), MessageSeverity::Success);
                self.link.set(LinkPhase::Registered {
                    peer: Some(peer.clone()),
                });
                LinkChange::PeerAttached(peer)
            }
            PeerState::Disconnected => {
                info!("Peer disconnected: {}", peer);
                self.send_log("Disconnected", MessageSeverity::Info);
                self.link.set(LinkPhase::Registered { peer: None });
                LinkChange::PeerLost
            }
            PeerState::Connecting | PeerState::Disconnecting => {
                debug!("Peer {} is {:?}", peer, state);
                LinkChange::Unchanged
            }
        }
    }

    /// Stop all reporting and unregister the HID app. Idempotent.
    ///
    /// The app is unregistered whenever it was ever registered, including
    /// after the profile was lost.
    pub fn teardown(&mut self) {
        if self.link.set(LinkPhase::TornDown) == LinkPhase::TornDown {
            return;
        }
        if !std::mem::take(&mut self.app_registered) {
            debug!("HID lifecycle torn down before registration");
            return;
        }
        info!("Unregistering HID application");
        if let Err(e) = self.transport.unregister_app() {
            warn!("Failed to unregister HID application: {}", e);
        }
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self
            .event_sender
            .send(AppEvent::LogMessage(StatusMessage::new(message, severity)));
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        self.teardown();
    }
}
