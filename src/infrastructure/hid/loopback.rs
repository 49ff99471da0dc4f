//! Loopback HID transport.
//!
//! Stands in for the platform HID device profile: the profile is ready as
//! soon as it is requested, bonded peers come from settings and attach on
//! connect, and reports are written to the log.

use crate::domain::models::{AppEvent, PeerId, PeerState, TransportEvent};
use crate::infrastructure::hid::descriptor::{SdpSettings, REPORT_LEN};
use crate::infrastructure::hid::transport::{HidTransport, TransportError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct LoopbackTransport {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    bonded: Vec<PeerId>,
    registered: AtomicBool,
    connected: Mutex<Option<PeerId>>,
    reports_sent: AtomicU64,
}

impl LoopbackTransport {
    pub fn new(event_sender: mpsc::UnboundedSender<AppEvent>, bonded: &[String]) -> Self {
        Self {
            event_sender,
            bonded: bonded.iter().map(PeerId::new).collect(),
            registered: AtomicBool::new(false),
            connected: Mutex::new(None),
            reports_sent: AtomicU64::new(0),
        }
    }

    pub fn reports_sent(&self) -> u64 {
        self.reports_sent.load(Ordering::Relaxed)
    }

    fn emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.event_sender
            .send(AppEvent::Transport(event))
            .map_err(|_| TransportError::Unavailable)
    }

    fn set_connected(&self, peer: Option<PeerId>) -> Option<PeerId> {
        let mut connected = self.connected.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *connected, peer)
    }
}

impl HidTransport for LoopbackTransport {
    fn request_profile(&self) -> Result<(), TransportError> {
        self.emit(TransportEvent::ProfileReady)
    }

    fn register_app(&self, sdp: &SdpSettings) -> Result<(), TransportError> {
        info!(
            "Registered HID app '{}' ({}, subclass {:#04X}, {} descriptor bytes)",
            sdp.name,
            sdp.description,
            sdp.subclass,
            sdp.descriptor.len()
        );
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn unregister_app(&self) -> Result<(), TransportError> {
        if !self.registered.swap(false, Ordering::SeqCst) {
            return Err(TransportError::NotRegistered);
        }
        info!(
            "Unregistered HID app after {} report(s)",
            self.reports_sent()
        );
        if let Some(peer) = self.set_connected(None) {
            for state in [PeerState::Disconnecting, PeerState::Disconnected] {
                let _ = self.emit(TransportEvent::ConnectionStateChanged {
                    peer: peer.clone(),
                    state,
                });
            }
        }
        Ok(())
    }

    fn bonded_devices(&self) -> Result<Vec<PeerId>, TransportError> {
        Ok(self.bonded.clone())
    }

    fn connect(&self, peer: &PeerId) -> Result<(), TransportError> {
        if !self.registered.load(Ordering::SeqCst) {
            return Err(TransportError::NotRegistered);
        }
        if !self.bonded.contains(peer) {
            return Err(TransportError::UnknownPeer(peer.clone()));
        }
        for state in [PeerState::Connecting, PeerState::Connected] {
            self.emit(TransportEvent::ConnectionStateChanged {
                peer: peer.clone(),
                state,
            })?;
        }
        self.set_connected(Some(peer.clone()));
        Ok(())
    }

    fn send_report(&self, peer: &PeerId, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        if !self.registered.load(Ordering::SeqCst) {
            return Err(TransportError::NotRegistered);
        }
        if !self.bonded.contains(peer) {
            return Err(TransportError::UnknownPeer(peer.clone()));
        }
        if data.len() != REPORT_LEN {
            return Err(TransportError::SendFailed {
                peer: peer.clone(),
                reason: format!("report is {} bytes, expected {}", data.len(), REPORT_LEN),
            });
        }
        self.reports_sent.fetch_add(1, Ordering::Relaxed);
        debug!("HID report {:#04X} -> {}: {:02X?}", report_id, peer, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::HidSettings;

    #[test]
    fn test_profile_and_connect_emit_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = LoopbackTransport::new(tx, &["host".to_string()]);

        transport.request_profile().unwrap();
        transport
            .register_app(&SdpSettings::from_settings(&HidSettings::default()))
            .unwrap();
        transport.connect(&PeerId::new("host")).unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(AppEvent::Transport(TransportEvent::ProfileReady))
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(AppEvent::Transport(TransportEvent::ConnectionStateChanged {
                state: PeerState::Connecting,
                ..
            }))
        ));
        match rx.try_recv() {
            Ok(AppEvent::Transport(TransportEvent::ConnectionStateChanged { peer, state })) => {
                assert_eq!(peer, PeerId::new("host"));
                assert_eq!(state, PeerState::Connected);
            }
            other => panic!("unexpected event {:?}", other),
        }

        transport.unregister_app().unwrap();
        let states: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                AppEvent::Transport(TransportEvent::ConnectionStateChanged { state, .. }) => {
                    Some(state)
                }
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![PeerState::Disconnecting, PeerState::Disconnected]);
    }

    #[test]
    fn test_closed_event_channel_means_unavailable() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let transport = LoopbackTransport::new(tx, &[]);
        assert!(matches!(
            transport.request_profile(),
            Err(TransportError::Unavailable)
        ));
    }

    #[test]
    fn test_rejects_unregistered_and_unknown_peers() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let transport = LoopbackTransport::new(tx, &["host".to_string()]);
        let host = PeerId::new("host");

        assert!(matches!(
            transport.send_report(&host, 0, &[0, 0, 0]),
            Err(TransportError::NotRegistered)
        ));
        transport
            .register_app(&SdpSettings::from_settings(&HidSettings::default()))
            .unwrap();
        assert!(matches!(
            transport.connect(&PeerId::new("stranger")),
            Err(TransportError::UnknownPeer(_))
        ));
        assert!(transport.send_report(&host, 0, &[0, 0]).is_err());
        transport.send_report(&host, 0, &[1, 0, 0]).unwrap();
        assert_eq!(transport.reports_sent(), 1);

        transport.unregister_app().unwrap();
        assert!(matches!(
            transport.unregister_app(),
            Err(TransportError::NotRegistered)
        ));
    }
}
