//! Mouse Report Sequencer
//!
//! Sends movement and click reports to the connected peer. Reports are never
//! queued: without a registered, attached peer a request is simply dropped.
//! Transport failures are logged and swallowed.

use crate::domain::models::{MouseReport, PeerId, PointerDelta};
use crate::domain::settings::HidSettings;
use crate::infrastructure::hid::descriptor::REPORT_ID;
use crate::infrastructure::hid::lifecycle::SharedLink;
use crate::infrastructure::hid::transport::HidTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

pub struct ReportSequencer {
    transport: Arc<dyn HidTransport>,
    link: SharedLink,
    release_delay: Duration,
    cancel_release_on_disconnect: bool,
    pending_releases: Vec<JoinHandle<()>>,
}

impl ReportSequencer {
    pub fn new(
        transport: Arc<dyn HidTransport>,
        link: SharedLink,
        settings: &HidSettings,
    ) -> Self {
        Self {
            transport,
            link,
            release_delay: Duration::from_millis(settings.click_release_ms),
            cancel_release_on_disconnect: settings.cancel_release_on_disconnect,
            pending_releases: Vec::new(),
        }
    }

    /// Send a relative movement report. All-zero deltas are sent as well.
    pub fn send_movement(&self, delta: PointerDelta) {
        let report = MouseReport::movement(delta);
        let transport = self.transport.as_ref();
        if self
            .link
            .with_connected_peer(|peer| deliver(transport, peer, report))
            .is_none()
        {
            trace!("No peer connected, dropping movement {:?}", delta);
        }
    }

    /// Press the left button now and release it after the configured delay.
    ///
    /// The release is scheduled on the current tokio runtime; outside of one
    /// the press goes out alone.
    pub fn send_click(&mut self) {
        let transport = self.transport.as_ref();
        let pressed = self.link.with_connected_peer(|peer| {
            deliver(transport, peer, MouseReport::left_press()).then(|| peer.clone())
        });

        let Some(Some(peer)) = pressed else {
            debug!("Click dropped, no peer connected or press failed");
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, button release for {} not scheduled", peer);
            return;
        };
        self.pending_releases.retain(|handle| !handle.is_finished());
        let handle = runtime.spawn(release_after(
            self.transport.clone(),
            self.link.clone(),
            peer,
            self.release_delay,
        ));
        self.pending_releases.push(handle);
    }

    /// Called when the peer went away.
    pub fn on_peer_lost(&mut self) {
        if self.cancel_release_on_disconnect {
            self.cancel_pending_releases();
        }
    }

    pub fn cancel_pending_releases(&mut self) {
        let mut cancelled = 0;
        for handle in self.pending_releases.drain(..) {
            if !handle.is_finished() {
                handle.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!("Cancelled {} pending button release(s)", cancelled);
        }
    }

    /// Wait for every scheduled release to go out (or be skipped).
    pub async fn settle(&mut self) {
        for handle in self.pending_releases.drain(..) {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("Button release task failed: {}", e);
                }
            }
        }
    }

    pub fn pending_release_count(&self) -> usize {
        self.pending_releases
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for ReportSequencer {
    fn drop(&mut self) {
        self.cancel_pending_releases();
    }
}

async fn release_after(
    transport: Arc<dyn HidTransport>,
    link: SharedLink,
    peer: PeerId,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    // Addressed to the peer that saw the press, even if it has since detached
    let sent =
        link.unless_torn_down(|| deliver(transport.as_ref(), &peer, MouseReport::release()));
    if sent.is_none() {
        debug!("Button release skipped, HID link torn down");
    }
}

fn deliver(transport: &dyn HidTransport, peer: &PeerId, report: MouseReport) -> bool {
    match transport.send_report(peer, REPORT_ID, &report.to_bytes()) {
        Ok(()) => {
            trace!("Sent {:?} to {}", report, peer);
            true
        }
        Err(e) => {
            error!("Error sending report: {}", e);
            false
        }
    }
}
