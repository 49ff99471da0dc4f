use crate::domain::models::{AppEvent, MessageSeverity, StatusMessage};
use crate::domain::motion::MotionFilter;
use crate::domain::settings::Settings;
use crate::infrastructure::hid::{
    ConnectionLifecycle, HidTransport, LinkChange, ReportSequencer, SharedLink,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct GyroMouseApp {
    // Sensor context
    pub(crate) filter: MotionFilter,

    // HID
    pub(crate) lifecycle: ConnectionLifecycle,
    pub(crate) sequencer: ReportSequencer,

    pub(crate) events: mpsc::UnboundedReceiver<AppEvent>,
    pub(crate) status_message: Option<StatusMessage>,
}

impl GyroMouseApp {
    pub fn new(
        settings: &Settings,
        transport: Arc<dyn HidTransport>,
        event_sender: mpsc::UnboundedSender<AppEvent>,
        events: mpsc::UnboundedReceiver<AppEvent>,
    ) -> Self {
        let link = SharedLink::new();
        let lifecycle =
            ConnectionLifecycle::new(transport.clone(), link.clone(), &settings.hid, event_sender);
        let sequencer = ReportSequencer::new(transport, link, &settings.hid);

        Self {
            filter: MotionFilter::new(settings.motion.clone()),
            lifecycle,
            sequencer,
            events,
            status_message: None,
        }
    }

    /// Process events until shutdown is requested or every sender is gone,
    /// then flush pending button releases and unregister.
    pub async fn run(mut self) {
        self.lifecycle.start();

        while let Some(event) = self.events.recv().await {
            if self.handle_event(event).is_break() {
                break;
            }
        }

        info!(
            "Shutting down ({} button release(s) pending)",
            self.sequencer.pending_release_count()
        );
        self.sequencer.settle().await;
        self.lifecycle.teardown();
    }

    pub fn handle_event(&mut self, event: AppEvent) -> ControlFlow<()> {
        match event {
            AppEvent::Sample(sample) => {
                let calibrating = !self.filter.is_calibrated();
                let delta = self.filter.observe(&sample);
                if calibrating && self.filter.is_calibrated() {
                    self.show_status(StatusMessage::new(
                        "Calibration complete",
                        MessageSeverity::Success,
                    ));
                }
                if let Some(delta) = delta {
                    self.sequencer.send_movement(delta);
                }
            }
            AppEvent::Click => self.sequencer.send_click(),
            AppEvent::Transport(event) => match self.lifecycle.handle_event(event) {
                LinkChange::PeerAttached(peer) => debug!("Reports now go to {}", peer),
                LinkChange::PeerLost => self.sequencer.on_peer_lost(),
                LinkChange::Unchanged => {}
            },
            AppEvent::LogMessage(message) => self.show_status(message),
            AppEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn show_status(&mut self, message: StatusMessage) {
        match message.severity {
            MessageSeverity::Info | MessageSeverity::Success => info!("{}", message.message),
            MessageSeverity::Warning => warn!("{}", message.message),
            MessageSeverity::Error => error!("{}", message.message),
        }
        self.status_message = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AngularSample, PeerId, PeerState, TransportEvent};
    use crate::domain::motion::CALIBRATION_SAMPLES;
    use crate::infrastructure::hid::transport::testing::{Call, RecordingTransport};
    use std::time::Duration;

    const MS: i64 = 1_000_000;

    fn build_app(
        transport: Arc<RecordingTransport>,
    ) -> (GyroMouseApp, mpsc::UnboundedSender<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = GyroMouseApp::new(&Settings::default(), transport, tx.clone(), rx);
        (app, tx)
    }

    fn attach(app: &mut GyroMouseApp) {
        app.lifecycle.start();
        let _ = app.handle_event(AppEvent::Transport(TransportEvent::ProfileReady));
        let _ = app.handle_event(AppEvent::Transport(TransportEvent::ConnectionStateChanged {
            peer: PeerId::new("host"),
            state: PeerState::Connected,
        }));
    }

    fn sample(values: [f32; 3], ts: i64) -> AppEvent {
        AppEvent::Sample(AngularSample::new(values, ts))
    }

    #[test]
    fn test_stationary_start_then_turn_moves_pointer() {
        let transport = Arc::new(RecordingTransport::with_bonded(&["host"]));
        let (mut app, _tx) = build_app(transport.clone());
        attach(&mut app);

        let rest = [0.01, 0.02, -0.01];
        let mut ts = 0;
        for _ in 0..=CALIBRATION_SAMPLES {
            ts += MS;
            let _ = app.handle_event(sample(rest, ts));
        }
        assert!(transport.sent().is_empty());
        assert_eq!(
            app.status_message.as_ref().map(|m| m.message.as_str()),
            Some("Calibration complete")
        );

        ts += 10 * MS;
        let _ = app.handle_event(sample([0.01, 0.02, 0.5], ts));
        assert_eq!(transport.sent(), vec![vec![0x00, 0x02, 0x00]]);
    }

    #[test]
    fn test_movement_dropped_while_disconnected() {
        let transport = Arc::new(RecordingTransport::with_bonded(&["host"]));
        let (mut app, _tx) = build_app(transport.clone());

        let mut ts = 0;
        for _ in 0..=CALIBRATION_SAMPLES {
            ts += MS;
            let _ = app.handle_event(sample([0.0; 3], ts));
        }
        let _ = app.handle_event(sample([0.0, 0.0, 5.0], ts + 10 * MS));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_status_messages_are_kept() {
        let transport = Arc::new(RecordingTransport::default());
        let (mut app, _tx) = build_app(transport);
        let flow = app.handle_event(AppEvent::LogMessage(StatusMessage::new(
            "No paired devices",
            MessageSeverity::Warning,
        )));
        assert!(flow.is_continue());
        assert_eq!(
            app.status_message.as_ref().map(|m| m.message.as_str()),
            Some("No paired devices")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_during_click_cancels_release() {
        let transport = Arc::new(RecordingTransport::with_bonded(&["host"]));
        let (mut app, _tx) = build_app(transport.clone());
        attach(&mut app);

        let _ = app.handle_event(AppEvent::Click);
        let _ = app.handle_event(AppEvent::Transport(TransportEvent::ConnectionStateChanged {
            peer: PeerId::new("host"),
            state: PeerState::Disconnected,
        }));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(transport.sent(), vec![vec![0x01, 0, 0]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_flushes_click_before_unregister() {
        let transport = Arc::new(RecordingTransport::with_bonded(&["host"]));
        let (app, tx) = build_app(transport.clone());

        tx.send(AppEvent::Transport(TransportEvent::ProfileReady)).unwrap();
        tx.send(AppEvent::Transport(TransportEvent::ConnectionStateChanged {
            peer: PeerId::new("host"),
            state: PeerState::Connected,
        }))
        .unwrap();
        tx.send(AppEvent::Click).unwrap();
        tx.send(AppEvent::Shutdown).unwrap();
        // Queued after shutdown, never processed
        tx.send(AppEvent::Click).unwrap();

        app.run().await;

        let calls = transport.calls();
        assert_eq!(calls.first(), Some(&Call::RequestProfile));
        assert_eq!(calls.last(), Some(&Call::Unregister));
        assert_eq!(transport.sent(), vec![vec![0x01, 0, 0], vec![0, 0, 0]]);
    }
}
