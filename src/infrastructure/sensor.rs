//! Sensor feed.
//!
//! Reads gyroscope samples and discrete click events as JSON lines and pushes
//! them into the app event channel:
//!
//! ```text
//! {"kind":"sample","values":[0.01,0.02,-0.01],"timestamp_nanos":1000000}
//! {"kind":"click"}
//! ```

use crate::domain::models::{AngularSample, AppEvent, MessageSeverity, StatusMessage};
use anyhow::Result;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum FeedRecord {
    Sample {
        values: [f32; 3],
        timestamp_nanos: i64,
    },
    Click,
}

impl From<FeedRecord> for AppEvent {
    fn from(record: FeedRecord) -> Self {
        match record {
            FeedRecord::Sample {
                values,
                timestamp_nanos,
            } => AppEvent::Sample(AngularSample::new(values, timestamp_nanos)),
            FeedRecord::Click => AppEvent::Click,
        }
    }
}

/// Parse one feed line; blank lines yield `None`.
fn parse_line(line: &str) -> Result<Option<AppEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let record: FeedRecord = serde_json::from_str(line)?;
    Ok(Some(record.into()))
}

pub struct SensorFeed {
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl SensorFeed {
    pub fn new(event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { event_sender }
    }

    /// Open the configured feed (`None` or "-" is stdin) and stream it until
    /// end of input, then request shutdown.
    ///
    /// A feed that cannot be opened is reported once; the app keeps running
    /// without samples.
    pub async fn run(self, path: Option<String>) {
        match path.as_deref() {
            None | Some("-") => {
                info!("Reading sensor feed from stdin");
                self.stream(BufReader::new(tokio::io::stdin())).await;
            }
            Some(path) => match tokio::fs::File::open(path).await {
                Ok(file) => {
                    info!("Reading sensor feed from {}", path);
                    self.stream(BufReader::new(file)).await;
                }
                Err(e) => {
                    warn!("Cannot open sensor feed {}: {}", path, e);
                    self.send(AppEvent::LogMessage(StatusMessage::new(
                        "Gyroscope not available!",
                        MessageSeverity::Error,
                    )));
                    return;
                }
            },
        }
        self.send(AppEvent::Shutdown);
    }

    /// Forward every record from `reader`. Returns the number forwarded.
    pub async fn stream<R: AsyncBufRead + Unpin>(&self, reader: R) -> usize {
        let mut lines = reader.lines();
        let mut line_no = 0usize;
        let mut forwarded = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Sensor feed read error: {}", e);
                    break;
                }
            };
            line_no += 1;

            match parse_line(&line) {
                Ok(Some(event)) => {
                    if !self.send(event) {
                        debug!("Event channel closed, stopping sensor feed");
                        break;
                    }
                    forwarded += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping malformed feed line {}: {}", line_no, e),
            }
        }

        debug!("Sensor feed ended after {} line(s)", line_no);
        forwarded
    }

    fn send(&self, event: AppEvent) -> bool {
        self.event_sender.send(event).is_ok()
    }
}
