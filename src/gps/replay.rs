// src/gps/replay.rs
//! Replay of a recorded NMEA log as a live feed

use super::data::GpsData;
use super::nmea::{parse_nmea_sentence, Sentence};
use super::source::{FixSink, PendingRequests, PositionSource, WatchHandle};
use crate::error::LocationError;
use log::{info, warn};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

/// Emits one fix per GGA sentence of an NMEA log, `interval` apart,
/// stamped with the wall-clock time of delivery.
pub struct NmeaReplaySource {
    path: PathBuf,
    interval: Duration,
    fix_timeout: Duration,
    pending: PendingRequests,
}

impl NmeaReplaySource {
    pub fn new(path: impl Into<PathBuf>, interval: Duration, fix_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            fix_timeout,
            pending: PendingRequests::new(),
        }
    }
}

impl PositionSource for NmeaReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn current_position(&self, sink: FixSink) {
        self.pending.register(sink, self.fix_timeout);
    }

    fn watch_position(&self, sink: FixSink) -> Result<WatchHandle, LocationError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| LocationError::Unsupported)?;

        let path = self.path.clone();
        let interval = self.interval;
        let pending = self.pending.clone();
        let running = Arc::new(AtomicBool::new(true));
        let running_task = Arc::clone(&running);

        let task = runtime.spawn(async move {
            let file = match File::open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    warn!("Failed to open replay log {}: {}", path.display(), e);
                    let event = Err(LocationError::from_io(&e));
                    pending.serve(&event);
                    sink.deliver(event);
                    return;
                }
            };
            info!("Replaying NMEA log {}", path.display());

            let mut lines = BufReader::new(file).lines();
            let mut data = GpsData::new();

            while running_task.load(Ordering::Relaxed) {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Replay log {} exhausted", path.display());
                        break;
                    }
                    Err(e) => {
                        warn!("Error reading replay log: {}", e);
                        let event = Err(LocationError::from_io(&e));
                        pending.serve(&event);
                        sink.deliver(event);
                        break;
                    }
                };

                if parse_nmea_sentence(&mut data, line.trim()) != Sentence::Gga {
                    continue;
                }
                data.update_timestamp();
                if let Some(fix) = data.to_fix() {
                    let event = Ok(fix);
                    pending.serve(&event);
                    sink.deliver(event);
                    tokio::time::sleep(interval).await;
                }
            }
        });

        Ok(WatchHandle::with_task(running, task))
    }
}
