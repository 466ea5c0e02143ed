// src/gps/serial.rs
//! NMEA receivers on a serial port

use super::data::GpsData;
use super::nmea::{parse_nmea_sentence, Sentence};
use super::source::{FixSink, PendingRequests, PositionSource, WatchHandle};
use crate::error::{LocationError, Result, TrackerError};
use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::SerialPortBuilderExt;

/// Position source reading NMEA sentences from a serial GPS receiver.
///
/// The port is opened once per watch; one-shot requests are answered by the
/// next fix the watch reads.
pub struct SerialSource {
    port: String,
    baudrate: u32,
    fix_timeout: Duration,
    pending: PendingRequests,
}

impl SerialSource {
    pub fn new(port: impl Into<String>, baudrate: u32, fix_timeout: Duration) -> Self {
        Self {
            port: port.into(),
            baudrate,
            fix_timeout,
            pending: PendingRequests::new(),
        }
    }
}

impl PositionSource for SerialSource {
    fn name(&self) -> &str {
        "serial"
    }

    fn current_position(&self, sink: FixSink) {
        self.pending.register(sink, self.fix_timeout);
    }

    fn watch_position(&self, sink: FixSink) -> std::result::Result<WatchHandle, LocationError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| LocationError::Unsupported)?;

        let port = self.port.clone();
        let baudrate = self.baudrate;
        let pending = self.pending.clone();
        let running = Arc::new(AtomicBool::new(true));
        let running_task = Arc::clone(&running);

        let task = runtime.spawn(async move {
            info!("Connecting to GPS on {} at {} baud...", port, baudrate);

            let serial = match tokio_serial::new(&port, baudrate)
                .timeout(Duration::from_millis(1000))
                .open_native_async()
            {
                Ok(serial) => serial,
                Err(e) => {
                    warn!("Failed to open serial port {}: {}", port, e);
                    let event = Err(TrackerError::Serial(e).location_error());
                    pending.serve(&event);
                    sink.deliver(event);
                    return;
                }
            };

            let mut reader = BufReader::new(serial);
            let mut data = GpsData::new();
            let mut line = String::new();

            while running_task.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        warn!("Serial port {} reached end of stream", port);
                        let event = Err(LocationError::PositionUnavailable);
                        pending.serve(&event);
                        sink.deliver(event);
                        break;
                    }
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if parse_nmea_sentence(&mut data, line) == Sentence::Gga {
                            data.update_timestamp();
                            if let Some(fix) = data.to_fix() {
                                debug!("serial fix {:.6},{:.6}", fix.latitude, fix.longitude);
                                let event = Ok(fix);
                                pending.serve(&event);
                                sink.deliver(event);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Error reading from serial port: {}", e);
                        let event = Err(LocationError::from_io(&e));
                        pending.serve(&event);
                        sink.deliver(event);
                        break;
                    }
                }
            }
        });

        Ok(WatchHandle::with_task(running, task))
    }
}

/// Names and kinds of the serial ports present on this machine
pub fn list_serial_ports() -> Result<Vec<(String, String)>> {
    let ports = tokio_serial::available_ports()?;

    Ok(ports
        .into_iter()
        .map(|port| (port.port_name, format!("{:?}", port.port_type)))
        .collect())
}
