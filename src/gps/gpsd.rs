// src/gps/gpsd.rs
//! GPSD client implementation

use super::data::GpsData;
use super::source::{FixSink, PendingRequests, PositionSource, WatchHandle};
use crate::error::{LocationError, Result, TrackerError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// Report class of a gpsd JSON line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsdClass {
    Tpv,
    Sky,
    Version,
    Devices,
    Other,
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let address = format!("{}:{}", host, port);
    let mut stream = TcpStream::connect(&address)
        .await
        .map_err(|e| TrackerError::Connection(format!("gpsd at {}: {}", address, e)))?;

    // Send WATCH command to start receiving JSON data
    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream.write_all(watch_cmd.as_bytes()).await?;

    Ok(BufReader::new(stream))
}

/// Parse a single line of gpsd JSON data
pub fn parse_gpsd_json(data: &mut GpsData, line: &str) -> Result<GpsdClass> {
    let msg: GpsdMessage = serde_json::from_str(line)
        .map_err(|e| TrackerError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    let class = match msg.class.as_str() {
        "TPV" => {
            parse_tpv_message(data, &msg.data);
            GpsdClass::Tpv
        }
        "SKY" => {
            parse_sky_message(data, &msg.data);
            GpsdClass::Sky
        }
        "VERSION" => {
            parse_version_message(&msg.data);
            GpsdClass::Version
        }
        "DEVICES" => {
            parse_devices_message(&msg.data);
            GpsdClass::Devices
        }
        _ => GpsdClass::Other,
    };

    Ok(class)
}

/// Parse TPV (Time Position Velocity) message
fn parse_tpv_message(data: &mut GpsData, msg_data: &HashMap<String, serde_json::Value>) {
    let number = |key: &str| msg_data.get(key).and_then(|v| v.as_f64());

    if let Some(mode) = msg_data.get("mode").and_then(|v| v.as_u64()) {
        data.mode = Some(mode as u8);
    }

    data.timestamp = msg_data
        .get("time")
        .and_then(|v| v.as_str())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| Some(Utc::now()));

    if let Some(lat) = number("lat") {
        data.latitude = Some(lat);
    }

    if let Some(lon) = number("lon") {
        data.longitude = Some(lon);
    }

    // Newer gpsd reports altHAE/altMSL; older ones only alt
    data.altitude = number("altMSL").or_else(|| number("alt")).or_else(|| number("altHAE"));

    data.speed = number("speed");

    data.accuracy = number("eph").or_else(|| match (number("epx"), number("epy")) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    });
}

/// Parse SKY (satellite data) message
fn parse_sky_message(data: &mut GpsData, msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(satellites) = msg_data.get("satellites").and_then(|v| v.as_array()) {
        let used = satellites
            .iter()
            .filter(|sat| sat.get("used").and_then(|v| v.as_bool()).unwrap_or(false))
            .count();
        data.satellites = Some(used.min(u8::MAX as usize) as u8);
    }

    if let Some(hdop) = msg_data.get("hdop").and_then(|v| v.as_f64()) {
        data.hdop = Some(hdop);
    }
}

/// Parse VERSION message (informational)
fn parse_version_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(version) = msg_data.get("release").and_then(|v| v.as_str()) {
        info!("Connected to gpsd version: {}", version);
    }
}

/// Parse DEVICES message (informational)
fn parse_devices_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(devices) = msg_data.get("devices").and_then(|v| v.as_array()) {
        info!("gpsd managing {} device(s)", devices.len());
        for device in devices {
            if let Some(path) = device.get("path").and_then(|v| v.as_str()) {
                info!("  Device: {}", path);
            }
        }
    }
}

/// Position source backed by a gpsd daemon
pub struct GpsdSource {
    host: String,
    port: u16,
    fix_timeout: Duration,
    pending: PendingRequests,
}

impl GpsdSource {
    pub fn new(host: impl Into<String>, port: u16, fix_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            fix_timeout,
            pending: PendingRequests::new(),
        }
    }
}

impl PositionSource for GpsdSource {
    fn name(&self) -> &str {
        "gpsd"
    }

    fn current_position(&self, sink: FixSink) {
        self.pending.register(sink, self.fix_timeout);
    }

    fn watch_position(&self, sink: FixSink) -> std::result::Result<WatchHandle, LocationError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| LocationError::Unsupported)?;

        let host = self.host.clone();
        let port = self.port;
        let pending = self.pending.clone();
        let running = Arc::new(AtomicBool::new(true));
        let running_task = Arc::clone(&running);

        let task = runtime.spawn(async move {
            info!("Connecting to gpsd at {}:{}...", host, port);
            let mut reader = match connect_gpsd(&host, port).await {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("Failed to connect to gpsd at {}:{}: {}", host, port, e);
                    let event = Err(e.location_error());
                    pending.serve(&event);
                    sink.deliver(event);
                    return;
                }
            };

            let mut data = GpsData::new();
            let mut line = String::new();

            while running_task.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        warn!("gpsd closed the connection");
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
                        match parse_gpsd_json(&mut data, line) {
                            Ok(GpsdClass::Tpv) => {
                                if let Some(fix) = data.to_fix() {
                                    debug!("gpsd fix {:.6},{:.6}", fix.latitude, fix.longitude);
                                    let event = Ok(fix);
                                    pending.serve(&event);
                                    sink.deliver(event);
                                }
                            }
                            Ok(_) => {}
                            Err(e) => debug!("Error parsing gpsd JSON: {}", e),
                        }
                    }
                    Err(e) => {
                        warn!("Error reading from gpsd: {}", e);
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
