// src/gps/mod.rs
//! GPS data handling, parsing and position sources

pub mod data;
pub mod gpsd;
pub mod nmea;
pub mod replay;
pub mod serial;
pub mod source;

pub use data::{Fix, GpsData};
pub use gpsd::GpsdSource;
pub use replay::NmeaReplaySource;
pub use serial::{list_serial_ports, SerialSource};
pub use source::{FixSink, ManualSource, PendingRequests, PositionEvent, PositionSource, WatchHandle};
