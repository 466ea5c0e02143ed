// src/transfer/mod.rs
//! Moving activities in and out of the store

pub mod backup;
pub mod track;

pub use backup::{
    activity_file_name, bulk_file_name, export_activity, export_all, import_file, import_json,
    write_unsaved, ExportBundle, ExportedActivity, ImportOutcome, EXPORT_VERSION,
};
pub use track::{render_track, write_track, TrackFormat};
