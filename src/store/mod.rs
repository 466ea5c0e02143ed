// src/store/mod.rs
//! Persistent activity storage

use std::future::Future;

use crate::error::Result;
use crate::models::{Activity, ActivityUpdate, GpsPoint};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::Database;

/// Storage contract for activities and their samples.
///
/// Multi-record operations are atomic: a reader never sees an activity
/// without its complete sample set.
pub trait ActivityStore: Send + Sync {
    /// Write an activity together with all of its samples, or nothing
    fn add_activity_with_samples(
        &self,
        activity: &Activity,
        samples: &[GpsPoint],
    ) -> impl Future<Output = Result<()>> + Send;

    fn get_activity(&self, id: &str) -> impl Future<Output = Result<Option<Activity>>> + Send;

    /// Every activity, newest start first
    fn list_activities(&self) -> impl Future<Output = Result<Vec<Activity>>> + Send;

    /// Samples of one activity in ascending timestamp order
    fn get_samples_for_activity(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Vec<GpsPoint>>> + Send;

    /// Edit title and notes only. Computed metrics are never touched.
    fn update_activity_fields(
        &self,
        id: &str,
        update: &ActivityUpdate,
    ) -> impl Future<Output = Result<Activity>> + Send;

    /// Remove an activity and all of its samples in one step
    fn delete_activity_cascade(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    fn activity_exists(&self, id: &str) -> impl Future<Output = Result<bool>> + Send;
}
