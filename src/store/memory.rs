// src/store/memory.rs
//! In-process activity store

use std::{collections::HashMap, sync::Mutex};

use log::info;

use super::ActivityStore;
use crate::error::{Result, TrackerError};
use crate::models::{Activity, ActivityUpdate, GpsPoint};
use crate::sync::lock;

#[derive(Default)]
struct MemoryInner {
    activities: HashMap<String, Activity>,
    // (storage key, sample)
    points: Vec<(u64, GpsPoint)>,
    next_key: u64,
}

/// Volatile store for tests and embedding. One lock covers both
/// collections, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored samples across all activities
    pub fn sample_count(&self) -> usize {
        lock(&self.inner).points.len()
    }
}

impl ActivityStore for MemoryStore {
    async fn add_activity_with_samples(
        &self,
        activity: &Activity,
        samples: &[GpsPoint],
    ) -> Result<()> {
        activity.validate()?;
        let mut inner = lock(&self.inner);
        if inner.activities.contains_key(&activity.id) {
            return Err(TrackerError::Other(format!(
                "activity {} already exists",
                activity.id
            )));
        }

        inner
            .activities
            .insert(activity.id.clone(), activity.clone());
        for sample in samples {
            let key = inner.next_key;
            inner.next_key += 1;
            let mut sample = sample.clone();
            sample.activity_id = activity.id.clone();
            inner.points.push((key, sample));
        }

        info!(
            "Stored activity {} with {} samples",
            activity.id,
            samples.len()
        );
        Ok(())
    }

    async fn get_activity(&self, id: &str) -> Result<Option<Activity>> {
        Ok(lock(&self.inner).activities.get(id).cloned())
    }

    async fn list_activities(&self) -> Result<Vec<Activity>> {
        let mut activities: Vec<Activity> =
            lock(&self.inner).activities.values().cloned().collect();
        activities.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
        Ok(activities)
    }

    async fn get_samples_for_activity(&self, id: &str) -> Result<Vec<GpsPoint>> {
        let mut samples: Vec<(u64, GpsPoint)> = lock(&self.inner)
            .points
            .iter()
            .filter(|(_, point)| point.activity_id == id)
            .cloned()
            .collect();
        samples.sort_by(|(ka, a), (kb, b)| a.timestamp.cmp(&b.timestamp).then(ka.cmp(kb)));
        Ok(samples.into_iter().map(|(_, point)| point).collect())
    }

    async fn update_activity_fields(&self, id: &str, update: &ActivityUpdate) -> Result<Activity> {
        let mut inner = lock(&self.inner);
        let activity = inner
            .activities
            .get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(format!("activity {}", id)))?;

        if let Some(title) = &update.title {
            activity.title = title.clone();
        }
        if let Some(notes) = &update.notes {
            activity.notes = notes.clone();
        }
        Ok(activity.clone())
    }

    async fn delete_activity_cascade(&self, id: &str) -> Result<()> {
        let mut inner = lock(&self.inner);
        if inner.activities.remove(id).is_none() {
            return Err(TrackerError::NotFound(format!("activity {}", id)));
        }
        inner.points.retain(|(_, point)| point.activity_id != id);
        info!("Deleted activity {}", id);
        Ok(())
    }

    async fn activity_exists(&self, id: &str) -> Result<bool> {
        Ok(lock(&self.inner).activities.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SportType;
    use chrono::{DateTime, Duration, Utc};

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(seconds)
    }

    fn activity(id: &str, start: i64) -> Activity {
        Activity {
            id: id.to_string(),
            title: "Morning run".to_string(),
            sport_type: SportType::Running,
            started_at: at(start),
            ended_at: at(start + 600),
            distance_meters: 1500.0,
            duration_seconds: 600,
            calories: Some(105),
            notes: None,
            elevation_gain: Some(3.0),
            elevation_loss: Some(1.0),
            avg_speed_mps: Some(2.5),
            max_speed_mps: Some(3.1),
        }
    }

    fn point(id: &str, seconds: i64, lat: f64) -> GpsPoint {
        GpsPoint {
            activity_id: id.to_string(),
            latitude: lat,
            longitude: 8.5,
            elevation_meters: None,
            timestamp: at(seconds),
            speed_mps: None,
            accuracy_meters: Some(5.0),
        }
    }

    #[tokio::test]
    async fn test_samples_come_back_in_time_order() {
        let store = MemoryStore::new();
        let samples = vec![point("a", 20, 3.0), point("a", 0, 1.0), point("a", 10, 2.0)];
        store
            .add_activity_with_samples(&activity("a", 0), &samples)
            .await
            .unwrap();

        let lats: Vec<f64> = store
            .get_samples_for_activity("a")
            .await
            .unwrap()
            .iter()
            .map(|p| p.latitude)
            .collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_negative_distance_is_refused() {
        let store = MemoryStore::new();
        let mut broken = activity("a", 0);
        broken.distance_meters = -1.0;

        let result = store
            .add_activity_with_samples(&broken, &[point("a", 0, 1.0)])
            .await;

        assert!(matches!(result, Err(TrackerError::InvalidActivity(_))));
        assert_eq!(store.sample_count(), 0);
        assert!(!store.activity_exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_add_writes_nothing() {
        let store = MemoryStore::new();
        store
            .add_activity_with_samples(&activity("a", 0), &[point("a", 0, 1.0)])
            .await
            .unwrap();

        let again = store
            .add_activity_with_samples(&activity("a", 0), &[point("a", 5, 2.0), point("a", 6, 3.0)])
            .await;

        assert!(again.is_err());
        assert_eq!(store.sample_count(), 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryStore::new();
        for (id, start) in [("old", 0), ("new", 7200), ("mid", 3600)] {
            store
                .add_activity_with_samples(&activity(id, start), &[])
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .list_activities()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_update_touches_only_title_and_notes() {
        let store = MemoryStore::new();
        store
            .add_activity_with_samples(&activity("a", 0), &[])
            .await
            .unwrap();

        let update = ActivityUpdate {
            title: Some("Tempo".to_string()),
            notes: Some(Some("felt good".to_string())),
        };
        let updated = store.update_activity_fields("a", &update).await.unwrap();

        assert_eq!(updated.title, "Tempo");
        assert_eq!(updated.notes.as_deref(), Some("felt good"));
        assert_eq!(updated.distance_meters, 1500.0);

        let cleared = store
            .update_activity_fields(
                "a",
                &ActivityUpdate {
                    title: None,
                    notes: Some(None),
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.title, "Tempo");
        assert_eq!(cleared.notes, None);

        assert!(matches!(
            store.update_activity_fields("missing", &update).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_samples() {
        let store = MemoryStore::new();
        store
            .add_activity_with_samples(&activity("a", 0), &[point("a", 0, 1.0), point("a", 1, 1.1)])
            .await
            .unwrap();
        store
            .add_activity_with_samples(&activity("b", 100), &[point("b", 100, 2.0)])
            .await
            .unwrap();

        store.delete_activity_cascade("a").await.unwrap();

        assert!(!store.activity_exists("a").await.unwrap());
        assert!(store.get_samples_for_activity("a").await.unwrap().is_empty());
        assert_eq!(store.get_samples_for_activity("b").await.unwrap().len(), 1);
        assert!(store.delete_activity_cascade("a").await.is_err());
    }
}
