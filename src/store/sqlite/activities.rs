// src/store/sqlite/activities.rs

use log::info;
use rusqlite::{params, OptionalExtension, Row};

use super::{
    helpers::{format_datetime, parse_datetime, to_i64, to_u64},
    Database,
};
use crate::error::{Result, TrackerError};
use crate::models::{Activity, ActivityUpdate, GpsPoint, SportType};
use crate::store::ActivityStore;

const ACTIVITY_COLUMNS: &str = "id, title, sport_type, started_at, ended_at, distance_meters, \
     duration_seconds, calories, notes, elevation_gain, elevation_loss, avg_speed_mps, max_speed_mps";

fn row_to_activity(row: &Row) -> Result<Activity> {
    let sport_type: String = row.get("sport_type")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;
    let duration_seconds: i64 = row.get("duration_seconds")?;

    Ok(Activity {
        id: row.get("id")?,
        title: row.get("title")?,
        sport_type: sport_type.parse::<SportType>()?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_datetime(&ended_at, "ended_at")?,
        distance_meters: row.get("distance_meters")?,
        duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
        calories: row.get("calories")?,
        notes: row.get("notes")?,
        elevation_gain: row.get("elevation_gain")?,
        elevation_loss: row.get("elevation_loss")?,
        avg_speed_mps: row.get("avg_speed_mps")?,
        max_speed_mps: row.get("max_speed_mps")?,
    })
}

fn row_to_point(row: &Row) -> Result<GpsPoint> {
    let timestamp: String = row.get("timestamp")?;

    Ok(GpsPoint {
        activity_id: row.get("activity_id")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        elevation_meters: row.get("elevation_meters")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        speed_mps: row.get("speed_mps")?,
        accuracy_meters: row.get("accuracy_meters")?,
    })
}

fn select_activity(conn: &rusqlite::Connection, id: &str) -> Result<Option<Activity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM activities WHERE id = ?1",
        ACTIVITY_COLUMNS
    ))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_activity(row)?)),
        None => Ok(None),
    }
}

impl ActivityStore for Database {
    async fn add_activity_with_samples(
        &self,
        activity: &Activity,
        samples: &[GpsPoint],
    ) -> Result<()> {
        activity.validate()?;
        let record = activity.clone();
        let points = samples.to_vec();

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO activities ({}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    ACTIVITY_COLUMNS
                ),
                params![
                    record.id,
                    record.title,
                    record.sport_type.as_str(),
                    format_datetime(&record.started_at),
                    format_datetime(&record.ended_at),
                    record.distance_meters,
                    to_i64(record.duration_seconds)?,
                    record.calories,
                    record.notes,
                    record.elevation_gain,
                    record.elevation_loss,
                    record.avg_speed_mps,
                    record.max_speed_mps,
                ],
            )?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO gps_points (activity_id, latitude, longitude, elevation_meters, timestamp, speed_mps, accuracy_meters)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for point in &points {
                    stmt.execute(params![
                        record.id,
                        point.latitude,
                        point.longitude,
                        point.elevation_meters,
                        format_datetime(&point.timestamp),
                        point.speed_mps,
                        point.accuracy_meters,
                    ])?;
                }
            }

            tx.commit()?;
            info!(
                "Stored activity {} with {} samples",
                record.id,
                points.len()
            );
            Ok(())
        })
        .await
    }

    async fn get_activity(&self, id: &str) -> Result<Option<Activity>> {
        let id = id.to_string();
        self.execute(move |conn| select_activity(conn, &id)).await
    }

    async fn list_activities(&self) -> Result<Vec<Activity>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM activities ORDER BY started_at DESC, id ASC",
                ACTIVITY_COLUMNS
            ))?;

            let mut rows = stmt.query([])?;
            let mut activities = Vec::new();
            while let Some(row) = rows.next()? {
                activities.push(row_to_activity(row)?);
            }
            Ok(activities)
        })
        .await
    }

    async fn get_samples_for_activity(&self, id: &str) -> Result<Vec<GpsPoint>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT activity_id, latitude, longitude, elevation_meters, timestamp, speed_mps, accuracy_meters
                 FROM gps_points
                 WHERE activity_id = ?1
                 ORDER BY timestamp ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![id])?;
            let mut points = Vec::new();
            while let Some(row) = rows.next()? {
                points.push(row_to_point(row)?);
            }
            Ok(points)
        })
        .await
    }

    async fn update_activity_fields(&self, id: &str, update: &ActivityUpdate) -> Result<Activity> {
        let id = id.to_string();
        let update = update.clone();

        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let exists = tx
                .query_row(
                    "SELECT 1 FROM activities WHERE id = ?1",
                    params![id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Err(TrackerError::NotFound(format!("activity {}", id)));
            }

            if let Some(title) = &update.title {
                tx.execute(
                    "UPDATE activities SET title = ?1 WHERE id = ?2",
                    params![title, id],
                )?;
            }
            if let Some(notes) = &update.notes {
                tx.execute(
                    "UPDATE activities SET notes = ?1 WHERE id = ?2",
                    params![notes, id],
                )?;
            }

            let activity = select_activity(&tx, &id)?
                .ok_or_else(|| TrackerError::NotFound(format!("activity {}", id)))?;
            tx.commit()?;
            Ok(activity)
        })
        .await
    }

    async fn delete_activity_cascade(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            // Explicit delete so the cascade holds even where foreign keys are off
            tx.execute("DELETE FROM gps_points WHERE activity_id = ?1", params![id])?;
            let removed = tx.execute("DELETE FROM activities WHERE id = ?1", params![id])?;
            if removed == 0 {
                return Err(TrackerError::NotFound(format!("activity {}", id)));
            }
            tx.commit()?;
            info!("Deleted activity {}", id);
            Ok(())
        })
        .await
    }

    async fn activity_exists(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM activities WHERE id = ?1",
                    params![id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}
