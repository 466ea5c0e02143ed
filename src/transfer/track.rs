// src/transfer/track.rs
//! Route export to GPX, GeoJSON and CSV

use std::{fmt, path::Path, str::FromStr};

use chrono::SecondsFormat;
use log::info;
use serde_json::json;

use crate::error::{Result, TrackerError};
use crate::models::{Activity, GpsPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Gpx,
    GeoJson,
    Csv,
}

impl TrackFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TrackFormat::Gpx => "gpx",
            TrackFormat::GeoJson => "geojson",
            TrackFormat::Csv => "csv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TrackFormat::Gpx => "GPX (GPS Exchange)",
            TrackFormat::GeoJson => "GeoJSON",
            TrackFormat::Csv => "CSV",
        }
    }
}

impl fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TrackFormat {
    type Err = TrackerError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpx" => Ok(TrackFormat::Gpx),
            "geojson" | "json" => Ok(TrackFormat::GeoJson),
            "csv" => Ok(TrackFormat::Csv),
            other => Err(TrackerError::Parse(format!("unknown track format '{}'", other))),
        }
    }
}

/// Render one activity's route in `format`
pub fn render_track(activity: &Activity, points: &[GpsPoint], format: TrackFormat) -> Result<String> {
    match format {
        TrackFormat::Gpx => Ok(to_gpx(activity, points)),
        TrackFormat::GeoJson => to_geojson(activity, points),
        TrackFormat::Csv => Ok(to_csv(points)),
    }
}

pub async fn write_track(
    path: &Path,
    activity: &Activity,
    points: &[GpsPoint],
    format: TrackFormat,
) -> Result<()> {
    if points.is_empty() {
        return Err(TrackerError::Other(format!(
            "Activity {} has no GPS points to export",
            activity.id
        )));
    }

    let content = render_track(activity, points, format)?;
    tokio::fs::write(path, content).await?;
    info!(
        "Wrote {} track with {} points to {}",
        format.display_name(),
        points.len(),
        path.display()
    );
    Ok(())
}

fn timestamp(point: &GpsPoint) -> String {
    point.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_gpx(activity: &Activity, points: &[GpsPoint]) -> String {
    let mut gpx = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="Sports Tracker" xmlns="http://www.topografix.com/GPX/1/1">
"#,
    );

    gpx.push_str(&format!(
        "  <metadata>\n    <name>{}</name>\n    <time>{}</time>\n  </metadata>\n",
        escape_xml(&activity.title),
        activity.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    gpx.push_str("  <trk>\n");
    gpx.push_str(&format!("    <name>{}</name>\n", escape_xml(&activity.title)));
    gpx.push_str(&format!("    <type>{}</type>\n", activity.sport_type.as_str()));
    if let Some(notes) = &activity.notes {
        gpx.push_str(&format!("    <desc>{}</desc>\n", escape_xml(notes)));
    }
    gpx.push_str("    <trkseg>\n");

    for point in points {
        gpx.push_str(&format!(
            "      <trkpt lat=\"{}\" lon=\"{}\">\n",
            point.latitude, point.longitude
        ));
        if let Some(ele) = point.elevation_meters {
            gpx.push_str(&format!("        <ele>{}</ele>\n", ele));
        }
        gpx.push_str(&format!("        <time>{}</time>\n", timestamp(point)));
        gpx.push_str("      </trkpt>\n");
    }

    gpx.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
    gpx
}

fn to_geojson(activity: &Activity, points: &[GpsPoint]) -> Result<String> {
    let coordinates: Vec<serde_json::Value> = points
        .iter()
        .map(|p| match p.elevation_meters {
            Some(ele) => json!([p.longitude, p.latitude, ele]),
            None => json!([p.longitude, p.latitude]),
        })
        .collect();
    let times: Vec<String> = points.iter().map(timestamp).collect();

    let feature = json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": coordinates
        },
        "properties": {
            "id": activity.id,
            "title": activity.title,
            "sport_type": activity.sport_type,
            "started_at": activity.started_at,
            "ended_at": activity.ended_at,
            "distance_meters": activity.distance_meters,
            "duration_seconds": activity.duration_seconds,
            "calories": activity.calories,
            "notes": activity.notes,
            "coordTimes": times
        }
    });

    Ok(serde_json::to_string_pretty(&feature)?)
}

fn to_csv(points: &[GpsPoint]) -> String {
    let mut csv =
        String::from("timestamp,latitude,longitude,elevation_meters,speed_mps,accuracy_meters\n");
    let optional = |value: Option<f64>| value.map_or(String::new(), |v| v.to_string());

    for point in points {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            escape_csv(&timestamp(point)),
            point.latitude,
            point.longitude,
            optional(point.elevation_meters),
            optional(point.speed_mps),
            optional(point.accuracy_meters)
        ));
    }

    csv
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SportType;
    use chrono::{DateTime, Utc};

    fn activity() -> Activity {
        let start = DateTime::parse_from_rfc3339("2024-04-20T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Activity {
            id: "trail".to_string(),
            title: "Hills & <valleys>".to_string(),
            sport_type: SportType::Hiking,
            started_at: start,
            ended_at: start + chrono::Duration::seconds(60),
            distance_meters: 120.0,
            duration_seconds: 60,
            calories: Some(7),
            notes: Some("muddy".to_string()),
            elevation_gain: Some(4.0),
            elevation_loss: Some(0.0),
            avg_speed_mps: Some(2.0),
            max_speed_mps: Some(2.4),
        }
    }

    fn points() -> Vec<GpsPoint> {
        let a = activity();
        vec![
            GpsPoint {
                activity_id: a.id.clone(),
                latitude: 47.0,
                longitude: 8.0,
                elevation_meters: Some(500.0),
                timestamp: a.started_at,
                speed_mps: None,
                accuracy_meters: Some(3.0),
            },
            GpsPoint {
                activity_id: a.id.clone(),
                latitude: 47.001,
                longitude: 8.0,
                elevation_meters: None,
                timestamp: a.ended_at,
                speed_mps: Some(2.4),
                accuracy_meters: None,
            },
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("GPX".parse::<TrackFormat>().unwrap(), TrackFormat::Gpx);
        assert_eq!("geojson".parse::<TrackFormat>().unwrap(), TrackFormat::GeoJson);
        assert_eq!(" csv ".parse::<TrackFormat>().unwrap(), TrackFormat::Csv);
        assert!("kml".parse::<TrackFormat>().is_err());
    }

    #[test]
    fn test_gpx_export() {
        let gpx = render_track(&activity(), &points(), TrackFormat::Gpx).unwrap();

        assert!(gpx.contains("<gpx"));
        assert!(gpx.contains("Hills &amp; &lt;valleys&gt;"));
        assert!(gpx.contains("<type>hiking</type>"));
        assert!(gpx.contains("<trkpt lat=\"47\" lon=\"8\">"));
        assert!(gpx.contains("<ele>500</ele>"));
        assert!(gpx.contains("<time>2024-04-20T08:01:00.000Z</time>"));
        assert_eq!(gpx.matches("<trkpt").count(), 2);
    }

    #[test]
    fn test_geojson_export() {
        let text = render_track(&activity(), &points(), TrackFormat::GeoJson).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["geometry"]["type"], "LineString");
        assert_eq!(value["geometry"]["coordinates"][0], json!([8.0, 47.0, 500.0]));
        assert_eq!(value["geometry"]["coordinates"][1], json!([8.0, 47.001]));
        assert_eq!(value["properties"]["sport_type"], "hiking");
        assert_eq!(value["properties"]["coordTimes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_export() {
        let csv = render_track(&activity(), &points(), TrackFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "timestamp,latitude,longitude,elevation_meters,speed_mps,accuracy_meters");
        assert_eq!(lines[1], "2024-04-20T08:00:00.000Z,47,8,500,,3");
        assert_eq!(lines[2], "2024-04-20T08:01:00.000Z,47.001,8,,2.4,");
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[tokio::test]
    async fn test_write_track_requires_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.gpx");

        assert!(write_track(&path, &activity(), &[], TrackFormat::Gpx).await.is_err());

        write_track(&path, &activity(), &points(), TrackFormat::Gpx)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml"));
    }
}
