// src/display/report.rs
//! Plain-text reports for stored activities and statistics

use crate::{
    goals::{Goal, GoalProgress, GoalType},
    metrics::{
        bounding_box, center, format_date, format_distance, format_duration, format_elevation,
        format_pace, format_speed, format_time,
    },
    models::{Activity, GpsPoint},
    stats::{PeriodSummary, PersonalRecord, RecordType, WeeklyTrend},
};

/// One line per activity, newest first as given
pub fn activity_table(activities: &[Activity]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<36}  {:<8}  {:<24}  {:>10}  {:>8}  {:>9}",
        "ID", "SPORT", "TITLE", "DISTANCE", "TIME", "PACE"
    )];

    for activity in activities {
        lines.push(format!(
            "{:<36}  {:<8}  {:<24}  {:>10}  {:>8}  {:>9}",
            activity.id,
            activity.sport_type.as_str(),
            truncate(&activity.title, 24),
            format_distance(activity.distance_meters),
            format_duration(activity.duration_seconds),
            format_pace(activity.distance_meters, activity.duration_seconds),
        ));
    }

    lines
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}~", kept)
    }
}

pub fn activity_details(activity: &Activity, points: &[GpsPoint]) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", activity.title, activity.sport_type.label()),
        format!(
            "  {}  {} - {}",
            format_date(&activity.started_at),
            format_time(&activity.started_at),
            format_time(&activity.ended_at)
        ),
        format!("  Distance:   {}", format_distance(activity.distance_meters)),
        format!("  Duration:   {}", format_duration(activity.duration_seconds)),
        format!(
            "  Pace:       {}",
            format_pace(activity.distance_meters, activity.duration_seconds)
        ),
    ];

    if let Some(avg) = activity.avg_speed_mps {
        lines.push(format!("  Avg speed:  {}", format_speed(avg)));
    }
    if let Some(max) = activity.max_speed_mps {
        lines.push(format!("  Max speed:  {}", format_speed(max)));
    }
    if let (Some(gain), Some(loss)) = (activity.elevation_gain, activity.elevation_loss) {
        lines.push(format!(
            "  Elevation:  +{} / -{}",
            format_elevation(gain),
            format_elevation(loss)
        ));
    }
    if let Some(calories) = activity.calories {
        lines.push(format!("  Calories:   {} kcal", calories));
    }

    lines.push(format!("  GPS points: {}", points.len()));
    if let Some([min, max]) = bounding_box(points) {
        let [lat, lon] = center(points);
        lines.push(format!("  Center:     {:.5}, {:.5}", lat, lon));
        lines.push(format!(
            "  Bounds:     {:.5}, {:.5} .. {:.5}, {:.5}",
            min[0], min[1], max[0], max[1]
        ));
    }

    if let Some(notes) = &activity.notes {
        lines.push(String::new());
        lines.push(format!("  {}", notes));
    }

    lines
}

fn summary_lines(label: &str, summary: &PeriodSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} ({} .. {})",
            label, summary.period_start, summary.period_end
        ),
        format!("  Activities: {}", summary.total_activities),
        format!("  Distance:   {}", format_distance(summary.total_distance_meters)),
        format!("  Duration:   {}", format_duration(summary.total_duration_seconds)),
        format!("  Calories:   {} kcal", summary.total_calories),
    ];

    if let Some(pace) = summary.avg_pace_per_km {
        let pace = pace.round() as u64;
        lines.push(format!("  Avg pace:   {}:{:02} /km", pace / 60, pace % 60));
    }
    for (sport, count) in &summary.sports_breakdown {
        lines.push(format!("    {:<10} {}", sport.label(), count));
    }

    lines
}

fn record_line(record: &PersonalRecord) -> String {
    let value = match record.record_type {
        RecordType::LongestDistance => format_distance(record.value),
        RecordType::LongestDuration => format_duration(record.value as u64),
        RecordType::FastestPace => format_pace(1000.0, (record.value * 1000.0).round() as u64),
    };
    let kind = match record.record_type {
        RecordType::LongestDistance => "Longest distance",
        RecordType::LongestDuration => "Longest duration",
        RecordType::FastestPace => "Fastest pace",
    };
    format!(
        "  {:<9} {:<17} {:>10}  {}",
        record.sport_type.label(),
        kind,
        value,
        format_date(&record.achieved_at)
    )
}

pub fn stats_report(
    label: &str,
    summary: &PeriodSummary,
    trend: &WeeklyTrend,
    records: &[PersonalRecord],
) -> Vec<String> {
    let mut lines = summary_lines(label, summary);

    lines.push(String::new());
    lines.push(format!(
        "This week vs last: distance {:+.1}%, duration {:+.1}%, activities {:+}",
        trend.distance_change_percent,
        trend.duration_change_percent,
        trend.activity_count_change
    ));

    if !records.is_empty() {
        lines.push(String::new());
        lines.push("Personal records".to_string());
        lines.extend(records.iter().map(record_line));
    }

    lines
}

fn goal_value(goal_type: GoalType, value: f64) -> String {
    match goal_type {
        GoalType::Distance => format_distance(value),
        GoalType::Duration => format_duration(value.round() as u64),
        GoalType::Frequency => format!("{}", value.round() as u64),
        GoalType::Calories => format!("{} kcal", value.round() as u64),
    }
}

/// One line per goal with its progress in the current window
pub fn goal_table(goals: &[(Goal, GoalProgress)]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<8}  {:<24}  {:<9}  {:<8}  {:>23}  {:>6}",
        "ID", "TITLE", "TYPE", "PERIOD", "PROGRESS", "DONE"
    )];

    for (goal, progress) in goals {
        let sport = goal.sport_type.map_or("", |sport| sport.as_str());
        lines.push(format!(
            "{:<8}  {:<24}  {:<9}  {:<8}  {:>23}  {:>5.1}%{}",
            goal.id.chars().take(8).collect::<String>(),
            truncate(&goal.title, 24),
            goal.goal_type.as_str(),
            goal.period.as_str(),
            format!(
                "{} / {}",
                goal_value(goal.goal_type, progress.current_value),
                goal_value(goal.goal_type, progress.target_value)
            ),
            progress.progress_percent,
            if progress.achieved { "  achieved" } else { "" }
        ));
        if !sport.is_empty() {
            lines.push(format!("{:<10}{} only", "", sport));
        }
    }

    lines
}
