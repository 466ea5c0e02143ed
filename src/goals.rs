// src/goals.rs
//! Training goals and their progress over stored activities

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::{Activity, SportType};
use crate::stats::{midnight, summarize_period, StatsPeriod};

const MAX_TITLE_CHARS: usize = 200;

/// What a goal counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    /// Meters
    Distance,
    /// Active seconds
    Duration,
    /// Number of activities
    Frequency,
    /// Estimated kcal
    Calories,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Distance => "distance",
            GoalType::Duration => "duration",
            GoalType::Frequency => "frequency",
            GoalType::Calories => "calories",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = TrackerError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(GoalType::Distance),
            "duration" => Ok(GoalType::Duration),
            "frequency" | "count" => Ok(GoalType::Frequency),
            "calories" => Ok(GoalType::Calories),
            other => Err(TrackerError::Parse(format!("unknown goal type '{}'", other))),
        }
    }
}

/// Window a goal is measured over. Calendar periods restart every day, week,
/// month or year; a custom goal runs between its own dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl GoalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalPeriod::Daily => "daily",
            GoalPeriod::Weekly => "weekly",
            GoalPeriod::Monthly => "monthly",
            GoalPeriod::Yearly => "yearly",
            GoalPeriod::Custom => "custom",
        }
    }
}

impl fmt::Display for GoalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalPeriod {
    type Err = TrackerError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(GoalPeriod::Daily),
            "weekly" | "week" => Ok(GoalPeriod::Weekly),
            "monthly" | "month" => Ok(GoalPeriod::Monthly),
            "yearly" | "year" => Ok(GoalPeriod::Yearly),
            "custom" => Ok(GoalPeriod::Custom),
            other => Err(TrackerError::Parse(format!("unknown goal period '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub goal_type: GoalType,
    /// `None` counts every sport
    pub sport_type: Option<SportType>,
    pub target_value: f64,
    pub period: GoalPeriod,
    pub start_date: NaiveDate,
    /// Last day of a custom goal, inclusive; open-ended when `None`
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create a [`Goal`]
#[derive(Debug, Clone)]
pub struct GoalDraft {
    pub title: String,
    pub goal_type: GoalType,
    pub sport_type: Option<SportType>,
    pub target_value: f64,
    pub period: GoalPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl Goal {
    /// Validate a draft and give it an id.
    pub fn create(draft: GoalDraft, now: DateTime<Utc>) -> Result<Self> {
        let title = draft.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(TrackerError::InvalidGoal(format!(
                "title must be 1 to {} characters",
                MAX_TITLE_CHARS
            )));
        }
        if !draft.target_value.is_finite() || draft.target_value <= 0.0 {
            return Err(TrackerError::InvalidGoal(
                "target must be a positive number".to_string(),
            ));
        }
        if let Some(end) = draft.end_date {
            if end < draft.start_date {
                return Err(TrackerError::InvalidGoal(
                    "end date is before the start date".to_string(),
                ));
            }
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            goal_type: draft.goal_type,
            sport_type: draft.sport_type,
            target_value: draft.target_value,
            period: draft.period,
            start_date: draft.start_date,
            end_date: draft.end_date,
            created_at: now,
        })
    }

    /// Half-open `[start, end)` window the goal counts at `now`.
    ///
    /// Custom goals without an end date count everything from their start.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self.period {
            GoalPeriod::Daily => {
                let today = midnight(now.date_naive());
                (today, today + Duration::days(1))
            }
            GoalPeriod::Weekly => StatsPeriod::Week.bounds(now),
            GoalPeriod::Monthly => StatsPeriod::Month.bounds(now),
            GoalPeriod::Yearly => StatsPeriod::Year.bounds(now),
            GoalPeriod::Custom => {
                let end = self
                    .end_date
                    .and_then(|date| date.succ_opt())
                    .map_or_else(|| midnight(NaiveDate::MAX), midnight);
                (midnight(self.start_date), end)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal_id: String,
    pub current_value: f64,
    pub target_value: f64,
    /// Capped at 100
    pub progress_percent: f64,
    pub achieved: bool,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Recompute a goal from the activities that fall in its current window.
pub fn goal_progress(goal: &Goal, activities: &[Activity], now: DateTime<Utc>) -> GoalProgress {
    let (start, end) = goal.window(now);
    let summary = summarize_period(activities, start, end, goal.sport_type);

    let current = match goal.goal_type {
        GoalType::Distance => summary.total_distance_meters,
        GoalType::Duration => summary.total_duration_seconds as f64,
        GoalType::Frequency => summary.total_activities as f64,
        GoalType::Calories => summary.total_calories as f64,
    };
    let percent = if goal.target_value > 0.0 {
        (current / goal.target_value * 100.0).min(100.0)
    } else {
        0.0
    };

    GoalProgress {
        goal_id: goal.id.clone(),
        current_value: current,
        target_value: goal.target_value,
        progress_percent: percent,
        achieved: current >= goal.target_value,
        window_start: start,
        window_end: end,
    }
}

/// Look a goal up by its full id or an unambiguous id prefix.
pub fn find_goal<'a>(goals: &'a [Goal], id: &str) -> Result<&'a Goal> {
    if let Some(goal) = goals.iter().find(|goal| goal.id == id) {
        return Ok(goal);
    }

    let mut matches = goals.iter().filter(|goal| !id.is_empty() && goal.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(goal), None) => Ok(goal),
        (Some(_), Some(_)) => Err(TrackerError::InvalidGoal(format!(
            "'{}' matches more than one goal",
            id
        ))),
        (None, _) => Err(TrackerError::NotFound(format!("goal {}", id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn activity(id: &str, sport: SportType, start: &str, meters: f64, seconds: u64) -> Activity {
        let started_at = utc(start);
        Activity {
            id: id.to_string(),
            title: id.to_string(),
            sport_type: sport,
            started_at,
            ended_at: started_at + Duration::seconds(seconds as i64),
            distance_meters: meters,
            duration_seconds: seconds,
            calories: Some(250),
            notes: None,
            elevation_gain: None,
            elevation_loss: None,
            avg_speed_mps: None,
            max_speed_mps: None,
        }
    }

    fn draft(goal_type: GoalType, target: f64, period: GoalPeriod) -> GoalDraft {
        GoalDraft {
            title: "Stay consistent".to_string(),
            goal_type,
            sport_type: None,
            target_value: target,
            period,
            start_date: date("2024-06-01"),
            end_date: None,
        }
    }

    fn goal(goal_type: GoalType, target: f64, period: GoalPeriod) -> Goal {
        Goal::create(draft(goal_type, target, period), utc("2024-06-01T00:00:00Z")).unwrap()
    }

    fn june() -> Vec<Activity> {
        vec![
            // Week of Monday 2024-06-10
            activity("r1", SportType::Running, "2024-06-10T06:00:00Z", 5000.0, 1500),
            activity("c1", SportType::Cycling, "2024-06-12T17:00:00Z", 20000.0, 3600),
            activity("r2", SportType::Running, "2024-06-13T07:00:00Z", 10000.0, 3300),
            // Previous week
            activity("r0", SportType::Running, "2024-06-05T06:00:00Z", 8000.0, 2400),
        ]
    }

    #[test]
    fn test_weekly_distance_goal() {
        let mut running = goal(GoalType::Distance, 20_000.0, GoalPeriod::Weekly);
        running.sport_type = Some(SportType::Running);

        let progress = goal_progress(&running, &june(), utc("2024-06-14T12:00:00Z"));
        assert_eq!(progress.current_value, 15_000.0);
        assert_eq!(progress.progress_percent, 75.0);
        assert!(!progress.achieved);
        assert_eq!(progress.window_start, utc("2024-06-10T00:00:00Z"));
        assert_eq!(progress.window_end, utc("2024-06-17T00:00:00Z"));
    }

    #[test]
    fn test_progress_is_capped_once_achieved() {
        let frequency = goal(GoalType::Frequency, 3.0, GoalPeriod::Monthly);
        let progress = goal_progress(&frequency, &june(), utc("2024-06-20T00:00:00Z"));

        assert_eq!(progress.current_value, 4.0);
        assert_eq!(progress.progress_percent, 100.0);
        assert!(progress.achieved);
    }

    #[test]
    fn test_duration_and_calorie_goals() {
        let now = utc("2024-06-12T20:00:00Z");

        let daily = goal(GoalType::Duration, 7200.0, GoalPeriod::Daily);
        assert_eq!(goal_progress(&daily, &june(), now).current_value, 3600.0);

        let yearly = goal(GoalType::Calories, 2000.0, GoalPeriod::Yearly);
        let progress = goal_progress(&yearly, &june(), now);
        assert_eq!(progress.current_value, 1000.0);
        assert_eq!(progress.progress_percent, 50.0);
    }

    #[test]
    fn test_custom_window_includes_its_last_day() {
        let mut custom = goal(GoalType::Frequency, 10.0, GoalPeriod::Custom);
        custom.start_date = date("2024-06-05");
        custom.end_date = Some(date("2024-06-12"));

        let progress = goal_progress(&custom, &june(), utc("2024-07-01T00:00:00Z"));
        assert_eq!(progress.current_value, 3.0);
        assert_eq!(progress.window_end, utc("2024-06-13T00:00:00Z"));

        custom.end_date = None;
        let progress = goal_progress(&custom, &june(), utc("2024-07-01T00:00:00Z"));
        assert_eq!(progress.current_value, 4.0);
    }

    #[test]
    fn test_invalid_drafts_are_refused() {
        let now = Utc::now();

        let mut empty_title = draft(GoalType::Distance, 1000.0, GoalPeriod::Weekly);
        empty_title.title = "   ".to_string();
        assert!(matches!(
            Goal::create(empty_title, now),
            Err(TrackerError::InvalidGoal(_))
        ));

        for target in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let bad = draft(GoalType::Distance, target, GoalPeriod::Weekly);
            assert!(Goal::create(bad, now).is_err(), "target {}", target);
        }

        let mut backwards = draft(GoalType::Frequency, 3.0, GoalPeriod::Custom);
        backwards.end_date = Some(date("2024-05-01"));
        assert!(Goal::create(backwards, now).is_err());
    }

    #[test]
    fn test_find_goal_by_prefix() {
        let mut first = goal(GoalType::Distance, 1.0, GoalPeriod::Weekly);
        first.id = "abc-111".to_string();
        let mut second = goal(GoalType::Distance, 1.0, GoalPeriod::Weekly);
        second.id = "abd-222".to_string();
        let goals = vec![first, second];

        assert_eq!(find_goal(&goals, "abc").unwrap().id, "abc-111");
        assert_eq!(find_goal(&goals, "abd-222").unwrap().id, "abd-222");
        assert!(matches!(find_goal(&goals, "ab"), Err(TrackerError::InvalidGoal(_))));
        assert!(matches!(find_goal(&goals, "zzz"), Err(TrackerError::NotFound(_))));
        assert!(find_goal(&goals, "").is_err());
    }

    #[test]
    fn test_goal_parsing() {
        assert_eq!("Distance".parse::<GoalType>().unwrap(), GoalType::Distance);
        assert_eq!("count".parse::<GoalType>().unwrap(), GoalType::Frequency);
        assert_eq!("week".parse::<GoalPeriod>().unwrap(), GoalPeriod::Weekly);
        assert!("fortnight".parse::<GoalPeriod>().is_err());
    }
}
