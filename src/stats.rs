// src/stats.rs
//! Training statistics over stored activities

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::TrackerError;
use crate::models::{Activity, SportType};

/// Minimum distance for an activity to count toward the fastest pace
const PACE_RECORD_MIN_METERS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Week,
    Month,
    Year,
    AllTime,
}

impl StatsPeriod {
    /// Half-open `[start, end)` bounds of the period containing `now`.
    ///
    /// Weeks start on Monday. All time runs from 2000-01-01 to one day past
    /// `now`.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        match self {
            StatsPeriod::Week => {
                let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (midnight(monday), midnight(monday + Duration::days(7)))
            }
            StatsPeriod::Month => {
                let first = first_of_month(today.year(), today.month());
                let next = if today.month() == 12 {
                    first_of_month(today.year() + 1, 1)
                } else {
                    first_of_month(today.year(), today.month() + 1)
                };
                (midnight(first), midnight(next))
            }
            StatsPeriod::Year => (
                midnight(first_of_month(today.year(), 1)),
                midnight(first_of_month(today.year() + 1, 1)),
            ),
            StatsPeriod::AllTime => (
                midnight(first_of_month(2000, 1)),
                now + Duration::days(1),
            ),
        }
    }
}

impl FromStr for StatsPeriod {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            "year" => Ok(StatsPeriod::Year),
            "all" | "all_time" => Ok(StatsPeriod::AllTime),
            other => Err(TrackerError::Parse(format!(
                "unknown stats period '{}'",
                other
            ))),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

pub(crate) fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn selected<'a>(
    activities: &'a [Activity],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sport: Option<SportType>,
) -> impl Iterator<Item = &'a Activity> {
    activities.iter().filter(move |a| {
        a.started_at >= start && a.started_at < end && sport.map_or(true, |s| a.sport_type == s)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_activities: usize,
    pub total_distance_meters: f64,
    pub total_duration_seconds: u64,
    pub total_calories: u64,
    pub avg_distance_meters: f64,
    pub avg_duration_seconds: f64,
    /// Seconds per kilometre over the whole period
    pub avg_pace_per_km: Option<f64>,
    pub sports_breakdown: BTreeMap<SportType, usize>,
}

pub fn summarize_period(
    activities: &[Activity],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sport: Option<SportType>,
) -> PeriodSummary {
    let mut summary = PeriodSummary {
        period_start: start.date_naive(),
        period_end: end.date_naive(),
        total_activities: 0,
        total_distance_meters: 0.0,
        total_duration_seconds: 0,
        total_calories: 0,
        avg_distance_meters: 0.0,
        avg_duration_seconds: 0.0,
        avg_pace_per_km: None,
        sports_breakdown: BTreeMap::new(),
    };

    for activity in selected(activities, start, end, sport) {
        summary.total_activities += 1;
        summary.total_distance_meters += activity.distance_meters;
        summary.total_duration_seconds += activity.duration_seconds;
        summary.total_calories += u64::from(activity.calories.unwrap_or(0));
        *summary
            .sports_breakdown
            .entry(activity.sport_type)
            .or_insert(0) += 1;
    }

    if summary.total_activities > 0 {
        let count = summary.total_activities as f64;
        summary.avg_distance_meters = summary.total_distance_meters / count;
        summary.avg_duration_seconds = summary.total_duration_seconds as f64 / count;
    }
    if summary.total_distance_meters > 0.0 {
        summary.avg_pace_per_km =
            Some(summary.total_duration_seconds as f64 / summary.total_distance_meters * 1000.0);
    }

    summary
}

pub fn period_summary(
    activities: &[Activity],
    period: StatsPeriod,
    now: DateTime<Utc>,
    sport: Option<SportType>,
) -> PeriodSummary {
    let (start, end) = period.bounds(now);
    summarize_period(activities, start, end, sport)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub activities: usize,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub calories: u64,
}

impl DailyStat {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            activities: 0,
            distance_meters: 0.0,
            duration_seconds: 0,
            calories: 0,
        }
    }
}

/// One entry per UTC day in `[start_date, end_date)`, days without
/// activities included as zeros
pub fn daily_stats(
    activities: &[Activity],
    start_date: NaiveDate,
    end_date: NaiveDate,
    sport: Option<SportType>,
) -> Vec<DailyStat> {
    let mut by_date: BTreeMap<NaiveDate, DailyStat> = BTreeMap::new();
    for activity in selected(activities, midnight(start_date), midnight(end_date), sport) {
        let date = activity.started_at.date_naive();
        let stat = by_date.entry(date).or_insert_with(|| DailyStat::empty(date));
        stat.activities += 1;
        stat.distance_meters += activity.distance_meters;
        stat.duration_seconds += activity.duration_seconds;
        stat.calories += u64::from(activity.calories.unwrap_or(0));
    }

    start_date
        .iter_days()
        .take_while(|date| *date < end_date)
        .map(|date| by_date.remove(&date).unwrap_or_else(|| DailyStat::empty(date)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    LongestDistance,
    LongestDuration,
    FastestPace,
}

impl RecordType {
    pub fn unit(&self) -> &'static str {
        match self {
            RecordType::LongestDistance => "meters",
            RecordType::LongestDuration => "seconds",
            RecordType::FastestPace => "seconds_per_meter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalRecord {
    pub record_type: RecordType,
    pub sport_type: SportType,
    pub value: f64,
    pub unit: &'static str,
    pub activity_id: String,
    pub achieved_at: DateTime<Utc>,
}

impl PersonalRecord {
    fn new(record_type: RecordType, value: f64, activity: &Activity) -> Self {
        Self {
            record_type,
            sport_type: activity.sport_type,
            value,
            unit: record_type.unit(),
            activity_id: activity.id.clone(),
            achieved_at: activity.started_at,
        }
    }
}

/// Per sport: longest distance, longest duration and fastest pace.
///
/// Ties go to the activity that started first, then to the smaller id, so the
/// result does not depend on the order of `activities`.
pub fn personal_records(activities: &[Activity], sport: Option<SportType>) -> Vec<PersonalRecord> {
    let sports: BTreeSet<SportType> = match sport {
        Some(sport) => BTreeSet::from([sport]),
        None => activities.iter().map(|a| a.sport_type).collect(),
    };

    let mut records = Vec::new();
    for sport in sports {
        let of_sport: Vec<&Activity> = activities.iter().filter(|a| a.sport_type == sport).collect();

        let best = |value: &dyn Fn(&Activity) -> Option<f64>, lower_is_better: bool| {
            of_sport
                .iter()
                .filter_map(|a| value(a).map(|v| (v, *a)))
                .fold(None::<(f64, &Activity)>, |current, (v, a)| match current {
                    Some((b, held)) if !beats((v, a), (b, held), lower_is_better) => current,
                    _ => Some((v, a)),
                })
        };

        if let Some((value, activity)) = best(&|a| Some(a.distance_meters), false) {
            records.push(PersonalRecord::new(RecordType::LongestDistance, value, activity));
        }
        if let Some((value, activity)) = best(&|a| Some(a.duration_seconds as f64), false) {
            records.push(PersonalRecord::new(RecordType::LongestDuration, value, activity));
        }
        let pace = |a: &Activity| {
            (a.distance_meters >= PACE_RECORD_MIN_METERS && a.duration_seconds > 0)
                .then(|| a.duration_seconds as f64 / a.distance_meters)
        };
        if let Some((value, activity)) = best(&pace, true) {
            records.push(PersonalRecord::new(RecordType::FastestPace, value, activity));
        }
    }

    records
}

fn beats(candidate: (f64, &Activity), held: (f64, &Activity), lower_is_better: bool) -> bool {
    let (v, a) = candidate;
    let (b, h) = held;
    if v == b {
        return (a.started_at, &a.id) < (h.started_at, &h.id);
    }
    (v < b) == lower_is_better
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrend {
    pub current_week: PeriodSummary,
    pub previous_week: PeriodSummary,
    pub distance_change_percent: f64,
    pub duration_change_percent: f64,
    pub activity_count_change: i64,
}

fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// This week so far against the whole previous week
pub fn weekly_trend(
    activities: &[Activity],
    now: DateTime<Utc>,
    sport: Option<SportType>,
) -> WeeklyTrend {
    let (start, end) = StatsPeriod::Week.bounds(now);
    let current_week = summarize_period(activities, start, end, sport);
    let previous_week = summarize_period(activities, start - Duration::days(7), start, sport);

    WeeklyTrend {
        distance_change_percent: percent_change(
            current_week.total_distance_meters,
            previous_week.total_distance_meters,
        ),
        duration_change_percent: percent_change(
            current_week.total_duration_seconds as f64,
            previous_week.total_duration_seconds as f64,
        ),
        activity_count_change: current_week.total_activities as i64
            - previous_week.total_activities as i64,
        current_week,
        previous_week,
    }
}
