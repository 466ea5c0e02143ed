// src/main.rs
//! Sports Tracker - record GPS workouts from the terminal and manage them locally

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use sports_tracker::{
    display::{
        activity_details, activity_table, goal_table, stats_report, SessionEnd, TerminalDisplay,
    },
    goals::{goal_progress, Goal, GoalDraft, GoalPeriod, GoalType},
    gps::list_serial_ports,
    models::{ActivityDetails, ActivityUpdate, SportType},
    stats::{daily_stats, period_summary, personal_records, weekly_trend, StatsPeriod},
    transfer::{
        activity_file_name, bulk_file_name, export_activity, export_all, import_file,
        write_track, write_unsaved, TrackFormat,
    },
    ActivityStore, Database, Recorder, TrackerConfig, TrackerError,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Local-first GPS activity tracker", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $SPORTS_TRACKER_CONFIG, then the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the configured one
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a new activity with a live terminal view
    Record(RecordArgs),
    /// List stored activities, newest first
    List {
        /// Only show this sport
        #[arg(long)]
        sport: Option<SportType>,
    },
    /// Show one activity in detail
    Show { id: String },
    /// Change the title or notes of an activity
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        /// Remove the notes
        #[arg(long)]
        clear_notes: bool,
    },
    /// Delete an activity and its GPS points
    Delete { id: String },
    /// Write a JSON backup of one or all activities
    Export {
        /// Activity to export; all activities when omitted
        id: Option<String>,
        /// Output file (a dated name in the current directory by default)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import activities from a JSON backup
    Import { file: PathBuf },
    /// Export an activity route as GPX, GeoJSON or CSV
    Track {
        id: String,
        #[arg(short, long, default_value = "gpx")]
        format: TrackFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Training statistics
    Stats(StatsArgs),
    /// Training goals and their progress
    Goals {
        #[command(subcommand)]
        action: Option<GoalAction>,
    },
    /// List available serial ports
    Ports,
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Args, Debug)]
struct RecordArgs {
    #[arg(short, long, default_value = "running")]
    sport: SportType,
    #[arg(short, long)]
    title: Option<String>,
    #[arg(short, long)]
    notes: Option<String>,
    /// Body weight in kg for the calorie estimate
    #[arg(long)]
    weight: Option<f64>,
    #[command(flatten)]
    source: SourceArgs,
}

/// One-run overrides of the configured position source
#[derive(Args, Debug)]
struct SourceArgs {
    /// Read NMEA from this serial port
    #[arg(long, conflicts_with_all = ["gpsd", "replay"])]
    serial: Option<String>,
    #[arg(long, requires = "serial")]
    baud: Option<u32>,
    /// Connect to gpsd at HOST[:PORT]
    #[arg(long, conflicts_with = "replay")]
    gpsd: Option<String>,
    /// Replay an NMEA log file
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Delay between replayed sentences
    #[arg(long, requires = "replay")]
    interval_ms: Option<u64>,
}

impl SourceArgs {
    fn apply(&self, config: &mut TrackerConfig) -> Result<()> {
        if let Some(port) = &self.serial {
            let baud = self.baud.or(config.serial_baudrate).unwrap_or(9600);
            config.update_serial(port.clone(), baud);
        }
        if let Some(address) = &self.gpsd {
            let (host, port) = parse_gpsd_address(address)?;
            config.update_gpsd(host, port);
        }
        if let Some(path) = &self.replay {
            let interval = self.interval_ms.or(config.replay_interval_ms).unwrap_or(1000);
            config.update_replay(path.clone(), interval);
        }
        Ok(())
    }
}

fn parse_gpsd_address(address: &str) -> Result<(String, u16)> {
    match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("Invalid gpsd port in '{}'", address))?;
            Ok((host.to_string(), port))
        }
        None => Ok((address.to_string(), 2947)),
    }
}

const MAX_DAILY_DAYS: i64 = 3660;

#[derive(Args, Debug)]
struct StatsArgs {
    /// week, month, year or all
    #[arg(short, long, default_value = "week")]
    period: StatsPeriod,
    #[arg(long)]
    sport: Option<SportType>,
    /// Also print per-day totals for the last N days
    #[arg(
        long,
        value_name = "DAYS",
        value_parser = clap::value_parser!(u32).range(1..=MAX_DAILY_DAYS)
    )]
    daily: Option<u32>,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum GoalAction {
    /// Progress of every goal in its current window
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Add a goal
    Add(GoalArgs),
    /// Remove a goal by id or id prefix
    Remove { id: String },
}

#[derive(Args, Debug)]
struct GoalArgs {
    title: String,
    /// distance, duration, frequency or calories
    #[arg(long = "type")]
    goal_type: GoalType,
    /// Kilometres, minutes, activities or kcal, depending on the type
    #[arg(long)]
    target: f64,
    /// daily, weekly, monthly, yearly or custom
    #[arg(long, default_value = "weekly")]
    period: GoalPeriod,
    /// Only count this sport
    #[arg(long)]
    sport: Option<SportType>,
    /// First day of a custom goal, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day of a custom goal, YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl GoalArgs {
    fn into_draft(self, today: NaiveDate) -> Result<GoalDraft> {
        if self.period != GoalPeriod::Custom && (self.start.is_some() || self.end.is_some()) {
            bail!("--start and --end only apply to custom goals");
        }
        let target_value = match self.goal_type {
            GoalType::Distance => self.target * 1000.0,
            GoalType::Duration => self.target * 60.0,
            GoalType::Frequency | GoalType::Calories => self.target,
        };
        Ok(GoalDraft {
            title: self.title,
            goal_type: self.goal_type,
            sport_type: self.sport,
            target_value,
            period: self.period,
            start_date: self.start.unwrap_or(today),
            end_date: self.end,
        })
    }
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Use a gpsd daemon
    Gpsd {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value_t = 2947)]
        port: u16,
    },
    /// Use a serial NMEA receiver
    Serial {
        port: String,
        #[arg(long, default_value_t = 9600)]
        baud: u32,
    },
    /// Replay an NMEA log file
    Replay {
        path: PathBuf,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Body weight in kg used for calorie estimates
    Weight { kg: f64 },
    /// Store activities in this SQLite file
    Database { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => TrackerConfig::config_path()?,
    };
    let config = TrackerConfig::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    match cli.command {
        Command::Ports => ports(),
        Command::Config { action } => configure(config, &config_path, action),
        command => {
            let db_path = match &cli.database {
                Some(path) => path.clone(),
                None => config.database_path()?,
            };
            let db = Database::open(&db_path)
                .with_context(|| format!("Failed to open database {}", db_path.display()))?;
            run(command, config, &config_path, &db).await
        }
    }
}

async fn run(
    command: Command,
    config: TrackerConfig,
    config_path: &Path,
    db: &Database,
) -> Result<()> {
    match command {
        Command::Record(args) => record(args, config, db).await,
        Command::List { sport } => {
            let activities: Vec<_> = db
                .list_activities()
                .await?
                .into_iter()
                .filter(|a| sport.map_or(true, |s| a.sport_type == s))
                .collect();
            if activities.is_empty() {
                println!("No activities recorded yet");
            } else {
                print_lines(&activity_table(&activities));
            }
            Ok(())
        }
        Command::Show { id } => {
            let activity = db
                .get_activity(&id)
                .await?
                .with_context(|| format!("Activity {} not found", id))?;
            let points = db.get_samples_for_activity(&id).await?;
            print_lines(&activity_details(&activity, &points));
            Ok(())
        }
        Command::Edit {
            id,
            title,
            notes,
            clear_notes,
        } => {
            let update = ActivityUpdate {
                title,
                notes: if clear_notes { Some(None) } else { notes.map(Some) },
            };
            if update.is_empty() {
                bail!("Nothing to change; pass --title, --notes or --clear-notes");
            }
            let activity = db.update_activity_fields(&id, &update).await?;
            println!("Updated {} ({})", activity.title, activity.id);
            Ok(())
        }
        Command::Delete { id } => {
            db.delete_activity_cascade(&id).await?;
            println!("Deleted activity {}", id);
            Ok(())
        }
        Command::Export { id, output } => {
            let (bundle, default_name) = match id {
                Some(id) => {
                    let bundle = export_activity(db, &id).await?;
                    let name = bundle
                        .activities
                        .first()
                        .map(|entry| activity_file_name(&entry.activity, "json"))
                        .unwrap_or_else(|| bulk_file_name(Utc::now().date_naive()));
                    (bundle, name)
                }
                None => (export_all(db).await?, bulk_file_name(Utc::now().date_naive())),
            };
            let path = output.unwrap_or_else(|| PathBuf::from(default_name));
            bundle
                .write_to(&path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} activities to {}",
                bundle.activities.len(),
                path.display()
            );
            Ok(())
        }
        Command::Import { file } => {
            let outcome = import_file(db, &file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            println!(
                "Imported {}, skipped {} already present",
                outcome.imported, outcome.skipped
            );
            for error in &outcome.errors {
                eprintln!("  {}", error);
            }
            if !outcome.success {
                bail!("Import failed");
            }
            Ok(())
        }
        Command::Track { id, format, output } => {
            let activity = db
                .get_activity(&id)
                .await?
                .with_context(|| format!("Activity {} not found", id))?;
            let points = db.get_samples_for_activity(&id).await?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(activity_file_name(&activity, format.extension())));
            write_track(&path, &activity, &points, format).await?;
            println!("Wrote {} to {}", format.display_name(), path.display());
            Ok(())
        }
        Command::Stats(args) => stats(args, db).await,
        Command::Goals { action } => goals(action, config, config_path, db).await,
        Command::Ports | Command::Config { .. } => Ok(()),
    }
}

async fn record(args: RecordArgs, mut config: TrackerConfig, db: &Database) -> Result<()> {
    args.source.apply(&mut config)?;
    let source = config
        .build_source()
        .context("Failed to set up the position source")?;
    let weight = args.weight.unwrap_or(config.weight_kg);

    let mut recorder = Recorder::new(source).with_weight(weight);
    recorder.start()?;

    let end = TerminalDisplay::new().run(&mut recorder, args.sport).await?;
    match end {
        SessionEnd::Save => {
            let details = ActivityDetails {
                sport: args.sport,
                title: args.title,
                notes: args.notes,
            };
            let activity = match recorder.save(db, details.clone()).await {
                Ok(activity) => activity,
                Err(e) => return Err(keep_unsaved(&recorder, &details, e, Path::new(".")).await),
            };
            let points = db.get_samples_for_activity(&activity.id).await?;
            print_lines(&activity_details(&activity, &points));
            println!("\nSaved as {}", activity.id);
        }
        SessionEnd::Discard => {
            recorder.discard()?;
            println!("Recording discarded");
        }
    }
    Ok(())
}

/// Turn a failed save into an error that says where the recording went.
async fn keep_unsaved(
    recorder: &Recorder,
    details: &ActivityDetails,
    error: TrackerError,
    dir: &Path,
) -> anyhow::Error {
    let error = anyhow::Error::new(error).context("Failed to save the activity");
    let Some((activity, points)) = recorder.pending_activity(details) else {
        return error;
    };

    match write_unsaved(dir, activity, points).await {
        Ok(path) => error.context(format!(
            "Recording kept in {}; restore it with `sports-tracker import {}`",
            path.display(),
            path.display()
        )),
        Err(e) => {
            warn!("Could not keep the unsaved recording: {}", e);
            error.context(format!("The recording could not be kept either: {}", e))
        }
    }
}

/// `[start, end)` covering the last `days` days up to and including `today`
fn daily_window(today: NaiveDate, days: u32) -> Result<(NaiveDate, NaiveDate)> {
    let end = today.succ_opt().context("Today is past the last supported date")?;
    let start = end
        .checked_sub_signed(Duration::days(i64::from(days)))
        .with_context(|| format!("--daily {} reaches before the first supported date", days))?;
    Ok((start, end))
}

async fn stats(args: StatsArgs, db: &Database) -> Result<()> {
    let activities = db.list_activities().await?;
    let now = Utc::now();

    let summary = period_summary(&activities, args.period, now, args.sport);
    let trend = weekly_trend(&activities, now, args.sport);
    let records = personal_records(&activities, args.sport);
    let daily = match args.daily {
        Some(days) => {
            let (start, end) = daily_window(now.date_naive(), days)?;
            Some(daily_stats(&activities, start, end, args.sport))
        }
        None => None,
    };

    if args.json {
        let value = serde_json::json!({
            "summary": summary,
            "trend": trend,
            "records": records,
            "daily": daily,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let label = match args.period {
        StatsPeriod::Week => "This week",
        StatsPeriod::Month => "This month",
        StatsPeriod::Year => "This year",
        StatsPeriod::AllTime => "All time",
    };
    print_lines(&stats_report(label, &summary, &trend, &records));

    if let Some(daily) = daily {
        println!();
        for day in daily {
            println!(
                "  {}  {:>2}  {:>8.2} km  {:>5} min",
                day.date,
                day.activities,
                day.distance_meters / 1000.0,
                day.duration_seconds / 60
            );
        }
    }
    Ok(())
}

async fn goals(
    action: Option<GoalAction>,
    mut config: TrackerConfig,
    path: &Path,
    db: &Database,
) -> Result<()> {
    let json = match action.unwrap_or(GoalAction::List { json: false }) {
        GoalAction::List { json } => json,
        GoalAction::Add(args) => {
            let now = Utc::now();
            let goal = Goal::create(args.into_draft(now.date_naive())?, now)?;
            let id = goal.id.clone();
            config.add_goal(goal);
            config
                .save_to(path)
                .with_context(|| format!("Failed to save config to {}", path.display()))?;
            println!("Added goal {}", id);
            return Ok(());
        }
        GoalAction::Remove { id } => {
            let removed = config.remove_goal(&id)?;
            config
                .save_to(path)
                .with_context(|| format!("Failed to save config to {}", path.display()))?;
            println!("Removed goal {} ({})", removed.id, removed.title);
            return Ok(());
        }
    };

    let activities = db.list_activities().await?;
    let now = Utc::now();
    let progress: Vec<_> = config
        .goals
        .into_iter()
        .map(|goal| {
            let progress = goal_progress(&goal, &activities, now);
            (goal, progress)
        })
        .collect();

    if json {
        let value: Vec<_> = progress
            .iter()
            .map(|(goal, progress)| serde_json::json!({ "goal": goal, "progress": progress }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if progress.is_empty() {
        println!("No goals yet; add one with `sports-tracker goals add`");
    } else {
        print_lines(&goal_table(&progress));
    }
    Ok(())
}

fn ports() -> Result<()> {
    let ports = list_serial_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for (name, kind) in ports {
        println!("{}  {}", name, kind);
    }
    Ok(())
}

fn configure(mut config: TrackerConfig, path: &Path, action: Option<ConfigAction>) -> Result<()> {
    let action = action.unwrap_or(ConfigAction::Show);
    match action {
        ConfigAction::Show => {
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            return Ok(());
        }
        ConfigAction::Gpsd { host, port } => config.update_gpsd(host, port),
        ConfigAction::Serial { port, baud } => config.update_serial(port, baud),
        ConfigAction::Replay { path, interval_ms } => config.update_replay(path, interval_ms),
        ConfigAction::Weight { kg } => {
            if kg.is_nan() || kg <= 0.0 {
                bail!("Weight must be positive");
            }
            config.weight_kg = kg;
        }
        ConfigAction::Database { path } => config.database_path = Some(path),
    }

    config
        .save_to(path)
        .with_context(|| format!("Failed to save config to {}", path.display()))?;
    info!("Configuration saved to {}", path.display());
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_gpsd_address() {
        assert_eq!(
            parse_gpsd_address("pi.local:3000").unwrap(),
            ("pi.local".to_string(), 3000)
        );
        assert_eq!(
            parse_gpsd_address("localhost").unwrap(),
            ("localhost".to_string(), 2947)
        );
        assert!(parse_gpsd_address("host:port").is_err());
    }

    #[test]
    fn test_source_overrides() {
        let cli = Cli::parse_from(["sports-tracker", "record", "--replay", "ride.nmea"]);
        let Command::Record(args) = cli.command else {
            panic!("expected record");
        };

        let mut config = TrackerConfig::default();
        args.source.apply(&mut config).unwrap();
        assert_eq!(config.source_type, "replay");
        assert_eq!(config.replay_interval_ms, Some(1000));
        assert_eq!(args.sport, SportType::Running);
    }

    #[test]
    fn test_daily_window() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let (start, end) = daily_window(today, 3).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());

        assert!(daily_window(NaiveDate::MIN, 2).is_err());
        assert!(daily_window(NaiveDate::MAX, 1).is_err());
    }

    #[test]
    fn test_daily_days_are_bounded() {
        let parse =
            |days: &str| Cli::try_parse_from(["sports-tracker", "stats", "--daily", days]);

        assert!(parse("4294967295").is_err());
        assert!(parse("0").is_err());
        let Command::Stats(args) = parse("3660").unwrap().command else {
            panic!("expected stats");
        };
        assert_eq!(args.daily, Some(3660));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_recording_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = std::sync::Arc::new(sports_tracker::ManualSource::new());
        let mut recorder = Recorder::new(source);
        recorder.start().unwrap();
        recorder.stop().unwrap();

        let details = ActivityDetails::new(SportType::Swimming);
        let error = keep_unsaved(
            &recorder,
            &details,
            TrackerError::Other("database is locked".to_string()),
            dir.path(),
        )
        .await;

        let message = format!("{:#}", error);
        assert!(message.contains("Failed to save the activity"), "{}", message);
        assert!(message.contains("database is locked"), "{}", message);

        let kept: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(kept.len(), 1);
        let path = kept[0].as_ref().unwrap().path();
        assert!(message.contains(&path.display().to_string()), "{}", message);

        let store = sports_tracker::MemoryStore::new();
        let outcome = sports_tracker::transfer::import_file(&store, &path).await.unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(
            store.list_activities().await.unwrap()[0].sport_type,
            SportType::Swimming
        );
    }

    #[test]
    fn test_goal_targets_use_friendly_units() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let parse = |args: &[&str]| {
            let cli = Cli::try_parse_from(args).unwrap();
            let Command::Goals { action: Some(GoalAction::Add(args)) } = cli.command else {
                panic!("expected goals add");
            };
            args.into_draft(today)
        };

        let distance = parse(&[
            "sports-tracker", "goals", "add", "Long week", "--type", "distance", "--target", "42.2",
        ])
        .unwrap();
        assert_eq!(distance.target_value, 42_200.0);
        assert_eq!(distance.period, GoalPeriod::Weekly);
        assert_eq!(distance.start_date, today);

        let duration = parse(&[
            "sports-tracker", "goals", "add", "Swim", "--type", "duration", "--target", "90",
            "--period", "monthly", "--sport", "swimming",
        ])
        .unwrap();
        assert_eq!(duration.target_value, 5400.0);
        assert_eq!(duration.sport_type, Some(SportType::Swimming));

        let custom = parse(&[
            "sports-tracker", "goals", "add", "Block", "--type", "frequency", "--target", "12",
            "--period", "custom", "--start", "2024-06-01", "--end", "2024-06-30",
        ])
        .unwrap();
        assert_eq!(custom.target_value, 12.0);
        assert_eq!(custom.end_date, NaiveDate::from_ymd_opt(2024, 6, 30));

        assert!(parse(&[
            "sports-tracker", "goals", "add", "Odd", "--type", "calories", "--target", "500",
            "--end", "2024-06-30",
        ])
        .is_err());
    }

    #[test]
    fn test_edit_flags_conflict() {
        let result = Cli::try_parse_from([
            "sports-tracker",
            "edit",
            "abc",
            "--notes",
            "x",
            "--clear-notes",
        ]);
        assert!(result.is_err());
    }
}
