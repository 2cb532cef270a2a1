use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use hydrate_core::export::{export_csv_file, write_csv, write_file, ExportFormat};
use hydrate_core::reminder::next_reminder_after;
use hydrate_core::sanitize::{sanitize_water_amount, sanitize_weight, sanitize_whole};
use hydrate_core::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hydrate")]
#[command(about = "Personal water intake tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a drink (e.g. `hydrate add 250ml`)
    Add {
        /// Amount in ml, units are ignored
        amount: String,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,

        /// When it happened (RFC 3339 or "YYYY-MM-DD HH:MM" local), default now
        #[arg(long)]
        at: Option<String>,
    },

    /// List logged drinks
    List {
        /// Day to list (YYYY-MM-DD), default today
        #[arg(long, conflicts_with = "days")]
        date: Option<NaiveDate>,

        /// List the most recent N days instead of one day
        #[arg(long)]
        days: Option<u32>,
    },

    /// Change the amount of a logged drink
    Edit { id: String, amount: String },

    /// Remove a logged drink
    Delete { id: String },

    /// Remove every logged drink
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Show progress, streak and weekly trend (default)
    Stats {
        /// Window for the average, overrides config
        #[arg(long)]
        days: Option<i64>,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the daily goal
    Goal {
        #[command(subcommand)]
        action: Option<GoalAction>,
    },

    /// Show or change the user profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },

    /// Export all data
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show when the next reminder is due
    Reminder,
}

#[derive(Subcommand)]
enum GoalAction {
    /// Print the current goal
    Show,
    /// Set a custom goal in ml
    Set { amount: String },
    /// Show recommendations from the profile
    Recommend {
        /// Adopt the height/weight recommendation as the goal
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the profile
    Show,
    /// Change profile fields; unspecified fields keep their value
    Set {
        #[arg(long)]
        height: Option<String>,
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        activity: Option<ActivityLevel>,
        #[arg(long)]
        reminders: Option<Toggle>,
        /// Minutes between reminders
        #[arg(long)]
        interval: Option<u32>,
        #[arg(long)]
        work_start: Option<u8>,
        #[arg(long)]
        work_end: Option<u8>,
    },
    /// Restore the default profile
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn main() -> ExitCode {
    // Initialize logging
    hydrate_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e.kind() {
                ErrorKind::Validation => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir.join("store")));
    let mut tracker = Tracker::open(store, config.statistics.clone());

    match cli.command {
        Some(Commands::Add { amount, note, at }) => cmd_add(&mut tracker, &amount, note, at),
        Some(Commands::List { date, days }) => cmd_list(&tracker, date, days),
        Some(Commands::Edit { id, amount }) => cmd_edit(&mut tracker, &id, &amount),
        Some(Commands::Delete { id }) => cmd_delete(&mut tracker, &id),
        Some(Commands::Clear { yes }) => cmd_clear(&mut tracker, yes),
        Some(Commands::Stats { days, json }) => {
            let window = days.unwrap_or(config.statistics.average_window_days);
            cmd_stats(&tracker, window, json)
        }
        Some(Commands::Goal { action }) => cmd_goal(&mut tracker, action),
        Some(Commands::Profile { action }) => cmd_profile(&mut tracker, action),
        Some(Commands::Export { format, output }) => cmd_export(&tracker, format.into(), output),
        Some(Commands::Reminder) => cmd_reminder(&tracker),
        None => {
            // Default to "stats" command
            cmd_stats(&tracker, config.statistics.average_window_days, false)
        }
    }
}

/// Tell the user when a change did not reach the disk
fn report(outcome: &Persisted) {
    if let Some(err) = outcome.storage_error() {
        eprintln!("Warning: saved for this session only ({})", err);
    }
}

fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            ValidationError::Unparseable {
                field: "time",
                input: input.to_string(),
            }
            .into()
        })
}

fn cmd_add(
    tracker: &mut Tracker,
    amount: &str,
    note: Option<String>,
    at: Option<String>,
) -> Result<()> {
    let amount = sanitize_water_amount(amount)?;
    let timestamp = match at {
        Some(ref s) => parse_instant(s)?,
        None => Utc::now(),
    };

    let (id, outcome) = tracker.add_intake(amount, timestamp, note)?;
    report(&outcome);

    let stats = tracker.statistics();
    println!("✓ Logged {} ml ({})", amount, id);
    println!(
        "  Today: {} / {} ml ({}%)",
        stats.today_total(),
        stats.goal(),
        stats.today_progress_percentage()
    );
    Ok(())
}

fn cmd_list(tracker: &Tracker, date: Option<NaiveDate>, days: Option<u32>) -> Result<()> {
    let today = Local::now().date_naive();
    let records = match (date, days) {
        (Some(date), _) => tracker.records().records_between(date, date),
        (None, Some(days)) => {
            let from = today
                .checked_sub_days(Days::new(u64::from(days.max(1)) - 1))
                .unwrap_or(NaiveDate::MIN);
            tracker.records().records_between(from, today)
        }
        (None, None) => tracker.records().records_between(today, today),
    };

    if records.is_empty() {
        println!("No drinks logged.");
        return Ok(());
    }

    for record in &records {
        let local = record.timestamp.with_timezone(&Local);
        print!(
            "{}  {:>5} ml  {}",
            local.format("%Y-%m-%d %H:%M"),
            record.amount,
            record.id
        );
        match record.note {
            Some(ref note) => println!("  {}", note),
            None => println!(),
        }
    }
    Ok(())
}

fn cmd_edit(tracker: &mut Tracker, id: &str, amount: &str) -> Result<()> {
    let amount = sanitize_whole("water amount", amount)?;
    match tracker.update_intake(id, amount) {
        Some(outcome) => {
            report(&outcome);
            println!("✓ Updated {} to {} ml", id, amount);
        }
        None => println!("No drink with id {}", id),
    }
    Ok(())
}

fn cmd_delete(tracker: &mut Tracker, id: &str) -> Result<()> {
    match tracker.delete_intake(id) {
        Some(outcome) => {
            report(&outcome);
            println!("✓ Deleted {}", id);
        }
        None => println!("No drink with id {}", id),
    }
    Ok(())
}

fn cmd_clear(tracker: &mut Tracker, yes: bool) -> Result<()> {
    if !yes {
        println!("This removes every logged drink. Re-run with --yes to confirm.");
        return Ok(());
    }
    let removed = tracker.records().len();
    let outcome = tracker.clear_records();
    report(&outcome);
    println!("✓ Removed {} drinks", removed);
    Ok(())
}

fn cmd_stats(tracker: &Tracker, window: i64, json: bool) -> Result<()> {
    let stats = tracker.statistics();
    let snapshot = stats.snapshot(window);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!(
        "Today:   {} / {} ml ({}%)",
        snapshot.today_total,
        stats.goal(),
        snapshot.today_progress
    );
    println!("Streak:  {} day(s)", snapshot.consecutive_days);
    println!("Average: {} ml/day over {} day(s)", snapshot.weekly_average, window);
    println!();
    println!("Last 7 days:");
    for day in &snapshot.weekly_trend {
        let filled = (day.progress.clamp(0, 100) / 10) as usize;
        println!(
            "  {}  {:<10}  {:>5} ml  {:>3}%",
            day.date.format("%a %m-%d"),
            "#".repeat(filled),
            day.total,
            day.progress
        );
    }
    Ok(())
}

fn cmd_goal(tracker: &mut Tracker, action: Option<GoalAction>) -> Result<()> {
    match action.unwrap_or(GoalAction::Show) {
        GoalAction::Show => {
            let goal = tracker.goal();
            let source = if goal.has_custom_goal() {
                "custom"
            } else {
                "recommended"
            };
            println!("Daily goal: {} ml ({})", goal.get_daily_goal(), source);
        }
        GoalAction::Set { amount } => {
            let amount = sanitize_whole("daily goal", &amount)?;
            let outcome = tracker.set_daily_goal(amount)?;
            report(&outcome);
            println!("✓ Daily goal set to {} ml", amount);
        }
        GoalAction::Recommend { apply } => {
            let profile = tracker.profile_policy();
            let weight = profile.profile().weight;
            println!("Height + weight: {} ml", profile.recommended_goal());
            println!(
                "Activity ({}): {} ml",
                profile.profile().activity_level,
                profile.recommended_goal_for_activity()
            );
            println!(
                "Weight only:     {} ml",
                hydrate_core::goal::recommended_from_weight(weight)
            );

            if apply {
                let (goal, outcome) = tracker.apply_recommended_goal()?;
                report(&outcome);
                println!("✓ Daily goal set to {} ml", goal);
            }
        }
    }
    Ok(())
}

fn cmd_profile(tracker: &mut Tracker, action: Option<ProfileAction>) -> Result<()> {
    match action.unwrap_or(ProfileAction::Show) {
        ProfileAction::Show => print_profile(tracker.profile()),
        ProfileAction::Set {
            height,
            weight,
            activity,
            reminders,
            interval,
            work_start,
            work_end,
        } => {
            let mut profile = tracker.profile().clone();
            if let Some(height) = height {
                let cm = sanitize_whole("height", &height)?;
                profile.height = u32::try_from(cm).map_err(|_| ValidationError::Unparseable {
                    field: "height",
                    input: height.clone(),
                })?;
            }
            if let Some(weight) = weight {
                profile.weight = sanitize_weight(&weight)?;
            }
            if let Some(activity) = activity {
                profile.activity_level = activity;
            }
            if let Some(toggle) = reminders {
                profile.reminder_enabled = matches!(toggle, Toggle::On);
            }
            if let Some(interval) = interval {
                profile.reminder_interval = interval;
            }
            if let Some(start) = work_start {
                profile.working_hours.start = start;
            }
            if let Some(end) = work_end {
                profile.working_hours.end = end;
            }

            let outcome = tracker.save_profile(profile)?;
            report(&outcome);
            println!("✓ Profile saved");
            print_profile(tracker.profile());
        }
        ProfileAction::Reset => {
            let outcome = tracker.reset_profile();
            report(&outcome);
            println!("✓ Profile reset to defaults");
            print_profile(tracker.profile());
        }
    }
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!("Height:    {} cm", profile.height);
    println!("Weight:    {} kg", profile.weight);
    println!("Activity:  {}", profile.activity_level);
    println!(
        "Reminders: {} (every {} min, {:02}:00-{:02}:00)",
        if profile.reminder_enabled { "on" } else { "off" },
        profile.reminder_interval,
        profile.working_hours.start,
        profile.working_hours.end
    );
}

fn cmd_export(tracker: &Tracker, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    match (format, output) {
        (ExportFormat::Json, Some(path)) => {
            let json = tracker.export_json(Utc::now())?;
            write_file(&path, json.as_bytes())?;
            println!("✓ Exported to {}", path.display());
        }
        (ExportFormat::Json, None) => println!("{}", tracker.export_json(Utc::now())?),
        (ExportFormat::Csv, Some(path)) => {
            let count = export_csv_file(&tracker.records().get_all(), &path)?;
            println!("✓ Exported {} drinks to {}", count, path.display());
        }
        (ExportFormat::Csv, None) => {
            write_csv(&tracker.records().get_all(), std::io::stdout().lock())?;
        }
    }
    Ok(())
}

fn cmd_reminder(tracker: &Tracker) -> Result<()> {
    let profile = tracker.profile();
    let last = tracker
        .records()
        .get_all()
        .iter()
        .map(|r| r.timestamp)
        .filter(|ts| *ts <= Utc::now())
        .max()
        .unwrap_or_else(Utc::now);

    match next_reminder_after(last, profile) {
        Some(next) => println!(
            "Next reminder: {}",
            next.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        None => println!("Reminders are off."),
    }
    Ok(())
}
