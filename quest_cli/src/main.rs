use chrono::{Datelike, Days, NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use quest_core::activity::{longest_run, summarize};
use quest_core::dates::{clip_to_due_date, is_today, parse_iso_date, start_of_day, today_in};
use quest_core::recurrence::parse_weekday_code;
use quest_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "questlog")]
#[command(about = "Recurring quests, streaks and XP tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured timezone (IANA name, e.g. Europe/Berlin)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a recurrence rule from a schedule choice
    Rule {
        #[command(subcommand)]
        schedule: ScheduleChoice,
    },

    /// Show a stored rule as readable text (no rule means one-time)
    Describe {
        rule: Option<String>,

        /// Short label instead of the full sentence
        #[arg(long)]
        compact: bool,
    },

    /// Create or replace a quest template
    Add {
        id: String,

        #[arg(long)]
        title: String,

        /// daily or side
        #[arg(long, default_value = "daily")]
        kind: String,

        /// Recurrence rule, e.g. FREQ=WEEKLY;BYDAY=MO,TH
        #[arg(long)]
        rule: Option<String>,

        /// Last day the quest applies (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// optional, minor, standard, important or critical
        #[arg(long, default_value = "standard")]
        priority: String,
    },

    /// List quest templates
    List,

    /// Stop accepting outcomes for a quest (it stays listed)
    Archive { id: String },

    /// Record the outcome of a quest for a day
    Done {
        id: String,

        /// Day to record (defaults to today in the configured timezone)
        #[arg(long)]
        date: Option<String>,

        /// Record the day as missed instead of completed
        #[arg(long)]
        missed: bool,
    },

    /// Show the current streak for a quest
    Streak {
        id: String,

        /// Evaluate as if today were this date
        #[arg(long)]
        today: Option<String>,
    },

    /// Show day-by-day activity for a quest
    Calendar {
        id: String,

        /// Window length in days (defaults to calendar.default_window_days)
        #[arg(long)]
        days: Option<u32>,

        /// Last day of the window (defaults to today)
        #[arg(long)]
        end: Option<String>,

        /// Append the window to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ScheduleChoice {
    /// Every day
    Daily,
    /// Every weekday (Mon-Fri)
    Weekdays,
    /// Every Saturday and Sunday
    Weekends,
    /// On selected weekdays
    Weekly {
        /// Comma-separated days, e.g. mo,we,fr
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<String>,
    },
    /// On selected days of the month
    Monthly {
        /// Comma-separated dates, e.g. 1,15
        #[arg(long, value_delimiter = ',', required = true)]
        dates: Vec<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    quest_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Rule commands are pure and need no configuration
    match &cli.command {
        Commands::Rule { schedule } => return cmd_rule(schedule),
        Commands::Describe { rule, compact } => return cmd_describe(rule.as_deref(), *compact),
        _ => {}
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Add {
            id,
            title,
            kind,
            rule,
            due,
            priority,
        } => cmd_add(&config, id, title, &kind, rule, due.as_deref(), &priority),
        Commands::List => cmd_list(&config),
        Commands::Archive { id } => cmd_archive(&config, &id),
        Commands::Done { id, date, missed } => cmd_done(&config, &id, date.as_deref(), missed),
        Commands::Streak { id, today } => cmd_streak(&config, &id, today.as_deref()),
        Commands::Calendar { id, days, end, csv } => {
            cmd_calendar(&config, &id, days, end.as_deref(), csv)
        }
        Commands::Rule { .. } | Commands::Describe { .. } => Ok(()),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = &cli.data_dir {
        config.data.data_dir = Some(dir.clone());
    }
    if let Some(tz) = &cli.timezone {
        config.schedule.timezone = tz.clone();
    }
    config.validate()?;
    Ok(config)
}

fn parse_day(input: &str) -> Result<Weekday> {
    parse_weekday_code(input)
        .or_else(|| input.trim().parse::<Weekday>().ok())
        .ok_or_else(|| Error::InvalidRule(format!("unknown weekday `{}`", input.trim())))
}

fn cmd_rule(schedule: &ScheduleChoice) -> Result<()> {
    use chrono::Weekday::*;

    let rule = match schedule {
        ScheduleChoice::Daily => encode_daily(),
        ScheduleChoice::Weekdays => encode_weekly(&[Mon, Tue, Wed, Thu, Fri])?,
        ScheduleChoice::Weekends => encode_weekly(&[Sat, Sun])?,
        ScheduleChoice::Weekly { days } => {
            let days = days
                .iter()
                .filter(|d| !d.trim().is_empty())
                .map(|d| parse_day(d))
                .collect::<Result<Vec<_>>>()?;
            encode_weekly(&days)?
        }
        ScheduleChoice::Monthly { dates } => encode_monthly(dates)?,
    };
    println!("{}", rule);
    Ok(())
}

fn cmd_describe(rule: Option<&str>, compact: bool) -> Result<()> {
    println!("{}", to_human_readable(rule, compact)?);
    Ok(())
}

fn cmd_add(
    config: &Config,
    id: String,
    title: String,
    kind: &str,
    rule: Option<String>,
    due: Option<&str>,
    priority: &str,
) -> Result<()> {
    let kind: QuestKind = kind.parse()?;
    let priority: Priority = priority.parse()?;
    let due_date = due.map(parse_iso_date).transpose()?;

    let template = QuestTemplate::new(id, title, kind, rule, due_date, priority)?;
    let schedule = template.rule()?.describe(false);
    let summary = format!(
        "✓ Saved {} ({}, {} XP)",
        template.id, schedule, template.base_points
    );

    TemplateBook::update(&config.templates_path()?, |book| {
        book.upsert(template);
        Ok(())
    })?;

    println!("{}", summary);
    Ok(())
}

fn cmd_list(config: &Config) -> Result<()> {
    let book = TemplateBook::load(&config.templates_path()?)?;
    if book.templates.is_empty() {
        println!("No quests yet.");
        return Ok(());
    }

    for template in book.sorted() {
        let schedule = match template.rule() {
            Ok(rule) => rule.describe(true),
            Err(e) => format!("unreadable schedule: {}", e),
        };
        let due = template
            .due_date
            .map(|d| format!(", due {}", d))
            .unwrap_or_default();
        let archived = if template.is_active { "" } else { " (archived)" };
        println!(
            "{:<16} {} [{}{}] {} XP{}",
            template.id, template.title, schedule, due, template.base_points, archived
        );
    }
    Ok(())
}

fn cmd_archive(config: &Config, id: &str) -> Result<()> {
    TemplateBook::update(&config.templates_path()?, |book| book.archive(id))?;
    println!("✓ Archived {}", id);
    Ok(())
}

fn cmd_done(config: &Config, id: &str, date: Option<&str>, missed: bool) -> Result<()> {
    let tz = config.timezone()?;
    let book = TemplateBook::load(&config.templates_path()?)?;
    let template = book.get(id)?;

    if !template.is_active {
        return Err(Error::Other(format!("quest {} is archived", id)));
    }

    let date = match date {
        Some(d) => parse_iso_date(d)?,
        None => today_in(tz),
    };

    if !template.is_scheduled_on(date)? {
        tracing::warn!("{} is not scheduled on {}", id, date);
        eprintln!("warning: {} is not scheduled on {}, recording anyway", id, date);
    }

    let instance = QuestInstance::record(template, date, !missed);
    let mut log = InstanceLog::new(config.instances_path()?);
    log.append(&instance)?;

    if missed {
        println!("✗ Marked {} as missed on {}", template.title, date);
    } else {
        println!(
            "✓ Completed {} on {} (+{} XP)",
            template.title, date, instance.xp_reward
        );
    }
    Ok(())
}

fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    end.checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

fn cmd_streak(config: &Config, id: &str, today: Option<&str>) -> Result<()> {
    let tz = config.timezone()?;
    let book = TemplateBook::load(&config.templates_path()?)?;
    let template = book.get(id)?;

    let today = match today {
        Some(d) => parse_iso_date(d)?,
        None => today_in(tz),
    };
    let lookback = config.streak.max_lookback;
    let start = window_start(today, lookback.max(1));

    let index = InstanceIndex::load(&config.instances_path()?, id, start, today)?;
    let streak = compute_streak(today, &index, lookback)?;

    let unit = if streak == 1 { "day" } else { "days" };
    println!("{}: {} {} streak", template.title, streak, unit);

    if is_today(today, tz) && index.instance_on(today)?.is_none() {
        if let Some(tomorrow) = today.succ_opt() {
            let closes = start_of_day(tomorrow, tz).with_timezone(&tz);
            println!("  Today is still open until {}", closes.format("%Y-%m-%d %H:%M %Z"));
        }
    }
    Ok(())
}

fn cmd_calendar(
    config: &Config,
    id: &str,
    days: Option<u32>,
    end: Option<&str>,
    csv: Option<PathBuf>,
) -> Result<()> {
    let tz = config.timezone()?;
    let book = TemplateBook::load(&config.templates_path()?)?;
    let template = book.get(id)?;

    let days = days.unwrap_or(config.calendar.default_window_days);
    if days == 0 {
        return Err(Error::Other("--days must be at least 1".into()));
    }
    let end = match end {
        Some(d) => parse_iso_date(d)?,
        None => today_in(tz),
    };
    let start = window_start(end, days);

    let (start, end) = match clip_to_due_date(start, end, template.due_date) {
        Some(window) => window,
        None => {
            println!(
                "{} was due {}; nothing to show.",
                template.title,
                template.due_date.map(|d| d.to_string()).unwrap_or_default()
            );
            return Ok(());
        }
    };

    let index = InstanceIndex::load(&config.instances_path()?, id, start, end)?;
    let records = build_activity_window(start, end, &index)?;

    println!("{} ({})", template.title, template.rule()?.describe(true));
    for record in &records {
        let mark = if record.completed {
            "✓"
        } else if template.is_scheduled_on(record.date)? {
            "·"
        } else {
            " "
        };
        let today = if is_today(record.date, tz) { "  <- today" } else { "" };
        println!(
            "  {} {}  {}  {:>3} XP{}",
            record.date,
            record.date.weekday(),
            mark,
            record.xp_earned,
            today
        );
    }

    let summary = summarize(&records);
    println!(
        "{}/{} days completed, {} XP, best run {}",
        summary.completed_days,
        summary.days,
        summary.total_xp,
        longest_run(&records)
    );

    if let Some(path) = csv {
        let rows = write_activity_csv(&path, id, &records)?;
        println!("✓ Exported {} rows to {}", rows, path.display());
    }

    Ok(())
}
