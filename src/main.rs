use cadence::config::Config;
use cadence::domain::{ReviewSchedule, ScheduleRecord, ScheduleStatus};
use cadence::engine::Quality;
use cadence::scheduler::{BulkScheduleRequest, DueReviewOptions, InitialParameters, SchedulerService};
use cadence::storage::{FileScheduleStore, StatusCounts};
use chrono::Utc;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;

type Service = SchedulerService<FileScheduleStore>;

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("cadence.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    if cli.is_verbose() {
        println!("{} {}", "Data directory:".yellow(), config.storage.base_dir.display());
    }

    let store = FileScheduleStore::open(&config.storage.base_dir)
        .await
        .context(format!("Failed to open store at {}", config.storage.base_dir.display()))?;
    let service = SchedulerService::with_config(Arc::new(store), config.scheduler_config());

    match &cli.command {
        Commands::Schedule {
            concept_ids,
            folder,
            ease,
            interval,
            replace,
        } => handle_schedule_command(&service, concept_ids, folder.as_deref(), *ease, *interval, *replace).await,
        Commands::Review { concept_id, quality } => handle_review_command(&service, concept_id, *quality).await,
        Commands::Due {
            limit,
            folder,
            status,
            difficult,
        } => handle_due_command(&service, *limit, folder.as_deref(), status, *difficult).await,
        Commands::Stats { problematic } => handle_stats_command(&service, *problematic).await,
        Commands::Plan => handle_plan_command(&service).await,
        Commands::Health => handle_health_command(&service).await,
        Commands::Suspend { concept_id, folder } => {
            handle_suspend_command(&service, concept_id.as_deref(), folder.as_deref(), true).await
        }
        Commands::Resume { concept_id, folder } => {
            handle_suspend_command(&service, concept_id.as_deref(), folder.as_deref(), false).await
        }
        Commands::Unschedule { concept_id } => handle_unschedule_command(&service, concept_id).await,
        Commands::ResetAbandoned { days } => handle_reset_command(&service, *days).await,
        Commands::Cleanup { valid_ids } => handle_cleanup_command(&service, valid_ids).await,
        Commands::Export { concept_ids, output } => handle_export_command(&service, concept_ids, output.as_deref()).await,
        Commands::Import { input } => handle_import_command(&service, input).await,
        Commands::Rebuild => handle_rebuild_command(&service).await,
    }
}

async fn handle_schedule_command(
    service: &Service,
    concept_ids: &[String],
    folder: Option<&str>,
    ease: Option<f64>,
    interval: Option<u32>,
    replace: bool,
) -> Result<()> {
    let now = Utc::now();

    if let [concept_id] = concept_ids
        && !replace
    {
        let initial = (ease.is_some() || interval.is_some()).then_some(InitialParameters {
            easiness_factor: ease,
            interval,
        });
        let schedule = service.schedule_for_review(concept_id, initial, folder, now).await?;
        println!("{} {}", "Scheduled:".green(), concept_id);
        print_schedule(&schedule);
        return Ok(());
    }

    if ease.is_some() || interval.is_some() {
        eyre::bail!("--ease and --interval apply to a single concept only");
    }

    let request = BulkScheduleRequest {
        concept_ids: concept_ids.to_vec(),
        folder_id: folder.map(str::to_string),
        batch_size: None,
        skip_existing: !replace,
    };
    let result = service.bulk_schedule(&request, now).await?;
    println!(
        "{} {} created, {} already scheduled",
        "Scheduled:".green(),
        result.created.len(),
        result.existing.len()
    );
    Ok(())
}

async fn handle_review_command(service: &Service, concept_id: &str, quality: Quality) -> Result<()> {
    let outcome = service.process_review(concept_id, quality, Utc::now()).await?;

    println!("{} {} ({})", "Reviewed:".green(), concept_id, quality);
    println!(
        "  interval: {} -> {} days ({:+})",
        outcome.interval_before, outcome.interval_after, outcome.interval_delta
    );
    println!(
        "  ease:     {:.2} -> {:.2} ({:+.2})",
        outcome.ease_before, outcome.ease_after, outcome.ease_delta
    );
    if outcome.status_changed {
        println!(
            "  status:   {} -> {}",
            outcome.previous_status,
            color_status(outcome.schedule.status)
        );
    }
    println!("  next:     {}", outcome.next_review_date.to_rfc3339());
    Ok(())
}

async fn handle_due_command(
    service: &Service,
    limit: usize,
    folder: Option<&str>,
    statuses: &[ScheduleStatus],
    difficult: bool,
) -> Result<()> {
    let mut options = DueReviewOptions::new(Utc::now()).with_limit(limit);
    if let Some(folder) = folder {
        options = options.in_folder(folder);
    }
    if !statuses.is_empty() {
        options = options.with_statuses(statuses.to_vec());
    }
    if difficult {
        options = options.prioritizing_difficult();
    }

    let due = service.get_due_reviews(&options).await?;
    if due.is_empty() {
        println!("{}", "Nothing due".green());
        return Ok(());
    }

    println!("{} {}", "Due:".cyan(), due.len());
    for schedule in &due {
        print_schedule(schedule);
    }
    Ok(())
}

async fn handle_stats_command(service: &Service, problematic: Option<usize>) -> Result<()> {
    let stats = service.get_statistics(Utc::now()).await?;

    println!("{} {}", "Schedules:".cyan(), stats.total_schedules);
    print_status_counts(&stats.by_status);
    println!("  due:              {}", stats.due_count);
    println!("  overdue:          {}", stats.overdue_count);
    println!("  average ease:     {:.2}", stats.average_ease);
    println!("  average interval: {:.2} days", stats.average_interval);

    if let Some(limit) = problematic {
        println!("{}", "Problematic concepts:".yellow());
        for concept in service.problematic_concepts(limit).await? {
            println!(
                "  {:<32} {:>6.2}  ease {:.2}  failures {}  {}",
                concept.concept_id,
                concept.severity,
                concept.easiness_factor,
                concept.consecutive_incorrect,
                color_status(concept.status)
            );
        }
    }
    Ok(())
}

async fn handle_plan_command(service: &Service) -> Result<()> {
    let plan = service.get_review_plan(Utc::now()).await?;

    println!("{} {} ({} overdue)", "Due now:".cyan(), plan.due_count, plan.overdue_count);
    print_status_counts(&plan.status_breakdown);
    println!("{}", "Forecast:".cyan());
    for day in &plan.forecast {
        println!("  {}  {:>5} reviews  ~{} min", day.date, day.due, day.estimated_minutes);
    }
    println!("  total ~{} min", plan.total_estimated_minutes);
    Ok(())
}

async fn handle_health_command(service: &Service) -> Result<()> {
    let health = service.get_system_health(Utc::now()).await?;

    println!("{} {}", "Concepts:".cyan(), health.total_concepts);
    println!("  average ease:     {:.2}", health.average_ease);
    println!("  average interval: {:.2} days", health.average_interval);
    let overdue = format!("{:.2}%", health.overdue_percentage);
    let overdue = if health.overdue_percentage > 20.0 {
        overdue.red()
    } else {
        overdue.green()
    };
    println!("  overdue:          {}", overdue);
    print_status_counts(&health.status_breakdown);
    Ok(())
}

async fn handle_suspend_command(
    service: &Service,
    concept_id: Option<&str>,
    folder: Option<&str>,
    suspend: bool,
) -> Result<()> {
    let verb = if suspend { "Suspended:" } else { "Resumed:" };

    match (concept_id, folder) {
        (_, Some(folder)) => {
            let changed = if suspend {
                service.suspend_folder(folder).await?
            } else {
                service.resume_folder(folder).await?
            };
            println!("{} {} concepts in {}", verb.yellow(), changed, folder);
        }
        (Some(concept_id), None) => {
            let found = if suspend {
                service.suspend(concept_id).await?
            } else {
                service.resume(concept_id).await?
            };
            if !found {
                eyre::bail!("Concept not scheduled: {}", concept_id);
            }
            println!("{} {}", verb.yellow(), concept_id);
        }
        (None, None) => eyre::bail!("Either a concept ID or --folder is required"),
    }
    Ok(())
}

async fn handle_unschedule_command(service: &Service, concept_id: &str) -> Result<()> {
    if service.unschedule(concept_id).await? {
        println!("{} {}", "Unscheduled:".red(), concept_id);
    } else {
        println!("{} {}", "Not scheduled:".yellow(), concept_id);
    }
    Ok(())
}

async fn handle_reset_command(service: &Service, days: i64) -> Result<()> {
    let reset = service.reset_abandoned(days, Utc::now()).await?;
    println!("{} {} abandoned schedules", "Reset:".yellow(), reset);
    Ok(())
}

async fn handle_cleanup_command(service: &Service, valid_ids: &Path) -> Result<()> {
    let content = fs::read_to_string(valid_ids).context(format!("Failed to read {}", valid_ids.display()))?;
    let valid: HashSet<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let removed = service.cleanup_orphaned(&valid).await?;
    println!("{} {} orphaned schedules", "Removed:".red(), removed);
    Ok(())
}

async fn handle_export_command(service: &Service, concept_ids: &[String], output: Option<&Path>) -> Result<()> {
    let filter = (!concept_ids.is_empty()).then_some(concept_ids);
    let records = service.export(filter).await?;
    let json = serde_json::to_string_pretty(&records).context("Failed to serialize export")?;

    match output {
        Some(path) => {
            fs::write(path, json).context(format!("Failed to write {}", path.display()))?;
            println!("{} {} schedules to {}", "Exported:".green(), records.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn handle_import_command(service: &Service, input: &Path) -> Result<()> {
    let content = fs::read_to_string(input).context(format!("Failed to read {}", input.display()))?;
    let records: Vec<ScheduleRecord> = serde_json::from_str(&content).context("Failed to parse export file")?;

    let report = service.import(records).await?;
    println!("{} {} schedules", "Imported:".green(), report.imported);
    for failure in &report.failures {
        println!("  {} record {}: {}", "rejected".red(), failure.position, failure.message);
    }
    Ok(())
}

async fn handle_rebuild_command(service: &Service) -> Result<()> {
    let count = service.store().rebuild_index().await?;
    println!("{} {} schedules indexed", "Rebuilt:".green(), count);
    Ok(())
}

fn print_schedule(schedule: &ReviewSchedule) {
    println!(
        "  {:<32} {:<10} ease {:.2}  interval {:>4}d  next {}",
        schedule.concept_id,
        color_status(schedule.status),
        schedule.parameters.easiness_factor(),
        schedule.parameters.interval(),
        schedule.timing.next_review_date.format("%Y-%m-%d %H:%M")
    );
}

fn print_status_counts(counts: &StatusCounts) {
    for status in ScheduleStatus::ALL {
        println!("  {:<17} {}", format!("{}:", status), counts.get(status));
    }
}

fn color_status(status: ScheduleStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        ScheduleStatus::New => label.blue(),
        ScheduleStatus::Learning => label.yellow(),
        ScheduleStatus::Reviewing => label.cyan(),
        ScheduleStatus::Mature => label.green(),
        ScheduleStatus::Suspended => label.dimmed(),
        ScheduleStatus::Leech => label.red(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;
    config.validate().context("Invalid configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
