use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use marketscope_core::config::Config;
use marketscope_core::data::Database;
use marketscope_core::report::{self, ReportFormat};
use marketscope_core::{ingest, traffic};
use marketscope_scraper::marketplace::MarketplaceScraper;
use marketscope_scraper::producthunt::{MAX_BATCH, ProductHunt};
use marketscope_scraper::record::ScrapeAttempt;
use marketscope_scraper::snapshot::SnapshotStore;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use url::Url;

/// Expand `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush().unwrap();
    let mut response = String::new();
    io::stdin().read_line(&mut response).unwrap();
    response.trim().to_lowercase()
}

fn resolve_db_path(args: &ArgMatches, config: &Config) -> PathBuf {
    let raw = args
        .get_one::<String>("db")
        .cloned()
        .unwrap_or_else(|| config.db_path.clone());
    expand_path(&raw)
}

fn open_database(path: &Path) -> Option<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let _ = fs::create_dir_all(parent);
    }

    match Database::new(path) {
        Ok(db) => Some(db),
        Err(e) => {
            eprintln!(
                "{} Failed to open database at {}: {}",
                "✗".red().bold(),
                path.display(),
                e
            );
            None
        }
    }
}

fn build_scraper(
    config: &Config,
    attempts: &Arc<StdMutex<Vec<ScrapeAttempt>>>,
    progress: Option<ProgressBar>,
) -> ProductHunt {
    let sink = attempts.clone();
    ProductHunt::with_timeout(config.timeout_secs)
        .with_request_delay(config.request_delay_secs)
        .with_snapshot_store(SnapshotStore::new(&config.snapshot_dir))
        .with_attempt_callback(Arc::new(move |attempt| {
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            sink.lock().unwrap().push(attempt);
        }))
}

fn flush_attempts(db: &Database, marketplace_id: Option<i64>, attempts: &[ScrapeAttempt]) {
    for attempt in attempts {
        if let Err(e) = db.append_scrape_attempt(marketplace_id, None, attempt) {
            eprintln!(
                "{} Failed to log attempt for {}: {}",
                "!".yellow().bold(),
                attempt.url,
                e
            );
        }
    }
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  MARKETSCOPE INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let dir_arg = args.get_one::<String>("PATH").unwrap();
    let force = args.get_flag("force");
    let config_dir = expand_path(dir_arg);
    let db_path = config_dir.join("marketscope.db");

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) {
        if force {
            println!(
                "{} Deleting existing database (force mode)",
                "→".yellow().bold()
            );
            Database::drop(&db_path);
        } else {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();

            let response = print_prompt("Would you like to overwrite it? [y/N]:");
            println!();

            if response != "y" && response != "yes" {
                println!("{} Initialization cancelled.", "✗".red().bold());
                return;
            }
            Database::drop(&db_path);
        }
        println!();
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        eprintln!(
            "{} Failed to create {}: {}",
            "✗".red().bold(),
            config_dir.display(),
            e
        );
        return;
    }

    match Database::new(&db_path) {
        Ok(_) => {
            println!(
                "{} Database created at {}",
                "✓".green().bold(),
                db_path.display().to_string().bright_white()
            );
            println!(
                "{} Point scrapes at it with --db or DB_PATH",
                "ℹ".blue()
            );
        }
        Err(e) => eprintln!("{} Failed to create database: {}", "✗".red().bold(), e),
    }
}

pub async fn handle_scrape(args: &ArgMatches) {
    let config = Config::from_env();
    let limit = *args.get_one::<usize>("limit").unwrap();

    let db_path = resolve_db_path(args, &config);
    let Some(db) = open_database(&db_path) else {
        return;
    };

    let progress = ProgressBar::new(limit.min(MAX_BATCH) as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap(),
    );
    progress.set_message("Fetching listings...");

    let attempts: Arc<StdMutex<Vec<ScrapeAttempt>>> = Arc::new(StdMutex::new(Vec::new()));
    let scraper = build_scraper(&config, &attempts, Some(progress.clone()));

    let records = match scraper.fetch_batch(limit).await {
        Ok(records) => records,
        Err(e) => {
            progress.finish_and_clear();
            eprintln!("{} Batch fetch failed: {}", "✗".red().bold(), e);
            return;
        }
    };
    progress.finish_with_message(format!("Fetched {} listings", records.len()));

    let marketplace_id = db.ensure_marketplace(scraper.name(), scraper.base_url()).ok();
    let logged = attempts.lock().unwrap().clone();
    flush_attempts(&db, marketplace_id, &logged);

    let estimator = traffic::from_config(&config);
    let summary = ingest::ingest_batch(
        &db,
        scraper.name(),
        scraper.base_url(),
        &records,
        estimator.as_ref(),
    );

    println!();
    print_divider();
    println!("{}", "  SCRAPE SUMMARY".bright_white().bold());
    print_divider();
    println!("{} Run {}", "→".blue(), summary.run_id.bright_white());
    println!(
        "{} {} ingested ({} new, {} updated)",
        "✓".green().bold(),
        summary.ingested,
        summary.created,
        summary.updated
    );
    if summary.failed > 0 {
        println!(
            "{} {} failed (logged, will retry next run)",
            "!".yellow().bold(),
            summary.failed
        );
    }
    println!("{} {} attempts logged", "→".blue(), logged.len());
}

pub async fn handle_estimate(args: &ArgMatches) {
    let url = args.get_one::<Url>("url").unwrap();
    let config = Config::from_env();

    let db_path = resolve_db_path(args, &config);
    let Some(db) = open_database(&db_path) else {
        return;
    };

    let attempts: Arc<StdMutex<Vec<ScrapeAttempt>>> = Arc::new(StdMutex::new(Vec::new()));
    let scraper = build_scraper(&config, &attempts, None);

    let result = scraper.fetch_one(url.as_str()).await;

    // Attempts are logged whether or not the fetch succeeded
    let marketplace_id = db.ensure_marketplace(scraper.name(), scraper.base_url()).ok();
    let logged = attempts.lock().unwrap().clone();
    flush_attempts(&db, marketplace_id, &logged);

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            eprintln!("{} Fetch failed: {}", "✗".red().bold(), e);
            return;
        }
    };

    let snapshot_path = logged.iter().rev().find_map(|a| a.snapshot_path.clone());
    let estimator = traffic::from_config(&config);

    match ingest::ingest_record(
        &db,
        scraper.name(),
        scraper.base_url(),
        &record,
        snapshot_path.as_deref(),
        estimator.as_ref(),
    ) {
        Ok(outcome) => {
            print_divider();
            println!("{}", format!("  {}", record.name).bright_white().bold());
            print_divider();
            println!("{} {}", "→".blue(), record.url);
            println!(
                "{} {} monthly visits",
                "→".blue(),
                outcome.traffic.visits_month
            );
            println!(
                "{} MRR ${:.2} - ${:.2} - ${:.2} (confidence {:.2})",
                "✓".green().bold(),
                outcome.estimate.mrr_low,
                outcome.estimate.mrr_likely,
                outcome.estimate.mrr_high,
                outcome.estimate.confidence
            );
            println!();
            println!("{}", "Assumptions:".bright_blue().bold());
            for line in outcome.estimate.rendered_assumptions() {
                println!("  {} {}", "•".blue(), line);
            }
        }
        Err(e) => eprintln!("{} Ingestion failed: {}", "✗".red().bold(), e),
    }
}

pub fn handle_report(args: &ArgMatches) {
    let config = Config::from_env();
    let db_path = resolve_db_path(args, &config);

    if !Database::exists(&db_path) {
        eprintln!(
            "{} No database at {} (run `marketscope init` first)",
            "✗".red().bold(),
            db_path.display()
        );
        return;
    }
    let Some(db) = open_database(&db_path) else {
        return;
    };

    let format_arg = args.get_one::<String>("format").unwrap();
    let Some(format) = ReportFormat::from_str(format_arg) else {
        eprintln!(
            "{} Unknown report format '{}' (expected text or json)",
            "✗".red().bold(),
            format_arg
        );
        return;
    };

    match report::gather_report_data(&db) {
        Ok(data) => println!("{}", report::render_report(&data, &format)),
        Err(e) => eprintln!("{} Failed to gather report: {}", "✗".red().bold(), e),
    }
}
