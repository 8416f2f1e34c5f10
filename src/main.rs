use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use pacecast::config::AppConfig;
use pacecast::error::PacecastError;
use pacecast::import::MemoryActivityStore;
use pacecast::logging::{self, LogFormat, LogLevel};
use pacecast::predictor::{self, ActivityStore, PredictionBasis};
use pacecast::training_load::{acwr, sanitize_series, FfmCalculator};
use pacecast::{geometry, records, zones};

/// pacecast - Race-time prediction and training-load analysis
///
/// Predicts finish times for GPX routes from an athlete's activity
/// history and tracks fitness, fatigue and workload ratios over time.
#[derive(Parser)]
#[command(name = "pacecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Race-time prediction and training-load analysis", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the finish time for a GPX route
    Predict {
        /// GPX route file
        #[arg(short, long)]
        route: PathBuf,

        /// Activity log (CSV or JSON)
        #[arg(short, long)]
        activities: PathBuf,
    },

    /// Show the personal-record table extracted from the activity log
    Records {
        /// Activity log (CSV or JSON)
        #[arg(short, long)]
        activities: PathBuf,
    },

    /// Heart-rate zone analysis for one activity
    Zones {
        /// Activity log (CSV or JSON)
        #[arg(short, long)]
        activities: PathBuf,

        /// Activity ID (defaults to the most recent with heart-rate data)
        #[arg(short = 'i', long)]
        activity_id: Option<i64>,
    },

    /// Fitness-fatigue and workload-ratio analysis over the activity log
    Load {
        /// Activity log (CSV or JSON)
        #[arg(short, long)]
        activities: PathBuf,

        /// Number of most recent days to display
        #[arg(short, long, default_value = "14")]
        days: usize,

        /// Emit the full series as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show or initialize the configuration file
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    logging::init_logging(&log_config)?;

    let result = match cli.command {
        Commands::Predict { route, activities } => cmd_predict(&config, &route, &activities),
        Commands::Records { activities } => cmd_records(&activities),
        Commands::Zones {
            activities,
            activity_id,
        } => cmd_zones(&config, &activities, activity_id),
        Commands::Load {
            activities,
            days,
            json,
        } => cmd_load(&config, &activities, days, json),
        Commands::Config { init } => cmd_config(&config, init),
    };

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<PacecastError>() {
            if err.severity().to_tracing_level() == tracing::Level::WARN {
                tracing::warn!(error = %err, "command failed");
            } else {
                tracing::error!(error = %err, "command failed");
            }
            eprintln!("{}", err.user_message().red());
            std::process::exit(1);
        }
        return Err(e);
    }
    Ok(())
}

#[derive(Tabled)]
struct KeyValueRow {
    #[tabled(rename = "Metric")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn kv(key: &str, value: String) -> KeyValueRow {
    KeyValueRow {
        key: key.to_string(),
        value,
    }
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn cmd_predict(config: &AppConfig, route: &PathBuf, activities: &PathBuf) -> Result<()> {
    let points = geometry::parse_route(route)
        .with_context(|| format!("Failed to load route {}", route.display()))?;
    let store = MemoryActivityStore::from_path(activities)
        .with_context(|| format!("Failed to load activity log {}", activities.display()))?;

    let prediction = predictor::predict_race_time(&points, &store, &config.predictor)?;
    let stats = geometry::elevation_stats(&points);

    println!("{}", "Route prediction".green().bold());

    let mut rows = vec![
        kv(
            "Distance",
            format!("{:.2} km", prediction.total_distance_m / 1000.0),
        ),
        kv("Elevation gain", format!("{:.0} m", stats.gain)),
        kv("Elevation loss", format!("{:.0} m", stats.loss)),
        kv(
            "Predicted time",
            records::minutes_to_time_str(prediction.predicted_minutes),
        ),
    ];
    if let Some(adjusted) = prediction.slope_adjusted_minutes {
        rows.push(kv(
            "Slope-adjusted time",
            records::minutes_to_time_str(adjusted),
        ));
    }
    if let Some(params) = &prediction.params {
        rows.push(kv("Flat speed", format!("{:.2} m/s", params.flat_speed_mps())));
        rows.push(kv(
            "Critical distance",
            format!("{:.0} m", params.critical_distance()),
        ));
    }
    if let Some(coefficients) = &prediction.coefficients {
        rows.push(kv(
            "Slope coefficients",
            format!("k1 = {:.3}, k2 = {:.3}", coefficients.k1, coefficients.k2),
        ));
    }
    print_table(rows);

    if prediction.basis == PredictionBasis::FlatPace {
        println!(
            "{}",
            "Not enough race history for a fitted model; used the flat-pace fallback.".yellow()
        );
    }
    Ok(())
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Best time")]
    time: String,
}

fn cmd_records(activities: &PathBuf) -> Result<()> {
    let store = MemoryActivityStore::from_path(activities)
        .with_context(|| format!("Failed to load activity log {}", activities.display()))?;
    let table = records::extract_records(&store.activities()?);

    if table.is_empty() {
        println!("{}", "No personal records found in the activity log.".yellow());
        return Ok(());
    }

    println!("{}", "Personal records".green().bold());
    let rows: Vec<RecordRow> = table
        .to_labeled()
        .into_iter()
        .map(|(distance, time)| RecordRow { distance, time })
        .collect();
    print_table(rows);
    Ok(())
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Share")]
    share: String,
}

fn cmd_zones(config: &AppConfig, activities: &PathBuf, activity_id: Option<i64>) -> Result<()> {
    let store = MemoryActivityStore::from_path(activities)
        .with_context(|| format!("Failed to load activity log {}", activities.display()))?;
    let all = store.activities()?;

    let activity = match activity_id {
        Some(id) => all
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow!("No activity with ID {}", id))?,
        None => all
            .iter()
            .filter(|a| a.heartrate_data.is_some())
            .max_by_key(|a| a.start_date)
            .ok_or_else(|| anyhow!("No activity with heart-rate data in the log"))?,
    };

    let stream = activity
        .heart_rate_stream()
        .ok_or_else(|| anyhow!("Activity {} has no usable heart-rate stream", activity.id))?;
    let summary = zones::calculate_zone_times(&stream, config.athlete.max_hr)?;
    let load = zones::training_impulse(&summary);
    let effort = zones::effort_score(&summary);

    println!(
        "{} (activity {}, {})",
        "Heart-rate zones".green().bold(),
        activity.id,
        activity.start_date
    );

    let rows: Vec<ZoneRow> = zones::ZONE_KEYS
        .iter()
        .filter_map(|key| {
            summary.zones.get(*key).map(|zone| ZoneRow {
                zone: zones::zone_description(key).to_string(),
                time: records::format_time(zone.time_seconds),
                share: format!("{:.1}%", zone.percentage),
            })
        })
        .collect();
    print_table(rows);

    println!(
        "Total {} | TRIMP {:.1} | intensity {:.2} | effort score {:.2}",
        records::format_time(summary.total_time_minutes * 60.0),
        load.trimp,
        load.intensity_factor,
        effort
    );
    Ok(())
}

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Effort")]
    effort: String,
    #[tabled(rename = "Fatigue")]
    fatigue: String,
    #[tabled(rename = "Fitness")]
    fitness: String,
    #[tabled(rename = "Form")]
    form: String,
    #[tabled(rename = "ACWR")]
    acwr: String,
}

fn cmd_load(config: &AppConfig, activities: &PathBuf, days: usize, json: bool) -> Result<()> {
    let store = MemoryActivityStore::from_path(activities)
        .with_context(|| format!("Failed to load activity log {}", activities.display()))?;
    let observations = store.effort_observations();
    if observations.is_empty() {
        println!("{}", "No effort scores in the activity log.".yellow());
        return Ok(());
    }

    let series = FfmCalculator::new(config.ffm).run(&observations);
    let ratios = acwr(&observations, &config.acwr);

    if json {
        // Non-finite values cross the boundary as nulls
        let collect = |f: fn(&pacecast::training_load::FfmSample) -> f64| {
            sanitize_series(&series.samples.iter().map(f).collect::<Vec<f64>>())
        };
        let report = serde_json::json!({
            "dates": series.samples.iter().map(|s| s.date.to_string()).collect::<Vec<String>>(),
            "effort": collect(|s| s.effort),
            "fatigue": collect(|s| s.fatigue),
            "fitness": collect(|s| s.fitness),
            "performance": collect(|s| s.performance),
            "form": collect(|s| s.form),
            "fatigue_ratio": collect(|s| s.fatigue_ratio),
            "acwr": ratios.iter().map(|r| r.ratio).collect::<Vec<Option<f64>>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Training load".green().bold());
    let start = series.samples.len().saturating_sub(days);
    let rows: Vec<LoadRow> = series.samples[start..]
        .iter()
        .zip(&ratios[start..])
        .map(|(sample, ratio)| LoadRow {
            date: sample.date.to_string(),
            effort: format!("{:.1}", sample.effort),
            fatigue: format!("{:.1}", sample.fatigue),
            fitness: format!("{:.1}", sample.fitness),
            form: format!("{:.1}", sample.form),
            acwr: ratio
                .ratio
                .map(|r| format!("{:.2}", r))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(rows);

    println!(
        "Final state: fatigue {:.1}, fitness {:.1}",
        series.final_state.fatigue, series.final_state.fitness
    );
    Ok(())
}

fn cmd_config(config: &AppConfig, init: bool) -> Result<()> {
    let path = AppConfig::default_config_path();
    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            config.save_to_file(&path)?;
            println!("{} {}", "Wrote default config to".green(), path.display());
        }
        return Ok(());
    }

    println!("Config path: {}", path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
