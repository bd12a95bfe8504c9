use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tge_archive::FsArchive;
use tge_cli::commands::{self, archive, scrape};
use tge_config::Settings;
use tge_md::{FilePageSource, HttpPageSource, PageSource};

#[derive(Parser)]
#[command(name = "tge")]
#[command(about = "TGE day-ahead Fixing I price archiver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one delivery day and archive it (no-op if already archived)
    Scrape {
        /// Delivery date YYYY-MM-DD (default: DELIVERY_DATE env, else tomorrow)
        #[arg(long)]
        date: Option<String>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Read markup from a saved file instead of fetching it
        #[arg(long)]
        html_file: Option<PathBuf>,

        /// Override archive.dir
        #[arg(long)]
        archive_dir: Option<PathBuf>,
    },

    /// Archive maintenance
    Archive {
        #[command(subcommand)]
        cmd: ArchiveCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ArchiveCmd {
    /// Print index summary and any drift against the record files
    Status {
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        archive_dir: Option<PathBuf>,
    },

    /// Rebuild index.json from the record files present
    Reindex {
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        archive_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Scrape {
            date,
            config_paths,
            html_file,
            archive_dir,
        } => {
            let (settings, _hash) = commands::load_settings(&config_paths)?;
            let env_date = std::env::var(commands::ENV_DELIVERY_DATE).ok();
            let now = Utc::now();
            let delivery_date = commands::resolve_delivery_date(
                date.as_deref(),
                env_date.as_deref(),
                settings.time_zone()?,
                now,
            )?;

            let source: Box<dyn PageSource> = match html_file {
                Some(path) => Box::new(FilePageSource::new(path)),
                None => Box::new(HttpPageSource::new(&settings.http_options())?),
            };
            let mut store = open_archive(&settings, archive_dir);

            let report = scrape::run_scrape(&settings, delivery_date, source.as_ref(), &mut store, now)?;

            println!(
                "archive_written={} date={} outcome={}",
                report.written(),
                report.delivery_date,
                report.outcome.as_str()
            );
            if let Some(s) = report.summary {
                println!(
                    "hours={} min={:.2} max={:.2} mean={:.2} skipped_cells={} absent_cells={}",
                    s.count,
                    s.min,
                    s.max,
                    s.mean,
                    report.diagnostics.len(),
                    report.absent_cells
                );
            }
            if report.written() {
                println!("record_path={}", store.record_path(delivery_date).display());
            }
        }

        Commands::Archive { cmd } => match cmd {
            ArchiveCmd::Status {
                config_paths,
                archive_dir,
            } => {
                let (settings, _hash) = commands::load_settings(&config_paths)?;
                let store = open_archive(&settings, archive_dir);
                let st = archive::archive_status(&store)?;
                println!("archive_dir={}", store.dir().display());
                println!("records={} in_sync={}", st.records, st.in_sync());
                match &st.index {
                    Some(ix) => println!(
                        "index_dates={} latest={} updated_at={}",
                        ix.dates.len(),
                        ix.latest,
                        ix.updated_at
                    ),
                    None => println!("index=missing"),
                }
                for d in &st.drift {
                    println!("drift={d}");
                }
            }
            ArchiveCmd::Reindex {
                config_paths,
                archive_dir,
            } => {
                let (settings, _hash) = commands::load_settings(&config_paths)?;
                let mut store = open_archive(&settings, archive_dir);
                match archive::archive_reindex(&mut store, Utc::now())? {
                    Some(ix) => println!(
                        "reindexed=true dates={} latest={}",
                        ix.dates.len(),
                        ix.latest
                    ),
                    None => println!("reindexed=false records=0"),
                }
            }
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tge_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn open_archive(settings: &Settings, dir_override: Option<PathBuf>) -> FsArchive {
    let dir = dir_override.unwrap_or_else(|| PathBuf::from(&settings.archive.dir));
    FsArchive::new(dir, settings.market.unit.as_str())
}

/// Logs go to stderr; stdout carries only the `key=value` result lines.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
