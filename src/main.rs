use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use cr_tracker::parser::{self, clauses::ClauseMatcher};
use cr_tracker::{
    ClauseSet, HttpTransport, MatchMode, MatchRecord, NullSink, Pipeline, PipelineSink,
    ProbeOutcome, RunOutcome, Settings,
};

#[derive(Parser)]
#[command(name = "cr_tracker", about = "Track approved 3GPP CRs touching selected clauses")]
struct Cli {
    /// Config file (default: ./cr_tracker.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Meetings index URL
    #[arg(long, global = true)]
    index_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find approved CRs in the newest usable meeting and write the report
    Run {
        /// Specification identifier (e.g. "38.101-1")
        #[arg(short, long)]
        spec: Option<String>,
        /// Comma-separated clause list, replaces the configured set
        #[arg(long, value_delimiter = ',')]
        clauses: Option<Vec<String>>,
        /// Report every matched clause instead of the first
        #[arg(long)]
        all_matches: bool,
        /// Report path; `.csv` writes CSV, anything else a workbook
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print each match as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// List meeting folders, newest first
    Folders,
    /// Check the first approved CR of one meeting folder
    Probe {
        /// Folder name as listed on the index (e.g. "TSGR_109")
        folder: String,
        #[arg(short, long)]
        spec: Option<String>,
    },
    /// Run the clause matcher against a local .docx
    Scan {
        file: PathBuf,
        #[arg(long)]
        all_matches: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = cli.index_url {
        settings.index_url = url;
    }

    let result = match cli.command {
        Commands::Run {
            spec,
            clauses,
            all_matches,
            output,
            json,
        } => {
            if let Some(spec) = spec {
                settings.spec_identifier = spec;
            }
            if let Some(clauses) = clauses {
                settings.clause_set = ClauseSet::new(clauses);
            }
            if all_matches {
                settings.match_mode = MatchMode::All;
            }
            if let Some(output) = output {
                settings.report_path = output;
            }
            run(settings, json).await
        }
        Commands::Folders => {
            let pipeline = Pipeline::new(settings, HttpTransport::new(), NullSink);
            let folders = pipeline.folders().await?;
            if folders.is_empty() {
                println!("No meeting folders found.");
                return Ok(());
            }
            println!("{:>3} | {:<24} | {:<16}", "#", "Folder", "Modified");
            println!("{}", "-".repeat(49));
            for (i, f) in folders.iter().enumerate() {
                println!(
                    "{:>3} | {:<24} | {:<16}",
                    i + 1,
                    truncate(&f.href, 24),
                    f.modified.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        Commands::Probe { folder, spec } => {
            if let Some(spec) = spec {
                settings.spec_identifier = spec;
            }
            let pipeline = Pipeline::new(settings, HttpTransport::new(), NullSink);
            match pipeline.probe_folder(&folder).await? {
                ProbeOutcome::NoManifest => println!("No manifest found in {}.", folder),
                ProbeOutcome::NoReferences => println!("No approved CRs in {}.", folder),
                ProbeOutcome::Checked { reference, record } => match record {
                    Some(r) => print_record(&r),
                    None => println!(
                        "{} in {}: no tracked clause.",
                        reference.document_id, reference.archive_id
                    ),
                },
            }
            Ok(())
        }
        Commands::Scan { file, all_matches } => {
            let mode = if all_matches {
                MatchMode::All
            } else {
                settings.match_mode
            };
            let matcher = ClauseMatcher::new(&settings.clause_set, mode);
            let found = parser::scan_document(&file, &matcher)
                .with_context(|| format!("reading {}", file.display()))?;
            match found {
                Some(m) => {
                    println!("Clauses: {}", m.clauses.join(", "));
                    println!("Summary:\n{}", m.summary);
                }
                None => println!("No tracked clause in {}.", file.display()),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(settings: Settings, json: bool) -> anyhow::Result<()> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}% {wide_msg}")?
            .progress_chars("#>-"),
    );
    let report = settings.report_path.clone();
    let sink = BarSink { pb, json };
    let pipeline = Pipeline::new(settings, HttpTransport::new(), &sink);

    let outcome = pipeline.run().await?;
    sink.pb.finish_and_clear();

    match &outcome {
        RunOutcome::NoFolders => println!("No meeting folders found."),
        RunOutcome::NoUsableManifest { folders_checked } => println!(
            "None of {} folders had approved CRs. Empty report at {}.",
            folders_checked,
            report.display()
        ),
        RunOutcome::Completed {
            folder,
            references,
            records,
        } => {
            if !json {
                for r in records {
                    print_record(r);
                }
            }
            println!(
                "{}: {} of {} CR documents matched. Report at {}.",
                folder,
                records.len(),
                references,
                report.display()
            );
        }
    }
    Ok(())
}

/// Drives the terminal progress bar from pipeline events.
struct BarSink {
    pb: ProgressBar,
    json: bool,
}

impl PipelineSink for BarSink {
    fn report_progress(&self, percent: u8) {
        self.pb.set_position(percent as u64);
    }

    fn emit_result(&self, record: &MatchRecord) {
        if !self.json {
            return;
        }
        match serde_json::to_string(record) {
            Ok(line) => self.pb.suspend(|| println!("{}", line)),
            Err(e) => tracing::error!("could not serialize result: {}", e),
        }
    }

    fn emit_log(&self, line: &str) {
        self.pb.set_message(line.to_string());
    }
}

fn print_record(r: &MatchRecord) {
    println!(
        "{} | {} | {} | {}",
        r.meeting_folder, r.archive_id, r.document_id, r.matching_clause
    );
    for line in r.summary_of_change.lines() {
        println!("    {}", truncate(line, 100));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
