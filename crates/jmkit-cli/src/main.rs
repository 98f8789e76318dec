//! jmkit: JMeter test plan naming, dashboard report export, and report
//! comparison.
//!
//! Each flow is reachable as a subcommand for scripting; with no subcommand
//! the interactive menu runs and gathers the same configuration through
//! validated prompts.

mod prompt;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jmkit_core::compare::{self, export as compare_export, load, Thresholds};
use jmkit_core::naming;
use jmkit_core::report::{self, SlaConfig};
use jmkit_core::JmkitError;

#[derive(Parser)]
#[command(name = "jmkit")]
#[command(version)]
#[command(about = "JMeter test plan and dashboard report toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply naming conventions to a JMX test plan
    Normalize {
        /// Test plan file (.jmx); output lands next to it as *_Modified.jmx
        #[arg(value_name = "PLAN")]
        plan: PathBuf,
    },

    /// Export a dashboard's statistics and errors tables to CSV and HTML
    Report {
        /// URL of the dashboard index page
        #[arg(value_name = "URL")]
        url: String,

        /// Error % ceiling for SLA highlighting
        #[arg(long)]
        max_error_pct: Option<f64>,

        /// Average response time ceiling in ms for SLA highlighting
        #[arg(long)]
        max_average: Option<f64>,

        /// Apply the SLA to parent transactions as well as requests
        #[arg(long)]
        include_parents: bool,

        /// Output file stem
        #[arg(short, long, default_value = "report")]
        output: String,
    },

    /// Diff two exported metrics documents
    Compare {
        /// First metrics CSV (source A)
        #[arg(value_name = "FIRST")]
        first: PathBuf,

        /// Second metrics CSV (source B)
        #[arg(value_name = "SECOND")]
        second: PathBuf,

        /// Error % difference before a row is marked
        #[arg(long, default_value_t = 0.0)]
        error_pct_threshold: f64,

        /// Average difference in ms before a row is marked
        #[arg(long, default_value_t = 0.0)]
        average_threshold: f64,

        /// 90th percentile difference in ms before a row is marked
        #[arg(long, default_value_t = 0.0)]
        pct90_threshold: f64,
    },
}

// ---------------------------------------------------------------------------
// Flow configs: filled by clap args or by the prompt layer
// ---------------------------------------------------------------------------

struct NormalizeConfig {
    plan: PathBuf,
}

struct ReportConfig {
    url: String,
    sla: SlaConfig,
    output: String,
}

struct CompareConfig {
    first: PathBuf,
    second: PathBuf,
    thresholds: Thresholds,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(command) => run_command(command).await,
        None => match run_menu().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                prompt::fail(&format!("terminal input failed: {e}"));
                ExitCode::FAILURE
            }
        },
    }
}

async fn run_command(command: Commands) -> ExitCode {
    let result = match command {
        Commands::Normalize { plan } => run_normalize(&NormalizeConfig { plan }),
        Commands::Report {
            url,
            max_error_pct,
            max_average,
            include_parents,
            output,
        } => {
            run_report(&ReportConfig {
                url,
                sla: SlaConfig {
                    error_pct: max_error_pct,
                    average: max_average,
                    include_parents,
                },
                output,
            })
            .await
        }
        Commands::Compare {
            first,
            second,
            error_pct_threshold,
            average_threshold,
            pct90_threshold,
        } => run_compare(&CompareConfig {
            first,
            second,
            thresholds: Thresholds {
                error_pct: error_pct_threshold,
                average: average_threshold,
                pct90: pct90_threshold,
            },
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            prompt::fail(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive menu
// ---------------------------------------------------------------------------

async fn run_menu() -> io::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        println!();
        println!("1. Normalize test plan naming");
        println!("2. Generate report from a dashboard");
        println!("3. Compare two reports");
        println!("4. Exit");

        let Some(choice) = prompt::prompt_choice(&mut input, "Select an option", 4)? else {
            return Ok(());
        };

        let result = match choice {
            1 => match gather_normalize(&mut input)? {
                Some(config) => run_normalize(&config),
                None => return Ok(()),
            },
            2 => match gather_report(&mut input)? {
                Some(config) => run_report(&config).await,
                None => return Ok(()),
            },
            3 => match gather_compare(&mut input)? {
                Some(config) => run_compare(&config),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        // A failed flow ends that flow, not the session.
        if let Err(e) = result {
            prompt::fail(&e.to_string());
        }
    }
}

fn gather_normalize(input: &mut impl BufRead) -> io::Result<Option<NormalizeConfig>> {
    let Some(plan) = prompt::prompt_existing_path(input, "Test plan file (.jmx)")? else {
        return Ok(None);
    };
    Ok(Some(NormalizeConfig { plan }))
}

fn gather_report(input: &mut impl BufRead) -> io::Result<Option<ReportConfig>> {
    let Some(url) = prompt::prompt_line(input, "Dashboard index URL", None)? else {
        return Ok(None);
    };
    let error_pct = prompt::prompt_optional_f64(input, "Error % ceiling")?;
    let average = prompt::prompt_optional_f64(input, "Average response time ceiling (ms)")?;
    let include_parents = if error_pct.is_some() || average.is_some() {
        prompt::prompt_yes_no(input, "Apply SLA to parent transactions", false)?
    } else {
        false
    };
    let Some(output) = prompt::prompt_line(input, "Output file stem", Some("report"))? else {
        return Ok(None);
    };

    Ok(Some(ReportConfig {
        url,
        sla: SlaConfig {
            error_pct,
            average,
            include_parents,
        },
        output,
    }))
}

fn gather_compare(input: &mut impl BufRead) -> io::Result<Option<CompareConfig>> {
    let Some(first) = prompt::prompt_existing_path(input, "First metrics CSV")? else {
        return Ok(None);
    };
    let Some(second) = prompt::prompt_existing_path(input, "Second metrics CSV")? else {
        return Ok(None);
    };
    let Some(error_pct) = prompt::prompt_f64(input, "Error % threshold")? else {
        return Ok(None);
    };
    let Some(average) = prompt::prompt_f64(input, "Average threshold (ms)")? else {
        return Ok(None);
    };
    let Some(pct90) = prompt::prompt_f64(input, "90th percentile threshold (ms)")? else {
        return Ok(None);
    };

    Ok(Some(CompareConfig {
        first,
        second,
        thresholds: Thresholds {
            error_pct,
            average,
            pct90,
        },
    }))
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

fn run_normalize(config: &NormalizeConfig) -> Result<(), JmkitError> {
    let outcome = naming::normalize_plan_file(&config.plan)?;
    let summary = &outcome.summary;

    prompt::success(&format!(
        "renamed {} controllers, {} samplers, {} extractors, {} post-processors",
        summary.controllers, summary.samplers, summary.extractors, summary.post_processors
    ));
    prompt::success(&format!("normalized plan written to {}", outcome.output.display()));
    Ok(())
}

async fn run_report(config: &ReportConfig) -> Result<(), JmkitError> {
    let source = report::fetch_dashboard(&config.url).await?;
    let bundle = report::build_report(&source, &config.sla)?;

    for issue in &bundle.issues {
        prompt::warn(issue);
    }

    let metrics_path = PathBuf::from(format!("{}.csv", config.output));
    let errors_path = PathBuf::from(format!("{}_errors.csv", config.output));
    let html_path = PathBuf::from(format!("{}.html", config.output));
    std::fs::write(&metrics_path, &bundle.metrics_csv)?;
    std::fs::write(&errors_path, &bundle.errors_csv)?;
    std::fs::write(&html_path, &bundle.html)?;

    prompt::success(&format!(
        "report written to {}, {} and {}",
        metrics_path.display(),
        errors_path.display(),
        html_path.display()
    ));
    Ok(())
}

fn run_compare(config: &CompareConfig) -> Result<(), JmkitError> {
    let first = load::load_metrics_csv(&config.first)?;
    let second = load::load_metrics_csv(&config.second)?;
    report_cell_issues(&config.first, &first.issues);
    report_cell_issues(&config.second, &second.issues);

    let merged = compare::merge(&first.dataset, &second.dataset, &config.thresholds);
    let stem = compare_export::output_stem(&merged.source_a, &merged.source_b);

    // Output lands next to the first input.
    let csv_path = config.first.with_file_name(format!("{stem}.csv"));
    let html_path = config.first.with_file_name(format!("{stem}.html"));
    std::fs::write(&csv_path, compare_export::export_merged_csv(&merged)?)?;
    std::fs::write(&html_path, compare_export::export_merged_html(&merged))?;

    prompt::success(&format!(
        "comparison written to {} and {}",
        csv_path.display(),
        html_path.display()
    ));
    Ok(())
}

fn report_cell_issues(path: &Path, issues: &[load::CellIssue]) {
    for issue in issues {
        prompt::warn(&format!(
            "{}: row {}, column {}: {}",
            path.display(),
            issue.row,
            issue.column,
            issue.detail
        ));
    }
}
