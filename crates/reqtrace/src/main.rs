//! reqtrace - validate state-transition specs against the native test suite
//!
//! reqtrace reconciles three sources of truth: the declarative transition
//! spec document, the test functions that exist in the C sources, and
//! (optionally) live pass/fail output from the compiled test binaries. Every
//! spec entry ends up with exactly one verdict: PASS, FAIL, MISSING_TEST or
//! NOT_RUN.

mod config;
mod matrix;
mod output;

use clap::{Parser, Subcommand};
use config::Config;
use eyre::{Result, WrapErr, bail};
use output::OutputFormat;
use owo_colors::OwoColorize;
use reqtrace_core::{
    FunctionIndex, SpecDocument, Status, TestRunner, classify, extract_from_dir,
};
use std::path::PathBuf;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "reqtrace",
    version,
    about = "Validate state-transition specs against the native test suite"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Workspace directory the build command runs in (default: .)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Directory containing the test_*.c sources
    #[arg(long, global = true)]
    tests: Option<PathBuf>,

    /// Show verbose diagnostics
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Path to the transition spec document
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Compile and run the test binaries to check PASS/FAIL
    #[arg(long)]
    run: bool,

    /// Build command used with --run (default: "make all")
    #[arg(long, value_name = "CMD")]
    build_cmd: Option<String>,

    /// Directory the build drops test binaries into
    #[arg(long, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// Output format: text, json, markdown, html
    #[arg(long, short = 'f')]
    format: Option<String>,

    /// Also write an HTML report to FILE
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,
}

/// Subcommands
#[derive(Debug, Subcommand)]
enum Command {
    /// Extract annotation blocks into traceability matrices
    Matrix {
        /// Directory containing test sources (defaults to --tests)
        test_dir: Option<PathBuf>,

        /// Write an HTML traceability report to FILE
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,

        /// Write a Markdown specification document to FILE
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,

        /// Write a Markdown traceability report (matrix format) to FILE
        #[arg(long = "markdown-report", value_name = "FILE")]
        markdown_report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let mut args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if args.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command.take() {
        Some(Command::Matrix {
            test_dir,
            html,
            markdown,
            markdown_report,
        }) => run_matrix(&args, test_dir, html, markdown, markdown_report),
        None => run_validate(args),
    }
}

fn run_validate(args: Args) -> Result<()> {
    let config = Config::resolve(
        args.workspace,
        args.spec,
        args.tests,
        args.build_dir,
        args.build_cmd.as_deref(),
    );

    // Structural-input errors are fatal; everything past this point
    // degrades per entry instead of aborting
    if !config.spec_path.is_file() {
        bail!("Spec document not found: {}", config.spec_path.display());
    }
    if !config.tests_dir.is_dir() {
        bail!("Tests directory not found: {}", config.tests_dir.display());
    }

    let format = match args.format.as_deref() {
        Some(name) => OutputFormat::from_str(name)
            .ok_or_else(|| eyre::eyre!("Unknown output format '{}'", name))?,
        None => OutputFormat::default(),
    };

    eprintln!(
        "{} Loading spec {}...",
        "->".blue().bold(),
        config.spec_path.display()
    );
    let mut spec = SpecDocument::load(&config.spec_path)?;
    eprintln!(
        "   Loaded {} transition(s).",
        spec.transitions.len().to_string().green()
    );

    eprintln!(
        "{} Scanning test functions in {}...",
        "->".blue().bold(),
        config.tests_dir.display()
    );
    let index = FunctionIndex::scan_dir(&config.tests_dir)?;
    eprintln!(
        "   Found {} unique test function(s).",
        index.len().to_string().green()
    );

    // Results are rebuilt fresh on every run and consumed exactly once
    let results = if args.run {
        eprintln!("{} Building and running tests...", "->".blue().bold());
        let results = TestRunner::new(&config.workspace_dir, &config.build_dir)
            .build_command(config.build_command.iter().cloned())
            .build_timeout(config.build_timeout)
            .binary_timeout(config.binary_timeout)
            .run();
        eprintln!(
            "   Collected results for {} test function(s).",
            results.len().to_string().green()
        );
        Some(results)
    } else {
        None
    };

    classify(&mut spec.transitions, &index, results.as_ref());

    print!(
        "{}",
        output::render_report(&spec.transitions, args.run, format)
    );

    if let Some(html_path) = &args.html {
        let html = output::render_report(&spec.transitions, args.run, OutputFormat::Html);
        std::fs::write(html_path, html)
            .wrap_err_with(|| format!("Failed to write {}", html_path.display()))?;
        eprintln!("   HTML report written to {}", html_path.display());
    }

    let all_passing = spec
        .transitions
        .iter()
        .all(|t| t.status == Some(Status::Pass));
    if !all_passing {
        std::process::exit(1);
    }
    Ok(())
}

fn run_matrix(
    args: &Args,
    test_dir: Option<PathBuf>,
    html: Option<PathBuf>,
    markdown: Option<PathBuf>,
    markdown_report: Option<PathBuf>,
) -> Result<()> {
    let config = Config::resolve(args.workspace.clone(), None, args.tests.clone(), None, None);
    let dir = test_dir.unwrap_or(config.tests_dir);

    if !dir.is_dir() {
        bail!("Tests directory not found: {}", dir.display());
    }

    eprintln!(
        "{} Scanning annotations in {}...",
        "->".blue().bold(),
        dir.display()
    );
    let annotations = extract_from_dir(&dir)?;
    if annotations.is_empty() {
        eprintln!(
            "No annotations found. Add @feature/@scenario comment blocks to test functions."
        );
        return Ok(());
    }
    eprintln!(
        "   Found {} annotated test(s).",
        annotations.len().to_string().green()
    );

    let groups = matrix::group_by_feature(&annotations);
    print!("{}", matrix::render_summary(&groups));

    if let Some(path) = &html {
        std::fs::write(path, matrix::render_html(&groups))
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        eprintln!("   HTML report written to {}", path.display());
    }
    if let Some(path) = &markdown {
        std::fs::write(path, matrix::render_markdown_spec(&groups))
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        eprintln!("   Markdown specification written to {}", path.display());
    }
    if let Some(path) = &markdown_report {
        std::fs::write(path, matrix::render_markdown_report(&groups))
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        eprintln!("   Markdown report written to {}", path.display());
    }

    if html.is_none() && markdown.is_none() && markdown_report.is_none() {
        eprintln!("Tip: use --html or --markdown to generate reports.");
    }

    Ok(())
}
