use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use leakscout::{
    enumerate, person, run_batch, run_search, BatchReport, ConfigOverrides, EncodingMode,
    MimeClassifier, RunContext, RunReport, SearchConfig, SearchError, SearchJob, WalkOutput,
};
use std::{num::NonZeroUsize, path::PathBuf, process::ExitCode, time::Duration};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Looks through files and merges lines of a specific pattern",
    long_about = None,
    after_help = "Example: leakscout /data/dumps 'example\\.com' -o found/example.txt -s :"
)]
struct Cli {
    /// The directory to be searched through
    source_directory: PathBuf,

    /// Pattern to look for (regular expression)
    pattern: String,

    /// Output file; results go to <dir>/<stem>/<stem>-main.txt. Prints to stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Separates user and password with this separator into users/password files
    #[arg(short, long)]
    separate: Option<String>,

    /// Excludes a single file from the search, e.g. a previous result
    #[arg(short, long)]
    ignore: Option<PathBuf>,

    /// File with one "firstname lastname" per line; runs one name search per line
    #[arg(short, long, conflicts_with_all = ["name", "firstname"])]
    list: Option<PathBuf>,

    /// Last name; together with --firstname replaces the pattern with a name search
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// First name; together with --name replaces the pattern with a name search
    #[arg(short, long)]
    firstname: Option<String>,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,

    /// Shows the file types that are block-listed and excluded from the search
    #[arg(short = 'S', long)]
    suppressed: bool,

    /// Shows the file types that have been found
    #[arg(short = 't', long = "file-types", alias = "fileTypes")]
    file_types: bool,

    /// Number of worker threads (default: CPU cores)
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// How file contents are decoded (latin1|utf8|lossy)
    #[arg(long)]
    encoding: Option<EncodingMode>,

    /// Additional configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Glob pattern of paths to skip (can be repeated)
    #[arg(long)]
    exclude: Vec<String>,

    /// Prints the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            ignore_path: self.ignore.clone(),
            exclude_patterns: self.exclude.clone(),
            thread_count: self.threads,
            encoding_mode: self.encoding,
            log_level: if self.verbose {
                Some("debug".to_string())
            } else if self.quiet {
                Some("error".to_string())
            } else {
                None
            },
        }
    }
}

fn init_logging(level: &str) {
    // RUST_LOG wins over flags and config
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar(template: &str, hidden: bool) -> Result<ProgressBar> {
    let bar = ProgressBar::new(0).with_style(
        ProgressStyle::with_template(template)?.progress_chars("=> "),
    );
    if hidden {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    Ok(bar)
}

fn print_walk(cli: &Cli, config: &SearchConfig, walk: &WalkOutput) {
    if cli.verbose {
        eprintln!("Here are all the locations:\n[");
        for file in &walk.files {
            eprintln!("{}", file.path.display());
        }
        eprintln!("]");
        eprintln!("location: {}", cli.source_directory.display());
        eprintln!("{} files found.", walk.files.len());
    } else if cli.quiet {
        eprintln!("{} files found.", walk.files.len());
    } else {
        eprintln!(
            "{} files found in {}.",
            walk.files.len(),
            cli.source_directory.display()
        );
    }
    if walk.skipped > 0 {
        warn!("{} entries could not be read and were skipped", walk.skipped);
    }

    if cli.suppressed {
        eprintln!(
            "These file types are ignored: [{}]",
            config.blocked_types.iter().sorted().join(", ")
        );
        if !walk.suppressed.is_empty() {
            eprintln!(
                "Suppressed in this directory: [{}]",
                walk.suppressed.iter().join(", ")
            );
        }
    }
    if cli.file_types {
        eprintln!(
            "These file types have been found: [{}]",
            walk.types.iter().join(", ")
        );
    }
}

fn print_report(report: &RunReport) {
    eprintln!(
        "{} matches were found in {} files",
        report.total_matches.to_string().green(),
        report.files_with_matches
    );
    if let Some(output) = &report.output {
        eprintln!("Results written to {}", output.display().to_string().blue());
    }
    if report.files_failed > 0 {
        eprintln!(
            "{}",
            format!("{} files could not be scanned", report.files_failed).yellow()
        );
    }
}

fn print_batch(report: &BatchReport) {
    for outcome in &report.people {
        match (&outcome.report, &outcome.error) {
            (Some(run), _) => eprintln!(
                "{}: {} matches{}",
                outcome.name,
                run.total_matches.to_string().green(),
                run.output
                    .as_ref()
                    .map(|p| format!(" in {}", p.display()))
                    .unwrap_or_default()
            ),
            (None, Some(error)) => eprintln!("{}: {}", outcome.name, error.red()),
            (None, None) => {}
        }
    }
    eprintln!(
        "{} people searched, {} failed, {} matches in total",
        report.people.len(),
        report.failed(),
        report.total_matches()
    );
}

fn run(cli: &Cli, ctx: &RunContext) -> Result<()> {
    let config = SearchConfig::load_from(cli.config.as_deref())
        .map_err(SearchError::from)?
        .merge_with_cli(cli.overrides());
    init_logging(&config.log_level);
    debug!("Configuration: {:?}", config);

    let token = ctx.cancel_token().clone();
    ctrlc::set_handler(move || token.cancel()).context("Failed to install interrupt handler")?;

    if cli.name.is_some() != cli.firstname.is_some() {
        warn!("A name search needs both --firstname and --name; searching for the pattern instead");
    }

    let walk = enumerate(
        &cli.source_directory,
        &config,
        &MimeClassifier::new(),
        ctx.cancel_token(),
    )?;
    print_walk(cli, &config, &walk);

    let multi = MultiProgress::new();
    if cli.quiet {
        multi.set_draw_target(ProgressDrawTarget::hidden());
    }
    let files_bar = multi.add(progress_bar(
        "{msg:20} [{bar:40}] {pos}/{len} files ({eta})",
        cli.quiet,
    )?);

    match &cli.list {
        Some(list) => {
            let people = person::parse_names(list, cli.output.as_deref())?;
            if cli.verbose {
                eprintln!("Here are the people found:\n[");
                for p in &people {
                    eprintln!(
                        "firstname: {}; lastname: {}; outputFile: {}",
                        p.firstname,
                        p.lastname,
                        p.output.display()
                    );
                }
                eprintln!("]\n{} people to be analyzed.", people.len());
            } else if cli.quiet {
                eprintln!("{} people.", people.len());
            } else {
                eprintln!("{} people have been found.", people.len());
            }

            let people_bar = multi.insert(
                0,
                progress_bar("{msg:20} [{bar:40}] {pos}/{len} ppl", cli.quiet)?,
            );
            let report = run_batch(
                &people,
                &walk.files,
                &cli.pattern,
                cli.separate.as_deref(),
                &config,
                ctx,
                &files_bar,
                &people_bar,
            )?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_batch(&report);
            }
        }
        None => {
            let mut job = SearchJob::new(cli.pattern.as_str());
            if let (Some(first), Some(last)) = (&cli.firstname, &cli.name) {
                job = job.with_names(first.as_str(), last.as_str());
            }
            job.output = cli.output.clone();
            job.separator = cli.separate.clone();

            let report = run_search(&walk.files, &job, &config, ctx, &files_bar)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }
    Ok(())
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<SearchError>() {
        Some(SearchError::AlreadyExists(path)) => {
            eprintln!("{}", format!("There is already a file with that name: {}", path.display()).red());
            eprintln!("ABORTED");
        }
        Some(SearchError::NotFound(path)) => {
            eprintln!("{}", format!("{} does not exist!", path.display()).red());
            eprintln!("ABORTED");
        }
        Some(SearchError::Interrupted) => {
            eprintln!("\n{} Interrupted, no results were written\n", "[ABORTED]".red());
        }
        _ => eprintln!("{} {:#}", "Error:".red(), err),
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ctx = RunContext::default();

    let code = match run(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    };

    let elapsed = Duration::from_millis(u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX));
    eprintln!("Total time: {}", humantime::format_duration(elapsed));
    code
}
