use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wikicorpus::cleaner::{self, ExternalCleaner};
use wikicorpus::config::{self, DEFAULT_DUMP_DATE};
use wikicorpus::download;
use wikicorpus::extract;
use wikicorpus::stats::ExtractionStats;
use wikicorpus::{DumpError, ExtractOptions};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit code when the run succeeded but produced no articles
const EXIT_EMPTY_RESULT: u8 = 2;

#[derive(Parser)]
#[command(name = "wikicorpus")]
#[command(about = "Extract article titles and text from Wikipedia dumps into JSONL")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract articles from a dump into a JSONL file
    Extract(ExtractArgs),
    /// Download a dump without extracting it
    Download(DownloadArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Dump date (YYYYMMDD or "latest")
    #[arg(long, default_value = DEFAULT_DUMP_DATE)]
    date: String,

    /// Local dump file (.xml or .xml.bz2); skips the download
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory holding downloaded dumps
    #[arg(long, default_value = ".")]
    dump_dir: PathBuf,

    /// Output JSONL path (defaults to wikipedia-titles-<date>.jsonl)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many articles
    #[arg(long)]
    limit: Option<u64>,

    /// Fail instead of downloading when the dump is not in --dump-dir
    #[arg(long)]
    skip_download: bool,

    /// Keep "(disambiguation)" pages
    #[arg(long)]
    include_disambiguation: bool,

    /// Capture raw article wikitext
    #[arg(long)]
    include_text: bool,

    /// Clean article markup with wikiextractor instead of emitting raw wikitext
    #[arg(long)]
    use_external_cleaner: bool,

    /// Directory for the cleaner's intermediate files
    #[arg(long, default_value = "extracted")]
    cleaner_output: PathBuf,

    /// Reuse existing cleaner output instead of running the cleaner again
    #[arg(long)]
    skip_extraction: bool,

    /// Worker processes for the cleaner
    #[arg(long, default_value_t = config::CLEANER_PROCESSES)]
    processes: u32,

    /// Python interpreter used to run the cleaner
    #[arg(long, default_value = "python")]
    python: String,
}

#[derive(Args)]
struct DownloadArgs {
    /// Dump date (YYYYMMDD or "latest")
    #[arg(long, default_value = DEFAULT_DUMP_DATE)]
    date: String,

    /// Directory to download into
    #[arg(long, default_value = ".")]
    dump_dir: PathBuf,
}

enum Outcome {
    Done,
    Empty,
}

fn resolve_dump(args: &ExtractArgs) -> Result<PathBuf> {
    if let Some(input) = &args.input {
        return Ok(input.clone());
    }

    let local = download::local_dump_path(&args.date, &args.dump_dir)?;
    if local.exists() {
        info!(path = ?local, "Using existing dump");
        return Ok(local);
    }
    if args.skip_download {
        return Err(DumpError::MissingInput(local).into());
    }
    download::download_dump(&args.date, &args.dump_dir)
        .with_context(|| format!("Failed to download dump for {}", args.date))
}

fn print_summary(output: &Path, stats: &ExtractionStats, elapsed: Duration) {
    println!();
    println!("=== Summary ===");
    println!("Output:             {}", output.display());
    println!("Elapsed time:       {:.2}s", elapsed.as_secs_f64());
    println!();
    println!("Pages seen:         {}", stats.pages());
    println!("Articles written:   {}", stats.articles());
    println!("Incomplete pages:   {}", stats.incomplete_skipped);
    println!("Redirects:          {}", stats.redirects_skipped);
    println!("Other namespaces:   {}", stats.namespace_skipped);
    println!("Disambiguation:     {}", stats.disambiguation_skipped);
    println!(
        "Line-scan fallback: {}",
        if stats.fallback_used { "yes" } else { "no" }
    );
}

fn run_extract(args: ExtractArgs) -> Result<Outcome> {
    let with_text = args.include_text || args.use_external_cleaner;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::default_output_path(&args.date, with_text)));
    let options = ExtractOptions {
        include_text: args.include_text,
        filter_disambiguation: !args.include_disambiguation,
        limit: args.limit,
    };

    let start = Instant::now();
    let stats = if args.use_external_cleaner {
        let reuse = args.skip_extraction && args.cleaner_output.exists();
        let dump = if reuse {
            args.input.clone().unwrap_or_default()
        } else {
            resolve_dump(&args)?
        };
        let cleaner = ExternalCleaner::new(&args.cleaner_output)
            .with_python(args.python.as_str())
            .with_processes(args.processes);
        cleaner::run_cleaned_extraction(&dump, &output, &cleaner, options, reuse)
            .context("External cleaner extraction failed")?
    } else {
        let dump = resolve_dump(&args)?;
        extract::run_extraction(&dump, &output, options)
            .with_context(|| format!("Failed to extract {}", dump.display()))?
    };
    let elapsed = start.elapsed();

    print_summary(&output, &stats, elapsed);

    if stats.articles() == 0 {
        warn!(output = ?output, "No articles extracted");
        eprintln!("Warning: no articles were extracted");
        return Ok(Outcome::Empty);
    }
    Ok(Outcome::Done)
}

fn run_download(args: DownloadArgs) -> Result<Outcome> {
    let path = download::download_dump(&args.date, &args.dump_dir)
        .with_context(|| format!("Failed to download dump for {}", args.date))?;
    println!("{}", path.display());
    Ok(Outcome::Done)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let result = match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Download(args) => run_download(args),
    };

    match result {
        Ok(Outcome::Done) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Empty) => ExitCode::from(EXIT_EMPTY_RESULT),
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
