use archive_cracker::{
    ArchiveKind, CommandVerifier, Coordinator, CrackConfig, CrackError, CrackReport, CrackStatus,
    PasswordGenerator, SearchMode,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "archive-cracker")]
#[command(about = "Brute force the password of a rar, 7z or zip archive", long_about = None)]
struct Cli {
    #[arg(help = "Archive to crack (.rar, .7z or .zip)")]
    archive: PathBuf,

    #[arg(short, long, help = "Wordlist to use (default: try every combination)")]
    wordlist: Option<PathBuf>,

    #[arg(short, long, help = "Number of worker processes (default: 2x available cores)")]
    procs: Option<usize>,

    #[arg(long, help = "Configuration file (JSON) - CLI options override config file values")]
    config: Option<PathBuf>,

    #[arg(long, help = "Characters used in combinatorial mode (overrides config file)")]
    charset: Option<String>,

    #[arg(long, help = "Longest password tried in combinatorial mode (overrides config file)")]
    max_length: Option<usize>,

    #[arg(short, long, help = "Seconds before a single verification is abandoned (overrides config file)")]
    timeout: Option<u64>,

    #[arg(short = 'c', long, help = "Save checkpoint every N candidates (overrides config file)")]
    checkpoint_interval: Option<u64>,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<CrackConfig, CrackError> {
    let mut config = match &cli.config {
        Some(path) => CrackConfig::load_from_file(path)?,
        None => CrackConfig::default(),
    };

    if let Some(procs) = cli.procs {
        config.workers = procs;
    }
    if let Some(charset) = &cli.charset {
        config.charset = charset.clone();
    }
    if let Some(max_length) = cli.max_length {
        config.max_length = max_length;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(interval) = cli.checkpoint_interval {
        config.checkpoint_interval = interval;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CrackError> {
    let kind = ArchiveKind::from_path(&cli.archive)?;
    let config = build_config(&cli)?;

    let mode = match &cli.wordlist {
        Some(path) => SearchMode::Wordlist(path.clone()),
        None => SearchMode::Combinatorial,
    };

    print_banner(&cli, kind, &config, &mode);

    let verifier = Arc::new(CommandVerifier::for_kind(kind));
    let coordinator = Coordinator::new(config, &cli.archive, verifier);
    let report = coordinator.run(&mode)?;

    print_report(&report, &coordinator);
    Ok(())
}

fn print_banner(cli: &Cli, kind: ArchiveKind, config: &CrackConfig, mode: &SearchMode) {
    println!("========================================");
    println!("  ARCHIVE PASSWORD SEARCH");
    println!("========================================");
    println!("Archive: {} ({})", cli.archive.display(), kind);
    match mode {
        SearchMode::Wordlist(path) => println!("Wordlist: {}", path.display()),
        SearchMode::Combinatorial => {
            let gen = PasswordGenerator::new(&config.charset, config.max_length);
            println!(
                "Combinations: {} symbols, up to {} characters ({} candidates)",
                gen.alphabet().len(),
                gen.max_length(),
                gen.total_candidates()
            );
        }
    }
    println!("Workers: {}", config.workers);
    println!("Timeout: {}s per candidate", config.timeout_secs);
    println!("Started at: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("========================================\n");
}

fn print_report(report: &CrackReport, coordinator: &Coordinator) {
    println!("\n========================================");
    match &report.status {
        CrackStatus::AlreadyFound(password) => {
            println!("Password is {}", password);
            println!("(recorded in {})", coordinator.store().path().display());
        }
        CrackStatus::Found(password) => {
            println!("Result: PASSWORD FOUND");
            println!("Password: {}", password);
            println!("Saved to: {}", coordinator.store().path().display());
        }
        CrackStatus::Exhausted => {
            println!("Result: NO PASSWORD FOUND");
        }
    }

    if !matches!(report.status, CrackStatus::AlreadyFound(_)) {
        if report.start_index > 0 {
            println!("Resumed at line: {}", report.start_index);
        }
        println!("Candidates tried: {}", report.candidates_sent);
        println!(
            "Failures: {} | Timeouts: {} | Errors: {}",
            report.tally.failures, report.tally.timeouts, report.tally.errors
        );
        println!("Total time: {:.3}s", report.elapsed.as_secs_f64());
    }
    println!("========================================");
    println!("Finished");
}
