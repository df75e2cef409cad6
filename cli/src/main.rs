use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use brine_proto_compiler::{compile_dir, Event, Summary};

#[derive(Parser)]
#[command(name = "bproto", version)]
#[command(about = "Generate serde-ready Rust types from a directory of .proto files", long_about = None)]
struct Cli {
    /// Directory searched recursively for `.proto` files
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the `<name>.g.rs` files are written to (created if missing)
    #[arg(short, long)]
    output: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn report(event: &Event<'_>) {
    match event {
        Event::Found { count } => println!("Found {} proto files", count),
        Event::Parsed { file_id, messages, enums, .. } => {
            println!("Parsed: {} ({} messages, {} enums)", file_id, messages, enums)
        }
        Event::Skipped { file_id } => println!("Skipping {}: no messages or enums", file_id),
        Event::Generated { path, .. } => println!("Generated: {}", path.display()),
        // Logged by the compiler at error level.
        Event::ParseFailed { .. } | Event::Failed { .. } => {}
    }
}

fn print_summary(summary: &Summary) {
    let failed = summary.parse_failures + summary.failures + summary.io_failures;
    println!(
        "Done: {} generated, {} skipped, {} failed",
        summary.generated, summary.skipped, failed
    );
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // `--help` and `--version` also arrive here.
            return if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    init_tracing();

    if !cli.input.is_dir() {
        eprintln!("Error: Input directory does not exist: {}", cli.input.display());
        return ExitCode::FAILURE;
    }

    match compile_dir(&cli.input, &cli.output, report) {
        Ok(summary) => {
            print_summary(&summary);
            if summary.io_failures > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
