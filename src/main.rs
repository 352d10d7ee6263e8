use clap::{ArgGroup, Parser};
use fileglue::{list, merge_with_options, split_with_options, MergeOptions, SplitOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fileglue", about = "Merge files into one container and split them back out")]
#[command(group(ArgGroup::new("mode").required(true).args(["merge", "split", "list"])))]
struct Cli {
    /// Merge these files, in order, into the output container
    ///
    /// Takes two or more files, as in `-m <file1> <file2> [...] -o <output>`.
    /// A single file does not need a container; the library accepts one.
    #[arg(short, long, num_args = 2.., value_name = "FILE", requires = "output")]
    merge: Vec<PathBuf>,

    /// Split this container into the output directory
    #[arg(short, long, value_name = "INPUT", requires = "output")]
    split: Option<PathBuf>,

    /// List the entries of this container
    #[arg(short, long, value_name = "INPUT", conflicts_with = "output")]
    list: Option<PathBuf>,

    /// Container (merge) or directory (split) to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Copy buffer size in KiB
    #[arg(long, default_value = "64")]
    buffer_size: usize,

    /// Refuse to overwrite files that already exist when splitting
    #[arg(short, long)]
    no_clobber: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let buffer_size = cli.buffer_size.max(1) * 1024;

    // ── Merge ────────────────────────────────────────────────────────────────
    if !cli.merge.is_empty() {
        let output = cli.output.ok_or("merge needs -o <output>")?;
        merge_with_options(&cli.merge, &output, &MergeOptions { buffer_size })?;
        println!("Created: {}", output.display());
        return Ok(());
    }

    // ── Split ────────────────────────────────────────────────────────────────
    if let Some(input) = cli.split {
        let output = cli.output.ok_or("split needs -o <output_dir>")?;
        let opts = SplitOptions { buffer_size, overwrite: !cli.no_clobber };
        split_with_options(&input, &output, &opts)?;
        println!("Split into: {}", output.display());
        return Ok(());
    }

    // ── List ─────────────────────────────────────────────────────────────────
    if let Some(input) = cli.list {
        let entries = list(&input)?;
        println!("Container: {}", input.display());
        println!("{:<40} {:>14} {:>14}", "Name", "Offset", "Size");
        for e in &entries {
            println!("{:<40} {:>14} {:>14}", e.display_name(), e.offset, e.size);
        }
        return Ok(());
    }

    unreachable!("clap enforces exactly one mode")
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (_, 0)    => "warn",
        (_, 1)    => "info",
        _         => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fileglue={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
