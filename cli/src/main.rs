use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use parzip_core::compression::CompressionCodec;
use parzip_core::stream::{
    InputSource, OutputSink, Pipeline, PipelineConfig, PipelineReport, decompress_file,
    default_decompressed_path, default_output_path,
};
use parzip_core::utils::format_bytes;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "parzip",
    version,
    about = "Parallel chunked gzip/zstd compressor",
    long_about = "Split a file into fixed-size chunks, compress them on all cores, \
                  and write the units back in order as one multi-member stream."
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file.
    Compress {
        /// Source file.
        input: PathBuf,

        /// Destination file (defaults to <input>.gz or <input>.zst).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON config file; flags given on the command line override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Chunk size (supports suffixes K/M/G, e.g. 64K, 1M).
        #[arg(long, value_parser = parse_size)]
        chunk_size: Option<usize>,

        /// Number of worker threads (defaults to CPU count).
        #[arg(long)]
        workers: Option<usize>,

        /// Maximum segments allocated but not yet written.
        #[arg(long)]
        inflight: Option<usize>,

        #[arg(long, value_enum)]
        codec: Option<CodecArg>,

        /// Compression level (gzip 0-9, zstd 1-22).
        #[arg(short, long)]
        level: Option<i32>,

        /// Fail if the writer waits longer than this for the next chunk.
        #[arg(long)]
        stall_timeout_ms: Option<u64>,

        /// Keep a partially written output file on failure.
        #[arg(long, default_value_t = false)]
        keep_partial: bool,

        /// Overwrite the output without asking.
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Print the telemetry snapshot as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Decompress a gzip or zstd file (every member/frame).
    Decompress {
        /// Compressed file.
        input: PathBuf,

        /// Destination file (defaults to the input without its extension).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output without asking.
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodecArg {
    Gzip,
    Zstd,
}

impl From<CodecArg> for CompressionCodec {
    fn from(value: CodecArg) -> Self {
        match value {
            CodecArg::Gzip => CompressionCodec::Gzip,
            CodecArg::Zstd => CompressionCodec::Zstd,
        }
    }
}

struct CompressArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    chunk_size: Option<usize>,
    workers: Option<usize>,
    inflight: Option<usize>,
    codec: Option<CodecArg>,
    level: Option<i32>,
    stall_timeout_ms: Option<u64>,
    keep_partial: bool,
    force: bool,
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = run(cli.command) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Compress {
            input,
            output,
            config,
            chunk_size,
            workers,
            inflight,
            codec,
            level,
            stall_timeout_ms,
            keep_partial,
            force,
            json,
        } => compress_command(CompressArgs {
            input,
            output,
            config,
            chunk_size,
            workers,
            inflight,
            codec,
            level,
            stall_timeout_ms,
            keep_partial,
            force,
            json,
        }),
        Commands::Decompress { input, output, force } => decompress_command(input, output, force),
    }
}

fn build_config(args: &CompressArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(workers) = args.workers {
        config = config.with_parallelism(workers);
    }
    if let Some(inflight) = args.inflight {
        config.inflight_segments = inflight;
    }
    if let Some(codec) = args.codec {
        config.codec = codec.into();
        // A level from the config file belongs to its codec.
        config.level = None;
    }
    if let Some(level) = args.level {
        config.level = Some(level);
    }
    if let Some(ms) = args.stall_timeout_ms {
        config.stall_timeout_ms = Some(ms);
    }
    if args.keep_partial {
        config.keep_partial_output = true;
    }

    config.validate()?;
    Ok(config)
}

fn compress_command(args: CompressArgs) -> Result<()> {
    let config = build_config(&args)?;
    tracing::debug!(?config, "effective configuration");
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, config.codec));

    if !args.input.is_file() {
        bail!("input {} is not a file", args.input.display());
    }
    if !args.force && !confirm_overwrite(&output_path)? {
        eprintln!("skipped: {} left untouched", output_path.display());
        return Ok(());
    }

    let started = Instant::now();
    let handle = Pipeline::new(config).start(
        InputSource::File(args.input.clone()),
        OutputSink::File(output_path.clone()),
    )?;
    let report = handle.wait()?;

    print_compress_summary(&args.input, &output_path, &report, started.elapsed());
    if args.json {
        println!("{}", report.telemetry.to_json()?);
    }
    Ok(())
}

fn decompress_command(input: PathBuf, output: Option<PathBuf>, force: bool) -> Result<()> {
    let output_path = match output {
        Some(path) => path,
        None => default_decompressed_path(&input).with_context(|| {
            format!("cannot derive an output name from {}; pass --output", input.display())
        })?,
    };

    if !force && !confirm_overwrite(&output_path)? {
        eprintln!("skipped: {} left untouched", output_path.display());
        return Ok(());
    }

    let started = Instant::now();
    let bytes = decompress_file(&input, &output_path)?;
    eprintln!(
        "decompressed {} -> {} ({}) in {}",
        input.display(),
        output_path.display(),
        format_bytes(bytes),
        format_duration(started.elapsed())
    );
    Ok(())
}

/// Ask on stderr until the answer is `y` or `n`. EOF on stdin means no.
fn confirm_overwrite(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        eprint!("file {} already exists. Overwrite? (y/n) ", path.display());
        io::stderr().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

fn print_compress_summary(input: &Path, output: &Path, report: &PipelineReport, elapsed: Duration) {
    let t = &report.telemetry;
    eprintln!("compressed {} -> {}", input.display(), output.display());
    eprintln!(
        "  {} -> {} (ratio {:.3}), {} segments on {} workers",
        format_bytes(t.bytes_raw),
        format_bytes(t.bytes_written),
        t.compression_ratio,
        t.segments_total,
        t.workers
    );
    eprintln!(
        "  time elapsed: {} ({}/s)",
        format_duration(elapsed),
        format_bytes(t.throughput_raw_bytes_per_sec as u64)
    );
}

fn parse_size(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let split_at = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (num_part, suffix_part) = trimmed.split_at(split_at);
    if num_part.is_empty() {
        return Err(format!("invalid size: {value}"));
    }

    let base: usize = num_part
        .parse()
        .map_err(|_| format!("invalid size number: {value}"))?;

    let multiplier = match suffix_part.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1usize,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(format!("invalid size suffix '{other}' in '{value}'")),
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: {value}"))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let millis = duration.subsec_millis();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else if minutes > 0 {
        format!("{minutes:02}:{seconds:02}")
    } else {
        format!("{seconds}.{millis:03}s")
    }
}
