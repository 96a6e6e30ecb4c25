use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use regex::Regex;
use simtrace::config::{OutputFormat, SimtraceConfig};
use simtrace::export::write_table_to;
use simtrace::extract::load_data;
use simtrace::{discover_sources, load_log, load_streams, LogSource, LogTable, TraceOptions};
use std::num::NonZeroU32;
use std::path::PathBuf;

/// Extract SIM_TRACE_LOG records from simulation logs into a table.
#[derive(Parser, Debug)]
#[command(name = "simtrace", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "simtrace.toml", global = true)]
    config: PathBuf,

    /// Extra logging (per-file extraction counts)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print resolved settings and exit without loading anything
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load one (possibly rolled-over) log and write its table
    Parse {
        /// Base log file; `.1`, `.2`, ... parts are picked up automatically
        path: PathBuf,
        #[command(flatten)]
        trace: TraceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Load several logs as labelled streams and write one sorted table
    Merge {
        /// Sources as PATH=STREAM
        #[arg(value_parser = parse_source)]
        sources: Vec<LogSource>,
        /// Glob of additional log files to load as streams
        #[arg(long)]
        glob: Option<String>,
        /// Regex whose first capture group names a discovered stream (overrides config)
        #[arg(long)]
        stream_regex: Option<String>,
        #[command(flatten)]
        trace: TraceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the raw trace payloads of a log, one per line
    Payloads {
        path: PathBuf,
        /// Trace marker (overrides config)
        #[arg(long)]
        marker: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TraceArgs {
    /// Trace marker (overrides config)
    #[arg(long)]
    marker: Option<String>,
    /// Episodes per training iteration (overrides config)
    #[arg(long)]
    episodes_per_iteration: Option<NonZeroU32>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format (overrides config)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Rescale rewards into [0, 1]
    #[arg(long)]
    normalize_rewards: bool,
    /// Drop repeated (stream, episode, steps) rows
    #[arg(long)]
    dedup: bool,
}

fn parse_source(s: &str) -> Result<LogSource, String> {
    match s.rsplit_once('=') {
        Some((path, stream)) if !path.is_empty() && !stream.is_empty() => {
            Ok(LogSource::new(path, stream))
        }
        _ => Err(format!("expected PATH=STREAM, got {s:?}")),
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn trace_options(config: &SimtraceConfig, args: &TraceArgs) -> anyhow::Result<TraceOptions> {
    let mut opts = config.trace_options()?;
    if let Some(marker) = &args.marker {
        anyhow::ensure!(!marker.is_empty(), "trace marker must not be empty");
        opts.marker = marker.clone();
    }
    if let Some(n) = args.episodes_per_iteration {
        opts.episodes_per_iteration = n;
    }
    Ok(opts)
}

/// Output settings after layering CLI flags over config.
#[derive(Debug)]
struct ResolvedOutput {
    format: OutputFormat,
    path: Option<PathBuf>,
    normalize_rewards: bool,
    dedup: bool,
}

fn resolve_output(config: &SimtraceConfig, args: &OutputArgs) -> ResolvedOutput {
    ResolvedOutput {
        format: args.format.unwrap_or(config.output.format),
        path: args.output.clone(),
        normalize_rewards: args.normalize_rewards || config.output.normalize_rewards,
        dedup: args.dedup || config.output.dedup,
    }
}

fn finish(mut table: LogTable, out: &ResolvedOutput) -> anyhow::Result<()> {
    if out.dedup {
        let dropped = table.dedup();
        tracing::info!(dropped, "removed duplicate rows");
    }
    if out.normalize_rewards {
        table.normalize_rewards();
    }
    write_table_to(&table, out.format, out.path.as_deref()).context("failed to write table")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = SimtraceConfig::load(&cli.config)?;

    match &cli.command {
        Command::Parse {
            path,
            trace,
            output,
        } => {
            let opts = trace_options(&config, trace)?;
            let out = resolve_output(&config, output);
            if cli.dry_run {
                println!("source: {}", path.display());
                println!("{opts:?}");
                println!("{out:?}");
                return Ok(());
            }
            let table = load_log(path, &opts)?;
            finish(table, &out)
        }
        Command::Merge {
            sources,
            glob,
            stream_regex,
            trace,
            output,
        } => {
            let opts = trace_options(&config, trace)?;
            let out = resolve_output(&config, output);
            let regex = stream_regex
                .as_deref()
                .or(config.discovery.stream_regex.as_deref())
                .map(Regex::new)
                .transpose()
                .context("invalid stream regex")?;

            let mut all = sources.clone();
            if let Some(pattern) = glob {
                all.extend(discover_sources(pattern, regex.as_ref())?);
            }
            anyhow::ensure!(!all.is_empty(), "no sources given: pass PATH=STREAM or --glob");

            if cli.dry_run {
                for source in &all {
                    println!("{} => {}", source.path.display(), source.stream);
                }
                println!("{opts:?}");
                println!("{out:?}");
                return Ok(());
            }
            let table = load_streams(&all, &opts)?;
            finish(table, &out)
        }
        Command::Payloads { path, marker } => {
            let marker = marker.as_deref().unwrap_or(&config.trace.marker);
            if cli.dry_run {
                println!("source: {} marker: {marker}", path.display());
                return Ok(());
            }
            for payload in load_data(path, marker)? {
                println!("{payload}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_splits_on_last_equals() {
        let s = parse_source("/logs/a=b/eval.log=run-1").unwrap();
        assert_eq!(s.path, PathBuf::from("/logs/a=b/eval.log"));
        assert_eq!(s.stream, "run-1");
    }

    #[test]
    fn parse_source_rejects_missing_stream() {
        assert!(parse_source("/logs/eval.log").is_err());
        assert!(parse_source("/logs/eval.log=").is_err());
        assert!(parse_source("=run").is_err());
    }

    #[test]
    fn cli_parses_merge_arguments() {
        let cli = Cli::try_parse_from([
            "simtrace",
            "merge",
            "a.log=A",
            "b.log=B",
            "--episodes-per-iteration",
            "10",
            "--format",
            "json",
            "--dedup",
        ])
        .unwrap();
        match cli.command {
            Command::Merge {
                sources,
                trace,
                output,
                ..
            } => {
                assert_eq!(sources.len(), 2);
                assert_eq!(trace.episodes_per_iteration.map(|n| n.get()), Some(10));
                assert_eq!(output.format, Some(OutputFormat::Json));
                assert!(output.dedup);
            }
            other => panic!("expected merge, got {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_zero_episodes_per_iteration() {
        let res = Cli::try_parse_from([
            "simtrace",
            "parse",
            "f.log",
            "--episodes-per-iteration",
            "0",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn cli_flags_override_config() {
        let config = SimtraceConfig::parse("[trace]\nepisodes_per_iteration = 5\n").unwrap();
        let args = TraceArgs {
            marker: Some("EVAL_TRACE".to_string()),
            episodes_per_iteration: None,
        };
        let opts = trace_options(&config, &args).unwrap();
        assert_eq!(opts.marker, "EVAL_TRACE");
        assert_eq!(opts.episodes_per_iteration.get(), 5);

        let out = resolve_output(
            &config,
            &OutputArgs {
                format: None,
                output: None,
                normalize_rewards: true,
                dedup: false,
            },
        );
        assert_eq!(out.format, OutputFormat::Csv);
        assert!(out.normalize_rewards);
        assert!(!out.dedup);
    }
}
