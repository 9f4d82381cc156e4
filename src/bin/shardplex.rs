//! Binary entry point for the fan-out planning CLI.
#![forbid(unsafe_code)]

#[path = "shardplex/topology.rs"]
mod topology;

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shardplex::{
    constructors::{BroadcastConstructor, SelectConstructor, StreamDescriptor, StreamSummary},
    Address, Cluster, FanoutLayout, FanoutQuery, QueryContext, RawQuery, Settings,
    StreamConstructor,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "shardplex",
    version,
    about = "Explain how a query fans out over a sharded cluster",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan the streams a query would open.
    Plan(PlanCmd),
}

#[derive(Args, Debug)]
struct PlanCmd {
    #[arg(long, value_name = "FILE", help = "TOML file listing the cluster shards")]
    topology: PathBuf,

    #[arg(long, value_name = "FILE", help = "TOML file with query settings")]
    settings: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::Select, help = "Stream constructor")]
    mode: ModeArg,

    #[arg(long, help = "Give every remote shard its own stream")]
    no_multiplexing: bool,

    #[arg(
        long,
        env = "SHARDPLEX_MAX_THREADS",
        help = "Override max_distributed_processing_threads (0 = single multiplexed stream)"
    )]
    max_threads: Option<u64>,

    #[arg(long, default_value = "SELECT 1", help = "Query text forwarded to shards")]
    query: String,

    #[arg(
        long,
        value_name = "HOST:PORT",
        help = "Decline local streams for this address (select mode only)"
    )]
    skip_local: Vec<Address>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ModeArg {
    Select,
    Broadcast,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    layout: FanoutLayout,
    stream_count: usize,
    streams: Vec<StreamSummary>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Plan(cmd) => {
            let report = plan(&cmd)?;
            emit(cli.format, &report, print_plan_text)?;
        }
    }
    Ok(())
}

fn plan(cmd: &PlanCmd) -> Result<PlanReport, Box<dyn Error>> {
    let cluster = topology::load(&cmd.topology)?;
    let mut settings = match &cmd.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(threads) = cmd.max_threads {
        settings.max_distributed_processing_threads = threads;
    }
    let context = QueryContext::new("shardplex-plan", "default", settings.clone());

    match cmd.mode {
        ModeArg::Select => {
            let mut constructor = cmd
                .skip_local
                .iter()
                .cloned()
                .fold(SelectConstructor::new(), SelectConstructor::skip_local);
            run_fanout(&mut constructor, &cluster, cmd, &context, &settings)
        }
        ModeArg::Broadcast => {
            if !cmd.skip_local.is_empty() {
                return Err("--skip-local cannot be combined with --mode broadcast: every \
                            broadcast participant must reach the barrier"
                    .into());
            }
            let mut constructor = BroadcastConstructor::new();
            run_fanout(&mut constructor, &cluster, cmd, &context, &settings)
        }
    }
}

fn run_fanout<C>(
    constructor: &mut C,
    cluster: &Cluster,
    cmd: &PlanCmd,
    context: &QueryContext,
    settings: &Settings,
) -> Result<PlanReport, Box<dyn Error>>
where
    C: StreamConstructor<Stream = StreamDescriptor>,
{
    let fanout = FanoutQuery::new(
        constructor,
        cluster,
        RawQuery::shared(cmd.query.clone()),
        context,
        settings,
        !cmd.no_multiplexing,
    );
    let layout = fanout.layout()?;
    let streams = fanout.execute()?;
    Ok(PlanReport {
        stream_count: layout.stream_count(),
        layout,
        streams: streams.iter().map(StreamDescriptor::summary).collect(),
    })
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(&T),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(value),
    }
    Ok(())
}

fn print_plan_text(report: &PlanReport) {
    let layout = &report.layout;
    println!("mode:             {:?}", layout.mode);
    println!("remote shards:    {}", layout.threads.remote_count);
    println!("remote threads:   {}", layout.threads.thread_count);
    println!(
        "pools/thread:     {} (+1 for first {})",
        layout.threads.pools_per_thread, layout.threads.remainder
    );
    println!("bucket sizes:     {:?}", layout.bucket_sizes);
    println!("local streams:    {}", layout.local_streams);
    println!("barrier size:     {}", report.stream_count);
    println!();
    for (idx, stream) in report.streams.iter().enumerate() {
        let shards = if stream.shards.is_empty() {
            String::new()
        } else {
            format!(" shards={:?}", stream.shards)
        };
        println!(
            "#{idx:<3} {:<12}{shards} -> {}{}",
            stream.kind,
            stream.addresses.join(", "),
            if stream.throttled { " (throttled)" } else { "" }
        );
    }
}
