pub mod runner;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wifi_lab_abstract::{
    LabConfig, ModelConfig, Mobility, RunConfig, ScenarioGrid, ScenarioKey, TrafficMix,
    validate_client_count,
};
use wifi_lab_estimator::{FlowMonitorSource, MetricSource, SourceDescriptor};
use wifi_lab_results::{ResultStore, render_markdown, scan, summarize, write_csv, write_json, write_markdown};

pub const DEFAULT_RESULTS_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(author, version, about = "WLAN scenario performance lab")]
pub struct Args {
    /// Lab configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding one result artifact per scenario.
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the scenario grid and which scenarios have stored results.
    List(GridArgs),
    /// Estimate and store a single scenario.
    Run {
        #[arg(long, value_parser = parse_clients)]
        clients: u32,
        #[arg(long)]
        mobility: Mobility,
        #[arg(long)]
        traffic: TrafficMix,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Estimate and store every scenario of the grid in parallel.
    Sweep {
        #[command(flatten)]
        grid: GridArgs,
        #[command(flatten)]
        run: RunArgs,
        /// Scenarios measured at once (defaults to the available parallelism).
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Convert simulator flow dumps (`<scenario>.flows.json`) into results.
    Ingest {
        #[arg(long)]
        flows_dir: PathBuf,
        #[command(flatten)]
        grid: GridArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Scan stored results and derive comparison statistics.
    Aggregate {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        summary: Option<PathBuf>,
        #[arg(long)]
        markdown: Option<PathBuf>,
    },
}

/// Restricts the grid; an empty list keeps the configured dimension.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct GridArgs {
    #[arg(long, value_delimiter = ',', value_parser = parse_clients)]
    pub clients: Vec<u32>,
    #[arg(long, value_delimiter = ',')]
    pub mobility: Vec<Mobility>,
    #[arg(long, value_delimiter = ',')]
    pub traffic: Vec<TrafficMix>,
}

#[derive(ClapArgs, Debug, Default, Clone)]
pub struct RunArgs {
    /// Nominal simulation duration in seconds.
    #[arg(long)]
    pub duration: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
}

fn parse_clients(raw: &str) -> Result<u32, String> {
    let clients: u32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a client count"))?;
    validate_client_count(clients).map_err(|e| e.to_string())
}

/// Effective settings after layering CLI flags over the lab file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: ModelConfig,
    pub run: RunConfig,
    pub grid: ScenarioGrid,
    pub results_dir: PathBuf,
}

impl Settings {
    pub fn resolve(args: &Args) -> Result<Self> {
        let lab = match &args.config {
            Some(path) => load_lab_config(path)?,
            None => LabConfig::default(),
        };
        let results_dir = args
            .results_dir
            .clone()
            .or(lab.results_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));
        let model = lab.model.resolve();
        lab.run.validate(&model)?;
        lab.grid.keys()?;
        Ok(Self {
            model,
            run: lab.run,
            grid: lab.grid,
            results_dir,
        })
    }

    fn run_config(&self, overrides: &RunArgs) -> Result<RunConfig> {
        let mut run = self.run.clone();
        if let Some(duration) = overrides.duration {
            run.duration_secs = duration;
        }
        if let Some(seed) = overrides.seed {
            run.seed = seed;
        }
        run.validate(&self.model)?;
        Ok(run)
    }

    fn grid(&self, overrides: &GridArgs) -> ScenarioGrid {
        let mut grid = self.grid.clone();
        if !overrides.clients.is_empty() {
            grid.clients = overrides.clients.clone();
        }
        if !overrides.mobility.is_empty() {
            grid.mobility = overrides.mobility.clone();
        }
        if !overrides.traffic.is_empty() {
            grid.traffic = overrides.traffic.clone();
        }
        grid
    }

    fn open_store(&self) -> Result<ResultStore> {
        Ok(ResultStore::open(&self.results_dir)?)
    }
}

pub fn load_lab_config(path: &Path) -> Result<LabConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read lab config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse lab config {}", path.display()))
}

pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

pub async fn run(args: Args) -> Result<()> {
    let settings = Settings::resolve(&args)?;
    match &args.command {
        Command::List(grid) => list(&settings, grid),
        Command::Run {
            clients,
            mobility,
            traffic,
            run,
        } => {
            let key = ScenarioKey::new(*clients, *mobility, *traffic)?;
            run_single(&settings, key, run)
        }
        Command::Sweep { grid, run, jobs } => sweep(&settings, grid, run, *jobs).await,
        Command::Ingest {
            flows_dir,
            grid,
            run,
        } => ingest(&settings, flows_dir, grid, run).await,
        Command::Aggregate {
            csv,
            summary,
            markdown,
        } => aggregate(&settings, csv.as_deref(), summary.as_deref(), markdown.as_deref()),
    }
}

fn list(settings: &Settings, grid: &GridArgs) -> Result<()> {
    let store = settings.open_store()?;
    for key in settings.grid(grid).keys()? {
        let state = if store.contains(&key) { "stored" } else { "missing" };
        println!("{:<20} {state}", key.canonical_name());
    }
    Ok(())
}

fn run_single(settings: &Settings, key: ScenarioKey, overrides: &RunArgs) -> Result<()> {
    let source = SourceDescriptor::Synthetic {
        model: settings.model.clone(),
        run: settings.run_config(overrides)?,
    }
    .build()?;
    let record = source.measure(&key)?;
    let path = settings.open_store()?.write(&record)?;
    info!(scenario = %key, path = %path.display(), "result stored");

    let json = serde_json::to_string_pretty(&record).context("Failed to serialize result record")?;
    println!("{json}");
    Ok(())
}

async fn sweep(
    settings: &Settings,
    grid: &GridArgs,
    overrides: &RunArgs,
    jobs: Option<usize>,
) -> Result<()> {
    let keys = settings.grid(grid).keys()?;
    let source: Arc<dyn MetricSource> = Arc::from(
        SourceDescriptor::Synthetic {
            model: settings.model.clone(),
            run: settings.run_config(overrides)?,
        }
        .build()?,
    );
    let store = Arc::new(settings.open_store()?);
    let report = runner::run_sweep(source, store, keys, jobs.unwrap_or_else(default_jobs)).await?;
    finish(report)
}

async fn ingest(
    settings: &Settings,
    flows_dir: &Path,
    grid: &GridArgs,
    overrides: &RunArgs,
) -> Result<()> {
    if !flows_dir.is_dir() {
        bail!("flow dump directory {} does not exist", flows_dir.display());
    }
    let run = settings.run_config(overrides)?;
    let source = FlowMonitorSource::new(flows_dir, run.duration_secs);

    let mut keys = Vec::new();
    for key in settings.grid(grid).keys()? {
        if source.dump_path(&key).is_file() {
            keys.push(key);
        } else {
            warn!(scenario = %key, "no flow dump, skipping");
        }
    }
    if keys.is_empty() {
        bail!("no flow dumps found in {}", flows_dir.display());
    }

    let store = Arc::new(settings.open_store()?);
    let report = runner::run_sweep(Arc::new(source), store, keys, default_jobs()).await?;
    finish(report)
}

fn finish(report: runner::SweepReport) -> Result<()> {
    info!(stored = report.written.len(), failed = report.failed.len(), "sweep finished");
    if !report.failed.is_empty() {
        for (key, reason) in &report.failed {
            eprintln!("{key}: {reason}");
        }
        bail!("{} of {} scenarios failed", report.failed.len(), report.total());
    }
    Ok(())
}

fn aggregate(
    settings: &Settings,
    csv: Option<&Path>,
    summary_path: Option<&Path>,
    markdown: Option<&Path>,
) -> Result<()> {
    let outcome = scan(&ResultStore::open(&settings.results_dir)?)?;
    let missing = outcome.missing(&settings.grid)?;
    if !missing.is_empty() {
        let names: Vec<_> = missing.iter().map(ScenarioKey::canonical_name).collect();
        warn!(count = missing.len(), scenarios = %names.join(", "), "scenarios without results");
    }
    info!(
        complete = outcome.complete_count,
        partial = outcome.partial_count(),
        missing = missing.len(),
        "aggregated results"
    );

    let summary = summarize(&outcome.table);
    if let Some(path) = csv {
        write_csv(&outcome.table, path)?;
        info!(path = %path.display(), "wrote csv table");
    }
    if let Some(path) = summary_path {
        write_json(&summary, path)?;
        info!(path = %path.display(), "wrote summary");
    }
    if let Some(path) = markdown {
        write_markdown(&summary, path)?;
        info!(path = %path.display(), "wrote markdown report");
    }
    if csv.is_none() && summary_path.is_none() && markdown.is_none() {
        print!("{}", render_markdown(&summary));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("wifi-lab").chain(argv.iter().copied()))
    }

    #[test]
    fn test_run_arguments_are_validated() {
        let args = parse(&["run", "--clients", "8", "--mobility", "mobile", "--traffic", "tcp"]).unwrap();
        match args.command {
            Command::Run {
                clients,
                mobility,
                traffic,
                ..
            } => {
                assert_eq!(clients, 8);
                assert_eq!(mobility, Mobility::Mobile);
                assert_eq!(traffic, TrafficMix::Tcp);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(parse(&["run", "--clients", "3", "--mobility", "static", "--traffic", "cbr"]).is_err());
        assert!(parse(&["run", "--clients", "1", "--mobility", "flying", "--traffic", "cbr"]).is_err());
        assert!(parse(&["run", "--clients", "1", "--mobility", "static", "--traffic", "udp"]).is_err());
    }

    #[test]
    fn test_grid_lists_accept_commas() {
        let args = parse(&["sweep", "--clients", "1,32", "--traffic", "mixed", "--jobs", "2"]).unwrap();
        let Command::Sweep { grid, jobs, .. } = args.command else {
            panic!("expected sweep");
        };
        assert_eq!(grid.clients, vec![1, 32]);
        assert_eq!(grid.traffic, vec![TrafficMix::Mixed]);
        assert!(grid.mobility.is_empty());
        assert_eq!(jobs, Some(2));
    }

    #[test]
    fn test_flags_override_lab_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("lab.toml");
        fs::write(
            &config,
            "results_dir = \"from-file\"\n[run]\nseed = 5\nduration_secs = 30.0\n[grid]\nclients = [1, 2]\n",
        )
        .unwrap();
        let config_arg = config.to_str().unwrap();

        let args = parse(&["--config", config_arg, "sweep", "--seed", "11"]).unwrap();
        let settings = Settings::resolve(&args).unwrap();
        assert_eq!(settings.results_dir, PathBuf::from("from-file"));
        let Command::Sweep { grid, run, .. } = &args.command else {
            panic!("expected sweep");
        };
        let run = settings.run_config(run).unwrap();
        assert_eq!(run.seed, 11);
        assert_eq!(run.duration_secs, 30.0);
        assert_eq!(settings.grid(grid).keys().unwrap().len(), 12);

        let args = parse(&["--config", config_arg, "--results-dir", "elsewhere", "list"]).unwrap();
        let settings = Settings::resolve(&args).unwrap();
        assert_eq!(settings.results_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_short_duration_fails_fast() {
        let args = parse(&["sweep", "--duration", "0.5"]).unwrap();
        let settings = Settings::resolve(&args).unwrap();
        let Command::Sweep { run, .. } = &args.command else {
            panic!("expected sweep");
        };
        assert!(settings.run_config(run).is_err());
    }

    #[tokio::test]
    async fn test_sweep_then_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let csv = dir.path().join("out/table.csv");
        let results_arg = results.to_str().unwrap();

        run(parse(&["--results-dir", results_arg, "sweep", "--clients", "1,32"]).unwrap())
            .await
            .unwrap();
        run(parse(&["--results-dir", results_arg, "aggregate", "--csv", csv.to_str().unwrap()]).unwrap())
            .await
            .unwrap();

        let table = fs::read_to_string(csv).unwrap();
        assert_eq!(table.lines().count(), 1 + 12);
    }

    #[tokio::test]
    async fn test_ingest_converts_flow_dumps() {
        let dir = tempfile::tempdir().unwrap();
        let flows = dir.path().join("flows");
        fs::create_dir_all(&flows).unwrap();
        fs::write(
            flows.join("c4_static_tcp.flows.json"),
            r#"{"flows":[{"flowId":1,"source":"10.1.1.2","destination":"10.1.2.1","protocol":6,
                "txPackets":50,"rxPackets":50,"rxBytes":75000,"delaySum":0.1,
                "timeFirstTxPacket":1.0,"timeLastRxPacket":11.0}]}"#,
        )
        .unwrap();
        let results = dir.path().join("results");

        run(parse(&[
            "--results-dir",
            results.to_str().unwrap(),
            "ingest",
            "--flows-dir",
            flows.to_str().unwrap(),
        ])
        .unwrap())
        .await
        .unwrap();

        let store = ResultStore::open(&results).unwrap();
        let key = ScenarioKey::new(4, Mobility::Static, TrafficMix::Tcp).unwrap();
        let parsed = store.read(&key).unwrap().unwrap();
        assert!(parsed.is_complete());
        assert_eq!(parsed.metrics.packets_sent, Some(50));
        assert_eq!(parsed.metrics.throughput_kbps, Some(60.0));
    }
}
