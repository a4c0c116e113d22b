use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use u_jobshop::encoding::Encoding;
use u_jobshop::models::ProblemInstance;
use u_jobshop::orchestrator::Orchestrator;
use u_jobshop::solver::{CpAdapter, MilpAdapter, MilpEngine, SolverAdapter};
use u_jobshop::{JsspError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EncodingArg {
    Interval,
    BigM,
    TimeIndexed,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Interval => Encoding::Interval,
            EncodingArg::BigM => Encoding::BigMDisjunctive,
            EncodingArg::TimeIndexed => Encoding::TimeIndexed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Microlp,
    Pumpkin,
    #[cfg(feature = "highs")]
    Highs,
    #[cfg(feature = "coin_cbc")]
    CoinCbc,
}

impl BackendArg {
    fn adapter(self, timeout: Option<Duration>) -> Arc<dyn SolverAdapter> {
        match self {
            BackendArg::Microlp => Arc::new(MilpAdapter::new(MilpEngine::MicroLp)),
            BackendArg::Pumpkin => {
                // Stop the search before the pair times out so the incumbent is reported.
                let adapter = CpAdapter::new();
                Arc::new(match timeout {
                    Some(limit) => adapter.with_time_limit(limit - limit / 10),
                    None => adapter,
                })
            }
            #[cfg(feature = "highs")]
            BackendArg::Highs => Arc::new(MilpAdapter::new(MilpEngine::Highs)),
            #[cfg(feature = "coin_cbc")]
            BackendArg::CoinCbc => Arc::new(MilpAdapter::new(MilpEngine::CoinCbc)),
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON instance file. Without it (and without --random-jobs) the
    /// built-in three-job instance is solved.
    instance_path: Option<PathBuf>,

    /// Generate a random instance with this many jobs
    #[arg(long = "random-jobs")]
    random_jobs: Option<usize>,

    /// Machines of the random instance
    #[arg(long = "random-machines", default_value_t = 3)]
    random_machines: usize,

    /// Largest task duration of the random instance
    #[arg(long = "max-duration", default_value_t = 9)]
    max_duration: i64,

    /// Seed of the random instance
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Overrides the derived horizon
    #[arg(long)]
    horizon: Option<i64>,

    /// Encodings to run; all of them when omitted
    #[arg(short = 'e', long = "encoding", value_enum)]
    encodings: Vec<EncodingArg>,

    /// Engines to run; microlp and pumpkin when omitted
    #[arg(short = 'b', long = "backend", value_enum)]
    backends: Vec<BackendArg>,

    /// Per-pair solve timeout in seconds
    #[arg(short = 't', long = "timeout")]
    timeout: Option<u64>,

    /// Print reports as JSON summaries instead of text blocks
    #[arg(long)]
    json: bool,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn load_instance(args: &Args) -> Result<ProblemInstance> {
    let instance = match (&args.instance_path, args.random_jobs) {
        (Some(path), _) => ProblemInstance::load(path)?,
        (None, Some(jobs)) => {
            let mut rng = SmallRng::seed_from_u64(args.seed);
            ProblemInstance::random(jobs, args.random_machines, args.max_duration, &mut rng)
        }
        (None, None) => ProblemInstance::three_job_example(),
    };
    Ok(match args.horizon {
        Some(horizon) => instance.with_horizon(horizon),
        None => instance,
    })
}

fn run() -> Result<()> {
    let args = Args::parse();

    let level_filter = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level_filter)
        .target(env_logger::Target::Stderr)
        .init();

    let instance = load_instance(&args)?;
    info!(
        "instance: {} jobs, {} machines, horizon {:?}",
        instance.num_jobs(),
        instance.num_machines(),
        instance.horizon().ok()
    );

    let encodings: Vec<Encoding> = if args.encodings.is_empty() {
        Encoding::ALL.to_vec()
    } else {
        args.encodings.iter().copied().map(Encoding::from).collect()
    };
    let backends = if args.backends.is_empty() {
        vec![BackendArg::Microlp, BackendArg::Pumpkin]
    } else {
        args.backends.clone()
    };
    let timeout = args.timeout.map(Duration::from_secs);

    let mut builder = Orchestrator::builder();
    for backend in backends {
        builder = builder.add_encodings(encodings.iter().copied(), backend.adapter(timeout));
    }
    if let Some(timeout) = timeout {
        builder = builder.with_timeout(timeout);
    }
    let orchestrator = builder.build();

    if args.json {
        let reports = orchestrator.run(&instance);
        let summaries: Vec<_> = reports.iter().map(|r| r.summary()).collect();
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &summaries)
            .map_err(|e| JsspError::Io(e.into()))?;
        writeln!(stdout)?;
    } else {
        orchestrator.run_with_sink(&instance, std::io::stdout());
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Execution failed ({}): {e}", e.kind());
        std::process::exit(1);
    }
}
