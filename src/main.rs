use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mulbench_sim::multiplier::RESULT;
use mulbench_sim::{
    Fault, FaultInjector, FaultType, IterativeMultiplier, SimulationConfig, SimulationRuntime,
    Waveform,
};
use mulbench_testing::{
    DirectedStimulus, MultiplierVerifier, RandomStimulus, StimulusSource, Testbench,
    VerifierConfig, VerifyError, DEFAULT_ITERATIONS,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// mulbench - handshake testbench for an iterative 64x64 multiplier
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the randomized verification
    Run {
        /// Number of random operand pairs to check
        #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,

        /// Seed for the stimulus generator (random if omitted)
        #[arg(short, long, env = "MULBENCH_SEED")]
        seed: Option<u64>,

        /// Use the directed boundary vectors instead of random operands
        #[arg(long)]
        directed: bool,

        #[command(flatten)]
        bench: BenchArgs,
    },

    /// Run only the directed boundary vectors
    Boundary {
        #[command(flatten)]
        bench: BenchArgs,
    },
}

#[derive(Args)]
struct BenchArgs {
    /// Multiplier bits consumed per clock cycle by the model
    #[arg(long, default_value_t = 1)]
    stride: u32,

    /// Fail if v_o is not asserted within this many cycles (waits forever if omitted)
    #[arg(long)]
    max_wait_cycles: Option<u64>,

    /// Wall-clock limit for the whole run in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Corrupt result_o by adding this offset (negative testing)
    #[arg(long)]
    inject_offset: Option<u128>,

    /// Write a VCD waveform of the run
    #[arg(long)]
    vcd: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Run {
            iterations,
            seed,
            directed,
            bench,
        } => {
            if directed && seed.is_some() {
                warn!("--seed has no effect with --directed");
            }
            let source: Box<dyn StimulusSource> = match (directed, seed) {
                (true, _) => Box::new(DirectedStimulus::boundary_cases()),
                (false, Some(seed)) => Box::new(RandomStimulus::from_seed(seed)),
                (false, None) => Box::new(RandomStimulus::from_entropy()),
            };
            runtime.block_on(run_bench(source, iterations, &bench))
        }

        Commands::Boundary { bench } => {
            let boundary = DirectedStimulus::boundary_cases();
            let iterations = boundary.len();
            let source: Box<dyn StimulusSource> = Box::new(boundary);
            runtime.block_on(run_bench(source, iterations, &bench))
        }
    }
}

fn build_dut(bench: &BenchArgs) -> Result<Box<dyn SimulationRuntime>> {
    let model = IterativeMultiplier::with_stride(bench.stride)?;
    info!(
        stride = model.stride(),
        latency = model.latency(),
        "multiplier model"
    );

    Ok(match bench.inject_offset {
        Some(offset) => {
            let fault = Fault::new(RESULT, FaultType::AddOffset(offset));
            Box::new(FaultInjector::new(model).with_fault(fault))
        }
        None => Box::new(model),
    })
}

async fn run_bench(
    source: Box<dyn StimulusSource>,
    iterations: usize,
    bench: &BenchArgs,
) -> Result<()> {
    let sim_config = SimulationConfig {
        capture_trace: bench.vcd.is_some(),
        ..Default::default()
    };
    let tb = Testbench::with_config(build_dut(bench)?, sim_config).await?;

    let config = VerifierConfig::default()
        .with_iterations(iterations)
        .with_max_wait_cycles(bench.max_wait_cycles);
    let mut verifier = MultiplierVerifier::new(tb, source, config);

    let outcome = match bench.timeout_ms {
        Some(ms) => verifier.run_with_timeout(Duration::from_millis(ms)).await,
        None => verifier.run().await,
    };

    if let Some(path) = &bench.vcd {
        let sim = verifier.testbench().simulator();
        let waveform = Waveform::from_simulation_states(
            sim.runtime_name(),
            sim.history(),
            &sim.signal_widths(),
        );
        waveform
            .export_vcd(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Waveform exported to {}", path.display());
        waveform.print_summary();
    }

    match outcome {
        Ok(report) => {
            println!("{report}");
            Ok(())
        }
        Err(VerifyError::ResultMismatch(report)) => {
            eprintln!("{report}");
            anyhow::bail!("verification failed at iteration {}", report.iteration)
        }
        Err(e) => Err(e.into()),
    }
}
