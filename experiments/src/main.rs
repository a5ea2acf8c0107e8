use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_derive::Args;
use itertools::Itertools;
use medians::Medianf64;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Result as MedianResult, Value};
use experiments::*;
use median_aggregate::Strategy;
use order_statistic::PivotStrategy;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Bench {
        #[arg(short, long, value_enum)]
        workload: Vec<Workload>,

        #[command(flatten)]
        workload_args: WorkloadArgs,

        #[arg(long)]
        table: bool,
    },
    Profile {
        #[arg(short, long, value_enum)]
        workload: Workload,

        #[command(flatten)]
        workload_args: WorkloadArgs,

        #[arg(short, long, default_value = "/dev/null")]
        control: PathBuf,
    },
}

#[derive(Args, Debug)]
struct WorkloadArgs {
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    #[arg(short, long)]
    elements: usize,

    /// Number of aggregation groups. With one group the feed is aggregated on a single state.
    #[arg(short, long, default_value_t = 1)]
    groups: usize,

    #[arg(long)]
    #[clap(value_enum, default_value_t=ValueType::Int8)]
    value_type: ValueType,

    /// Zipf exponent for value skew. Values are uniform when absent.
    #[arg(long, value_parser = parse_exponent)]
    zipf: Option<f64>,

    /// Probability of a missing value.
    #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
    nulls: f64,

    /// Feed values in ascending order.
    #[arg(long)]
    sorted: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(short, long, default_value_t = 5)]
    iterations: usize,
}

#[derive(ValueEnum, Debug, Copy, Clone)]
#[clap(rename_all = "kebab_case")]
enum Workload {
    Heap,
    Sort,
    Quickselect,
    QuickselectRandom,
}

impl Workload {
    fn strategy(&self, seed: u64) -> Strategy {
        match self {
            Workload::Heap => Strategy::Heap,
            Workload::Sort => Strategy::Sort,
            Workload::Quickselect => Strategy::Quickselect(PivotStrategy::Last),
            Workload::QuickselectRandom => Strategy::Quickselect(PivotStrategy::Random { seed }),
        }
    }
}

#[derive(ValueEnum, Debug, Copy, Clone)]
enum ValueType {
    Int4,
    Int8,
    Float8,
    Text,
}

impl From<ValueType> for ValueKind {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Int4 => ValueKind::Int4,
            ValueType::Int8 => ValueKind::Int8,
            ValueType::Float8 => ValueKind::Float8,
            ValueType::Text => ValueKind::Text,
        }
    }
}

fn parse_probability(s: &str) -> std::result::Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{p} is not a probability"))
    }
}

fn parse_exponent(s: &str) -> std::result::Result<f64, String> {
    let exponent: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if exponent.is_finite() && exponent >= 0.0 {
        Ok(exponent)
    } else {
        Err(format!("{exponent} is not a non-negative exponent"))
    }
}

/// (step or initialization, aggregation, finish) seconds of one run.
type Breakdown = (f64, f64, f64);

type Feed = (Vec<usize>, Vec<Option<Value>>);

fn box_workload_closure(
    workload: Workload,
    seed: u64,
    threads: usize,
    groups: usize,
) -> Box<dyn Fn(&mut Feed) -> MedianResult<Breakdown>> {
    let strategy = workload.strategy(seed);
    if groups <= 1 {
        Box::new(move |tv: &mut Feed| {
            let (step, finish) = median_workload(strategy, &tv.1)?;
            Ok((0f64, step, finish))
        })
    } else {
        Box::new(move |tv: &mut Feed| grouped_workload(strategy, threads, groups, &tv.0, &tv.1))
    }
}

fn process_breakdown(breakdown: Vec<Breakdown>) -> (f64, f64, f64) {
    let mut init_times = Vec::new();
    let mut agg_times = Vec::new();
    let mut finish_times = Vec::new();

    breakdown.into_iter()
        .for_each(|(initialization, aggregation, finish)| {
            init_times.push(initialization);
            agg_times.push(aggregation);
            finish_times.push(finish);
        });

    (
        init_times.as_mut_slice().medf_unchecked(),
        agg_times.as_mut_slice().medf_unchecked(),
        finish_times.as_mut_slice().medf_unchecked(),
    )
}

fn dataset_spec(args: &WorkloadArgs) -> DatasetSpec {
    DatasetSpec {
        elements: args.elements,
        groups: args.groups,
        kind: args.value_type.into(),
        zipf: args.zipf,
        nulls: args.nulls,
        sorted: args.sorted,
        seed: args.seed,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Bench { workload, workload_args, table } => {
            let spec = dataset_spec(&workload_args);
            info!(elements = spec.elements, groups = spec.groups, "generating dataset");
            let mut tv = generate_dataset(&spec)?;

            for &w in workload.iter() {
                let closure = box_workload_closure(w, workload_args.seed, workload_args.threads, workload_args.groups);
                let (trials, mut mems, breakdown) = benchmark_harness(&mut tv, closure, workload_args.iterations)?;
                if trials.is_empty() {
                    continue;
                }
                let (init, agg, finish) = process_breakdown(breakdown);
                let memory = mems.as_mut_slice().medf_unchecked();

                if table {
                    print!(
                        "{:?},{},{},{},{:?},{},{},{},{:+e}",
                        w,
                        workload_args.threads,
                        workload_args.groups,
                        workload_args.elements,
                        workload_args.value_type,
                        workload_args.zipf.unwrap_or(0.0),
                        workload_args.nulls,
                        workload_args.sorted,
                        memory,
                    );
                    for trial in trials {
                        print!(",{:?}", trial);
                    }
                    print!(",{:+e},{:+e},{:+e}", init, agg, finish);
                    println!();
                } else {
                    println!("Workload: {:?}", w);
                    println!("Threads: {}", workload_args.threads);
                    println!("Groups: {}", workload_args.groups);
                    println!("Elements: {}", workload_args.elements);
                    println!("Value Type: {:?}", workload_args.value_type);
                    println!("Zipf: {}", workload_args.zipf.unwrap_or(0.0));
                    println!("Nulls: {}", workload_args.nulls);
                    println!("Sorted: {}", workload_args.sorted);
                    println!("Memory: {:+e}", memory);
                    println!("Trials: {}", trials.iter().map(|t| format!("{:+e}", t)).join(", "));
                    println!("Initialization: {:+e}", init);
                    println!("Aggregation: {:+e}", agg);
                    println!("Finish: {:+e}", finish);
                }
            }
        },
        Commands::Profile { workload, workload_args, control } => {
            let spec = dataset_spec(&workload_args);
            let closure = box_workload_closure(workload, workload_args.seed, workload_args.threads, workload_args.groups);
            let elapsed = profile_harness(
                &control.to_string_lossy(),
                || generate_dataset(&spec),
                closure,
                workload_args.iterations,
            )?;

            println!("Elapsed time: {:+e}", elapsed);
        },
    }

    Ok(())
}
