use std::{fs, thread};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use itertools::Itertools;
use peak_alloc::PeakAlloc;
use rand::prelude::*;
use rand_distr::{Uniform, Zipf};
use rayon::prelude::*;
use thiserror::Error as ThisError;
use tracing::{debug, info};

use common::{BuiltinCatalog, MedianError, Result as MedianResult, Value};
use median_aggregate::{AccumulatorState, MedianAggregate, MedianUpdater, Strategy, Updater};

const CHUNK_SIZE: usize = 1 << 16;
const TIMEOUT: f64 = 600f64;
const MAX_VALUE: i64 = 10_000;

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

#[derive(Debug, ThisError)]
pub enum ExperimentError {
    #[error(transparent)]
    Median(#[from] MedianError),

    #[error("invalid dataset parameters: {0}")]
    Dataset(String),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Int4,
    Int8,
    Float8,
    Text,
}

impl ValueKind {
    /// Order-preserving mapping from a raw integer into the value type.
    pub fn make(&self, raw: i64) -> Value {
        match self {
            ValueKind::Int4 => Value::int4(raw as i32),
            ValueKind::Int8 => Value::int8(raw),
            ValueKind::Float8 => Value::float8(raw as f64 / 100.0),
            ValueKind::Text => Value::text(&format!("{:08}", raw)),
        }
    }
}

pub struct DatasetSpec {
    pub elements: usize,
    pub groups: usize,
    pub kind: ValueKind,
    pub zipf: Option<f64>,
    pub nulls: f64,
    pub sorted: bool,
    pub seed: u64,
}

/// Returns group tickets and the value feed. Missing values appear with probability `nulls`.
pub fn generate_dataset(spec: &DatasetSpec) -> Result<(Vec<usize>, Vec<Option<Value>>)> {
    if !(0.0..=1.0).contains(&spec.nulls) {
        return Err(ExperimentError::Dataset(format!("{} is not a probability", spec.nulls)));
    }
    let ticket_distr = Uniform::new(0, spec.groups.max(1)).map_err(|err| ExperimentError::Dataset(err.to_string()))?;
    let value_distr = Uniform::new(0, MAX_VALUE).map_err(|err| ExperimentError::Dataset(err.to_string()))?;
    let zipf_distr = spec
        .zipf
        .map(|s| Zipf::new(MAX_VALUE as f64, s))
        .transpose()
        .map_err(|err| ExperimentError::Dataset(err.to_string()))?;

    let mut tickets = vec![0usize; spec.elements];
    let mut raw: Vec<Option<i64>> = vec![None; spec.elements];

    tickets.par_chunks_mut(CHUNK_SIZE)
        .zip(raw.par_chunks_mut(CHUNK_SIZE))
        .enumerate()
        .for_each(|(chunk_num, (tickets, raw))| {
            let mut rng = SmallRng::seed_from_u64(spec.seed.wrapping_add(chunk_num as u64));
            tickets.iter_mut().for_each(|t| *t = ticket_distr.sample(&mut rng));

            raw.iter_mut().for_each(|v| {
                let sample = match &zipf_distr {
                    Some(zipf) => zipf.sample(&mut rng) as i64 - 1,
                    None => value_distr.sample(&mut rng),
                };
                *v = (!rng.random_bool(spec.nulls)).then_some(sample);
            });
        });

    if spec.sorted {
        raw.par_sort_unstable();
    }

    let values = raw.into_par_iter()
        .map(|v| v.map(|raw| spec.kind.make(raw)))
        .collect();
    Ok((tickets, values))
}

/// Whole feed into a single group. Returns (step, finish) seconds.
pub fn median_workload(strategy: Strategy, values: &[Option<Value>]) -> MedianResult<(f64, f64)> {
    let aggregate = MedianAggregate::new(BuiltinCatalog::new(), strategy);
    let mut state = AccumulatorState::default();

    let time = Instant::now();
    aggregate.step_all(&mut state, values.iter().cloned())?;
    let step_time = time.elapsed().as_secs_f64();

    let time = Instant::now();
    let median = aggregate.finish(state)?;
    let finish_time = time.elapsed().as_secs_f64();
    debug!(?median, "single group median");

    Ok((step_time, finish_time))
}

/// Feed split across groups by ticket and stepped from `threads` workers. Returns
/// (initialization, aggregation, finish) seconds.
pub fn grouped_workload(
    strategy: Strategy,
    threads: usize,
    groups: usize,
    tickets: &[usize],
    values: &[Option<Value>],
) -> MedianResult<(f64, f64, f64)> {
    let tasks = RwLock::new(
        tickets.chunks(CHUNK_SIZE)
            .zip(values.chunks(CHUNK_SIZE))
    );

    let time = Instant::now();
    let aggregate = MedianAggregate::new(BuiltinCatalog::new(), strategy);
    let updater = MedianUpdater::with_capacity_and_threads(aggregate, groups.max(1), threads);
    let init_time = time.elapsed().as_secs_f64();

    let time = Instant::now();
    thread::scope(|s| {
        (0..threads)
            .map(|_| s.spawn(|| -> MedianResult<()> {
                loop {
                    let task = tasks.write().map_err(|_g| MedianError::Poisoned)?.next();
                    match task {
                        Some((t, v)) => updater.update_vec(t, v)?,
                        None => break,
                    }
                }
                Ok(())
            }))
            .collect_vec() // Force iterator evaluation.
            .into_iter()
            .try_for_each(|jh| jh.join().map_err(|_e| MedianError::Poisoned)?)
    })?;
    let agg_time = time.elapsed().as_secs_f64();

    let time = Instant::now();
    let medians = updater.into_vec()?;
    let finish_time = time.elapsed().as_secs_f64();
    debug!(groups = medians.len(), present = medians.iter().flatten().count(), "grouped medians");

    Ok((init_time, agg_time, finish_time))
}

pub fn benchmark_harness<I, O, W>(input: &mut I, workload: W, iterations: usize) -> Result<(Vec<f64>, Vec<f64>, Vec<O>)>
where W: Fn(&mut I) -> MedianResult<O>,
{
    let mut times: Vec<f64> = Vec::with_capacity(iterations);
    let mut mems = Vec::with_capacity(iterations);
    let mut outputs = Vec::new();
    let timeout = Instant::now();

    // Warmup.
    for _ in 0..iterations.div_ceil(4) {
        workload(input)?;
        thread::sleep(Duration::from_millis(100));

        if timeout.elapsed().as_secs_f64() > TIMEOUT / 4f64 {
            break;
        }
    }

    // Workload.
    let timeout = Instant::now();
    for i in 0..iterations {
        let init_mem = PEAK_ALLOC.current_usage_as_gb() as f64;
        let time = Instant::now();
        let o = workload(input)?;
        times.push(time.elapsed().as_secs_f64());
        outputs.push(o);
        mems.push(PEAK_ALLOC.peak_usage_as_gb() as f64 - init_mem);
        PEAK_ALLOC.reset_peak_usage();
        if timeout.elapsed().as_secs_f64() > TIMEOUT {
            info!(completed = i + 1, "benchmark timed out");
            break;
        }
    }

    Ok((times, mems, outputs))
}

/// Runs the workload between "enable"/"disable" writes to a profiler control pipe.
pub fn profile_harness<I, O, S, W>(control: &str, setup: S, workload: W, iterations: usize) -> Result<f64>
where S: Fn() -> Result<I>,
      W: Fn(&mut I) -> MedianResult<O>,
{
    let signal = |msg: &str| {
        if let Err(err) = fs::write(control, msg.as_bytes()) {
            debug!(%err, control, "could not write profiler control");
        }
    };

    signal("disable");
    let mut input: I = setup()?;
    let timeout = Instant::now();

    // Warmup.
    for _ in 0..iterations.div_ceil(4) {
        workload(&mut input)?;
        if timeout.elapsed().as_secs_f64() > TIMEOUT / 4f64 {
            break;
        }
    }

    let time = Instant::now();
    signal("enable");
    for _ in 0..iterations {
        workload(&mut input)?;
        if time.elapsed().as_secs_f64() > TIMEOUT {
            break;
        }
    }
    signal("disable");

    Ok(time.elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use order_statistic::PivotStrategy;

    use super::*;

    fn spec(sorted: bool) -> DatasetSpec {
        DatasetSpec { elements: 2_000, groups: 8, kind: ValueKind::Int8, zipf: None, nulls: 0.1, sorted, seed: 1 }
    }

    #[test]
    fn dataset_shape() {
        let (tickets, values) = generate_dataset(&spec(false)).unwrap();
        assert_eq!(tickets.len(), 2_000);
        assert_eq!(values.len(), 2_000);
        assert!(tickets.iter().all(|t| *t < 8));
        assert!(values.iter().any(|v| v.is_none()));
    }

    #[test]
    fn sorted_dataset_is_sorted() {
        let (_tickets, values) = generate_dataset(&spec(true)).unwrap();
        let present = values.iter().flatten().map(|v| v.datum.as_int().unwrap()).collect_vec();
        assert!(present.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn workloads_run() {
        let (tickets, values) = generate_dataset(&spec(false)).unwrap();
        for strategy in [Strategy::Heap, Strategy::Sort, Strategy::Quickselect(PivotStrategy::Last)] {
            median_workload(strategy, &values).unwrap();
            grouped_workload(strategy, 2, 8, &tickets, &values).unwrap();
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let negative_zipf = DatasetSpec { zipf: Some(-1.0), ..spec(false) };
        assert!(matches!(generate_dataset(&negative_zipf), Err(ExperimentError::Dataset(_))));

        let bad_nulls = DatasetSpec { nulls: 1.5, ..spec(false) };
        assert!(matches!(generate_dataset(&bad_nulls), Err(ExperimentError::Dataset(_))));

        let skewed = DatasetSpec { zipf: Some(1.1), ..spec(false) };
        let (_tickets, values) = generate_dataset(&skewed).unwrap();
        assert!(values.iter().flatten().all(|v| (0..MAX_VALUE).contains(&v.datum.as_int().unwrap())));
    }

    #[test]
    fn text_kind_preserves_order() {
        let a = ValueKind::Text.make(42);
        let b = ValueKind::Text.make(1_000);
        assert!(a.datum.as_text() < b.datum.as_text());
    }
}
