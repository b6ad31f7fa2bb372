//! Workload simulator for the prefetch advisor.
//!
//! Replays a seeded, probabilistic access pattern over an in-memory employee
//! graph and reports how many round-trips the learned prefetch paths save.

use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use prefetch_advisor::tracking::Association;
use prefetch_advisor::{
    AdvisorConfig, CounterMetrics, EntityRecord, ExtentManager, FetchPlan, Path, Property,
    PropertyRegistry, SiteKey, TrackedCollection, TrackedEntity,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "advisor-sim",
    version,
    about = "Replay a synthetic access workload against the prefetch advisor"
)]
struct Args {
    #[arg(long, value_name = "FILE", help = "TOML advisor configuration")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1_000, help = "Number of root loads to replay")]
    iterations: usize,

    #[arg(long, default_value_t = 7, help = "Seed for the workload generator")]
    seed: u64,

    #[arg(long, help = "Override the fetch threshold")]
    threshold: Option<f64>,

    #[arg(long, default_value_t = 3, help = "Subordinates per employee")]
    fanout: usize,

    #[arg(long, default_value_t = 0.8, help = "Probability of reading the supervisor")]
    p_supervisor: f64,

    #[arg(
        long,
        default_value_t = 0.6,
        help = "Probability of reading the supervisor's supervisor"
    )]
    p_chain: f64,

    #[arg(long, default_value_t = 0.5, help = "Probability of iterating subordinates")]
    p_subordinates: f64,

    #[arg(
        long,
        default_value_t = 0.1,
        help = "Probability of reading a subordinate's mentor"
    )]
    p_mentor: f64,

    #[arg(long, help = "Print the learned profile tree")]
    report: bool,
}

const GRAPH_DEPTH: usize = 3;
const ENTITY: &str = "Employee";

struct Workload {
    supervisor: f64,
    chain: f64,
    subordinates: f64,
    mentor: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    install_tracing_subscriber();
    let args = Args::parse();
    for (name, p) in [
        ("p-supervisor", args.p_supervisor),
        ("p-chain", args.p_chain),
        ("p-subordinates", args.p_subordinates),
        ("p-mentor", args.p_mentor),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(format!("--{name} must be within [0, 1], got {p}").into());
        }
    }

    let mut config = match &args.config {
        Some(path) => AdvisorConfig::load(path)?,
        None => AdvisorConfig::default(),
    }
    .apply_env_overrides()?;
    if let Some(threshold) = args.threshold {
        config.fetch_threshold = threshold;
    }

    let metrics = Arc::new(CounterMetrics::default());
    let manager = ExtentManager::with_config(config)?.with_metrics(metrics.clone());

    let registry = PropertyRegistry::new();
    let properties = registry.register(
        ENTITY,
        [
            Property::entity("supervisor"),
            Property::entity("mentor"),
            Property::collection("subordinates"),
        ],
    );

    let workload = Workload {
        supervisor: args.p_supervisor,
        chain: args.p_chain,
        subordinates: args.p_subordinates,
        mentor: args.p_mentor,
    };
    let site = SiteKey::new(ENTITY);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let half = args.iterations / 2;
    let (mut early, mut late) = (0usize, 0usize);

    for iteration in 0..args.iterations {
        let trips = replay(&manager, &site, &properties, args.fanout, &workload, &mut rng)?;
        if iteration < half {
            early += trips;
        } else {
            late += trips;
        }
    }
    info!(iterations = args.iterations, "advisor_sim.done");

    let paths = manager.prefetch_paths(&site);
    let plan = FetchPlan::build("entity", &paths)?;

    println!("site            {site}");
    println!("iterations      {}", args.iterations);
    println!("round-trips     first half {early} / second half {late}");
    println!("prefetch paths");
    for path in &paths {
        println!("  {path}");
    }
    println!("fetch plan      {plan}");
    println!("metrics         {:?}", metrics.snapshot());
    if args.report {
        println!();
        print!("{}", manager.report());
    }
    Ok(())
}

/// Loads one root, touches the graph per `workload` and returns the round-trips spent.
fn replay(
    manager: &ExtentManager,
    site: &SiteKey,
    properties: &Arc<[Property]>,
    fanout: usize,
    workload: &Workload,
    rng: &mut ChaCha8Rng,
) -> prefetch_advisor::Result<usize> {
    let prefetched: HashSet<Path> = manager.prefetch_paths(site).into_iter().collect();
    let mut trips = 1;
    let mut fetch = |path: &str| {
        if !prefetched.contains(&Path::from(path)) {
            trips += 1;
        }
    };

    let root = build_graph(properties, GRAPH_DEPTH, fanout)?;
    manager.record_root_access(root.as_ref(), site);
    manager.record_entity_access(root.as_ref());

    if rng.gen_bool(workload.supervisor) {
        if let Some(supervisor) = entity(root.as_ref(), "supervisor")? {
            fetch("supervisor");
            manager.record_entity_access(supervisor.as_ref());
            if rng.gen_bool(workload.chain) {
                if let Some(next) = entity(supervisor.as_ref(), "supervisor")? {
                    fetch("supervisor.supervisor");
                    manager.record_entity_access(next.as_ref());
                }
            }
        }
    }

    if rng.gen_bool(workload.subordinates) {
        if let Some(subordinates) = collection(root.as_ref(), "subordinates")? {
            fetch("subordinates");
            manager.record_collection_access(&subordinates);
            for element in subordinates.elements() {
                if !rng.gen_bool(workload.mentor) {
                    continue;
                }
                if let Some(mentor) = entity(element.as_ref(), "mentor")? {
                    fetch("subordinates.mentor");
                    manager.record_entity_access(mentor.as_ref());
                }
            }
        }
    }
    Ok(trips)
}

fn build_graph(
    properties: &Arc<[Property]>,
    depth: usize,
    fanout: usize,
) -> prefetch_advisor::Result<Arc<EntityRecord>> {
    let record = Arc::new(EntityRecord::new(ENTITY, Arc::clone(properties)));
    if depth == 0 {
        return Ok(record);
    }
    record.set_entity("supervisor", build_graph(properties, depth - 1, fanout)?)?;
    record.set_entity("mentor", build_graph(properties, depth - 1, fanout)?)?;
    let mut elements: Vec<Arc<dyn TrackedEntity>> = Vec::with_capacity(fanout);
    for _ in 0..fanout {
        elements.push(build_graph(properties, depth - 1, fanout)?);
    }
    record.set_collection("subordinates", Arc::new(TrackedCollection::new(elements)))?;
    Ok(record)
}

fn entity(
    owner: &dyn TrackedEntity,
    name: &str,
) -> prefetch_advisor::Result<Option<Arc<dyn TrackedEntity>>> {
    Ok(match owner.association(name)? {
        Some(Association::Entity(target)) => Some(target),
        _ => None,
    })
}

fn collection(
    owner: &dyn TrackedEntity,
    name: &str,
) -> prefetch_advisor::Result<Option<Arc<TrackedCollection>>> {
    Ok(match owner.association(name)? {
        Some(Association::Collection(target)) => Some(target),
        _ => None,
    })
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prefetch_advisor=info,advisor_sim=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
