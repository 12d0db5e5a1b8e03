//! Wavelength planning CLI
//!
//! Computes WDM routes over an inventory snapshot, ranks wavelength path
//! candidates for one or two transponder port pairs and prints them as JSON.
//!
//! Usage:
//!   plan-paths --inventory data/inventory.json \
//!              --link-models data/link_models.json \
//!              --pair tp-a/1,tp-b/1

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use optical_model::{ConnectPoint, FrequencyConverter, LinkModelCatalog, NetworkInventory, PortType};
use path_optimizer::{OptimizerConfig, PathOptimizer, ResourceRegistry};
use qot_estimator::{QotEstimator, QualityParameters};
use wavelength_store::{WavelengthPathStore, WdmPathStore};

#[derive(Parser, Debug)]
#[command(name = "plan-paths", about = "Rank wavelength path candidates over an optical inventory")]
struct Args {
    /// Inventory snapshot JSON (devices, ports, links)
    #[arg(short, long)]
    inventory: PathBuf,

    /// Physical link model catalog JSON
    #[arg(short, long)]
    link_models: PathBuf,

    /// Quality parameter overrides JSON; shipped defaults when omitted
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Transponder port pair as src-device/port,dst-device/port.
    /// Give twice for a protected pair.
    #[arg(long, required = true, num_args = 1..=2)]
    pair: Vec<String>,

    /// Routes searched per ROADM pair
    #[arg(short, long, default_value_t = 3)]
    k: usize,

    /// Frequency IDs offered on every line-side port
    #[arg(long, default_value_t = 96)]
    channels: i32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_point(text: &str) -> Result<ConnectPoint> {
    let (device, port) = text
        .rsplit_once('/')
        .with_context(|| format!("malformed connect point {text:?}, expected device/port"))?;
    Ok(ConnectPoint::of(
        device,
        port.parse()
            .with_context(|| format!("malformed port number in {text:?}"))?,
    ))
}

fn parse_pair(text: &str) -> Result<(ConnectPoint, ConnectPoint)> {
    let Some((src, dst)) = text.split_once(',') else {
        bail!("malformed pair {text:?}, expected src-point,dst-point");
    };
    Ok((parse_point(src)?, parse_point(dst)?))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let inventory = NetworkInventory::from_json_str(
        &fs::read_to_string(&args.inventory)
            .with_context(|| format!("reading {:?}", args.inventory))?,
    )?;
    let catalog = LinkModelCatalog::from_json_str(
        &fs::read_to_string(&args.link_models)
            .with_context(|| format!("reading {:?}", args.link_models))?,
    )?;
    let params = match &args.params {
        Some(path) => QualityParameters::from_file(path)?,
        None => QualityParameters::default(),
    };
    let pairs = args
        .pair
        .iter()
        .map(|p| parse_pair(p))
        .collect::<Result<Vec<_>>>()?;

    let config = OptimizerConfig {
        k: args.k,
        ..OptimizerConfig::default()
    };
    let converter = FrequencyConverter::new(config.lowest_frequency_thz());
    let resources = Arc::new(ResourceRegistry::new());

    // Every line-side port offers the full configured grid.
    let mut registered = 0usize;
    for link in inventory.links() {
        for point in [&link.src, &link.dst] {
            if matches!(
                inventory.port_type(point),
                Some(PortType::Oms) | Some(PortType::Fiber)
            ) {
                resources
                    .register_lambdas(point.clone(), (1..=args.channels).map(|id| converter.signal(id)));
                registered += 1;
            }
        }
    }
    info!(
        devices = inventory.device_count(),
        links = inventory.links().len(),
        line_ports = registered,
        "inventory loaded"
    );

    let optimizer = PathOptimizer::new(
        Arc::new(inventory),
        Arc::new(catalog),
        QotEstimator::new(params),
        Arc::new(WavelengthPathStore::new()),
        Arc::new(WdmPathStore::new()),
        resources,
        config,
    );

    let wdm_count = optimizer.calculate_wdm_paths(None, None)?;
    info!(wdm_count, "wdm calculation done");

    let candidates = optimizer.calculate_wavelength_paths(&pairs)?;
    info!(count = candidates.len(), "candidates ranked");
    for (i, candidate) in candidates.iter().enumerate() {
        let entry = candidate.main();
        info!(
            "  #{:<3} {} => {} | {}/{} | Q {:.2} dB (threshold {:.2}) | {} hops | {} wavelengths",
            i + 1,
            entry.ingress_edge.src,
            entry.egress_edge.dst,
            entry.rate,
            entry.mod_format,
            entry.q_value,
            entry.q_threshold,
            entry.route.links.len(),
            entry.signals.len(),
        );
    }

    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}
