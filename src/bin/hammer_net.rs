use anyhow::{bail, Context};
use clap::Parser;
use hammernet::core::{run_survey, RingSectorAverager};
use hammernet::io::{DemDirectory, DemReader, DemSource, GeoPackageSink, OgrStationReader};
use hammernet::{RingSpec, SurveyConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Hammer-zone terrain correction sampling")]
struct Args {
    /// Station point layer (any OGR vector format)
    #[arg(long)]
    stations: PathBuf,
    /// Layer inside the station dataset; first layer when omitted
    #[arg(long)]
    layer: Option<String>,
    /// DEM raster, repeat for several layers in priority order
    #[arg(long = "dem")]
    dems: Vec<PathBuf>,
    /// Directory whose rasters are all used as DEM layers
    #[arg(long, conflicts_with = "dems")]
    dem_dir: Option<PathBuf>,
    /// Load rings and strategies from a YAML survey config
    #[arg(long)]
    config: Option<PathBuf>,
    /// Inner radius of a single ring in meters
    #[arg(long, requires_all = ["outer", "compartments"])]
    inner: Option<f64>,
    /// Outer radius of a single ring in meters
    #[arg(long, requires_all = ["inner", "compartments"])]
    outer: Option<f64>,
    /// Number of compartments of a single ring
    #[arg(long, requires_all = ["inner", "outer"])]
    compartments: Option<usize>,
    /// Output GeoPackage with one polygon layer per ring
    #[arg(long)]
    output: PathBuf,
    /// Also export the station attribute table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SurveyConfig::load(path)
            .with_context(|| format!("loading survey config {}", path.display()))?,
        None => SurveyConfig::default(),
    };
    if let (Some(inner), Some(outer), Some(n)) = (args.inner, args.outer, args.compartments) {
        config.hammer.rings = vec![RingSpec::new(inner, outer, n)?];
    }
    if let Some(layer) = &args.layer {
        config.station_layer = Some(layer.clone());
    }

    let stations = OgrStationReader::from_config(&args.stations, &config);
    let dems: Box<dyn DemSource> = match (&args.dem_dir, args.dems.is_empty()) {
        (Some(dir), _) => Box::new(DemDirectory::new(dir)),
        (None, false) => Box::new(DemReader::new(args.dems.clone())),
        (None, true) => bail!("no DEM given: use --dem <file> or --dem-dir <dir>"),
    };

    let averager = RingSectorAverager::new(config.hammer.clone()).context("invalid ring parameters")?;
    let mut sink = GeoPackageSink::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    if let Some(csv) = &args.csv {
        sink = sink.with_csv(csv);
    }

    let summary = run_survey(&stations, dems.as_ref(), &averager, &mut sink)
        .with_context(|| format!("processing stations from {}", args.stations.display()))?;

    println!(
        "Processed {} stations over {} rings -> {} sectors ({} without DEM pixels, {} null)",
        summary.stations, summary.rings, summary.records, summary.empty_sectors, summary.null_results
    );
    Ok(())
}
