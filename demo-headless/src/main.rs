use clap::{Parser, ValueEnum};
use plume_core::{
    AtmosphericConditions, CancellationToken, DispersionCalculator, DispersionConfig,
    DispersionMode, EmissionSource, GridResolution, PassKind, Progress, StabilityClass,
    ISOPLETH_LADDER,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Grid resolution presets accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
enum ResolutionArg {
    Fine,
    Standard,
    Coarse,
}

impl From<ResolutionArg> for GridResolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Fine => GridResolution::Fine,
            ResolutionArg::Standard => GridResolution::Standard,
            ResolutionArg::Coarse => GridResolution::Coarse,
        }
    }
}

/// Plume dispersion demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "plume-demo")]
#[command(about = "Gaussian plume dispersion demo", long_about = None)]
struct Args {
    /// Wind speed in m/s
    #[arg(short, long, default_value_t = 2.4)]
    wind_speed: f64,

    /// Direction the wind blows FROM in degrees (0=North, 90=East)
    #[arg(long, default_value_t = 180.0)]
    wind_direction: f64,

    /// Pasquill-Gifford stability class (A-F)
    #[arg(short = 'c', long, default_value = "D")]
    stability: String,

    /// Use the radially symmetric footprint instead of the wind-shaped one
    #[arg(long)]
    isotropic: bool,

    /// Grid resolution preset
    #[arg(short = 'r', long, value_enum, default_value_t = ResolutionArg::Standard)]
    resolution: ResolutionArg,

    /// Override the grid step in meters
    #[arg(long)]
    grid_step: Option<f64>,

    /// Visualization threshold as a fraction of the reference limit
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Maximum number of merged field points
    #[arg(short, long)]
    budget: Option<usize>,

    /// JSON file with a full configuration (overrides the presets)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file with an array of emission sources
    #[arg(short, long)]
    sources: Option<PathBuf>,

    /// Generate this many random sources instead of the built-in set
    #[arg(long)]
    random: Option<u32>,

    /// Seed for --random
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the full report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Run validation checks
    #[arg(short, long)]
    validate: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    let sources = match load_sources(&args) {
        Ok(sources) => sources,
        Err(e) => {
            error!("Could not load sources: {e}");
            std::process::exit(2);
        }
    };

    info!(
        "Loaded {} sources, grid step {} m",
        sources.len(),
        config.grid_step_m
    );

    let mode = if args.isotropic {
        DispersionMode::Isotropic
    } else {
        DispersionMode::Anisotropic
    };
    let conditions = AtmosphericConditions::new(
        args.wind_speed,
        args.wind_direction,
        StabilityClass::from_code(&args.stability),
    )
    .with_mode(mode);

    let calculator = DispersionCalculator::new(config);
    let quiet = args.json;
    let progress = |p: Progress| {
        if !quiet {
            let pass = match p.kind {
                PassKind::Field => "field",
                PassKind::Isopleths => "isopleths",
            };
            eprint!("\r  {pass:9} {:3}%", p.percent());
            if p.completed_sources == p.total_sources {
                eprintln!();
            }
        }
    };

    let report = match calculator.calculate(&sources, &conditions, &progress, &CancellationToken::new()) {
        Ok(report) => report,
        Err(e) => {
            error!("Calculation failed: {e}");
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Could not serialize report: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("=== Plume Dispersion Demo ===\n");
    println!(
        "Wind: {} from {} ({}), class {}, {:?} footprint",
        conditions.wind_speed,
        conditions.wind_direction,
        conditions.compass_point().abbreviation(),
        conditions.stability_class,
        conditions.dispersion_mode
    );
    println!(
        "Grid: {:.0} m step, threshold {:.4} of limit, budget {} points\n",
        calculator.config().grid_step_m,
        calculator.config().visualization_threshold,
        calculator.config().max_total_points
    );

    let summary = &report.summary;
    println!("Sources: {}", summary.source_count);
    println!("Total emission: {}", summary.total_emission);
    println!("Average emission: {}", summary.average_emission);
    println!("Max concentration: {}", summary.max_concentration);
    println!("Max % of limit: {}", summary.max_percent_of_limit);
    println!("Status: {}", summary.status);
    if let Some(factor) = summary.exceedance_factor() {
        println!("Limit exceeded {factor:.1}x");
    }

    println!("\nField: {} points ({} generated)", report.field.len(), report.field.generated_points);
    if report.field.truncated {
        println!("  Point budget reached, field truncated");
    }

    println!("\nId    | Name                 | Peak distance | Peak concentration");
    println!("------|----------------------|---------------|-------------------");
    for peak in &summary.peaks {
        match &peak.peak {
            Some(p) => println!(
                "{:5} | {:20} | {:>13} | {}",
                peak.source_id, peak.name, p.distance.to_string(), p.concentration
            ),
            None => println!("{:5} | {:20} | {:>13} | -", peak.source_id, peak.name, "-"),
        }
    }

    println!("\nIsopleths:");
    for level in &ISOPLETH_LADDER {
        let count = report
            .isopleths
            .iter()
            .filter(|p| (p.level - level.fraction).abs() < f64::EPSILON)
            .count();
        let reach = report
            .isopleths
            .iter()
            .filter(|p| (p.level - level.fraction).abs() < f64::EPSILON)
            .map(|p| *p.tip_distance)
            .fold(0.0_f64, f64::max);
        println!(
            "  {:3.0}% {} : {} polygon(s), farthest reach {:.0} m",
            level.fraction * 100.0,
            level.color,
            count,
            reach
        );
    }

    if args.validate {
        run_validation_checks();
    }
}

fn build_config(args: &Args) -> Result<DispersionConfig, String> {
    let mut config = if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?
    } else {
        DispersionConfig::with_resolution(args.resolution.into())
    };

    if let Some(step) = args.grid_step {
        config.grid_step_m = step;
    }
    if let Some(threshold) = args.threshold {
        config.visualization_threshold = threshold;
    }
    if let Some(budget) = args.budget {
        config.max_total_points = budget;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn load_sources(args: &Args) -> Result<Vec<EmissionSource>, String> {
    if let Some(path) = &args.sources {
        let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        return serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()));
    }

    if let Some(count) = args.random {
        let mut rng = StdRng::seed_from_u64(args.seed);
        return Ok((1..=count)
            .map(|id| {
                EmissionSource::new(
                    id,
                    55.70 + rng.random_range(0.0..0.12),
                    37.50 + rng.random_range(0.0..0.20),
                    rng.random_range(15.0..120.0),
                    rng.random_range(0.5..8.0),
                )
            })
            .collect());
    }

    Ok(vec![
        EmissionSource::new(1, 55.7558, 37.6173, 40.0, 3.7).named("Boiler house No. 1"),
        EmissionSource::new(2, 55.7600, 37.6250, 35.0, 2.5).named("Boiler house No. 2"),
        EmissionSource::new(3, 55.7500, 37.6100, 45.0, 4.2).named("Boiler house No. 3"),
    ])
}

fn run_validation_checks() {
    println!("\n=== Running Validation Checks ===\n");
    let calculator = DispersionCalculator::new(DispersionConfig::with_resolution(GridResolution::Coarse));
    let stack = EmissionSource::new(1, 55.7558, 37.6173, 40.0, 10.0);

    // Check 1: the footprint leans downwind
    println!("Check 1: Wind Directionality");
    let westerly = AtmosphericConditions::new(3.0, 270.0, StabilityClass::D);
    match calculator.calculate_field(std::slice::from_ref(&stack), &westerly) {
        Ok(field) => {
            let load = |east: bool| -> f64 {
                field
                    .points
                    .iter()
                    .filter(|p| (p.position.lng > stack.position.lng) == east)
                    .map(|p| *p.concentration)
                    .sum()
            };
            let (east, west) = (load(true), load(false));
            println!("  East load: {east:.3e}, west load: {west:.3e}");
            if east > west {
                println!("  PASS: plume travels downwind");
            } else {
                println!("  FAIL: expected more load east of the stack");
            }
        }
        Err(e) => println!("  FAIL: {e}"),
    }

    // Check 2: unstable air brings the peak closer
    println!("\nCheck 2: Stability Ordering");
    let peak_distance = |class: StabilityClass| {
        let conditions = AtmosphericConditions::new(3.0, 270.0, class);
        let summary = calculator.summarize(
            std::slice::from_ref(&stack),
            &conditions,
            &plume_core::ConcentrationField::empty(),
        );
        summary
            .peaks
            .first()
            .and_then(|p| p.peak)
            .map_or(f64::NAN, |p| *p.distance)
    };
    let (unstable, stable) = (peak_distance(StabilityClass::A), peak_distance(StabilityClass::F));
    println!("  Class A peak at {unstable:.0} m, class F peak at {stable:.0} m");
    if unstable < stable {
        println!("  PASS: unstable air mixes to ground sooner");
    } else {
        println!("  FAIL: expected class A peak nearer the stack");
    }

    // Check 3: contour nesting
    println!("\nCheck 3: Isopleth Nesting");
    match calculator.calculate_isopleths(std::slice::from_ref(&stack), &westerly) {
        Ok(polygons) => {
            let nested = polygons
                .windows(2)
                .all(|w| w[1].tip_distance <= w[0].tip_distance);
            println!("  {} polygons traced", polygons.len());
            if nested {
                println!("  PASS: higher levels reach no farther than lower ones");
            } else {
                println!("  FAIL: a higher level outreaches a lower one");
            }
        }
        Err(e) => println!("  FAIL: {e}"),
    }

    println!("\n=== Validation Complete ===");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resolution_is_rejected() {
        assert!(Args::try_parse_from(["plume-demo", "--json", "--resolution", "bogus"]).is_err());
    }

    #[test]
    fn test_resolution_preset_reaches_config() {
        let args = Args::try_parse_from(["plume-demo", "--resolution", "coarse"]).unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.grid_step_m, GridResolution::Coarse.grid_step());
    }
}
