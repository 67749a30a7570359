//! sunraster CLI - per-pixel solar geometry over DEMs and regions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_types::Point;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sunraster_algorithms::solar::{
    compute_solar_position, compute_surface_position, probe, IlluminationSeries,
    SolarPositionParams, SunHoursParams, SurfaceParams, TimeFields, TimeSeries, TimeZoneGrid,
    DEFAULT_ZONE_PROPERTY,
};
use sunraster_algorithms::terrain::{
    aspect, hillshade, hillshadow, slope, AspectOutput, AspectParams, CellSpacing,
    HillshadeParams, HillshadowParams, SlopeParams, SlopeUnits,
};
use sunraster_core::io::{read_geotiff, write_geotiff};
use sunraster_core::{Raster, RasterElement, Region};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sunraster")]
#[command(author, version, about = "Per-pixel solar position, solar-surface angles and sun hours", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where per-pixel UTC offsets come from
#[derive(clap::Args)]
struct ZoneArgs {
    /// GeoJSON polygon layer of time zones (nautical 15° zones if omitted)
    #[arg(long)]
    zones: Option<PathBuf>,
    /// Attribute holding the UTC offset in hours
    #[arg(long, default_value = DEFAULT_ZONE_PROPERTY)]
    zone_property: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Solar position bands over a region
    Position {
        /// UTC timestamp, YYYY-MM-DDTHH:MM:SS
        #[arg(short, long)]
        time: String,
        /// Region as min_lon,min_lat,max_lon,max_lat (global if omitted)
        #[arg(long)]
        bbox: Option<String>,
        /// Grid resolution in degrees
        #[arg(short, long, default_value = "0.5")]
        resolution: f64,
        #[command(flatten)]
        zones: ZoneArgs,
        /// Output prefix; one file per band, <prefix>_<band>.tif
        output: PathBuf,
    },
    /// Solar-surface angles over a DEM
    Surface {
        /// Input DEM (EPSG:4326)
        dem: PathBuf,
        /// UTC timestamp, YYYY-MM-DDTHH:MM:SS
        #[arg(short, long)]
        time: String,
        /// Region as min_lon,min_lat,max_lon,max_lat (DEM extent if omitted)
        #[arg(long)]
        bbox: Option<String>,
        /// Cell spacing: auto, projected, geographic
        #[arg(long, default_value = "auto")]
        spacing: String,
        /// Also write the solar position bands
        #[arg(long)]
        with_position: bool,
        #[command(flatten)]
        zones: ZoneArgs,
        /// Output prefix; one file per band, <prefix>_<band>.tif
        output: PathBuf,
    },
    /// Total sunlit hours over a time series
    SunHours {
        /// Input DEM (EPSG:4326)
        dem: PathBuf,
        /// Output sun-hours raster
        output: PathBuf,
        /// First UTC timestamp
        #[arg(long)]
        start: String,
        /// Last UTC timestamp (inclusive)
        #[arg(long)]
        end: String,
        /// Step in minutes
        #[arg(long, default_value = "10")]
        step: u32,
        /// Sun sample point as lon,lat (DEM centre if omitted)
        #[arg(long)]
        centroid: Option<String>,
        /// Hillshadow search distance in ground units
        #[arg(long, default_value = "1000")]
        neighborhood: f64,
        /// Cell spacing: auto, projected, geographic
        #[arg(long, default_value = "auto")]
        spacing: String,
        /// Write frame metadata as JSON
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Write each retained frame's illumination as <prefix>_<index>.tif
        #[arg(long)]
        frames: Option<PathBuf>,
        #[command(flatten)]
        zones: ZoneArgs,
    },
    /// All bands at one location as JSON
    Probe {
        /// Input DEM (EPSG:4326)
        dem: PathBuf,
        /// UTC timestamp, YYYY-MM-DDTHH:MM:SS
        #[arg(short, long)]
        time: String,
        /// Location as lon,lat
        #[arg(short, long)]
        point: String,
        /// Cell spacing: auto, projected, geographic
        #[arg(long, default_value = "auto")]
        spacing: String,
        #[command(flatten)]
        zones: ZoneArgs,
    },
    /// Terrain primitives
    Terrain {
        #[command(subcommand)]
        algorithm: TerrainCommands,
    },
}

// ─── Terrain subcommands ────────────────────────────────────────────────

#[derive(Subcommand)]
enum TerrainCommands {
    /// Calculate slope from DEM
    Slope {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output units: degrees, percent, radians
        #[arg(short, long, default_value = "degrees")]
        units: String,
        /// Z-factor for unit conversion
        #[arg(short, long, default_value = "1.0")]
        z_factor: f64,
        /// Cell spacing: auto, projected, geographic
        #[arg(long, default_value = "auto")]
        spacing: String,
    },
    /// Calculate aspect from DEM
    Aspect {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output format: degrees, radians, compass
        #[arg(short, long, default_value = "degrees")]
        format: String,
        /// Cell spacing: auto, projected, geographic
        #[arg(long, default_value = "auto")]
        spacing: String,
    },
    /// Calculate hillshade from DEM
    Hillshade {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Sun azimuth in degrees (0=North, clockwise)
        #[arg(short, long, default_value = "315")]
        azimuth: f64,
        /// Sun altitude in degrees above horizon
        #[arg(short = 'l', long, default_value = "45")]
        altitude: f64,
        /// Z-factor for vertical exaggeration
        #[arg(short, long, default_value = "1.0")]
        z_factor: f64,
        /// Cell spacing: auto, projected, geographic
        #[arg(long, default_value = "auto")]
        spacing: String,
    },
    /// Cast shadows: 1 lit, 0 shadowed
    Hillshadow {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Sun azimuth in degrees (0=North, clockwise)
        #[arg(short, long, default_value = "180")]
        azimuth: f64,
        /// Sun zenith in degrees
        #[arg(long, default_value = "45")]
        zenith: f64,
        /// Occluder search distance in ground units
        #[arg(long, default_value = "1000")]
        neighborhood: f64,
        /// Cell spacing: auto, projected, geographic
        #[arg(long, default_value = "auto")]
        spacing: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("a global tracing subscriber is already installed");
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn frame_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} frames {msg}")
    {
        pb.set_style(style);
    }
    pb
}

fn read_dem(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn band_path(prefix: &Path, band: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.tif", prefix.display(), band))
}

fn write_bands(prefix: &Path, bands: &[(&str, &Raster<f64>)]) -> Result<()> {
    let pb = spinner("Writing bands...");
    for (name, raster) in bands {
        let path = band_path(prefix, name);
        write_geotiff(*raster, &path)
            .with_context(|| format!("Failed to write band {}", path.display()))?;
    }
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_time(s: &str) -> Result<TimeFields> {
    TimeFields::parse(s).with_context(|| format!("Invalid timestamp: {}", s))
}

fn parse_numbers<const N: usize>(s: &str, what: &str) -> Result<[f64; N]> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid {}: {}", what, s))?;
    values
        .try_into()
        .map_err(|_| anyhow::anyhow!("{} needs {} comma-separated numbers, got: {}", what, N, s))
}

fn parse_point(s: &str) -> Result<Point<f64>> {
    let [lon, lat] = parse_numbers::<2>(s, "point")?;
    Ok(Point::new(lon, lat))
}

fn parse_bbox(s: &str) -> Result<Region> {
    let [min_lon, min_lat, max_lon, max_lat] = parse_numbers::<4>(s, "bbox")?;
    Region::bbox(min_lon, min_lat, max_lon, max_lat).context("Invalid bbox")
}

/// Region covering the DEM's extent
fn dem_region(dem: &Raster<f64>) -> Result<Region> {
    let (min_x, min_y, max_x, max_y) = dem.bounds();
    Region::bbox(min_x, min_y, max_x, max_y).context("DEM extent is not a valid lon/lat region")
}

fn parse_spacing(s: &str) -> CellSpacing {
    match s.to_lowercase().as_str() {
        "auto" | "a" => CellSpacing::Auto,
        "projected" | "proj" | "p" => CellSpacing::Projected,
        "geographic" | "geo" | "g" => CellSpacing::Geographic,
        _ => {
            eprintln!("Unknown spacing: {}. Using auto.", s);
            CellSpacing::Auto
        }
    }
}

fn load_zones<T: RasterElement>(args: &ZoneArgs, template: &Raster<T>) -> Result<TimeZoneGrid> {
    let pb = spinner("Building time-zone grid...");
    let grid = match &args.zones {
        Some(path) => TimeZoneGrid::from_geojson_path(path, &args.zone_property, template)
            .with_context(|| format!("Failed to load time zones from {}", path.display()))?,
        None => TimeZoneGrid::nautical(template).context("Failed to build nautical time zones")?,
    };
    pb.finish_and_clear();
    Ok(grid)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_dem(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Solar position ───────────────────────────────────────────
        Commands::Position {
            time,
            bbox,
            resolution,
            zones,
            output,
        } => {
            let fields = parse_time(&time)?;
            let region = match bbox {
                Some(b) => parse_bbox(&b)?,
                None => Region::global(),
            };
            let params = SolarPositionParams { resolution };
            let template = region.template(resolution).context("Invalid resolution")?;
            let tz = load_zones(&zones, &template)?;

            let start = Instant::now();
            let result = compute_solar_position(&fields, &region, &tz, &params)
                .context("Failed to compute solar position")?;
            let elapsed = start.elapsed();
            write_bands(&output, &result.bands())?;
            done("Solar position", &output, elapsed);
        }

        // ── Solar surface ────────────────────────────────────────────
        Commands::Surface {
            dem,
            time,
            bbox,
            spacing,
            with_position,
            zones,
            output,
        } => {
            let fields = parse_time(&time)?;
            let dem = read_dem(&dem)?;
            let region = match bbox {
                Some(b) => parse_bbox(&b)?,
                None => dem_region(&dem)?,
            };
            let tz = load_zones(&zones, &dem)?;
            let params = SurfaceParams {
                spacing: parse_spacing(&spacing),
            };

            let start = Instant::now();
            let result = compute_surface_position(&fields, &region, &dem, &tz, &params)
                .context("Failed to compute solar-surface angles")?;
            let elapsed = start.elapsed();
            write_bands(&output, &result.bands())?;
            if with_position {
                write_bands(&output, &result.position.bands())?;
            }
            done("Solar surface", &output, elapsed);
        }

        // ── Sun hours ────────────────────────────────────────────────
        Commands::SunHours {
            dem,
            output,
            start,
            end,
            step,
            centroid,
            neighborhood,
            spacing,
            metadata,
            frames,
            zones,
        } => {
            let (first, last) = (parse_time(&start)?, parse_time(&end)?);
            let dem = read_dem(&dem)?;
            let centroid = match centroid {
                Some(p) => parse_point(&p)?,
                None => dem_region(&dem)?.centroid(),
            };
            let tz = load_zones(&zones, &dem)?;
            let times = TimeSeries::new(&first, &last, step).context("Invalid time series")?;
            let params = SunHoursParams {
                neighborhood_size: neighborhood,
                spacing: parse_spacing(&spacing),
                ..Default::default()
            };
            info!(
                "Series: {} frames from {} to {} every {} min, sun sampled at ({:.5}, {:.5})",
                times.len(),
                first,
                last,
                step,
                centroid.x(),
                centroid.y()
            );

            let timer = Instant::now();
            let series = IlluminationSeries::new(times, centroid, &dem, &tz, params)
                .context("Failed to set up illumination series")?;
            let mut acc = series.accumulator();
            let pb = frame_bar(series.len());
            let mut index = 0;
            for batch in series.batches() {
                let batch = batch.context("Failed to compute illumination frames")?;
                for frame in &batch {
                    let retained = acc.push(frame).context("Failed to aggregate frame")?;
                    if let (true, Some(prefix)) = (retained, &frames) {
                        let path = band_path(prefix, &format!("{:04}", index));
                        write_geotiff(&frame.illumination, &path)
                            .with_context(|| format!("Failed to write frame {}", path.display()))?;
                    }
                    index += 1;
                }
                if let Some(last) = batch.last() {
                    pb.set_message(last.metadata.date.clone());
                }
                pb.inc(batch.len() as u64);
            }
            pb.finish_and_clear();
            let result = acc.finish().context("Failed to finish sun hours")?;
            let elapsed = timer.elapsed();

            write_result(&result.hours, &output)?;
            if let Some(path) = metadata {
                let json = serde_json::to_string_pretty(&result.metadata)
                    .context("Failed to serialize frame metadata")?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            println!(
                "  Frames retained: {} of {}",
                result.retained,
                result.metadata.len()
            );
            done("Sun hours", &output, elapsed);
        }

        // ── Probe ────────────────────────────────────────────────────
        Commands::Probe {
            dem,
            time,
            point,
            spacing,
            zones,
        } => {
            let fields = parse_time(&time)?;
            let point = parse_point(&point)?;
            let dem = read_dem(&dem)?;
            let tz = load_zones(&zones, &dem)?;
            let result = probe(point, &fields, &dem, &tz, parse_spacing(&spacing))
                .context("Failed to probe location")?;
            let json = serde_json::to_string_pretty(&result).context("Failed to serialize probe")?;
            println!("{}", json);
        }

        // ── Terrain ──────────────────────────────────────────────────
        Commands::Terrain { algorithm } => match algorithm {
            TerrainCommands::Slope {
                input,
                output,
                units,
                z_factor,
                spacing,
            } => {
                let units = match units.to_lowercase().as_str() {
                    "degrees" | "deg" | "d" => SlopeUnits::Degrees,
                    "percent" | "pct" | "%" => SlopeUnits::Percent,
                    "radians" | "rad" | "r" => SlopeUnits::Radians,
                    _ => {
                        eprintln!("Unknown units: {}. Using degrees.", units);
                        SlopeUnits::Degrees
                    }
                };
                let dem = read_dem(&input)?;
                let start = Instant::now();
                let result = slope(
                    &dem,
                    SlopeParams {
                        units,
                        z_factor,
                        spacing: parse_spacing(&spacing),
                    },
                )
                .context("Failed to calculate slope")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Slope", &output, elapsed);
            }

            TerrainCommands::Aspect {
                input,
                output,
                format,
                spacing,
            } => {
                let fmt = match format.to_lowercase().as_str() {
                    "degrees" | "deg" | "d" => AspectOutput::Degrees,
                    "radians" | "rad" | "r" => AspectOutput::Radians,
                    "compass" | "c" => AspectOutput::Compass,
                    _ => {
                        eprintln!("Unknown format: {}. Using degrees.", format);
                        AspectOutput::Degrees
                    }
                };
                let dem = read_dem(&input)?;
                let start = Instant::now();
                let result = aspect(
                    &dem,
                    AspectParams {
                        output: fmt,
                        spacing: parse_spacing(&spacing),
                    },
                )
                .context("Failed to calculate aspect")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Aspect", &output, elapsed);
            }

            TerrainCommands::Hillshade {
                input,
                output,
                azimuth,
                altitude,
                z_factor,
                spacing,
            } => {
                let dem = read_dem(&input)?;
                let start = Instant::now();
                let result = hillshade(
                    &dem,
                    HillshadeParams {
                        azimuth,
                        altitude,
                        z_factor,
                        normalized: false,
                        spacing: parse_spacing(&spacing),
                    },
                )
                .context("Failed to calculate hillshade")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Hillshade", &output, elapsed);
            }

            TerrainCommands::Hillshadow {
                input,
                output,
                azimuth,
                zenith,
                neighborhood,
                spacing,
            } => {
                let dem = read_dem(&input)?;
                let start = Instant::now();
                let result = hillshadow(
                    &dem,
                    HillshadowParams {
                        azimuth,
                        zenith,
                        neighborhood_size: neighborhood,
                        spacing: parse_spacing(&spacing),
                    },
                )
                .context("Failed to calculate hillshadow")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Hillshadow", &output, elapsed);
            }
        },
    }

    Ok(())
}
