//! placement-render: place an image on a product and write the PNG.
//!
//! Drives a render surface the way an interactive host would: load, apply
//! gestures, commit, export. Prints the committed placement as JSON.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use print_placement::{
    Configurable, EngineConfig, ExportPreset, PlacementProfile, ProductArea, RenderSurface, Shape,
    SizeF, SourceHandle, print_multiplier,
};

#[derive(Parser)]
#[command(name = "placement-render")]
#[command(about = "Place an image on a print product and export it")]
struct Cli {
    /// PNG or JPEG image to place
    #[arg(short, long)]
    image: PathBuf,

    /// Product size label, e.g. 5x5 or 2.5x3.5
    #[arg(short, long, default_value = "5x5")]
    size: String,

    #[arg(long, value_enum, default_value = "square")]
    shape: Shape,

    /// Host container side in pixels
    #[arg(long, default_value_t = 800.0)]
    container: f64,

    /// Zoom relative to fit-to-canvas
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Rotation in degrees
    #[arg(long, default_value_t = 0.0)]
    rotate: f64,

    /// Drag offset in canvas pixels, as dx,dy
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    offset: Option<(f64, f64)>,

    /// Saved placement to restore instead of the gesture flags
    #[arg(long, conflicts_with_all = ["scale", "rotate", "offset"])]
    profile: Option<PathBuf>,

    /// Draw the alignment grid (preview only)
    #[arg(long)]
    grid: bool,

    /// Write the on-screen preview with guides instead of the print file
    #[arg(long)]
    preview: bool,

    /// Output multiplier
    #[arg(short, long, conflicts_with_all = ["dpi", "preset"])]
    multiplier: Option<f64>,

    /// Export at this many dots per product unit
    #[arg(long, conflicts_with = "preset")]
    dpi: Option<u32>,

    #[arg(long, value_enum)]
    preset: Option<ExportPreset>,

    /// Engine configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "placement.png")]
    out: PathBuf,
}

fn parse_offset(value: &str) -> Result<(f64, f64), String> {
    let (dx, dy) = value
        .split_once(',')
        .ok_or_else(|| format!("expected dx,dy, got {value:?}"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| e.to_string());
    Ok((parse(dx)?, parse(dy)?))
}

fn run(cli: Cli) -> Result<PlacementProfile, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let product = ProductArea::parse_size(&cli.size, cli.shape)?;
    let mut surface =
        RenderSurface::new(config, product, SizeF::new(cli.container, cli.container))?;

    let bytes = fs::read(&cli.image)?;
    let source = SourceHandle::url(cli.image.display().to_string());
    let request = surface
        .set_source(Some(source))
        .ok_or("surface did not request a load")?;

    if let Some(path) = &cli.profile {
        let profile = PlacementProfile::from_json(&fs::read_to_string(path)?)?;
        surface.apply_profile(&profile)?;
    }
    surface.complete_load(request.token, &bytes)?;

    if cli.profile.is_none() {
        surface.set_user_scale(cli.scale);
        surface.set_rotation(cli.rotate);
        if let Some((dx, dy)) = cli.offset {
            surface.drag_by(dx, dy);
        }
    }
    surface.set_show_grid(cli.grid || surface.show_grid());
    let committed = surface.commit();

    let multiplier = match (cli.multiplier, cli.dpi, cli.preset) {
        (Some(m), _, _) => m,
        (None, Some(dpi), _) => print_multiplier(surface.product(), surface.canvas(), dpi)?,
        (None, None, Some(preset)) => preset.multiplier(),
        (None, None, None) => ExportPreset::Preview.multiplier(),
    };

    if cli.preview {
        let frame = surface.render_preview(multiplier)?;
        frame.save(&cli.out)?;
        log::info!("wrote preview {}x{} to {}", frame.width(), frame.height(), cli.out.display());
    } else {
        let raster = surface.export_raster(multiplier)?;
        fs::write(&cli.out, &raster.png)?;
        log::info!("wrote {}x{} to {}", raster.width, raster.height, cli.out.display());
    }

    Ok(committed)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(profile) => match profile.to_json_pretty() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
