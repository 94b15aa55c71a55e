use crate::config::load_config;
use crate::ir::parse_annotations;
use crate::pass::run_pass;
use crate::render::{SvgSurface, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mapann", version, about = "Place map markers and labels without overlaps")]
pub struct Args {
    /// Input annotation file (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png/json). Defaults to stdout for SVG and JSON.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (.json or .json5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Override the map width in pixels
    #[arg(short = 'w', long = "width")]
    pub width: Option<i32>,

    /// Override the map height in pixels
    #[arg(short = 'H', long = "height")]
    pub height: Option<i32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let mut set = parse_annotations(&input)?;
    if let Some(width) = args.width {
        set.width = width;
    }
    if let Some(height) = args.height {
        set.height = height;
    }
    if set.width <= 0 || set.height <= 0 {
        return Err(anyhow::anyhow!(
            "Map size must be positive, got {}x{}",
            set.width,
            set.height
        ));
    }

    let surface = SvgSurface::new(set.width, set.height, config.render.clone());
    let (report, surface) = run_pass(&set, &config.placement, surface)?;

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&surface.finish(), args.output.as_deref())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            write_output_svg(&json, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&surface.finish(), &output, &config.placement.font_family)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, font_family: &str) -> Result<()> {
    crate::render::write_output_png(svg, output, font_family)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _font_family: &str) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
