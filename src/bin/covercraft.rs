use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "covercraft", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a cover and export it as a PNG.
    Render(RenderArgs),
    /// Print the style fields a form would show for the given style.
    Fields(FieldsArgs),
}

#[derive(Parser, Debug)]
struct StyleArgs {
    /// Style JSON to start from (camelCase keys).
    #[arg(long)]
    style: Option<PathBuf>,

    /// Cover text.
    #[arg(long)]
    text: Option<String>,

    /// Font family to request.
    #[arg(long)]
    font_family: Option<String>,

    /// Font size in pixels.
    #[arg(long)]
    font_size: Option<u32>,

    /// Text color as hex (#RGB, #RRGGBB or #RRGGBBAA).
    #[arg(long)]
    text_color: Option<covercraft::Rgba8>,

    /// Disable the drop shadow.
    #[arg(long)]
    no_shadow: bool,

    /// Enable the text outline with the given swatch.
    #[arg(long, value_enum)]
    border: Option<SwatchChoice>,

    /// Outline width in pixels.
    #[arg(long)]
    border_width: Option<u32>,

    /// Vertical position of the text.
    #[arg(long, value_enum)]
    anchor: Option<AnchorChoice>,

    /// Enable the diagonal gradient starting from this hex color.
    #[arg(long)]
    gradient: Option<covercraft::Rgba8>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Background image (PNG, JPEG, WebP, GIF, BMP, SVG, ...).
    #[arg(long)]
    background: Option<PathBuf>,

    /// Render configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font file to register. May be repeated; the first one is the fallback face.
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Override the exported file name.
    #[arg(long)]
    file_name: Option<String>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct FieldsArgs {
    #[command(flatten)]
    style: StyleArgs,

    /// Print as a JSON array instead of one field per line.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SwatchChoice {
    White,
    Black,
    Green,
    Red,
    Blue,
    Yellow,
}

impl From<SwatchChoice> for covercraft::BorderSwatch {
    fn from(c: SwatchChoice) -> Self {
        match c {
            SwatchChoice::White => Self::White,
            SwatchChoice::Black => Self::Black,
            SwatchChoice::Green => Self::Green,
            SwatchChoice::Red => Self::Red,
            SwatchChoice::Blue => Self::Blue,
            SwatchChoice::Yellow => Self::Yellow,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnchorChoice {
    Upper,
    Middle,
    Lower,
}

impl From<AnchorChoice> for covercraft::VerticalAnchor {
    fn from(c: AnchorChoice) -> Self {
        match c {
            AnchorChoice::Upper => Self::Upper,
            AnchorChoice::Middle => Self::Middle,
            AnchorChoice::Lower => Self::Lower,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Fields(args) => cmd_fields(args),
    }
}

fn build_style(args: &StyleArgs) -> anyhow::Result<covercraft::StyleParameters> {
    let mut style = match &args.style {
        Some(path) => {
            let s = std::fs::read_to_string(path)
                .with_context(|| format!("read style '{}'", path.display()))?;
            covercraft::StyleParameters::from_json_str(&s)
                .with_context(|| format!("parse style '{}'", path.display()))?
        }
        None => covercraft::StyleParameters::default(),
    };

    if let Some(text) = &args.text {
        style.text = text.clone();
    }
    if let Some(family) = &args.font_family {
        style.font_family = family.clone();
    }
    if let Some(px) = args.font_size {
        style.font_size_px = px;
    }
    if let Some(color) = args.text_color {
        style.text_color = color;
    }
    if args.no_shadow {
        style.shadow_enabled = false;
    }
    if let Some(swatch) = args.border {
        style.border_enabled = true;
        style.border_color = swatch.into();
    }
    if let Some(px) = args.border_width {
        style.border_width_px = px;
    }
    if let Some(anchor) = args.anchor {
        style.vertical_anchor = anchor.into();
    }
    if let Some(color) = args.gradient {
        style.gradient_enabled = true;
        style.gradient_color = color;
    }
    Ok(style)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<covercraft::RenderConfig> {
    Ok(match path {
        Some(p) => covercraft::RenderConfig::from_json_file(p)?,
        None => covercraft::RenderConfig::default(),
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = args.file_name {
        config.export.file_name = name;
    }

    let mut fonts = covercraft::FontLibrary::new();
    for path in &args.fonts {
        let family = fonts.register_file(path)?;
        tracing::info!(family = %family, path = %path.display(), "registered font");
    }

    let style = build_style(&args.style)?;
    let mut controller = covercraft::Controller::new(config, fonts)?;
    controller.update_style(style)?;

    if let Some(bg) = args.background {
        controller.request_background_file(bg);
        for outcome in controller.drain_loads() {
            if let covercraft::LoadOutcome::Failed { error, .. } = outcome {
                return Err(error).context("load background");
            }
        }
    }

    let path = controller.export_png(&args.out)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_fields(args: FieldsArgs) -> anyhow::Result<()> {
    let style = build_style(&args.style)?;
    let fields = covercraft::visible_fields(&style);
    if args.json {
        println!("{}", serde_json::to_string(&fields.iter().collect::<Vec<_>>())?);
    } else {
        for field in fields.iter() {
            println!("{}", serde_json::to_value(field)?.as_str().unwrap_or_default());
        }
    }
    Ok(())
}
