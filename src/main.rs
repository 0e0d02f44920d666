use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use label_stamp::font::FontChoice;
use label_stamp::{Labeler, settings};

#[derive(Parser, Debug)]
#[command(
    name = "label-stamp",
    version,
    about = "Stamp text labels onto images over HTTP"
)]
struct Cli {
    /// Listen address (overrides settings [server].addr)
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Label a single image file instead of starting the server
    #[arg(short = 'i', long = "image", requires = "label")]
    image: Option<PathBuf>,

    /// Label text for --image
    #[arg(short = 'l', long = "label", requires = "image")]
    label: Option<String>,

    /// Font for --image (sans, serif; default when omitted)
    #[arg(short = 'f', long = "font")]
    font: Option<String>,

    /// Output path for --image (default: a new file in the output dir)
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    label_stamp::logging::init(cli.verbose)?;
    let settings = settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;

    if let (Some(image), Some(label)) = (cli.image.as_deref(), cli.label.as_deref()) {
        let path = label_file(&settings, image, label, cli.font.as_deref(), cli.out.as_deref())?;
        println!("{}", path.display());
        return Ok(());
    }

    let addr = cli.addr.unwrap_or_else(|| settings.server_addr.clone());
    label_stamp::server::run_server(settings, addr).await
}

fn label_file(
    settings: &settings::Settings,
    image: &Path,
    label: &str,
    font: Option<&str>,
    out: Option<&Path>,
) -> Result<PathBuf> {
    let bytes = std::fs::read(image)
        .with_context(|| format!("failed to read image: {}", image.display()))?;
    let font = FontChoice::parse(font)?;
    let labeler = Labeler::new(settings);
    let stamped = labeler
        .stamp(&bytes, label, font, &settings.layout)
        .map_err(|err| anyhow!("failed to label {}: {}", image.display(), err))?;
    match out {
        Some(path) => {
            std::fs::write(path, &stamped.png)
                .with_context(|| format!("failed to write output: {}", path.display()))?;
            Ok(path.to_path_buf())
        }
        None => Ok(label_stamp::write_output(&stamped.png, labeler.output_dir())?),
    }
}
