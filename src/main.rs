//! # Photobox CLI
//!
//! Command-line interface for the photobooth server.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP server
//! photobox serve --listen 0.0.0.0:5000 --data-dir ./data
//!
//! # Composite a frame offline, without a server or camera
//! photobox compose --template frame.png --frame shot.png \
//!     --slot 100,50,200x300 --out composed.png
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use photobox::{
    PhotoboxError,
    compositor,
    geometry::{Slot, SlotConfig},
    server::{self, ServerConfig},
};

/// Photobox - photobooth frame compositing
#[derive(Parser, Debug)]
#[command(name = "photobox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the photobooth HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:5000")]
        listen: String,

        /// Directory for the template index and uploaded images
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Composite a camera frame into a template offline
    Compose {
        /// Template image (PNG with transparent slot region)
        #[arg(long)]
        template: PathBuf,

        /// Camera frame image
        #[arg(long)]
        frame: PathBuf,

        /// Slot rectangle as "x,y,WxH" in template pixels
        #[arg(long, value_name = "X,Y,WxH", conflicts_with = "config")]
        slot: Option<String>,

        /// Slot configuration JSON file (as stored in the registry)
        #[arg(long, conflicts_with = "slot")]
        config: Option<PathBuf>,

        /// Output PNG path
        #[arg(long, short, default_value = "composed.png")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photobox=info,tower_http=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), PhotoboxError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen, data_dir } => {
            server::serve(ServerConfig { listen_addr: listen, data_dir }).await
        }
        Commands::Compose { template, frame, slot, config, out } => {
            compose(&template, &frame, slot.as_deref(), config.as_deref(), &out)
        }
    }
}

/// Offline compositing: the same pipeline the capture flow runs, fed from
/// files instead of a live camera.
fn compose(
    template_path: &std::path::Path,
    frame_path: &std::path::Path,
    slot: Option<&str>,
    config_path: Option<&std::path::Path>,
    out: &std::path::Path,
) -> Result<(), PhotoboxError> {
    let slots = match (slot, config_path) {
        (Some(spec), None) => vec![parse_slot_spec(spec)?],
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)?;
            SlotConfig::from_json(&text)?.slots
        }
        _ => {
            return Err(PhotoboxError::Validation(
                "Provide exactly one of --slot or --config".to_string(),
            ));
        }
    };

    let template = image::open(template_path)
        .map_err(|e| PhotoboxError::Image(format!("Failed to open template: {}", e)))?;
    let frame = image::open(frame_path)
        .map_err(|e| PhotoboxError::Image(format!("Failed to open frame: {}", e)))?;

    println!(
        "Compositing {}x{} frame into {} slot(s) of {}x{} template...",
        frame.width(),
        frame.height(),
        slots.len(),
        template.width(),
        template.height()
    );

    let png = compositor::composite_png(&template, &frame, &slots)?;
    std::fs::write(out, png)?;
    println!("Saved to {}", out.display());

    Ok(())
}

/// Parse a "x,y,WxH" slot spec, e.g. "100,50,200x300".
fn parse_slot_spec(spec: &str) -> Result<Slot, PhotoboxError> {
    let invalid = || {
        PhotoboxError::Validation(format!(
            "Invalid slot spec '{}': expected x,y,WxH (e.g. 100,50,200x300)",
            spec
        ))
    };

    let mut parts = spec.split(',');
    let x: f64 = parts.next().and_then(|p| p.trim().parse().ok()).ok_or_else(invalid)?;
    let y: f64 = parts.next().and_then(|p| p.trim().parse().ok()).ok_or_else(invalid)?;
    let size = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let (w, h) = size.split_once('x').ok_or_else(invalid)?;
    let width: f64 = w.trim().parse().map_err(|_| invalid())?;
    let height: f64 = h.trim().parse().map_err(|_| invalid())?;

    Ok(Slot::new(x, y, width, height))
}
