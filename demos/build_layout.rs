//! Build a layout description and print the polygons as JSON.
//!
//!     cargo run --example build_layout --features tracing -- path/to/layout.json
//!
//! Set `RUST_LOG=octagen=debug` for per-stage counts on stderr.

use miette::IntoDiagnostic;
use octagen::{LayoutOptions, generate_from_json};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/demos/transformer.json").to_string());
    let input = std::fs::read_to_string(&path).into_diagnostic()?;

    let options = LayoutOptions {
        staircase_step: std::env::var("OCTAGEN_STAIRCASE")
            .ok()
            .and_then(|s| s.parse().ok()),
        ..LayoutOptions::default()
    };
    let layout = generate_from_json(&input, &options)?;

    eprintln!(
        "{}: {} polygons, {} ports",
        layout.name,
        layout.polygon_count(),
        layout.ports.len()
    );
    for (category, polys) in layout.categories() {
        eprintln!("  {category}: {}", polys.len());
    }
    println!("{}", serde_json::to_string_pretty(&layout).into_diagnostic()?);
    Ok(())
}
