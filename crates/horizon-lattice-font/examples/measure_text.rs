//! Text measurement example.
//!
//! Measures a few strings with the built-in font and, if a typeface path is
//! given, with that typeface as a plain and a distance-field font. No GPU is
//! needed: the headless backend records draws instead of executing them.
//!
//! Run with: cargo run -p horizon-lattice-font --example measure_text -- [path/to/font.ttf]

use std::sync::Arc;

use horizon_lattice_font::{
    Color, Font, FontContext, FontContextConfig, FontOptions, HeadlessBackend, RenderBackend,
};

const SAMPLES: [&str; 4] = ["Hello", "Hello world", "AVATAR", "Räksmörgås 42"];

fn report(name: &str, font: &mut Font) {
    println!("{name} (built at {} px)", font.size());
    for text in SAMPLES {
        let size = font.measure(text, 1.0).expect("Failed to measure text");
        println!("  {text:<16} {:>7.1} x {:<5.1}", size.width, size.height);
    }
    let stats = font.stats();
    println!(
        "  layouts: {}, cache hits: {}, cached strings: {}",
        stats.layouts, stats.cache_hits, stats.cached_strings
    );
    println!();
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let backend = Arc::new(HeadlessBackend::new());
    let context = FontContext::new(backend.clone(), FontContextConfig::default());
    let target = backend
        .create_target(640, 480)
        .expect("Failed to create render target");

    let mut builtin = context.builtin_font().expect("Failed to create built-in font");
    report("Built-in font", &mut builtin);

    if let Some(path) = std::env::args().nth(1) {
        let mut plain = context
            .load_font(&path, 24.0, FontOptions::new())
            .expect("Failed to load typeface");
        report(&path, &mut plain);

        let mut sdf = context
            .load_font(&path, 24.0, FontOptions::new().distance_field())
            .expect("Failed to load distance-field typeface");
        report(&format!("{path} (distance field)"), &mut sdf);

        sdf.draw(&target, "Hello world", 10.0, 10.0, Color::WHITE, 1.0)
            .expect("Failed to draw text");
        // Measuring again reuses the geometry uploaded above
        sdf.measure("Hello world", 2.0).expect("Failed to measure text");
    }

    builtin
        .draw(&target, "Hello", 10.0, 40.0, Color::WHITE, 1.0)
        .expect("Failed to draw text");

    println!("Recorded {} draw calls", backend.draws().len());
    println!("Live font resources: {}", context.registry().live_count());
}
