use std::path::PathBuf;

use tracing::{error, info};

use fractalfield::render;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fractalfield=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let size: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(40);
    let iterations: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50);
    let seed: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(42);
    let out_dir: PathBuf = args
        .get(4)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    if let Err(err) = std::fs::create_dir_all(&out_dir) {
        error!("failed to create {}: {err}", out_dir.display());
        std::process::exit(1);
    }

    info!(size, iterations, seed, "generating field");

    let (frame, timings) = fractalfield::generate_frame(size, iterations, Some(seed), 0.25, 0.0);

    eprintln!("\nTimings ({} optimization):", frame.level);
    for t in &timings {
        eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
    }

    let path = out_dir.join("fractal.png");
    match image::save_buffer(
        &path,
        &frame.rgba,
        frame.size as u32,
        frame.size as u32,
        image::ColorType::Rgba8,
    ) {
        Ok(()) => info!("Saved {}", path.display()),
        Err(err) => {
            error!("failed to save {}: {err}", path.display());
            std::process::exit(1);
        }
    }

    print!("{}", render::render_ascii(&frame.frame));
}
