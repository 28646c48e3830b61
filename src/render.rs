use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use rayon::prelude::*;

use crate::error::Result;
use crate::grid::Grid;

/// Dark blue at 0, bright cyan towards 1.
#[inline]
pub fn field_color(v: f64) -> [u8; 4] {
    let v = v.clamp(0.0, 1.0);
    [
        (v * 50.0).floor() as u8,
        (v * 150.0 + 50.0).floor() as u8,
        (v * 200.0 + 55.0).floor() as u8,
        255,
    ]
}

/// Render a field to RGBA, one pixel per cell.
pub fn render_field(grid: &Grid<f64>) -> Vec<u8> {
    let w = grid.w;
    let h = grid.h;
    let mut rgba = vec![0u8; w * h * 4];
    if w == 0 {
        return rgba;
    }

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let c = field_color(grid.get(x, y));
            row[x * 4..x * 4 + 4].copy_from_slice(&c);
        }
    });

    rgba
}

/// PNG as a `data:` URL.
pub fn encode_png(rgba: &[u8], w: usize, h: usize) -> Result<String> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder.write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    Ok(format!("data:image/png;base64,{}", b64))
}

/// `#` above 0.5, blank otherwise.
pub fn render_ascii(grid: &Grid<f64>) -> String {
    let mut out = String::with_capacity((grid.w + 1) * grid.h);
    for y in 0..grid.h {
        for x in 0..grid.w {
            out.push(if grid.get(x, y) > 0.5 { '#' } else { ' ' });
        }
        out.push('\n');
    }
    out
}
