//! Non-local-means filtering of 8-bit planes.
//!
//! For every pixel, each candidate inside the search window contributes with
//! weight `exp(-ssd / (T^2 * channels * h^2))`, where `ssd` is the sum of
//! squared differences between the two `T x T` patches. Patch sums are built
//! per search offset with running box sums, so the cost per pixel is
//! proportional to the search area only.

use rayon::prelude::*;

use super::lab;

/// Weights below this are dropped, which keeps flat regions from smearing.
const WEIGHT_THRESHOLD: f32 = 0.001;
/// Output rows handled by one rayon task.
const BAND_ROWS: usize = 16;

/// Interleaved `f32` samples with `channels` values per pixel.
#[derive(Debug, Clone)]
pub struct Planes {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl Planes {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height * channels);
        Self { width, height, channels, data }
    }
}

/// Window geometry, both sizes odd.
#[derive(Debug, Clone, Copy)]
pub struct Windows {
    pub template: usize,
    pub search: usize,
}

/// Reflect-101 index into `0..len` (`-1` maps to `1`, `len` to `len - 2`).
fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let mut i = i.rem_euclid(period);
    if i >= len as isize {
        i = period - i;
    }
    i as usize
}

fn pad(planes: &Planes, border: usize) -> Planes {
    let (w, h, cn) = (planes.width, planes.height, planes.channels);
    let pw = w + 2 * border;
    let ph = h + 2 * border;
    let mut data = Vec::with_capacity(pw * ph * cn);
    for py in 0..ph {
        let sy = reflect101(py as isize - border as isize, h);
        for px in 0..pw {
            let sx = reflect101(px as isize - border as isize, w);
            let src = (sy * w + sx) * cn;
            data.extend_from_slice(&planes.data[src..src + cn]);
        }
    }
    Planes::new(pw, ph, cn, data)
}

/// Filters all channels of `planes` jointly with strength `h`.
pub fn denoise_planes(planes: &Planes, h: f32, windows: Windows) -> Planes {
    if h <= 0.0 || planes.width == 0 || planes.height == 0 {
        return planes.clone();
    }

    let tr = windows.template / 2;
    let sr = windows.search / 2;
    let border = tr + sr;
    let padded = pad(planes, border);

    let (width, height, cn) = (planes.width, planes.height, planes.channels);
    let template_area = (windows.template * windows.template) as f32;
    let inv_denominator = 1.0 / (template_area * cn as f32 * h * h);

    let mut out = vec![0.0f32; width * height * cn];
    out.par_chunks_mut(width * cn * BAND_ROWS)
        .enumerate()
        .for_each(|(band, chunk)| {
            let y0 = band * BAND_ROWS;
            let rows = chunk.len() / (width * cn);
            filter_band(&padded, y0, rows, width, tr, sr, inv_denominator, chunk);
        });

    // Rounded back onto the 8-bit grid the planes came from.
    for v in out.iter_mut() {
        *v = v.round().clamp(0.0, 255.0);
    }
    Planes::new(width, height, cn, out)
}

#[allow(clippy::too_many_arguments)]
fn filter_band(
    padded: &Planes,
    y0: usize,
    rows: usize,
    width: usize,
    tr: usize,
    sr: usize,
    inv_denominator: f32,
    out: &mut [f32],
) {
    let cn = padded.channels;
    let pw = padded.width;
    let border = tr + sr;
    let span = 2 * tr + 1;
    let ext_rows = rows + 2 * tr;
    let ext_cols = width + 2 * tr;

    let mut weight_sums = vec![0.0f32; rows * width];
    let mut acc = vec![0.0f32; rows * width * cn];
    let mut diff = vec![0.0f32; ext_rows * ext_cols];
    let mut columns = vec![0.0f32; rows * ext_cols];

    let sample = |x: usize, y: usize| {
        let i = (y * pw + x) * cn;
        &padded.data[i..i + cn]
    };

    for dy in -(sr as isize)..=(sr as isize) {
        for dx in -(sr as isize)..=(sr as isize) {
            // Squared differences for every pixel a patch in this band touches.
            for r in 0..ext_rows {
                let py = y0 + r + border - tr;
                let qy = (py as isize + dy) as usize;
                for c in 0..ext_cols {
                    let px = c + border - tr;
                    let qx = (px as isize + dx) as usize;
                    let p = sample(px, py);
                    let q = sample(qx, qy);
                    diff[r * ext_cols + c] = p.iter().zip(q).map(|(a, b)| (a - b) * (a - b)).sum();
                }
            }

            // Vertical running sums over the template height.
            for c in 0..ext_cols {
                let mut sum: f32 = (0..span).map(|r| diff[r * ext_cols + c]).sum();
                columns[c] = sum;
                for r in 1..rows {
                    sum += diff[(r + span - 1) * ext_cols + c] - diff[(r - 1) * ext_cols + c];
                    columns[r * ext_cols + c] = sum;
                }
            }

            // Horizontal running sums give the patch distance per pixel.
            for r in 0..rows {
                let row = &columns[r * ext_cols..(r + 1) * ext_cols];
                let mut ssd: f32 = row[..span].iter().sum();
                let qy = (y0 + r + border) as isize + dy;
                for x in 0..width {
                    if x > 0 {
                        ssd += row[x + span - 1] - row[x - 1];
                    }
                    let weight = (-ssd.max(0.0) * inv_denominator).exp();
                    if weight < WEIGHT_THRESHOLD {
                        continue;
                    }
                    let qx = (x + border) as isize + dx;
                    let q = sample(qx as usize, qy as usize);
                    weight_sums[r * width + x] += weight;
                    let base = (r * width + x) * cn;
                    for (ch, value) in q.iter().enumerate() {
                        acc[base + ch] += weight * value;
                    }
                }
            }
        }
    }

    for (i, px) in out.chunks_mut(cn).enumerate() {
        let weight = weight_sums[i];
        for (ch, v) in px.iter_mut().enumerate() {
            *v = acc[i * cn + ch] / weight;
        }
    }
}

/// Single-channel 8-bit filtering with strength `h`.
pub fn denoise_gray(samples: &[u8], width: usize, height: usize, h: f32, windows: Windows) -> Vec<u8> {
    let planes = Planes::new(width, height, 1, samples.iter().map(|&v| v as f32).collect());
    denoise_planes(&planes, h, windows)
        .data
        .into_iter()
        .map(|v| v as u8)
        .collect()
}

/// Colour filtering of interleaved RGB pixels: lightness is filtered with `h`,
/// the two chroma channels jointly with `h_color`.
pub fn denoise_rgb(pixels: &[[u8; 3]], width: usize, height: usize, h: f32, h_color: f32, windows: Windows) -> Vec<[u8; 3]> {
    let lab: Vec<[f32; 3]> = pixels.par_iter().map(|&p| lab::rgb_to_lab(p)).collect();

    let lightness = Planes::new(width, height, 1, lab.iter().map(|p| p[0]).collect());
    let chroma = Planes::new(width, height, 2, lab.iter().flat_map(|p| [p[1], p[2]]).collect());

    let lightness = denoise_planes(&lightness, h, windows);
    let chroma = denoise_planes(&chroma, h_color, windows);

    lightness
        .data
        .par_iter()
        .zip(chroma.data.par_chunks(2))
        .map(|(&l, ab)| lab::lab_to_rgb([l, ab[0], ab[1]]))
        .collect()
}
