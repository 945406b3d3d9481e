//! Chart Rendering
//!
//! Minimal PNG charts for lab write-ups: time series, spectra, histogram
//! against its Gaussian, and SNR-vs-averaging curves. Pixels are drawn by
//! hand; there is no plotting framework here, and collaborators that want
//! publication figures export CSV and use their own tools.

use image::{codecs::png::PngEncoder, ExtendedColorType, ImageBuffer, ImageEncoder, Rgb};

use crate::analysis::averaging::AveragingSweep;
use crate::analysis::spectrum::Spectrum;
use crate::analysis::statistics::GaussianFit;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 320;
const MARGIN: u32 = 10;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([200, 200, 200]);
const SERIES: Rgb<u8> = Rgb([0, 100, 200]);
const OVERLAY: Rgb<u8> = Rgb([200, 40, 40]);

type Canvas = ImageBuffer<Rgb<u8>, Vec<u8>>;

fn blank_canvas() -> Canvas {
    let mut img = ImageBuffer::new(WIDTH, HEIGHT);
    for pixel in img.pixels_mut() {
        *pixel = BACKGROUND;
    }
    for x in 0..WIDTH {
        img.put_pixel(x, HEIGHT - MARGIN, AXIS);
    }
    for y in 0..HEIGHT {
        img.put_pixel(MARGIN, y, AXIS);
    }
    img
}

fn encode(img: &Canvas) -> Vec<u8> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new(&mut buffer);
    encoder
        .write_image(img, WIDTH, HEIGHT, ExtendedColorType::Rgb8)
        .expect("Failed to encode PNG");
    buffer
}

/// Data-to-pixel mapping for the plot area inside the margins.
struct AxisMap {
    x_min: f64,
    x_span: f64,
    y_min: f64,
    y_span: f64,
}

impl AxisMap {
    fn new(x_bounds: (f64, f64), y_bounds: (f64, f64)) -> Self {
        let x_span = x_bounds.1 - x_bounds.0;
        let y_span = y_bounds.1 - y_bounds.0;
        Self {
            x_min: x_bounds.0,
            x_span: if x_span == 0.0 { 1.0 } else { x_span },
            y_min: y_bounds.0,
            y_span: if y_span == 0.0 { 1.0 } else { y_span },
        }
    }

    fn px(&self, x: f64) -> f64 {
        let usable = (WIDTH - 2 * MARGIN - 1) as f64;
        (MARGIN + 1) as f64 + (x - self.x_min) / self.x_span * usable
    }

    fn py(&self, y: f64) -> f64 {
        let usable = (HEIGHT - 2 * MARGIN - 1) as f64;
        (HEIGHT - MARGIN - 1) as f64 - (y - self.y_min) / self.y_span * usable
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

fn draw_segment(img: &mut Canvas, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb<u8>) {
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil() as u32;
    for i in 0..=steps {
        let t = if steps == 0 {
            0.0
        } else {
            i as f64 / steps as f64
        };
        let x = (x0 + (x1 - x0) * t).round();
        let y = (y0 + (y1 - y0) * t).round();
        if x >= 0.0 && y >= 0.0 && (x as u32) < WIDTH && (y as u32) < HEIGHT {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn draw_polyline(img: &mut Canvas, map: &AxisMap, xs: &[f64], ys: &[f64], color: Rgb<u8>) {
    for i in 1..xs.len().min(ys.len()) {
        draw_segment(
            img,
            map.px(xs[i - 1]),
            map.py(ys[i - 1]),
            map.px(xs[i]),
            map.py(ys[i]),
            color,
        );
    }
}

fn draw_marker(img: &mut Canvas, map: &AxisMap, x: f64, y: f64, color: Rgb<u8>) {
    let cx = map.px(x).round() as i64;
    let cy = map.py(y).round() as i64;
    for dx in -1..=1 {
        for dy in -1..=1 {
            let px = cx + dx;
            let py = cy + dy;
            if px >= 0 && py >= 0 && (px as u32) < WIDTH && (py as u32) < HEIGHT {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Line plot of the first `max_points` samples against time.
pub fn time_series_png(samples: &[f64], sample_rate: f64, max_points: usize) -> Vec<u8> {
    let mut img = blank_canvas();
    let shown = &samples[..samples.len().min(max_points.max(2))];
    if shown.len() >= 2 {
        let dt = if sample_rate > 0.0 {
            1.0 / sample_rate
        } else {
            1.0
        };
        let xs: Vec<f64> = (0..shown.len()).map(|i| i as f64 * dt).collect();
        let map = AxisMap::new(bounds(&xs), bounds(shown));
        draw_polyline(&mut img, &map, &xs, shown, SERIES);
    }
    encode(&img)
}

/// Bar plot of a spectrum. With `log_scale` the values are compressed to
/// decibels before drawing.
pub fn spectrum_png(spectrum: &Spectrum, log_scale: bool) -> Vec<u8> {
    let mut img = blank_canvas();
    let values: Vec<f64> = if log_scale {
        spectrum
            .values
            .iter()
            .map(|&v| 10.0 * v.max(1e-20).log10())
            .collect()
    } else {
        spectrum.values.clone()
    };

    let map = AxisMap::new(bounds(&spectrum.frequencies), bounds(&values));
    let base = map.py(bounds(&values).0);
    for (f, v) in spectrum.frequencies.iter().zip(&values) {
        let x = map.px(*f);
        // Vertical fill from the floor up to the value
        draw_segment(&mut img, x, base, x, map.py(*v), SERIES);
    }
    encode(&img)
}

/// Density histogram bars with the plug-in Gaussian drawn over them.
pub fn histogram_png(fit: &GaussianFit) -> Vec<u8> {
    let mut img = blank_canvas();

    let mut y_max = 0.0f64;
    for &d in fit.density.iter().chain(&fit.curve) {
        y_max = y_max.max(d);
    }
    let map = AxisMap::new(bounds(&fit.bin_centers), (0.0, y_max));

    let base = map.py(0.0);
    let half_bin = fit.bin_width / 2.0;
    for (&center, &density) in fit.bin_centers.iter().zip(&fit.density) {
        let x0 = map.px(center - half_bin).round();
        let x1 = map.px(center + half_bin).round();
        let top = map.py(density);
        let mut x = x0;
        while x <= x1 {
            draw_segment(&mut img, x, base, x, top, SERIES);
            x += 1.0;
        }
    }

    draw_polyline(&mut img, &map, &fit.bin_centers, &fit.curve, OVERLAY);
    encode(&img)
}

/// SNR against averaging depth, with a √depth guide for comparison.
pub fn snr_sweep_png(sweep: &AveragingSweep) -> Vec<u8> {
    let mut img = blank_canvas();
    if sweep.depths.is_empty() {
        return encode(&img);
    }

    let xs: Vec<f64> = sweep.depths.iter().map(|&d| d as f64).collect();
    let first = sweep.snr.first().copied().unwrap_or(1.0);
    let guide: Vec<f64> = xs.iter().map(|&d| first * d.sqrt()).collect();

    let mut all = sweep.snr.clone();
    all.extend_from_slice(&guide);
    let map = AxisMap::new(bounds(&xs), bounds(&all));

    draw_polyline(&mut img, &map, &xs, &guide, OVERLAY);
    draw_polyline(&mut img, &map, &xs, &sweep.snr, SERIES);
    for (&x, &y) in xs.iter().zip(&sweep.snr) {
        draw_marker(&mut img, &map, x, y, SERIES);
    }
    encode(&img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{snr_vs_averaging, GaussianFit, SpectralEstimator};
    use crate::types::SampleBuffer;

    const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];

    #[test]
    fn test_time_series_is_png() {
        let samples: Vec<f64> = (0..500).map(|i| (i as f64 * 0.05).sin()).collect();
        let png = time_series_png(&samples, 1000.0, 200);
        assert_eq!(&png[..4], &PNG_MAGIC);
    }

    #[test]
    fn test_spectrum_chart_is_png() {
        let tone: Vec<f64> = (0..256)
            .map(|i| (2.0 * std::f64::consts::PI * 50.0 * i as f64 / 1000.0).sin())
            .collect();
        let spectrum = SpectralEstimator::new()
            .power(&SampleBuffer::Real(tone), 1000.0)
            .unwrap();
        assert_eq!(&spectrum_png(&spectrum, false)[..4], &PNG_MAGIC);
        assert_eq!(&spectrum_png(&spectrum, true)[..4], &PNG_MAGIC);
    }

    #[test]
    fn test_histogram_chart_is_png() {
        let data: Vec<f64> = (0..512).map(|i| ((i * 37) % 101) as f64 / 50.0).collect();
        let fit = GaussianFit::compute(&data, 20).unwrap();
        assert_eq!(&histogram_png(&fit)[..4], &PNG_MAGIC);
    }

    #[test]
    fn test_snr_chart_is_png() {
        let blocks: Vec<Vec<f64>> = (0..4)
            .map(|b| {
                (0..128)
                    .map(|i| (((b * 131 + i * 37) % 101) as f64 / 50.0) - 1.0)
                    .collect()
            })
            .collect();
        let refs: Vec<&[f64]> = blocks.iter().map(|b| b.as_slice()).collect();
        let sweep = snr_vs_averaging(&refs, 1000.0).unwrap();
        assert_eq!(&snr_sweep_png(&sweep)[..4], &PNG_MAGIC);
    }
}
