use image::{Rgb, RgbImage};
use ndarray::Array2;
use rayon::prelude::*;

const LUT_SIZE: usize = 256;

// (x, y) control points of matplotlib's "jet", per channel.
const JET_RED: [(f32, f32); 5] = [(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: [(f32, f32); 6] = [
	(0.0, 0.0),
	(0.125, 0.0),
	(0.375, 1.0),
	(0.64, 1.0),
	(0.91, 0.0),
	(1.0, 0.0),
];
const JET_BLUE: [(f32, f32); 5] = [(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

fn interpolate(points: &[(f32, f32)], t: f32) -> f32 {
	for window in points.windows(2) {
		let (x0, y0) = window[0];
		let (x1, y1) = window[1];
		if t <= x1 {
			return y0 + (y1 - y0) * (t - x0) / (x1 - x0);
		}
	}
	points[points.len() - 1].1
}

/// Jet color for `t` in `[0, 1]`, quantized to a 256-entry table.
pub fn jet(t: f32) -> Rgb<u8> {
	let index = if t.is_nan() {
		0
	} else {
		((t * LUT_SIZE as f32) as usize).min(LUT_SIZE - 1)
	};
	let x = index as f32 / (LUT_SIZE - 1) as f32;

	let channel = |points: &[(f32, f32)]| (interpolate(points, x).clamp(0.0, 1.0) * 255.0) as u8;
	Rgb([channel(&JET_RED), channel(&JET_GREEN), channel(&JET_BLUE)])
}

/// Render a field with the jet map, scaled between its finite minimum and maximum.
pub fn colorize(field: &Array2<f32>) -> RgbImage {
	let (height, width) = field.dim();

	let (min, max) = field
		.iter()
		.copied()
		.filter(|v| v.is_finite())
		.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
	let range = max - min;

	let values: Vec<f32> = field.iter().copied().collect();
	let mut buffer = vec![0u8; width * height * 3];

	buffer
		.par_chunks_mut(3)
		.zip(values.par_iter())
		.for_each(|(pixel, &v)| {
			let t = if range > 0.0 && range.is_finite() {
				((v - min) / range).clamp(0.0, 1.0)
			} else {
				0.0
			};
			pixel.copy_from_slice(&jet(t).0);
		});

	RgbImage::from_raw(width as u32, height as u32, buffer)
		.unwrap_or_else(|| RgbImage::new(width as u32, height as u32))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn jet_endpoints() {
		assert_eq!(jet(0.0), Rgb([0, 0, 127]));
		assert_eq!(jet(1.0), Rgb([127, 0, 0]));
		assert_eq!(jet(2.0), jet(1.0));
	}

	#[test]
	fn jet_midpoint_is_greenish() {
		let Rgb([r, g, b]) = jet(0.5);
		assert!(g > 200);
		assert!(r < 160 && b < 160);
	}

	#[test]
	fn colorize_scales_to_field_range() {
		let field = Array2::from_shape_vec((1, 3), vec![10.0, 20.0, 30.0]).unwrap();
		let img = colorize(&field);
		assert_eq!(img.dimensions(), (3, 1));
		assert_eq!(*img.get_pixel(0, 0), jet(0.0));
		assert_eq!(*img.get_pixel(2, 0), jet(1.0));
	}

	#[test]
	fn constant_field_is_uniform() {
		let img = colorize(&Array2::from_elem((2, 2), 5.0));
		assert!(img.pixels().all(|p| *p == jet(0.0)));
	}
}
