use crate::error::{DisparityError, DisparityResult};
use image::DynamicImage;
use ndarray::Array4;
use std::path::Path;

/// A batch-of-one RGB image, shape `(1, 3, H, W)`, raw 0..=255 intensities.
pub type ImageTensor = Array4<f32>;

pub fn load_image(path: impl AsRef<Path>) -> DisparityResult<ImageTensor> {
	let path = path.as_ref();

	if !path.exists() {
		return Err(DisparityError::ImageLoad {
			path: path.to_path_buf(),
			msg: "Image file not found".to_string(),
		});
	}

	let extension = path
		.extension()
		.and_then(|ext| ext.to_str())
		.map(|s| s.to_lowercase())
		.ok_or_else(|| DisparityError::ImageLoad {
			path: path.to_path_buf(),
			msg: "File has no extension".to_string(),
		})?;

	match extension.as_str() {
		"jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp" => {
			let img = load_standard(path)?;
			Ok(to_tensor(&img))
		}
		_ => Err(DisparityError::ImageLoad {
			path: path.to_path_buf(),
			msg: format!("Unsupported image format: .{}", extension),
		}),
	}
}

fn load_standard(path: &Path) -> DisparityResult<DynamicImage> {
	image::open(path).map_err(|e| DisparityError::ImageLoad {
		path: path.to_path_buf(),
		msg: e.to_string(),
	})
}

/// Convert to NCHW float layout. Grayscale images have their channel replicated.
pub fn to_tensor(img: &DynamicImage) -> ImageTensor {
	let rgb = img.to_rgb8();
	let (width, height) = rgb.dimensions();

	Array4::from_shape_fn(
		(1, 3, height as usize, width as usize),
		|(_, c, y, x)| rgb.get_pixel(x as u32, y as u32)[c] as f32,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{GrayImage, Luma, Rgb, RgbImage};

	#[test]
	fn grayscale_is_replicated_to_three_channels() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("gray.png");
		GrayImage::from_fn(5, 3, |x, y| Luma([(x * 10 + y) as u8]))
			.save(&path)
			.unwrap();

		let tensor = load_image(&path).unwrap();
		assert_eq!(tensor.dim(), (1, 3, 3, 5));
		for c in 0..3 {
			assert_eq!(tensor[[0, c, 2, 4]], 42.0);
		}
	}

	#[test]
	fn rgb_channels_keep_their_order() {
		let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
		let tensor = to_tensor(&img);
		assert_eq!(tensor[[0, 0, 1, 1]], 1.0);
		assert_eq!(tensor[[0, 1, 1, 1]], 2.0);
		assert_eq!(tensor[[0, 2, 1, 1]], 3.0);
	}

	#[test]
	fn missing_file_is_an_image_load_error() {
		let err = load_image("does/not/exist.png").unwrap_err();
		assert!(matches!(err, DisparityError::ImageLoad { .. }));
	}

	#[test]
	fn corrupt_file_is_an_image_load_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("broken.png");
		std::fs::write(&path, b"not a png").unwrap();
		assert!(matches!(load_image(&path), Err(DisparityError::ImageLoad { .. })));
	}
}
