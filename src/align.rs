use crate::error::{DisparityError, DisparityResult};
use crate::image_loader::ImageTensor;
use ndarray::{s, Array2, Array4};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STRIDE: usize = 32;

/// How the padding needed on each axis is distributed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadMode {
	/// Split evenly on both axes, the odd pixel going to the trailing edge.
	#[default]
	Sintel,
	/// Width split as `Sintel`, height padded at the bottom only.
	Kitti,
}

/// Padding applied to one frame pair, recorded so it can be undone on the model output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaddingSpec {
	pub height: usize,
	pub width: usize,
	pub top: usize,
	pub bottom: usize,
	pub left: usize,
	pub right: usize,
}

impl PaddingSpec {
	pub fn padded_dims(&self) -> (usize, usize) {
		(
			self.height + self.top + self.bottom,
			self.width + self.left + self.right,
		)
	}

	/// Pad an image tensor, replicating its edge pixels.
	pub fn pad(&self, image: &ImageTensor) -> DisparityResult<ImageTensor> {
		let (n, c, h, w) = image.dim();
		if (h, w) != (self.height, self.width) {
			return Err(DisparityError::ShapeMismatch {
				expected: (self.height, self.width),
				actual: (h, w),
			});
		}

		let (ph, pw) = self.padded_dims();
		if h == 0 || w == 0 {
			return Ok(Array4::zeros((n, c, ph, pw)));
		}

		Ok(Array4::from_shape_fn((n, c, ph, pw), |(b, ch, y, x)| {
			let sy = y.saturating_sub(self.top).min(h - 1);
			let sx = x.saturating_sub(self.left).min(w - 1);
			image[[b, ch, sy, sx]]
		}))
	}

	/// Crop a padded-resolution field back to the original resolution.
	pub fn unpad(&self, field: &Array2<f32>) -> DisparityResult<Array2<f32>> {
		let padded = self.padded_dims();
		if field.dim() != padded {
			return Err(DisparityError::ShapeMismatch {
				expected: padded,
				actual: field.dim(),
			});
		}

		Ok(field
			.slice(s![
				self.top..self.top + self.height,
				self.left..self.left + self.width
			])
			.to_owned())
	}
}

#[derive(Clone, Copy, Debug)]
pub struct ImageAligner {
	stride: usize,
	mode: PadMode,
}

impl Default for ImageAligner {
	fn default() -> Self {
		Self {
			stride: DEFAULT_STRIDE,
			mode: PadMode::Sintel,
		}
	}
}

impl ImageAligner {
	pub fn new(stride: usize, mode: PadMode) -> DisparityResult<Self> {
		if stride == 0 {
			return Err(DisparityError::Config("Alignment stride must be positive".to_string()));
		}
		Ok(Self { stride, mode })
	}

	pub fn stride(&self) -> usize {
		self.stride
	}

	pub fn spec_for(&self, height: usize, width: usize) -> PaddingSpec {
		let pad_h = (self.stride - height % self.stride) % self.stride;
		let pad_w = (self.stride - width % self.stride) % self.stride;

		let (top, bottom) = match self.mode {
			PadMode::Sintel => (pad_h / 2, pad_h - pad_h / 2),
			PadMode::Kitti => (0, pad_h),
		};

		PaddingSpec {
			height,
			width,
			top,
			bottom,
			left: pad_w / 2,
			right: pad_w - pad_w / 2,
		}
	}

	/// Pad equally-shaped images to the stride. Padding is derived from the first image.
	pub fn pad(&self, images: &[&ImageTensor]) -> DisparityResult<(Vec<ImageTensor>, PaddingSpec)> {
		let first = images
			.first()
			.ok_or_else(|| DisparityError::Config("No images to pad".to_string()))?;
		let (_, _, h, w) = first.dim();
		let spec = self.spec_for(h, w);

		let padded = images
			.iter()
			.map(|image| spec.pad(image))
			.collect::<DisparityResult<Vec<_>>>()?;

		Ok((padded, spec))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ramp(h: usize, w: usize) -> ImageTensor {
		Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| (c * 10_000 + y * 100 + x) as f32)
	}

	#[test]
	fn euroc_frame_pads_width_only() {
		let aligner = ImageAligner::default();
		let image = ramp(480, 752);
		let (padded, spec) = aligner.pad(&[&image, &image]).unwrap();

		assert_eq!(padded.len(), 2);
		assert_eq!(padded[0].dim(), (1, 3, 480, 768));
		assert_eq!((spec.top, spec.bottom, spec.left, spec.right), (0, 0, 8, 8));

		let field = Array2::<f32>::zeros((480, 768));
		assert_eq!(spec.unpad(&field).unwrap().dim(), (480, 752));
	}

	#[test]
	fn unpad_inverts_pad() {
		for stride in [16, 32, 64] {
			for mode in [PadMode::Sintel, PadMode::Kitti] {
				for (h, w) in [(48, 64), (37, 51), (64, 33), (1, 1)] {
					let aligner = ImageAligner::new(stride, mode).unwrap();
					let image = ramp(h, w);
					let (padded, spec) = aligner.pad(&[&image]).unwrap();

					let (ph, pw) = spec.padded_dims();
					assert_eq!(ph % stride, 0);
					assert_eq!(pw % stride, 0);
					assert!(ph - h < stride && pw - w < stride);

					let field = padded[0].slice(s![0, 1, .., ..]).to_owned();
					let restored = spec.unpad(&field).unwrap();
					assert_eq!(restored, image.slice(s![0, 1, .., ..]));
				}
			}
		}
	}

	#[test]
	fn padding_replicates_edges() {
		let aligner = ImageAligner::new(4, PadMode::Sintel).unwrap();
		let image = ramp(2, 2);
		let (padded, spec) = aligner.pad(&[&image]).unwrap();
		assert_eq!((spec.top, spec.left), (1, 1));
		assert_eq!(padded[0][[0, 0, 0, 0]], image[[0, 0, 0, 0]]);
		assert_eq!(padded[0][[0, 0, 3, 3]], image[[0, 0, 1, 1]]);
	}

	#[test]
	fn kitti_mode_pads_bottom() {
		let spec = ImageAligner::new(32, PadMode::Kitti).unwrap().spec_for(370, 1226);
		assert_eq!((spec.top, spec.bottom), (0, 14));
		assert_eq!((spec.left, spec.right), (11, 11));
	}

	#[test]
	fn mismatched_images_are_rejected() {
		let aligner = ImageAligner::default();
		let err = aligner.pad(&[&ramp(480, 752), &ramp(480, 640)]).unwrap_err();
		assert!(matches!(
			err,
			DisparityError::ShapeMismatch {
				expected: (480, 752),
				actual: (480, 640)
			}
		));
	}

	#[test]
	fn unpad_rejects_wrong_shape() {
		let spec = ImageAligner::default().spec_for(480, 752);
		let err = spec.unpad(&Array2::zeros((480, 752))).unwrap_err();
		assert!(matches!(err, DisparityError::ShapeMismatch { .. }));
	}

	#[test]
	fn zero_stride_is_a_config_error() {
		assert!(ImageAligner::new(0, PadMode::Sintel).is_err());
	}
}
