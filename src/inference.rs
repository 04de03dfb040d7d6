//! Frame-by-frame inference over resolved stereo pairs.
//!
//! Every pair is loaded, padded to the aligner's stride, passed through the model and cropped
//! back. With the dual pass enabled a second estimate is taken from the rotated pair (both images
//! flipped along height and width, fed right-first), which yields disparity from the right
//! camera's viewpoint once the field is rotated back.

use crate::align::ImageAligner;
use crate::error::DisparityResult;
use crate::image_loader::{load_image, ImageTensor};
use crate::index::FramePair;
use crate::model::StereoModel;
use ndarray::{s, Array2};

/// Disparity estimated for one frame pair.
#[derive(Clone, Debug)]
pub struct FrameDisparity {
	pub pair: FramePair,
	/// Left-camera disparity at the original image resolution.
	pub left: Array2<f32>,
	/// Right-camera disparity, present in dual-pass mode.
	pub right: Option<Array2<f32>>,
}

/// Lazy iterator over model results. Stops after the first error.
pub struct Inference<'m, M: StereoModel + ?Sized> {
	model: &'m mut M,
	pairs: std::vec::IntoIter<FramePair>,
	aligner: ImageAligner,
	iters: u32,
	dual_pass: bool,
	failed: bool,
}

pub fn run<M: StereoModel + ?Sized>(
	model: &mut M,
	pairs: Vec<FramePair>,
	iters: u32,
	dual_pass: bool,
	aligner: ImageAligner,
) -> Inference<'_, M> {
	Inference {
		model,
		pairs: pairs.into_iter(),
		aligner,
		iters,
		dual_pass,
		failed: false,
	}
}

impl<M: StereoModel + ?Sized> Iterator for Inference<'_, M> {
	type Item = DisparityResult<FrameDisparity>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.failed {
			return None;
		}

		let pair = self.pairs.next()?;
		let result = infer_pair(
			&mut *self.model,
			&self.aligner,
			pair,
			self.iters,
			self.dual_pass,
		);
		self.failed = result.is_err();
		Some(result)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		if self.failed {
			(0, Some(0))
		} else {
			(0, Some(self.pairs.len()))
		}
	}
}

pub fn infer_pair<M: StereoModel + ?Sized>(
	model: &mut M,
	aligner: &ImageAligner,
	pair: FramePair,
	iters: u32,
	dual_pass: bool,
) -> DisparityResult<FrameDisparity> {
	let left_image = load_image(&pair.left)?;
	let right_image = load_image(&pair.right)?;

	let (padded, spec) = aligner.pad(&[&left_image, &right_image])?;
	let disparity = model.infer(&padded[0], &padded[1], iters)?;
	let left = spec.unpad(&disparity)?;
	drop(padded);

	let right = if dual_pass {
		let flipped_left = spec.pad(&flip_image(&left_image))?;
		let flipped_right = spec.pad(&flip_image(&right_image))?;
		let disparity = model.infer(&flipped_right, &flipped_left, iters)?;
		Some(flip_field(&spec.unpad(&disparity)?))
	} else {
		None
	};

	tracing::debug!(
		"{} @ {}: {}x{} disparity{}",
		pair.sequence,
		pair.timestamp,
		left.ncols(),
		left.nrows(),
		if right.is_some() { " (dual pass)" } else { "" }
	);

	Ok(FrameDisparity { pair, left, right })
}

/// Reverse an image along both spatial axes.
pub fn flip_image(image: &ImageTensor) -> ImageTensor {
	image.slice(s![.., .., ..;-1, ..;-1]).to_owned()
}

/// Reverse a field along both spatial axes.
pub fn flip_field(field: &Array2<f32>) -> Array2<f32> {
	field.slice(s![..;-1, ..;-1]).to_owned()
}
