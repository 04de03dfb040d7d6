use crate::colormap::colorize;
use crate::error::{DisparityError, DisparityResult};
use crate::index::FramePair;
use crate::inference::FrameDisparity;
use ndarray::Array2;
use ndarray_npy::WriteNpyExt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

pub const IMAGES_DIR: &str = "images";
pub const DEPTH_DIR: &str = "depth";

/// Where arrays and visualizations go under the output root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLayout {
	/// `<root>/<stem>.npy` and `<root>/<stem>.png`.
	Flat,
	/// `<root>/depth/<stem>.npy` and `<root>/images/<stem>.png`.
	Split,
}

impl OutputLayout {
	pub fn for_mode(dual_pass: bool) -> Self {
		if dual_pass {
			OutputLayout::Split
		} else {
			OutputLayout::Flat
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			OutputLayout::Flat => "flat",
			OutputLayout::Split => "images+depth",
		}
	}

	fn array_path(&self, root: &Path, stem: &str) -> PathBuf {
		match self {
			OutputLayout::Flat => root.join(format!("{}.npy", stem)),
			OutputLayout::Split => root.join(DEPTH_DIR).join(format!("{}.npy", stem)),
		}
	}

	fn image_path(&self, root: &Path, stem: &str) -> PathBuf {
		match self {
			OutputLayout::Flat => root.join(format!("{}.png", stem)),
			OutputLayout::Split => root.join(IMAGES_DIR).join(format!("{}.png", stem)),
		}
	}
}

/// Output names for both images of a pair: `<sequence>-<camera>-<timestamp>`.
///
/// The camera is the one path component where the left and right paths differ, so any
/// camera subpath depth works. Unlike the original tool's names (`MH_01-cam0-100.png.png`),
/// the image extension is not kept in the stem.
pub fn pair_stems(pair: &FramePair) -> DisparityResult<(String, String)> {
	let invalid = |path: &Path, msg: &str| DisparityError::InvalidPath {
		path: path.to_path_buf(),
		msg: msg.to_string(),
	};

	let left: Vec<Component> = pair.left.components().collect();
	let right: Vec<Component> = pair.right.components().collect();
	if left.len() != right.len() {
		return Err(invalid(&pair.right, "left and right paths differ in depth"));
	}

	let (left_camera, right_camera) = left
		.iter()
		.zip(&right)
		.find(|(l, r)| l != r)
		.and_then(|(l, r)| Some((l.as_os_str().to_str()?, r.as_os_str().to_str()?)))
		.ok_or_else(|| invalid(&pair.left, "no camera component differs between left and right"))?;

	let file_stem = |path: &Path| {
		path.file_stem()
			.and_then(|s| s.to_str())
			.map(str::to_string)
			.ok_or_else(|| invalid(path, "file name is not valid UTF-8"))
	};

	Ok((
		format!("{}-{}-{}", pair.sequence, left_camera, file_stem(&pair.left)?),
		format!("{}-{}-{}", pair.sequence, right_camera, file_stem(&pair.right)?),
	))
}

/// Create the output root and, in split mode, its `images/` and `depth/` subdirectories.
pub fn prepare_output_dirs(output_root: &Path, layout: OutputLayout) -> DisparityResult<()> {
	let dirs = match layout {
		OutputLayout::Flat => vec![output_root.to_path_buf()],
		OutputLayout::Split => vec![output_root.join(IMAGES_DIR), output_root.join(DEPTH_DIR)],
	};

	for dir in dirs {
		std::fs::create_dir_all(&dir).map_err(|e| {
			DisparityError::Io(format!("Failed to create output directory {:?}: {}", dir, e))
		})?;
	}

	Ok(())
}

/// Write one frame's disparity, returning the paths written.
pub fn write(
	output_root: &Path,
	frame: &FrameDisparity,
	dual_pass: bool,
) -> DisparityResult<Vec<PathBuf>> {
	let layout = OutputLayout::for_mode(dual_pass);
	prepare_output_dirs(output_root, layout)?;

	let mut written = Vec::with_capacity(4);
	let (left_stem, right_stem) = pair_stems(&frame.pair)?;
	written.extend(save_field(output_root, layout, &left_stem, &frame.left)?);

	if dual_pass {
		let right = frame.right.as_ref().ok_or_else(|| {
			DisparityError::Config("Dual-pass output requested without a right disparity".to_string())
		})?;
		written.extend(save_field(output_root, layout, &right_stem, right)?);
	}

	Ok(written)
}

fn save_field(
	root: &Path,
	layout: OutputLayout,
	stem: &str,
	field: &Array2<f32>,
) -> DisparityResult<[PathBuf; 2]> {
	let array_path = layout.array_path(root, stem);
	let image_path = layout.image_path(root, stem);

	save_array(field, &array_path)?;
	colorize(field).save(&image_path).map_err(|e| {
		DisparityError::Io(format!("Failed to save visualization {:?}: {}", image_path, e))
	})?;

	Ok([array_path, image_path])
}

fn save_array(field: &Array2<f32>, path: &Path) -> DisparityResult<()> {
	let file = File::create(path)
		.map_err(|e| DisparityError::Io(format!("Failed to create {:?}: {}", path, e)))?;
	let mut writer = BufWriter::new(file);
	field
		.write_npy(&mut writer)
		.map_err(|e| DisparityError::Io(format!("Failed to write {:?}: {}", path, e)))?;
	writer.flush()?;
	Ok(())
}
