use crate::align::PadMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Execution device handed to model backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
	#[default]
	Cpu,
	Cuda(usize),
}

impl fmt::Display for Device {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Device::Cpu => write!(f, "cpu"),
			Device::Cuda(id) => write!(f, "cuda:{}", id),
		}
	}
}

impl FromStr for Device {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim().to_lowercase();
		match s.as_str() {
			"cpu" => Ok(Device::Cpu),
			"cuda" => Ok(Device::Cuda(0)),
			_ => match s.strip_prefix("cuda:") {
				Some(id) => id
					.parse()
					.map(Device::Cuda)
					.map_err(|_| format!("Invalid CUDA device ordinal: {}", id)),
				None => Err(format!("Unknown device '{}'. Use: cpu, cuda, cuda:N", s)),
			},
		}
	}
}

/// Where the camera images live inside one sequence directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLayout {
	/// Subpath from the sequence directory to the left camera's images.
	pub camera_subpath: PathBuf,
	pub left_camera: String,
	pub right_camera: String,
	pub image_extension: String,
}

impl Default for DatasetLayout {
	fn default() -> Self {
		Self {
			camera_subpath: PathBuf::from("mav0/cam0/data"),
			left_camera: "cam0".to_string(),
			right_camera: "cam1".to_string(),
			image_extension: "png".to_string(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
	pub metadata_glob: String,
	pub dataset_root: PathBuf,
	pub output_dir: PathBuf,
	pub iters: u32,
	pub dual_pass: bool,
	pub stride: usize,
	pub pad_mode: PadMode,
	pub layout: DatasetLayout,
	pub device: Device,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			metadata_glob: "data/sample_euroc/*.csv".to_string(),
			dataset_root: PathBuf::from("data/EuRoC/"),
			output_dir: PathBuf::from("./demo-output/"),
			iters: 32,
			dual_pass: false,
			stride: 32,
			pad_mode: PadMode::Sintel,
			layout: DatasetLayout::default(),
			device: Device::Cpu,
		}
	}
}
