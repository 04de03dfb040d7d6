use crate::error::{DisparityError, DisparityResult};
use crate::image_loader::ImageTensor;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A stereo disparity network used for inference only.
///
/// `left` and `right` share one padded shape `(1, 3, H, W)`; the returned field is `H × W`,
/// in pixels.
pub trait StereoModel {
	fn infer(
		&mut self,
		left: &ImageTensor,
		right: &ImageTensor,
		iters: u32,
	) -> DisparityResult<Array2<f32>>;
}

impl<M: StereoModel + ?Sized> StereoModel for Box<M> {
	fn infer(
		&mut self,
		left: &ImageTensor,
		right: &ImageTensor,
		iters: u32,
	) -> DisparityResult<Array2<f32>> {
		(**self).infer(left, right, iters)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrImplementation {
	#[default]
	Reg,
	Alt,
	RegCuda,
	AltCuda,
}

impl fmt::Display for CorrImplementation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			CorrImplementation::Reg => "reg",
			CorrImplementation::Alt => "alt",
			CorrImplementation::RegCuda => "reg_cuda",
			CorrImplementation::AltCuda => "alt_cuda",
		};
		f.write_str(name)
	}
}

/// Architecture hyperparameters of the disparity network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
	pub hidden_dims: Vec<u32>,
	pub corr_implementation: CorrImplementation,
	pub shared_backbone: bool,
	pub corr_levels: u32,
	pub corr_radius: u32,
	pub n_downsample: u32,
	pub slow_fast_gru: bool,
	pub n_gru_layers: u32,
	pub max_disp: u32,
	pub mixed_precision: bool,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			hidden_dims: vec![128; 3],
			corr_implementation: CorrImplementation::Reg,
			shared_backbone: false,
			corr_levels: 2,
			corr_radius: 4,
			n_downsample: 2,
			slow_fast_gru: false,
			n_gru_layers: 3,
			max_disp: 192,
			mixed_precision: false,
		}
	}
}

impl ModelConfig {
	/// Reject combinations the network cannot be constructed with.
	pub fn check(&self) -> DisparityResult<()> {
		if self.n_gru_layers == 0 {
			return Err(DisparityError::Config("n_gru_layers must be at least 1".to_string()));
		}
		if self.hidden_dims.len() < self.n_gru_layers as usize {
			return Err(DisparityError::Config(format!(
				"{} GRU layers need as many hidden dims, got {:?}",
				self.n_gru_layers, self.hidden_dims
			)));
		}
		Ok(())
	}
}

/// Find a checkpoint file.
///
/// An existing `checkpoint` path is used as is. Otherwise its file name is looked up in:
/// 1. `IGEV_CHECKPOINTS` env var
/// 2. `~/.euroc-disparity/checkpoints/`
/// 3. XDG data directory
/// 4. `./pretrained_models/`
pub fn find_checkpoint(checkpoint: impl AsRef<Path>) -> DisparityResult<PathBuf> {
	let checkpoint = checkpoint.as_ref();
	if checkpoint.exists() {
		return Ok(checkpoint.to_path_buf());
	}

	let name = checkpoint
		.file_name()
		.ok_or_else(|| DisparityError::Config(format!("Invalid checkpoint path: {:?}", checkpoint)))?;

	let mut search_paths = Vec::new();
	if let Ok(env_dir) = std::env::var("IGEV_CHECKPOINTS") {
		search_paths.push(PathBuf::from(env_dir).join(name));
	}
	search_paths.extend([
		dirs::home_dir()
			.unwrap_or_default()
			.join(".euroc-disparity")
			.join("checkpoints")
			.join(name),
		dirs::data_dir()
			.unwrap_or_default()
			.join("euroc-disparity")
			.join("checkpoints")
			.join(name),
		PathBuf::from("pretrained_models").join(name),
	]);

	if let Some(found) = search_paths.iter().find(|p| p.exists()) {
		return Ok(found.clone());
	}

	Err(DisparityError::Config(format!(
		"Checkpoint {:?} not found.\nSearched locations:\n{}",
		checkpoint,
		search_paths
			.iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)))
}
