pub mod align;
pub mod colormap;
pub mod config;
pub mod error;
pub mod image_loader;
pub mod index;
pub mod inference;
pub mod model;
pub mod output;

#[cfg(feature = "onnx")]
pub mod model_onnx;

pub use align::{ImageAligner, PadMode, PaddingSpec};
pub use config::{DatasetLayout, Device, RunConfig};
pub use error::{DisparityError, DisparityResult};
pub use index::{resolve, FramePair, SequenceTimestamps};
pub use inference::FrameDisparity;
pub use model::{find_checkpoint, CorrImplementation, ModelConfig, StereoModel};
pub use output::OutputLayout;

#[cfg(feature = "onnx")]
pub use model_onnx::OnnxStereoModel;

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub const MANIFEST_FILE: &str = "run.json";

#[derive(Clone, Debug)]
pub struct RunProgress {
	pub current_pair: usize,
	pub total_pairs: usize,
	pub stage: String,
	pub percent: f64,
}

impl RunProgress {
	pub fn new(current_pair: usize, total_pairs: usize, stage: String) -> Self {
		let percent = if total_pairs > 0 {
			(current_pair as f64 / total_pairs as f64 * 100.0).min(100.0)
		} else {
			0.0
		};
		Self {
			current_pair,
			total_pairs,
			stage,
			percent,
		}
	}
}

pub type ProgressCallback = Box<dyn Fn(RunProgress) + Send + Sync>;

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
	pub pairs: usize,
	pub files_written: usize,
	pub output_dir: PathBuf,
}

#[derive(Serialize)]
struct RunManifest<'a> {
	run: &'a RunConfig,
	model: Option<&'a ModelConfig>,
	summary: &'a RunSummary,
}

/// Resolve every frame pair of the dataset, run the model over it and write the results.
///
/// Metadata problems abort before the first image is read. Any later failure stops the run;
/// outputs of pairs already processed stay on disk.
pub fn process_dataset<M: StereoModel + ?Sized>(
	config: &RunConfig,
	model: &mut M,
	model_config: Option<&ModelConfig>,
	progress: Option<ProgressCallback>,
) -> DisparityResult<RunSummary> {
	let pairs = index::resolve(&config.metadata_glob, &config.dataset_root, &config.layout)?;
	let aligner = ImageAligner::new(config.stride, config.pad_mode)?;
	let layout = OutputLayout::for_mode(config.dual_pass);
	let total = pairs.len();

	tracing::info!(
		"Found {} images. Saving files to {}/ ({} layout)",
		total,
		config.output_dir.display(),
		layout.name()
	);
	output::prepare_output_dirs(&config.output_dir, layout)?;

	let mut files_written = 0;
	for (i, frame) in inference::run(model, pairs, config.iters, config.dual_pass, aligner).enumerate() {
		let frame = frame?;
		files_written += output::write(&config.output_dir, &frame, config.dual_pass)?.len();

		if let Some(ref cb) = progress {
			cb(RunProgress::new(i + 1, total, frame.pair.sequence.clone()));
		}
	}

	let summary = RunSummary {
		pairs: total,
		files_written,
		output_dir: config.output_dir.clone(),
	};
	write_manifest(config, model_config, &summary)?;

	tracing::info!("Wrote {} files for {} pairs", files_written, total);
	Ok(summary)
}

fn write_manifest(
	config: &RunConfig,
	model_config: Option<&ModelConfig>,
	summary: &RunSummary,
) -> DisparityResult<()> {
	let path = config.output_dir.join(MANIFEST_FILE);
	let file = File::create(&path)?;
	let manifest = RunManifest {
		run: config,
		model: model_config,
		summary,
	};
	let mut writer = BufWriter::new(file);
	serde_json::to_writer_pretty(&mut writer, &manifest)
		.map_err(|e| DisparityError::Io(format!("Failed to write {:?}: {}", path, e)))?;
	writer.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn progress_percent() {
		let p = RunProgress::new(1, 4, "MH_01".to_string());
		assert_eq!(p.percent, 25.0);
		assert_eq!(RunProgress::new(0, 0, String::new()).percent, 0.0);
	}
}
