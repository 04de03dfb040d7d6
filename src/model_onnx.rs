use crate::config::Device;
use crate::error::{DisparityError, DisparityResult};
use crate::image_loader::ImageTensor;
use crate::model::{ModelConfig, StereoModel};
use ndarray::Array2;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;

/// A disparity network exported to ONNX, taking `(left, right)` and returning the final
/// disparity estimate. The refinement iteration count is fixed when the graph is exported.
pub struct OnnxStereoModel {
	session: Session,
	export_iters: Option<u32>,
	warned: bool,
}

impl OnnxStereoModel {
	pub fn new(
		model_path: impl AsRef<Path>,
		config: &ModelConfig,
		device: Device,
	) -> DisparityResult<Self> {
		config.check()?;
		let model_path = model_path.as_ref();

		let mut builder = Session::builder()
			.map_err(|e| DisparityError::ModelInference(format!("Failed to create session: {}", e)))?
			.with_optimization_level(GraphOptimizationLevel::Level3)
			.map_err(|e| DisparityError::ModelInference(format!("Failed to set opt level: {}", e)))?;

		if let Device::Cuda(id) = device {
			builder = builder
				.with_execution_providers([CUDAExecutionProvider::default()
					.with_device_id(id as i32)
					.build()])
				.map_err(|e| {
					DisparityError::ModelInference(format!("Failed to select {}: {}", device, e))
				})?;
		}

		let session = builder.commit_from_file(model_path).map_err(|e| {
			DisparityError::ModelInference(format!("Failed to load ONNX model {:?}: {}", model_path, e))
		})?;

		tracing::info!(
			"Loaded ONNX model {:?} on {} (corr={}, levels={}, radius={}, max_disp={})",
			model_path,
			device,
			config.corr_implementation,
			config.corr_levels,
			config.corr_radius,
			config.max_disp
		);

		Ok(Self {
			session,
			export_iters: None,
			warned: false,
		})
	}

	/// Record the iteration count the graph was exported with, so mismatches are reported.
	pub fn with_export_iters(mut self, iters: u32) -> Self {
		self.export_iters = Some(iters);
		self
	}
}

/// Message for a requested iteration count the exported graph cannot honor.
fn iteration_warning(export_iters: Option<u32>, requested: u32) -> Option<String> {
	match export_iters {
		Some(baked) if baked == requested => None,
		Some(baked) => Some(format!(
			"Graph was exported with {} iterations, ignoring requested {}",
			baked, requested
		)),
		None => Some(format!(
			"Iteration count is fixed in the ONNX graph, requested {} may not apply",
			requested
		)),
	}
}

fn to_value(tensor: &ImageTensor) -> DisparityResult<ort::value::Value> {
	let (n, c, h, w) = tensor.dim();
	let data: Vec<f32> = tensor.iter().copied().collect();
	let value = ort::value::Value::from_array(([n, c, h, w], data))
		.map_err(|e| DisparityError::ModelInference(format!("Failed to create input: {}", e)))?;
	Ok(value.into_dyn())
}

impl StereoModel for OnnxStereoModel {
	fn infer(
		&mut self,
		left: &ImageTensor,
		right: &ImageTensor,
		iters: u32,
	) -> DisparityResult<Array2<f32>> {
		if !self.warned {
			if let Some(msg) = iteration_warning(self.export_iters, iters) {
				tracing::warn!("{}", msg);
			}
			self.warned = true;
		}

		let outputs = self
			.session
			.run(ort::inputs![to_value(left)?, to_value(right)?])
			.map_err(|e| DisparityError::ModelInference(format!("Inference failed: {}", e)))?;

		let (shape, data) = outputs[0]
			.try_extract_tensor::<f32>()
			.map_err(|e| DisparityError::ModelInference(format!("Failed to extract output: {}", e)))?;

		let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
		if dims.len() < 2 {
			return Err(DisparityError::ModelInference(format!(
				"Unexpected output shape {:?}",
				dims
			)));
		}
		let h = dims[dims.len() - 2];
		let w = dims[dims.len() - 1];
		if data.len() < h * w {
			return Err(DisparityError::ModelInference(format!(
				"Output holds {} values, shape {:?} needs {}",
				data.len(),
				dims,
				h * w
			)));
		}

		Array2::from_shape_vec((h, w), data[..h * w].to_vec())
			.map_err(|e| DisparityError::ModelInference(format!("Failed to reshape disparity: {}", e)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matching_export_iters_is_silent() {
		assert_eq!(iteration_warning(Some(32), 32), None);
	}

	#[test]
	fn mismatched_or_unknown_iters_warn() {
		let msg = iteration_warning(Some(32), 8).unwrap();
		assert!(msg.contains("32") && msg.contains("8"));
		assert!(iteration_warning(None, 16).unwrap().contains("16"));
	}
}
