use std::path::PathBuf;

pub type DisparityResult<T> = Result<T, DisparityError>;

#[derive(Debug, thiserror::Error)]
pub enum DisparityError {
	#[error("Metadata error in {path:?}: {msg}")]
	MetadataParse { path: PathBuf, msg: String },

	#[error("Metadata file {path:?} has no '{column}' column")]
	MissingColumn { path: PathBuf, column: String },

	#[error("Failed to load image {path:?}: {msg}")]
	ImageLoad { path: PathBuf, msg: String },

	#[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
	ShapeMismatch {
		expected: (usize, usize),
		actual: (usize, usize),
	},

	#[error("Model error: {0}")]
	ModelInference(String),

	#[error("Cannot derive output name from {path:?}: {msg}")]
	InvalidPath { path: PathBuf, msg: String },

	#[error("I/O error: {0}")]
	Io(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl DisparityError {
	/// Pipeline stage the error originated from, for diagnostics.
	pub fn stage(&self) -> &'static str {
		match self {
			DisparityError::MetadataParse { .. } | DisparityError::MissingColumn { .. } => "resolver",
			DisparityError::ShapeMismatch { .. } => "aligner",
			DisparityError::ImageLoad { .. } => "orchestrator",
			DisparityError::ModelInference(_) => "model",
			DisparityError::Config(_) => "config",
			DisparityError::InvalidPath { .. } | DisparityError::Io(_) => "writer",
		}
	}
}

impl From<std::io::Error> for DisparityError {
	fn from(e: std::io::Error) -> Self {
		DisparityError::Io(e.to_string())
	}
}

impl From<image::ImageError> for DisparityError {
	fn from(e: image::ImageError) -> Self {
		DisparityError::Io(e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stage_names_follow_the_pipeline() {
		let err = DisparityError::MissingColumn {
			path: PathBuf::from("MH_01.csv"),
			column: "Reference Timestamp".to_string(),
		};
		assert_eq!(err.stage(), "resolver");
		assert!(err.to_string().contains("Reference Timestamp"));

		let err = DisparityError::ShapeMismatch {
			expected: (480, 752),
			actual: (480, 640),
		};
		assert_eq!(err.stage(), "aligner");
		assert_eq!(DisparityError::ModelInference("boom".into()).stage(), "model");
	}

	#[test]
	fn io_errors_convert() {
		let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
		let err: DisparityError = io.into();
		assert!(matches!(err, DisparityError::Io(ref m) if m.contains("gone")));
	}
}
