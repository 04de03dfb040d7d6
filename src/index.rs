//! Frame index resolution.
//!
//! Each metadata CSV describes one recorded sequence. Its `Reference Timestamp` column lists the
//! frames to process, in order, and its file name (up to the first `.`) names the sequence
//! directory under the dataset root.

use crate::config::DatasetLayout;
use crate::error::{DisparityError, DisparityResult};
use std::path::{Component, Path, PathBuf};

pub const REFERENCE_TIMESTAMP_COLUMN: &str = "Reference Timestamp";

/// Left/right image paths for one timestamp of one sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePair {
	pub sequence: String,
	pub timestamp: String,
	pub left: PathBuf,
	pub right: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
	pub id: String,
	pub timestamps: Vec<String>,
}

/// Timestamps of every sequence matched by a metadata glob, in enumeration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceTimestamps {
	sequences: Vec<Sequence>,
}

impl SequenceTimestamps {
	pub fn read(metadata_glob: &str) -> DisparityResult<Self> {
		let paths = glob::glob(metadata_glob).map_err(|e| DisparityError::MetadataParse {
			path: PathBuf::from(metadata_glob),
			msg: format!("Invalid glob pattern: {}", e),
		})?;

		let mut set = SequenceTimestamps::default();
		for entry in paths {
			let path = entry.map_err(|e| DisparityError::MetadataParse {
				path: e.path().to_path_buf(),
				msg: e.to_string(),
			})?;
			let id = sequence_id(&path)?;
			let timestamps = read_reference_timestamps(&path)?;
			if timestamps.is_empty() {
				tracing::warn!("Sequence {} lists no frames ({:?})", id, path);
			}
			set.insert(Sequence { id, timestamps });
		}

		Ok(set)
	}

	/// Later files with an already-seen sequence id replace the earlier entry in place.
	pub fn insert(&mut self, sequence: Sequence) {
		match self.sequences.iter_mut().find(|s| s.id == sequence.id) {
			Some(existing) => *existing = sequence,
			None => self.sequences.push(sequence),
		}
	}

	pub fn sequences(&self) -> &[Sequence] {
		&self.sequences
	}

	pub fn frame_count(&self) -> usize {
		self.sequences.iter().map(|s| s.timestamps.len()).sum()
	}

	pub fn pairs_for(
		&self,
		dataset_root: &Path,
		layout: &DatasetLayout,
	) -> DisparityResult<Vec<FramePair>> {
		let right_subpath = right_camera_subpath(layout)?;
		let mut pairs = Vec::with_capacity(self.frame_count());

		for sequence in &self.sequences {
			let sequence_dir = dataset_root.join(&sequence.id);
			for stamp in &sequence.timestamps {
				let file_name = format!("{}.{}", stamp, layout.image_extension);
				pairs.push(FramePair {
					sequence: sequence.id.clone(),
					timestamp: stamp.clone(),
					left: sequence_dir.join(&layout.camera_subpath).join(&file_name),
					right: sequence_dir.join(&right_subpath).join(&file_name),
				});
			}
		}

		Ok(pairs)
	}
}

/// Resolve every frame pair listed by the metadata files matching `metadata_glob`.
///
/// Image files are not checked for existence; a missing image fails later when it is loaded.
pub fn resolve(
	metadata_glob: &str,
	dataset_root: &Path,
	layout: &DatasetLayout,
) -> DisparityResult<Vec<FramePair>> {
	SequenceTimestamps::read(metadata_glob)?.pairs_for(dataset_root, layout)
}

fn sequence_id(path: &Path) -> DisparityResult<String> {
	path.file_name()
		.and_then(|n| n.to_str())
		.and_then(|n| n.split('.').next())
		.filter(|id| !id.is_empty())
		.map(str::to_string)
		.ok_or_else(|| DisparityError::MetadataParse {
			path: path.to_path_buf(),
			msg: "Cannot derive a sequence id from the file name".to_string(),
		})
}

pub fn read_reference_timestamps(path: &Path) -> DisparityResult<Vec<String>> {
	let parse_err = |msg: String| DisparityError::MetadataParse {
		path: path.to_path_buf(),
		msg,
	};

	let mut reader = csv::ReaderBuilder::new()
		.trim(csv::Trim::All)
		.from_path(path)
		.map_err(|e| parse_err(e.to_string()))?;

	let column = reader
		.headers()
		.map_err(|e| parse_err(e.to_string()))?
		.iter()
		.position(|h| h == REFERENCE_TIMESTAMP_COLUMN)
		.ok_or_else(|| DisparityError::MissingColumn {
			path: path.to_path_buf(),
			column: REFERENCE_TIMESTAMP_COLUMN.to_string(),
		})?;

	let mut timestamps = Vec::new();
	for (row, record) in reader.records().enumerate() {
		let record = record.map_err(|e| parse_err(e.to_string()))?;
		match record.get(column) {
			Some(stamp) if !stamp.is_empty() => timestamps.push(stamp.to_string()),
			_ => return Err(parse_err(format!("Row {} has no reference timestamp", row + 1))),
		}
	}

	Ok(timestamps)
}

fn right_camera_subpath(layout: &DatasetLayout) -> DisparityResult<PathBuf> {
	let mut swapped = false;
	let subpath = layout
		.camera_subpath
		.components()
		.map(|c| match c {
			Component::Normal(name) if name == layout.left_camera.as_str() => {
				swapped = true;
				Component::Normal(layout.right_camera.as_ref())
			}
			other => other,
		})
		.collect::<PathBuf>();

	if !swapped {
		return Err(DisparityError::Config(format!(
			"Camera subpath {:?} does not contain '{}'",
			layout.camera_subpath, layout.left_camera
		)));
	}
	Ok(subpath)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
		let path = dir.join(name);
		fs::write(&path, body).unwrap();
		path
	}

	#[test]
	fn resolves_euroc_paths() {
		let dir = tempfile::tempdir().unwrap();
		write_csv(dir.path(), "MH_01.csv", "Reference Timestamp,Other\n100,a\n200,b\n");

		let pattern = format!("{}/*.csv", dir.path().display());
		let pairs = resolve(&pattern, Path::new("data/EuRoC"), &DatasetLayout::default()).unwrap();

		assert_eq!(pairs.len(), 2);
		assert_eq!(pairs[0].left, PathBuf::from("data/EuRoC/MH_01/mav0/cam0/data/100.png"));
		assert_eq!(pairs[0].right, PathBuf::from("data/EuRoC/MH_01/mav0/cam1/data/100.png"));
		assert_eq!(pairs[1].left, PathBuf::from("data/EuRoC/MH_01/mav0/cam0/data/200.png"));
		assert_eq!(pairs[1].right, PathBuf::from("data/EuRoC/MH_01/mav0/cam1/data/200.png"));
		assert_eq!(pairs[1].sequence, "MH_01");
		assert_eq!(pairs[1].timestamp, "200");
	}

	#[test]
	fn pair_count_is_sum_of_timestamps() {
		let dir = tempfile::tempdir().unwrap();
		write_csv(dir.path(), "MH_01.csv", "Reference Timestamp\n1\n2\n3\n");
		write_csv(dir.path(), "V1_02.csv", "Reference Timestamp\n10\n20\n");
		write_csv(dir.path(), "notes.txt", "ignored");

		let pattern = format!("{}/*.csv", dir.path().display());
		let set = SequenceTimestamps::read(&pattern).unwrap();
		assert_eq!(set.sequences().len(), 2);
		assert_eq!(set.frame_count(), 5);

		let pairs = set.pairs_for(Path::new("root"), &DatasetLayout::default()).unwrap();
		assert_eq!(pairs.len(), 5);
		for pair in &pairs {
			let left: Vec<_> = pair.left.components().collect();
			let right: Vec<_> = pair.right.components().collect();
			assert_eq!(left.len(), right.len());
			for (l, r) in left.iter().zip(&right) {
				if l.as_os_str() == "cam0" {
					assert_eq!(r.as_os_str(), "cam1");
				} else {
					assert_eq!(l, r);
				}
			}
		}
	}

	#[test]
	fn row_order_is_preserved() {
		let dir = tempfile::tempdir().unwrap();
		let path = write_csv(dir.path(), "seq.csv", "Reference Timestamp\n300\n100\n200\n");
		assert_eq!(read_reference_timestamps(&path).unwrap(), vec!["300", "100", "200"]);
	}

	#[test]
	fn missing_column_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		write_csv(dir.path(), "MH_01.csv", "timestamp,x\n1,2\n");

		let pattern = format!("{}/*.csv", dir.path().display());
		let err = resolve(&pattern, Path::new("root"), &DatasetLayout::default()).unwrap_err();
		assert!(matches!(err, DisparityError::MissingColumn { .. }));
	}

	#[test]
	fn malformed_rows_are_parse_errors() {
		let dir = tempfile::tempdir().unwrap();
		let path = write_csv(dir.path(), "bad.csv", "Reference Timestamp,x\n1,2\n3\n");
		let err = read_reference_timestamps(&path).unwrap_err();
		assert!(matches!(err, DisparityError::MetadataParse { .. }));

		let path = write_csv(dir.path(), "blank.csv", "Reference Timestamp,x\n,2\n");
		let err = read_reference_timestamps(&path).unwrap_err();
		assert!(matches!(err, DisparityError::MetadataParse { .. }));
	}

	#[test]
	fn invalid_pattern_is_a_parse_error() {
		let err = SequenceTimestamps::read("data/[*.csv").unwrap_err();
		assert!(matches!(err, DisparityError::MetadataParse { .. }));
	}

	#[test]
	fn sequence_id_stops_at_first_dot() {
		assert_eq!(sequence_id(Path::new("dir/MH_01.sync.csv")).unwrap(), "MH_01");
	}

	#[test]
	fn dataset_root_is_never_rewritten() {
		let mut set = SequenceTimestamps::default();
		set.insert(Sequence {
			id: "MH_01".to_string(),
			timestamps: vec!["5".to_string()],
		});
		let pairs = set.pairs_for(Path::new("cam0"), &DatasetLayout::default()).unwrap();
		assert_eq!(pairs[0].right, PathBuf::from("cam0/MH_01/mav0/cam1/data/5.png"));
	}

	#[test]
	fn layout_without_left_camera_is_rejected() {
		let layout = DatasetLayout {
			camera_subpath: PathBuf::from("mav0/left/data"),
			..DatasetLayout::default()
		};
		assert!(matches!(right_camera_subpath(&layout), Err(DisparityError::Config(_))));
	}
}
