use clap::{Parser, ValueEnum};
use euroc_disparity::{
	find_checkpoint, process_dataset, CorrImplementation, DatasetLayout, Device, ModelConfig,
	OnnxStereoModel, PadMode, RunConfig, RunProgress,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CorrArg {
	#[value(name = "reg")]
	Reg,
	#[value(name = "alt")]
	Alt,
	#[value(name = "reg_cuda")]
	RegCuda,
	#[value(name = "alt_cuda")]
	AltCuda,
}

impl From<CorrArg> for CorrImplementation {
	fn from(arg: CorrArg) -> Self {
		match arg {
			CorrArg::Reg => CorrImplementation::Reg,
			CorrArg::Alt => CorrImplementation::Alt,
			CorrArg::RegCuda => CorrImplementation::RegCuda,
			CorrArg::AltCuda => CorrImplementation::AltCuda,
		}
	}
}

#[derive(Parser)]
#[command(name = "euroc-disparity")]
#[command(about = "Estimate stereo disparity for every frame pair of a EuRoC-style dataset")]
#[command(version)]
struct Cli {
	/// Model checkpoint (ONNX export of the stereo network)
	#[arg(long, default_value = "./pretrained_models/sceneflow/sceneflow.onnx")]
	restore_ckpt: PathBuf,

	/// Glob matching the per-sequence metadata CSV files
	#[arg(long, default_value = "data/sample_euroc/*.csv")]
	csv_dir: String,

	/// Dataset root containing one directory per sequence
	#[arg(long, default_value = "data/EuRoC/")]
	dataset_dir: PathBuf,

	/// Directory to save output
	#[arg(long, default_value = "./demo-output/")]
	output_directory: PathBuf,

	/// Number of disparity-field updates during the forward pass
	#[arg(long, default_value = "32")]
	valid_iters: u32,

	/// Iteration count the ONNX graph was exported with, if known
	#[arg(long)]
	export_iters: Option<u32>,

	/// Execution device: cpu, cuda, cuda:N
	#[arg(long, default_value = "cpu")]
	device: Device,

	/// Use mixed precision
	#[arg(long)]
	mixed_precision: bool,

	/// Hidden state and context dimensions
	#[arg(long, num_args = 1.., default_values_t = [128u32, 128, 128])]
	hidden_dims: Vec<u32>,

	/// Correlation volume implementation
	#[arg(long, value_enum, default_value = "reg")]
	corr_implementation: CorrArg,

	/// Use a single backbone for the context and feature encoders
	#[arg(long)]
	shared_backbone: bool,

	/// Number of levels in the correlation pyramid
	#[arg(long, default_value = "2")]
	corr_levels: u32,

	/// Width of the correlation pyramid
	#[arg(long, default_value = "4")]
	corr_radius: u32,

	/// Resolution of the disparity field (1/2^K)
	#[arg(long, default_value = "2")]
	n_downsample: u32,

	/// Iterate the low-res GRUs more frequently
	#[arg(long)]
	slow_fast_gru: bool,

	/// Number of hidden GRU levels
	#[arg(long, default_value = "3")]
	n_gru_layers: u32,

	/// Max disparity of the geometry encoding volume
	#[arg(long, default_value = "192")]
	max_disp: u32,

	/// Also estimate right-camera disparity from the flipped pair
	#[arg(long)]
	stereo_depth: bool,

	/// Debug logging
	#[arg(short, long)]
	verbose: bool,
}

fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
	let default_level = if verbose { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(filter)
		.try_init()
		.map_err(|e| format!("Failed to initialize logger: {}", e))?;

	Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let cli = Cli::parse();
	setup_logging(cli.verbose)?;

	let model_config = ModelConfig {
		hidden_dims: cli.hidden_dims,
		corr_implementation: cli.corr_implementation.into(),
		shared_backbone: cli.shared_backbone,
		corr_levels: cli.corr_levels,
		corr_radius: cli.corr_radius,
		n_downsample: cli.n_downsample,
		slow_fast_gru: cli.slow_fast_gru,
		n_gru_layers: cli.n_gru_layers,
		max_disp: cli.max_disp,
		mixed_precision: cli.mixed_precision,
	};

	let config = RunConfig {
		metadata_glob: cli.csv_dir,
		dataset_root: cli.dataset_dir,
		output_dir: cli.output_directory,
		iters: cli.valid_iters,
		dual_pass: cli.stereo_depth,
		stride: 32,
		pad_mode: PadMode::Sintel,
		layout: DatasetLayout::default(),
		device: cli.device,
	};

	let start = std::time::Instant::now();
	let result = find_checkpoint(&cli.restore_ckpt)
		.and_then(|path| OnnxStereoModel::new(path, &model_config, config.device))
		.map(|model| match cli.export_iters {
			Some(iters) => model.with_export_iters(iters),
			None => model,
		})
		.and_then(|mut model| {
			process_dataset(
				&config,
				&mut model,
				Some(&model_config),
				Some(Box::new(|progress: RunProgress| {
					eprint!(
						"\r[{}] Pair {}/{} ({:.1}%)",
						progress.stage, progress.current_pair, progress.total_pairs, progress.percent
					);
				})),
			)
		});

	eprintln!();
	match result {
		Ok(summary) => {
			eprintln!("✓ Saved {} files to: {:?}", summary.files_written, summary.output_dir);
			eprintln!("Total time: {:.1}s", start.elapsed().as_secs_f64());
			Ok(())
		}
		Err(e) => {
			tracing::error!("{} stage failed: {}", e.stage(), e);
			Err(e.into())
		}
	}
}
