pub mod worker;

mod error;

pub use error::{Error, Result};
pub use worker::{BackfillReport, CaptionJob, CaptionQueue};

use std::{fs, path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use pixsift_cli::ConfigArgs;
use pixsift_domain::candidate::ImageDescriptor;
use pixsift_service::PixsiftService;

#[derive(Debug, Parser)]
#[command(
	version = pixsift_cli::VERSION,
	rename_all = "kebab",
	styles = pixsift_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub config: ConfigArgs,
	/// JSON array of already-uploaded image descriptors to caption and index.
	#[arg(long, short = 'm', value_name = "FILE")]
	pub manifest: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = pixsift_config::load(&args.config.config)?;

	init_tracing(&config);

	let images = read_manifest(&args.manifest)?;

	tracing::info!(manifest = %args.manifest.display(), images = images.len(), "Backfill started.");

	let service = Arc::new(PixsiftService::new(config));
	let report = worker::backfill(&service, images).await;

	tracing::info!(indexed = report.indexed, failed = report.failed, "Backfill finished.");

	if report.failed > 0 {
		return Err(eyre::eyre!(
			"{} of {} images failed to index.",
			report.failed,
			report.indexed + report.failed
		));
	}

	Ok(())
}

pub fn read_manifest(path: &std::path::Path) -> Result<Vec<ImageDescriptor>> {
	let raw = fs::read_to_string(path)?;

	Ok(serde_json::from_str(&raw)?)
}

fn init_tracing(config: &pixsift_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
