use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = pixsift_worker::Args::parse();

	pixsift_worker::run(args).await
}
