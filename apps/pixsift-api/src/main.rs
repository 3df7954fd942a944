use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = pixsift_api::Args::parse();

	pixsift_api::run(args).await
}
