use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = juris_api::Args::parse();

	juris_api::run(args).await
}
