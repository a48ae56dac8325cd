mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let report = cli::run().await?;

    if report.total() > 0 && report.downloaded.len() + report.skipped.len() == 0 {
        return Err("every track failed to download".into());
    }
    Ok(())
}
