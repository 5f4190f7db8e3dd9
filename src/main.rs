use clap::Parser;
use site_porter::config::MigrationConfig;
use site_porter::error::MigrateError;
use site_porter::migrate;
use std::process::ExitCode;

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match MigrationConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("{}", e);
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if matches!(args.command, Command::Crawl | Command::Full) {
        println!("Note: crawling requires a WebDriver server (e.g., ChromeDriver).");
        println!(
            "Set WEBDRIVER_URL environment variable if not using the default {}",
            config.webdriver_url
        );
    }

    let result = run(&args.command, &config).await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("Run failed: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: &Command, config: &MigrationConfig) -> Result<(), MigrateError> {
    match command {
        Command::Crawl => {
            let outcome = migrate::run_crawl(config).await?;
            println!(
                "Crawled {} pages ({} errors), discovered {} image URLs",
                outcome.pages.len(),
                outcome.errors.len(),
                outcome.image_urls.len()
            );
        }
        Command::Process => {
            let outcome = migrate::run_process(config)?;
            println!(
                "Generated {} documents, excluded {} pages, {} redirects",
                outcome.documents.len(),
                outcome.excluded.len(),
                outcome.redirects.len()
            );
            for (category, count) in outcome.category_counts() {
                println!("  {category}: {count}");
            }
        }
        Command::Images => {
            let (fetched, transcoded) = migrate::run_images(config).await?;
            println!(
                "Downloaded {} images ({} failed, {} skipped); wrote {} variants",
                fetched.assets.len(),
                fetched.errors.len(),
                fetched.skipped,
                transcoded.written.len()
            );
        }
        Command::Full => {
            let summary = migrate::run_full(config).await?;
            println!(
                "Migration complete in {:.2}s: {} pages -> {} documents, {} images, {} variants",
                summary.elapsed_seconds,
                summary.pages_crawled,
                summary.documents_written,
                summary.images_downloaded,
                summary.variants_written
            );
            for (category, count) in &summary.pages_by_category {
                println!("  {category}: {count}");
            }
            if summary.validation_errors > 0 {
                println!(
                    "Validation: {} errors, {} warnings (see validation-report.json)",
                    summary.validation_errors, summary.validation_warnings
                );
            }
        }
    }
    Ok(())
}
