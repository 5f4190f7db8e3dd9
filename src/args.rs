use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-porter")]
#[command(about = "Migrates a legacy website into a static-site content model")]
#[command(version)]
pub struct Args {
    /// Path to the migration configuration file (JSON)
    #[arg(short, long, default_value = "migration.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the site and store the page records
    Crawl,
    /// Classify and normalize previously crawled pages into documents
    Process,
    /// Download discovered images and generate responsive variants
    Images,
    /// Run every stage in order; any stage failure aborts the run
    Full,
}
