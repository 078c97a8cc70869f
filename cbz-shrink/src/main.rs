#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use anyhow::{bail, Result};
use camino::Utf8PathBuf;
use cbz_shrink::{
    batch::{run, BatchOptions},
    OutputFormat, TranscodeOptions, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH,
};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(about, author, version)]
pub struct Args {
    /// The archive to shrink, or a directory whose zip and cbz archives are all shrunk
    pub source: Utf8PathBuf,
    /// The output directory for the shrunk archives
    pub dest_dir: Utf8PathBuf,
    /// Maximum height of the pages
    #[clap(short = 'H', long, default_value_t = DEFAULT_MAX_HEIGHT, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_height: u32,
    /// Maximum width of the pages
    #[clap(short = 'w', long, default_value_t = DEFAULT_MAX_WIDTH, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_width: u32,
    /// Format the pages are re-encoded to
    #[clap(short, long, default_value_t = OutputFormat::Webp)]
    pub format: OutputFormat,
    /// Move the source archives to this directory once shrunk
    #[clap(short = 'o', long)]
    pub done_dir: Option<Utf8PathBuf>,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if !self.source.exists() {
            bail!("{} not found", self.source);
        }
        if !self.dest_dir.is_dir() {
            bail!("output directory {} doesn't exist", self.dest_dir);
        }
        if let Some(done_dir) = &self.done_dir {
            if !done_dir.is_dir() {
                bail!("done directory {done_dir} doesn't exist");
            }
        }

        Ok(())
    }
}

impl From<Args> for BatchOptions {
    fn from(args: Args) -> Self {
        Self {
            source: args.source,
            dest_dir: args.dest_dir,
            done_dir: args.done_dir,
            transcode: TranscodeOptions {
                max_width: args.max_width,
                max_height: args.max_height,
                format: args.format,
            },
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    args.validate()?;
    let options = BatchOptions::from(args);

    info!("started at {}", Local::now().to_rfc3339());
    let report = run(&options)?;
    info!(
        "finished at {}: {} succeeded, {} failed",
        Local::now().to_rfc3339(),
        report.succeeded.len(),
        report.failed.len()
    );

    Ok(())
}
