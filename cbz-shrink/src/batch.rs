use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use glob::{glob_with, MatchOptions, Pattern};
use tracing::{debug, error, info, warn};

use crate::{naming, transcode, Error, Result, TranscodeOptions};

/// Extensions of the archives picked up when the source is a directory, case is ignored
pub static ARCHIVE_EXTENSIONS: [&str; 2] = ["zip", "cbz"];

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// An archive, or a directory whose archives (not recursively) are all processed
    pub source: Utf8PathBuf,
    pub dest_dir: Utf8PathBuf,
    /// Where the source archives are moved once processed
    pub done_dir: Option<Utf8PathBuf>,
    pub transcode: TranscodeOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub source: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub page_count: usize,
    pub input_size: u64,
    pub output_size: u64,
    pub relocated_to: Option<Utf8PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<ArchiveReport>,
    pub failed: Vec<(Utf8PathBuf, Error)>,
}

/// Lists the archives to process, sorted by path.
///
/// ## Errors
///
/// Fails if `source` can't be inspected or the directory can't be walked
pub fn list_sources(source: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let metadata = fs::metadata(source).map_err(|err| Error::SourceList {
        path: source.to_owned(),
        source: err,
    })?;
    if !metadata.is_dir() {
        return Ok(vec![source.to_owned()]);
    }

    let match_options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let mut sources = Vec::new();
    for extension in ARCHIVE_EXTENSIONS {
        let pattern = format!("{}/*.{extension}", Pattern::escape(source.as_str()));
        for path in glob_with(&pattern, match_options)? {
            let path = path?;
            if !path.is_file() {
                continue;
            }
            match Utf8PathBuf::from_path_buf(path) {
                Ok(path) => sources.push(path),
                Err(path) => error!("{path:?} is not a valid utf-8 path"),
            }
        }
    }
    sources.sort();
    sources.dedup();

    Ok(sources)
}

/// Transcodes one archive, saves it under `dest_dir` and moves the source to `done_dir` if set.
/// A failing move is only logged, the output is already saved at that point.
///
/// ## Errors
///
/// Any transcoding error, or `Error::Persist` if the output can't be saved
pub fn process_archive(source: &Utf8Path, options: &BatchOptions) -> Result<ArchiveReport> {
    let Some(file_name) = source.file_name() else {
        return Err(Error::NoFileName(source.to_owned()));
    };

    let transcoded = transcode(source, &options.transcode)?;
    let input_size = file_size(source);

    let output = naming::resolve(options.dest_dir.join(file_name));
    debug!("writing {source} to {output}");
    transcoded
        .archive
        .write_to_new_path(&output)
        .map_err(|err| Error::Persist {
            path: output.clone(),
            source: err,
        })?;

    let relocated_to = options
        .done_dir
        .as_deref()
        .and_then(|done_dir| match relocate(source, file_name, done_dir) {
            Ok(destination) => Some(destination),
            Err(err) => {
                warn!("{err}");
                None
            }
        });

    Ok(ArchiveReport {
        source: source.to_owned(),
        output,
        page_count: transcoded.page_count,
        input_size,
        output_size: transcoded.len() as u64,
        relocated_to,
    })
}

/// Size reported for `path`, 0 when it can't be read
fn file_size(path: &Utf8Path) -> u64 {
    match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(err) => {
            warn!("couldn't read the size of {path}: {err}");
            0
        }
    }
}

fn relocate(source: &Utf8Path, file_name: &str, done_dir: &Utf8Path) -> Result<Utf8PathBuf> {
    let destination = naming::resolve(done_dir.join(file_name));

    if let Err(err) = fs::rename(source, &destination) {
        debug!("couldn't rename {source} ({err}), copying it instead");
        fs::copy(source, &destination)
            .and_then(|_| fs::remove_file(source))
            .map_err(|err| Error::Relocate {
                from: source.to_owned(),
                to: destination.clone(),
                source: err,
            })?;
    }

    Ok(destination)
}

/// Processes every archive of `options.source` in order, one failing archive doesn't stop the others.
///
/// ## Errors
///
/// Only fails when the archives can't be listed, nothing has been processed then
pub fn run(options: &BatchOptions) -> Result<BatchReport> {
    let sources = list_sources(&options.source)?;
    info!("found {} archive(s) in {}", sources.len(), options.source);

    let mut report = BatchReport::default();
    for source in sources {
        match process_archive(&source, options) {
            Ok(archive_report) => {
                info!(
                    "done: {}: {} pages: {} -> {} bytes",
                    archive_report.output.file_name().unwrap_or_default(),
                    archive_report.page_count,
                    archive_report.input_size,
                    archive_report.output_size,
                );
                report.succeeded.push(archive_report);
            }
            Err(err) => {
                error!("failed: {source}: {err}");
                report.failed.push((source, err));
            }
        }
    }

    Ok(report)
}
