use std::io;

use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("couldn't open archive {path}: {source}")]
    ContainerOpen {
        path: Utf8PathBuf,
        source: cbz::Error,
    },

    #[error("couldn't decode page {entry}: {source}")]
    Decode { entry: String, source: cbz::Error },

    #[error("couldn't encode page {entry}: {source}")]
    Encode { entry: String, source: cbz::Error },

    #[error("couldn't assemble the output archive: {0}")]
    Write(cbz::Error),

    #[error("couldn't save {path}: {source}")]
    Persist {
        path: Utf8PathBuf,
        source: cbz::Error,
    },

    #[error("couldn't move {from} to {to}: {source}")]
    Relocate {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        source: io::Error,
    },

    #[error("couldn't list archives from {path}: {source}")]
    SourceList { path: Utf8PathBuf, source: io::Error },

    #[error("{0} has no file name")]
    NoFileName(Utf8PathBuf),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
