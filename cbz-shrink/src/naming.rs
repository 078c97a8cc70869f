//! Collision free destination paths.
//!
//! A taken path gets a `[YYYYMMDDhhmmss]` stamp inserted before its extension,
//! e.g. `volume 1.cbz` becomes `volume 1[20231024183012].cbz`.
//! Stripping also takes a bare 14 digits token in the same place.
//! Nothing is persisted, the file system is checked on every call.
//! The check and the following write are not atomic.

use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Duration, Local, NaiveDateTime};
use regex::Regex;
use tracing::debug;

pub static STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

static STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[\d{14}\]|\d{14})$").expect("stamp regex is valid"));

/// Removes the stamp a previous run may have left right before the extension
#[must_use]
pub fn strip_stamp(path: &Utf8Path) -> Utf8PathBuf {
    let Some(file_stem) = path.file_stem() else {
        return path.to_owned();
    };

    let stripped = STAMP.replace(file_stem, "");
    if stripped.is_empty() || stripped.len() == file_stem.len() {
        return path.to_owned();
    }

    let file_name = match path.extension() {
        Some(extension) => format!("{stripped}.{extension}"),
        None => stripped.into_owned(),
    };

    path.with_file_name(file_name)
}

/// Path to write `candidate` to without overwriting anything, see `resolve_at`
#[must_use]
pub fn resolve(candidate: impl AsRef<Utf8Path>) -> Utf8PathBuf {
    resolve_at(candidate, Local::now().naive_local())
}

/// The stamp of `candidate` is stripped first, the result is returned as is when no file exists there.
/// Otherwise it's stamped with `now`, moved forward one second at a time while the stamped path is taken too.
#[must_use]
pub fn resolve_at(candidate: impl AsRef<Utf8Path>, now: NaiveDateTime) -> Utf8PathBuf {
    let path = strip_stamp(candidate.as_ref());
    if !path.exists() {
        return path;
    }

    let mut time = now;
    loop {
        let stamped = stamp(&path, time);
        if !stamped.exists() {
            debug!("{path} already exists, using {stamped}");
            return stamped;
        }
        time += Duration::seconds(1);
    }
}

fn stamp(path: &Utf8Path, time: NaiveDateTime) -> Utf8PathBuf {
    let file_stem = path.file_stem().unwrap_or_default();
    let stamp = time.format(STAMP_FORMAT);

    let file_name = match path.extension() {
        Some(extension) => format!("{file_stem}[{stamp}].{extension}"),
        None => format!("{file_stem}[{stamp}]"),
    };

    path.with_file_name(file_name)
}
