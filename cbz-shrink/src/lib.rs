#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::{fs::File, io::Cursor};

use camino::Utf8Path;
use cbz::{
    image::Image, rename_extension, Cbz, CbzFile, CbzRead, CbzReader, CbzWrite, CbzWriter,
    CbzWriterFinished,
};
use tracing::{debug, warn};

pub use cbz::image::OutputFormat;

pub use crate::errors::{Error, Result};

pub mod batch;
pub mod errors;
pub mod naming;

pub static DEFAULT_MAX_WIDTH: u32 = 3000;

pub static DEFAULT_MAX_HEIGHT: u32 = 1200;

/// How the pages of an archive are transcoded, bounds must be positive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub format: OutputFormat,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            format: OutputFormat::default(),
        }
    }
}

/// A fully transcoded archive, still in memory
pub struct Transcoded {
    pub archive: CbzWriterFinished<Cursor<Vec<u8>>>,
    pub page_count: usize,
}

impl Transcoded {
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }
}

/// Decodes, downscales and re-encodes every page of the archive at `path` into a new archive.
///
/// Pages are processed one at a time in `CbzRead::image_names` order and keep their position
/// in the output, only their extension changes. The first failing page aborts the whole archive.
///
/// ## Errors
///
/// - `Error::ContainerOpen` if `path` isn't a readable zip archive
/// - `Error::Decode` / `Error::Encode` for the first page that can't be transcoded
/// - `Error::Write` if the output archive can't be assembled
pub fn transcode(path: impl AsRef<Utf8Path>, options: &TranscodeOptions) -> Result<Transcoded> {
    let path = path.as_ref();
    let mut reader = open(path)?;
    let mut writer = CbzWriter::default();

    reader.try_for_each_image(|name, file| {
        let page = transcode_page(name, file, options)?;
        let page_name = rename_extension(name, options.format.extension());
        writer.insert(&page_name, &page).map_err(Error::Write)?;
        debug!("{name} transcoded to {page_name}");

        Ok::<(), Error>(())
    })?;

    let page_count = writer.len();
    if page_count == 0 {
        warn!("no page found in {path}");
    }
    let archive = writer.finish().map_err(Error::Write)?;

    Ok(Transcoded {
        archive,
        page_count,
    })
}

fn open(path: &Utf8Path) -> Result<CbzReader<File>> {
    CbzReader::from_path(path).map_err(|source| Error::ContainerOpen {
        path: path.to_owned(),
        source,
    })
}

fn transcode_page(
    name: &str,
    file: cbz::Result<CbzFile<'_>>,
    options: &TranscodeOptions,
) -> Result<Vec<u8>> {
    let decode_error = |source| Error::Decode {
        entry: name.to_string(),
        source,
    };

    let bytes = file
        .and_then(|mut file| file.to_bytes())
        .map_err(decode_error)?;
    let image = Image::from_bytes(&bytes).map_err(decode_error)?;
    debug!(
        "decoded {name} ({:?}, {}x{})",
        image.format(),
        image.width(),
        image.height()
    );

    image
        .resize_to_fit(options.max_width, options.max_height)
        .encode(options.format)
        .map_err(|source| Error::Encode {
            entry: name.to_string(),
            source,
        })
}
