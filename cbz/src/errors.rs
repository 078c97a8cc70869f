use std::{io, result};

use zip::result::ZipError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error {0}")]
    IO(#[from] io::Error),

    #[error("Zip error {0}")]
    Zip(#[from] ZipError),

    #[error("Cbz is too large, it can contain a maximum of {0} files")]
    CbzTooLarge(usize),

    #[error("Cbz already contains a file named {0}")]
    CbzDuplicateName(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T, E = Error> = result::Result<T, E>;
