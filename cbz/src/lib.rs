#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::{
    collections::HashSet,
    fs::{File, OpenOptions},
    io::{self, Cursor, Read, Seek, Write},
    path::Path,
    result,
};

use bytes::Bytes;
use camino::Utf8Path;
use tracing::debug;
use zip::{read::ZipFile, write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

pub use crate::errors::{Error, Result};

pub mod errors;
pub mod image;

/// We artificially limit the amount of accepted files to 65535 files per Cbz
/// First as it'd be rather impractical for the user to read such enormous Cbz
/// Also, this size has been chosen as it was the limit of the very first zip spec
pub static MAX_FILE_NUMBER: usize = u16::MAX as usize;

/// Upper bound of the buffer preallocated when reading a file out of a Cbz
pub static MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// Lowercase extensions of the files considered as pages
pub static IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Returns `true` if the file name carries one of the `IMAGE_EXTENSIONS`, case is ignored
#[must_use]
pub fn is_image_name(name: &str) -> bool {
    // zip directories end with a slash
    if name.ends_with('/') {
        return false;
    }

    Utf8Path::new(name).extension().is_some_and(|extension| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|candidate| extension.eq_ignore_ascii_case(candidate))
    })
}

/// Replaces the extension of a file name, the directories inside the archive are kept as is
#[must_use]
pub fn rename_extension(name: &str, extension: &str) -> String {
    Utf8Path::new(name).with_extension(extension).into_string()
}

pub trait Cbz {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait CbzRead: Cbz {
    fn file_names(&self) -> Vec<&str>;

    /// Names of the page images only, sorted by byte order.
    /// The page order doesn't depend on the order of the zip central directory.
    fn image_names(&self) -> Vec<String> {
        let mut image_names = self
            .file_names()
            .into_iter()
            .filter(|name| is_image_name(name))
            .map(Into::into)
            .collect::<Vec<String>>();
        image_names.sort();

        image_names
    }

    /// Lookup the file by `name` in Cbz and returns a `CbzFile`
    ///
    /// ## Errors
    ///
    /// Fails if the file is missing or its header can't be read
    fn read_by_name(&mut self, name: &str) -> Result<CbzFile<'_>>;

    /// Iterate over the page images present in the Cbz, in `image_names` order.
    /// If the closure returns an error, this error is returned immediately.
    ///
    /// ## Errors
    ///
    /// Returns an error immediately if the provided closure returns an error
    fn try_for_each_image<F, E>(&mut self, mut f: F) -> result::Result<(), E>
    where
        F: FnMut(&str, Result<CbzFile<'_>>) -> result::Result<(), E>,
    {
        for image_name in self.image_names() {
            f(&image_name, self.read_by_name(&image_name))?;
        }

        Ok(())
    }
}

pub trait CbzWrite: Cbz {
    /// Appends a file stored without compression, pages are already compressed by their own codec
    ///
    /// ## Errors
    ///
    /// Same behavior as `insert_with_options`
    fn insert(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let file_options = FileOptions::default().compression_method(CompressionMethod::Stored);

        self.insert_with_options(name, bytes, file_options)
    }

    /// This is the method ultimately called to insert the bytes into the Cbz
    ///
    /// ## Errors
    ///
    /// This fails if the Cbz writer can't be written, if it's full (i.e. its size equals `MAX_FILE_NUMBER`)
    /// or if a file with the same name has already been inserted
    fn insert_with_options(
        &mut self,
        name: &str,
        bytes: &[u8],
        file_options: FileOptions,
    ) -> Result<()>;
}

pub struct CbzFile<'a>(ZipFile<'a>);

impl<'a> CbzFile<'a> {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn size(&self) -> u64 {
        self.0.size()
    }

    /// Convert the file content to `Bytes`
    ///
    /// ## Errors
    ///
    /// Fails if the content can't be read
    pub fn to_bytes(&mut self) -> Result<Bytes> {
        // the declared size comes from the archive itself and can't be trusted
        let capacity = usize::try_from(self.size())
            .map_or(MAX_PREALLOCATION, |size| size.min(MAX_PREALLOCATION));
        let mut buf = Vec::with_capacity(capacity);

        self.0.read_to_end(&mut buf)?;

        Ok(buf.into())
    }
}

impl<'a> Read for CbzFile<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<'a> From<ZipFile<'a>> for CbzFile<'a> {
    fn from(zip_file: ZipFile<'a>) -> Self {
        Self(zip_file)
    }
}

/// Read side of a Cbz, the underlying reader (and file descriptor) is released on drop
#[derive(Debug)]
pub struct CbzReader<R> {
    archive: ZipArchive<R>,
}

impl<R> CbzReader<R> {
    pub fn new(archive: ZipArchive<R>) -> Self {
        Self { archive }
    }
}

impl<R> CbzReader<R>
where
    R: Read + Seek,
{
    /// Creates `CbzReader` from a `Read`
    ///
    /// ## Errors
    ///
    /// Fails if the underlying `ZipArchive` can't be created
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;

        Ok(Self::new(archive))
    }
}

impl CbzReader<File> {
    /// Creates `CbzReader` from a path
    ///
    /// ## Errors
    ///
    /// Fails if the file can't be open or the underlying `ZipArchive` can't be created
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;

        Self::from_reader(file)
    }
}

impl<'b> CbzReader<Cursor<&'b [u8]>> {
    /// Creates `CbzReader` from a bytes slice
    ///
    /// ## Errors
    ///
    /// Fails if the underlying `ZipArchive` can't be created
    pub fn from_bytes_slice(bytes: &'b [u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R> Cbz for CbzReader<R>
where
    R: Read + Seek,
{
    fn len(&self) -> usize {
        self.archive.len()
    }
}

impl<R> CbzRead for CbzReader<R>
where
    R: Read + Seek,
{
    fn file_names(&self) -> Vec<&str> {
        self.archive.file_names().collect()
    }

    fn read_by_name(&mut self, name: &str) -> Result<CbzFile<'_>> {
        let archive_file = self.archive.by_name(name)?;

        Ok(archive_file.into())
    }
}

impl<R> From<ZipArchive<R>> for CbzReader<R> {
    fn from(archive: ZipArchive<R>) -> Self {
        Self::new(archive)
    }
}

/// Write side of a Cbz, files are emitted in insertion order
pub struct CbzWriter<W: Write + Seek> {
    archive: ZipWriter<W>,
    names: HashSet<String>,
}

impl<W> CbzWriter<W>
where
    W: Write + Seek,
{
    pub fn new(archive: ZipWriter<W>) -> Self {
        Self {
            archive,
            names: HashSet::new(),
        }
    }

    /// Creates a `CbzWriter` from a `Write`
    pub fn from_writer(writer: W) -> Self {
        Self::new(ZipWriter::new(writer))
    }

    /// Terminates the Cbz archiving and hands back the underlying writer
    ///
    /// ## Errors
    ///
    /// Same errors as the underlying `ZipWriter::finish` method
    pub fn finish(mut self) -> Result<CbzWriterFinished<W>> {
        let writer = self.archive.finish()?;

        Ok(CbzWriterFinished::new(writer))
    }
}

impl Default for CbzWriter<Cursor<Vec<u8>>> {
    fn default() -> Self {
        Self::from_writer(Cursor::new(Vec::new()))
    }
}

impl<W> Cbz for CbzWriter<W>
where
    W: Write + Seek,
{
    fn len(&self) -> usize {
        self.names.len()
    }
}

impl<W> CbzWrite for CbzWriter<W>
where
    W: Write + Seek,
{
    fn insert_with_options(
        &mut self,
        name: &str,
        bytes: &[u8],
        file_options: FileOptions,
    ) -> Result<()> {
        if self.names.len() >= MAX_FILE_NUMBER {
            return Err(Error::CbzTooLarge(MAX_FILE_NUMBER));
        }

        if self.names.contains(name) {
            return Err(Error::CbzDuplicateName(name.to_string()));
        }

        self.archive.start_file(name, file_options)?;

        self.archive.write_all(bytes)?;

        self.names.insert(name.to_string());
        debug!("inserted {name} into zip ({} bytes)", bytes.len());

        Ok(())
    }
}

pub struct CbzWriterFinished<W> {
    writer: W,
}

impl<W> CbzWriterFinished<W> {
    fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for CbzWriterFinished<Cursor<T>> {
    fn as_ref(&self) -> &[u8] {
        self.writer.get_ref().as_ref()
    }
}

impl CbzWriterFinished<Cursor<Vec<u8>>> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.writer.get_ref().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    /// Writes self into provided writer
    ///
    /// ## Errors
    ///
    /// Fails on write error
    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        writer.write_all(self.writer.get_ref())?;

        Ok(())
    }

    /// Writes self into a File that must not exist yet, an existing file is never truncated
    ///
    /// ## Errors
    ///
    /// Fails if a file already exists at `path`, on file creation or when writing the file content
    pub fn write_to_new_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        self.write_to(&mut file)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip_with(names: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for name in names {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(name.as_bytes()).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn image_names_are_filtered_and_sorted() {
        let bytes = zip_with(&[
            "c.webp",
            "notes.txt",
            "b.PNG",
            "ComicInfo.xml",
            "a.jpg",
            "dir/",
            "A.jpeg",
        ]);
        let reader = CbzReader::from_bytes_slice(&bytes).unwrap();

        assert_eq!(reader.len(), 7);
        assert_eq!(reader.image_names(), ["A.jpeg", "a.jpg", "b.PNG", "c.webp"]);
    }

    #[test]
    fn try_for_each_image_reads_in_sorted_order() {
        let bytes = zip_with(&["002.png", "001.png", "readme.md", "010.png"]);
        let mut reader = CbzReader::from_bytes_slice(&bytes).unwrap();
        let mut seen = Vec::new();

        reader
            .try_for_each_image(|name, file| {
                let content = file?.to_bytes()?;
                assert_eq!(content.as_ref(), name.as_bytes());
                seen.push(name.to_string());
                Ok::<(), Error>(())
            })
            .unwrap();

        assert_eq!(seen, ["001.png", "002.png", "010.png"]);
    }

    #[test]
    fn garbage_is_not_a_cbz() {
        assert!(matches!(
            CbzReader::from_bytes_slice(b"definitely not a zip"),
            Err(Error::Zip(_))
        ));
    }

    #[test]
    fn writer_keeps_insertion_order_and_stores() {
        let mut writer = CbzWriter::default();
        for name in ["b.png", "a.png", "c.png"] {
            writer.insert(name, name.as_bytes()).unwrap();
        }
        assert_eq!(writer.len(), 3);
        let finished = writer.finish().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(finished.into_bytes())).unwrap();
        let names = (0..archive.len())
            .map(|index| {
                let file = archive.by_index(index).unwrap();
                assert_eq!(file.compression(), CompressionMethod::Stored);
                file.name().to_string()
            })
            .collect::<Vec<_>>();

        assert_eq!(names, ["b.png", "a.png", "c.png"]);
    }

    #[test]
    fn writer_rejects_duplicate_names() {
        let mut writer = CbzWriter::default();
        writer.insert("a.webp", b"first").unwrap();

        assert!(matches!(
            writer.insert("a.webp", b"second"),
            Err(Error::CbzDuplicateName(name)) if name == "a.webp"
        ));
    }

    #[test]
    fn write_to_new_path_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.cbz");
        std::fs::write(&path, b"keep me").unwrap();

        let mut writer = CbzWriter::default();
        writer.insert("a.png", b"page").unwrap();
        let finished = writer.finish().unwrap();

        assert!(finished.write_to_new_path(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn rename_extension_keeps_directories() {
        assert_eq!(rename_extension("a.jpg", "png"), "a.png");
        assert_eq!(rename_extension("vol1/003.JPEG", "webp"), "vol1/003.webp");
        assert_eq!(rename_extension("page.01.png", "jpg"), "page.01.jpg");
    }

    #[test]
    fn image_names_need_an_extension() {
        assert!(is_image_name("x.WebP"));
        assert!(!is_image_name("png"));
        assert!(!is_image_name("x.gif"));
        assert!(!is_image_name("folder.png/"));
    }
}
