#![allow(dead_code)]

use std::{
    fs,
    io::{Cursor, Write},
};

use camino::{Utf8Path, Utf8PathBuf};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use zip::{write::FileOptions, ZipArchive, ZipWriter};

pub fn tempdir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

pub fn page(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    page(width, height, ImageFormat::Png)
}

pub fn write_zip(path: &Utf8Path, entries: &[(&str, Vec<u8>)]) {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
}

/// Entry names in the order they were written
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|index| archive.by_index(index).unwrap().name().to_string())
        .collect()
}

pub fn entry_dimensions(bytes: &[u8], name: &str) -> (u32, u32) {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    std::io::Read::read_to_end(&mut file, &mut content).unwrap();
    let image = image::load_from_memory(&content).unwrap();
    (image.width(), image.height())
}

/// A zip holding one stored `hello` entry whose central directory declares
/// `declared_size` uncompressed bytes through a zip64 extra field
pub fn zip_with_declared_size(name: &str, declared_size: u64) -> Vec<u8> {
    const CONTENT: &[u8] = b"hello";
    const CONTENT_CRC: u32 = 0x3610_a686;
    let name_len = u16::try_from(name.len()).unwrap();
    let content_len = u32::try_from(CONTENT.len()).unwrap();

    let mut bytes = Vec::new();
    // local file header
    bytes.extend_from_slice(&0x0403_4b50_u32.to_le_bytes());
    bytes.extend_from_slice(&45_u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 8]); // flags, method, time, date
    bytes.extend_from_slice(&CONTENT_CRC.to_le_bytes());
    bytes.extend_from_slice(&content_len.to_le_bytes());
    bytes.extend_from_slice(&content_len.to_le_bytes());
    bytes.extend_from_slice(&name_len.to_le_bytes());
    bytes.extend_from_slice(&0_u16.to_le_bytes());
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(CONTENT);

    let central_directory_offset = u32::try_from(bytes.len()).unwrap();
    bytes.extend_from_slice(&0x0201_4b50_u32.to_le_bytes());
    bytes.extend_from_slice(&45_u16.to_le_bytes());
    bytes.extend_from_slice(&45_u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 8]); // flags, method, time, date
    bytes.extend_from_slice(&CONTENT_CRC.to_le_bytes());
    bytes.extend_from_slice(&content_len.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(&name_len.to_le_bytes());
    bytes.extend_from_slice(&12_u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 10]); // comment, disk, attributes
    bytes.extend_from_slice(&0_u32.to_le_bytes());
    bytes.extend_from_slice(name.as_bytes());
    // zip64 extra field, only the uncompressed size is overridden
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&8_u16.to_le_bytes());
    bytes.extend_from_slice(&declared_size.to_le_bytes());
    let central_directory_size = u32::try_from(bytes.len()).unwrap() - central_directory_offset;

    // end of central directory
    bytes.extend_from_slice(&0x0605_4b50_u32.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&central_directory_size.to_le_bytes());
    bytes.extend_from_slice(&central_directory_offset.to_le_bytes());
    bytes.extend_from_slice(&0_u16.to_le_bytes());

    bytes
}
