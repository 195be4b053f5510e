//! Archive Module
//!
//! Unwraps the envelopes a report can travel in. Gzip streams are inflated,
//! zip archives are scanned for the report entry. Every read is capped by the
//! limits in [`Config`], and nothing is ever written to disk.

use std::io::{self, Read, Seek};

use flate2::read::GzDecoder;
use log::{debug, warn};
use zip::ZipArchive;

use crate::config::Config;
use crate::error::{ContainerError, DmarcError, Result};

/// Extension of the last path component, dot included (`"report.xml.gz"` gives
/// `".gz"`), or `""` when there is none. Case is kept.
pub fn extension(name: &str) -> &str {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    base.rfind('.').map_or("", |i| &base[i..])
}

/// Reads `reader` to the end, failing with `FileTooLarge` past `limit` bytes.
pub(crate) fn read_capped<R, F>(reader: R, limit: usize, what: &str, on_io: F) -> Result<Vec<u8>>
where
    R: Read,
    F: FnOnce(io::Error) -> DmarcError,
{
    let mut buf = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .map_err(on_io)?;
    if buf.len() > limit {
        return Err(DmarcError::FileTooLarge(format!(
            "{what} exceeds limit of {limit} bytes"
        )));
    }
    Ok(buf)
}

/// Inflates a gzip stream.
pub(crate) fn gunzip<R: Read>(reader: R, config: &Config) -> Result<Vec<u8>> {
    read_capped(
        GzDecoder::new(reader),
        config.max_decompressed_size,
        "Decompressed gzip stream",
        |e| ContainerError::Gzip(e).into(),
    )
}

/// Returns the name and contents of the first non-directory entry, in archive
/// order, whose name ends in `.xml`. Later candidates are ignored.
pub(crate) fn unzip_report<R: Read + Seek>(reader: R, config: &Config) -> Result<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(reader)?;
    if archive.len() > config.max_files_in_zip {
        return Err(DmarcError::Format(format!(
            "Too many files in archive: {}",
            archive.len()
        )));
    }

    let mut candidates = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.is_dir() || extension(entry.name()) != ".xml" {
            debug!("Skipping zip entry {}", entry.name());
            continue;
        }
        candidates.push(i);
    }
    let index = *candidates.first().ok_or(DmarcError::NotFound)?;
    if candidates.len() > 1 {
        warn!(
            "Zip archive holds {} .xml entries, decoding only the first",
            candidates.len()
        );
    }

    let entry = archive.by_index(index)?;
    let name = entry.name().to_string();
    debug!("Decoding zip entry {}", name);

    if entry.size() > config.max_decompressed_size as u64 {
        return Err(DmarcError::FileTooLarge(format!(
            "Zipped file {} too large: {} bytes",
            name,
            entry.size()
        )));
    }
    let compressed_size = entry.compressed_size();
    if compressed_size > 0 {
        let ratio = entry.size() as f64 / compressed_size as f64;
        if ratio > config.max_compression_ratio {
            return Err(DmarcError::Format(format!(
                "Suspicious compression ratio: {:.2}",
                ratio
            )));
        }
    }

    let contents = read_capped(
        entry,
        config.max_decompressed_size,
        "Zipped file",
        |source| {
            ContainerError::Entry {
                name: name.clone(),
                source,
            }
            .into()
        },
    )?;
    Ok((name, contents))
}
