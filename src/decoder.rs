//! Decoder Module
//!
//! Entry points that turn a byte stream into an [`Aggregate`]. Reports arrive
//! as plain XML, gzip-compressed XML, or a zip archive holding the XML file;
//! [`Decoder::decode_file`] picks the unwrapping from the file name alone and
//! never sniffs content, so gzip bytes named `.xml` fail as a parse error.
//!
//! The `check*` variants decode and then validate, folding a failed policy
//! check into [`DmarcError::Policy`].

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use log::debug;

use crate::archive::{self, extension};
use crate::config::Config;
use crate::error::{DmarcError, Result};
use crate::models::Aggregate;
use crate::xml_parser::parse_aggregate;

/// Decodes reports under a set of size limits.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: Config,
}

impl Decoder {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decodes a plain XML report. The document text is capped by
    /// `max_decompressed_size`, the same cap gzip and zip contents get.
    pub fn decode<R: Read>(&self, reader: R) -> Result<Aggregate> {
        let xml = archive::read_capped(reader, self.config.max_decompressed_size, "XML report", DmarcError::Io)?;
        parse_aggregate(&xml)
    }

    /// Decodes a gzip-compressed XML report.
    pub fn decode_gzip<R: Read>(&self, reader: R) -> Result<Aggregate> {
        let xml = archive::gunzip(reader, &self.config)?;
        parse_aggregate(&xml)
    }

    /// Decodes the first `.xml` entry of a zip archive, in archive order.
    /// Other entries, `.xml` or not, are ignored.
    pub fn decode_zip<R: Read + Seek>(&self, reader: R) -> Result<Aggregate> {
        let (_, xml) = archive::unzip_report(reader, &self.config)?;
        parse_aggregate(&xml)
    }

    /// Decodes a report according to its file name: `.gz` is gunzipped,
    /// `.zip` is unzipped, anything else is read as XML.
    ///
    /// A zip needs random access, so `.zip` input is first buffered whole in
    /// memory (up to `max_file_size`).
    pub fn decode_file<P, R>(&self, filename: P, reader: R) -> Result<Aggregate>
    where
        P: AsRef<Path>,
        R: Read,
    {
        let filename = filename.as_ref().to_string_lossy();
        match extension(&filename) {
            ".gz" => {
                debug!("Decoding {} as gzip", filename);
                self.decode_gzip(reader)
            }
            ".zip" => {
                debug!("Decoding {} as zip", filename);
                let buf = archive::read_capped(reader, self.config.max_file_size, "Zip archive", DmarcError::Io)?;
                self.decode_zip(Cursor::new(buf))
            }
            _ => {
                debug!("Decoding {} as XML", filename);
                self.decode(reader)
            }
        }
    }

    /// Opens a report on disk and decodes it according to its name.
    /// Compressed files are held to `max_file_size`, plain XML to
    /// `max_decompressed_size`.
    pub fn decode_path<P: AsRef<Path>>(&self, path: P) -> Result<Aggregate> {
        let path = path.as_ref();
        let limit = match extension(&path.to_string_lossy()) {
            ".gz" | ".zip" => self.config.max_file_size,
            _ => self.config.max_decompressed_size,
        };
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        if size > limit as u64 {
            return Err(DmarcError::FileTooLarge(format!(
                "File size {} bytes exceeds limit of {} bytes",
                size, limit
            )));
        }
        self.decode_file(path, file)
    }

    /// [`Decoder::decode`], then [`Aggregate::validate`].
    pub fn check<R: Read>(&self, reader: R) -> Result<()> {
        Ok(self.decode(reader)?.validate()?)
    }

    /// [`Decoder::decode_gzip`], then [`Aggregate::validate`].
    pub fn check_gzip<R: Read>(&self, reader: R) -> Result<()> {
        Ok(self.decode_gzip(reader)?.validate()?)
    }

    /// [`Decoder::decode_zip`], then [`Aggregate::validate`].
    pub fn check_zip<R: Read + Seek>(&self, reader: R) -> Result<()> {
        Ok(self.decode_zip(reader)?.validate()?)
    }

    /// [`Decoder::decode_file`], then [`Aggregate::validate`].
    pub fn check_file<P: AsRef<Path>, R: Read>(&self, filename: P, reader: R) -> Result<()> {
        Ok(self.decode_file(filename, reader)?.validate()?)
    }
}

/// Decodes a plain XML report with default limits.
pub fn decode<R: Read>(reader: R) -> Result<Aggregate> {
    Decoder::default().decode(reader)
}

/// Decodes a gzip-compressed report with default limits.
pub fn decode_gzip<R: Read>(reader: R) -> Result<Aggregate> {
    Decoder::default().decode_gzip(reader)
}

/// Decodes a zipped report with default limits.
pub fn decode_zip<R: Read + Seek>(reader: R) -> Result<Aggregate> {
    Decoder::default().decode_zip(reader)
}

/// Decodes a report by file name with default limits.
pub fn decode_file<P: AsRef<Path>, R: Read>(filename: P, reader: R) -> Result<Aggregate> {
    Decoder::default().decode_file(filename, reader)
}

pub fn check<R: Read>(reader: R) -> Result<()> {
    Decoder::default().check(reader)
}

pub fn check_gzip<R: Read>(reader: R) -> Result<()> {
    Decoder::default().check_gzip(reader)
}

pub fn check_zip<R: Read + Seek>(reader: R) -> Result<()> {
    Decoder::default().check_zip(reader)
}

pub fn check_file<P: AsRef<Path>, R: Read>(filename: P, reader: R) -> Result<()> {
    Decoder::default().check_file(filename, reader)
}
