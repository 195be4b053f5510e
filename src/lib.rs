//! DMARC aggregate report library
//!
//! Decodes DMARC aggregate feedback reports, whether plain XML, gzip or zip,
//! into a typed [`Aggregate`], and checks each record's disposition, DKIM/SPF
//! alignment and DKIM/SPF authentication results.

pub mod archive;
pub mod config;
pub mod decoder;
pub mod error;
pub mod models;
pub mod timestamp;
pub mod validate;
pub mod xml_parser;

pub use config::Config;
pub use decoder::{
    check, check_file, check_gzip, check_zip, decode, decode_file, decode_gzip, decode_zip, Decoder,
};
pub use error::{ContainerError, DmarcError, Result};
pub use models::Aggregate;
pub use validate::{Reason, RecordFailure, ReportFailure};
