//! Error Handling Module
//!
//! This module defines the error types returned by the decoders and the
//! policy checks, using the `thiserror` crate.

use quick_xml::DeError;
use thiserror::Error;

use crate::timestamp;
use crate::validate::ReportFailure;

#[derive(Error, Debug)]
pub enum DmarcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The gzip or zip envelope could not be opened.
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("no suitable .xml file found in zip")]
    NotFound,

    /// Malformed XML or a document that does not fit the report shape.
    #[error("XML error: {0}")]
    Parse(#[source] DeError),

    #[error("malformed field {field}: {value:?}")]
    MalformedField { field: String, value: String },

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Invalid format: {0}")]
    Format(String),

    /// The report decoded fine but some record failed its checks.
    #[error("{0}")]
    Policy(#[from] ReportFailure),
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("could not read gzip stream: {0}")]
    Gzip(#[source] std::io::Error),

    #[error("could not open zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("could not read zipped file {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl DmarcError {
    /// True for [`DmarcError::Policy`]: the input was well formed, the mail was not.
    pub fn is_policy_failure(&self) -> bool {
        matches!(self, DmarcError::Policy(_))
    }
}

impl From<DeError> for DmarcError {
    fn from(err: DeError) -> Self {
        if let DeError::Custom(message) = &err {
            if let Some((field, value)) = timestamp::malformed_field(message) {
                return DmarcError::MalformedField {
                    field: field.to_string(),
                    value: value.to_string(),
                };
            }
        }
        DmarcError::Parse(err)
    }
}

impl From<zip::result::ZipError> for DmarcError {
    fn from(err: zip::result::ZipError) -> Self {
        DmarcError::Container(ContainerError::Zip(err))
    }
}

pub type Result<T> = std::result::Result<T, DmarcError>;
