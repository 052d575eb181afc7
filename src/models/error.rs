use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Display, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum PackError {
    #[display("modpack not found: {_0}")]
    PackNotFound(String),
    #[display("version not found: {_0}")]
    VersionNotFound(String),
    #[display("package not found: {_0}")]
    PackageNotFound(String),
    #[display("a modpack with id '{_0}' already exists")]
    DuplicatePack(String),
    #[display("invalid manifest: {_0}")]
    InvalidManifest(String),
    #[display("path escapes the store root: {_0}")]
    InvalidPath(String),
    #[display("parse error: {_0}")]
    ParseError(String),
    #[display("io error: {_0}")]
    IOError(String),
}

impl std::error::Error for PackError {}

impl From<std::io::Error> for PackError {
    fn from(e: std::io::Error) -> Self {
        PackError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for PackError {
    fn from(e: serde_json::Error) -> Self {
        PackError::ParseError(e.to_string())
    }
}

impl From<std::path::StripPrefixError> for PackError {
    fn from(e: std::path::StripPrefixError) -> Self {
        PackError::ParseError(e.to_string())
    }
}

impl From<walkdir::Error> for PackError {
    fn from(e: walkdir::Error) -> Self {
        PackError::IOError(e.to_string())
    }
}

impl From<zip::result::ZipError> for PackError {
    fn from(e: zip::result::ZipError) -> Self {
        PackError::IOError(e.to_string())
    }
}
