//! Typed failure kinds raised by the analysis engine.
//!
//! Errors travel inside `anyhow::Error` like everywhere else in the crate;
//! callers that need to distinguish a hard failure kind use
//! [`metadata_error`] to find it in the chain.
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// An `extends` or `requires` file whose line or clause cardinality is wrong.
    MalformedDirective { path: PathBuf, reason: String },
    /// A directive clause carrying an attribute outside the allowed set.
    UnsupportedAttribute {
        path: PathBuf,
        name: String,
        allowed: &'static [&'static str],
    },
    /// A `.content.xml` that is not a document-view file or carries a
    /// super type / required types value with the wrong cardinality.
    MalformedDescriptor { path: PathBuf, reason: String },
    /// A script path whose extension has no script engine mapping.
    UnmappedScriptExtension { path: String },
    /// A provided capability constructed without any resource type.
    EmptyResourceTypes,
    /// A required capability constructed with a blank resource type.
    EmptyResourceType,
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::MalformedDirective { path, reason } => {
                write!(f, "malformed directive file {}: {reason}", path.display())
            }
            MetadataError::UnsupportedAttribute {
                path,
                name,
                allowed,
            } => write!(
                f,
                "unsupported attribute/directive {name:?} in {}; only {} may be used",
                path.display(),
                allowed.join(",")
            ),
            MetadataError::MalformedDescriptor { path, reason } => {
                write!(f, "malformed descriptor {}: {reason}", path.display())
            }
            MetadataError::UnmappedScriptExtension { path } => {
                write!(f, "path {path} does not have an extension mapped to a script engine")
            }
            MetadataError::EmptyResourceTypes => {
                write!(f, "a provided capability needs at least one resource type")
            }
            MetadataError::EmptyResourceType => {
                write!(f, "a required capability needs a non-empty resource type")
            }
        }
    }
}

impl std::error::Error for MetadataError {}

/// Find the first [`MetadataError`] in an error chain.
pub fn metadata_error(err: &anyhow::Error) -> Option<&MetadataError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<MetadataError>())
}
