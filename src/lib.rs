//! Static analysis of script trees laid out by resource type.
//!
//! [`analyse_tree`] walks a scripts directory, classifies resource type roots,
//! reads their directive files and script names, and returns the
//! [`CapabilitySet`] the tree provides and requires. [`render`] turns the set
//! into OSGi capability headers.
pub mod analyser;
pub mod capability;
pub mod classifier;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod header;
pub mod platform_name;
pub mod render;
pub mod resource_type;
pub mod script;
pub mod version;

pub use analyser::{analyse_tree, TreeAnalyser};
pub use capability::{
    CapabilitySet, CapabilitySetBuilder, ProvidedResourceTypeCapability, ProvidedScriptCapability,
    RequiredResourceTypeCapability,
};
pub use config::{AnalysisConfig, ConfigOverrides};
pub use error::{metadata_error, MetadataError};
