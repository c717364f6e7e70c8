//! Shared test infrastructure for integration tests.

use script_capabilities::{CapabilitySet, ProvidedResourceTypeCapability};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scripts directory built file by file in a temp dir.
pub struct ScriptTree {
    dir: TempDir,
}

impl Default for ScriptTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to a root-relative path, creating parent folders.
    pub fn file(&self, relative: &str, contents: &str) -> &Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture file");
        self
    }

    /// Create empty script files.
    pub fn scripts(&self, relatives: &[&str]) -> &Self {
        for relative in relatives {
            self.file(relative, "");
        }
        self
    }
}

#[allow(dead_code)]
pub fn types(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Provided capabilities for a resource type string, in set order.
#[allow(dead_code)]
pub fn provided_for<'a>(
    set: &'a CapabilitySet,
    resource_type: &str,
) -> Vec<&'a ProvidedResourceTypeCapability> {
    set.provided_resource_types()
        .iter()
        .filter(|capability| capability.resource_types().contains(resource_type))
        .collect()
}

/// Find a provided capability by resource type and selectors.
#[allow(dead_code)]
pub fn find_provided<'a>(
    set: &'a CapabilitySet,
    resource_type: &str,
    selectors: &[&str],
) -> Option<&'a ProvidedResourceTypeCapability> {
    provided_for(set, resource_type)
        .into_iter()
        .find(|capability| capability.selectors() == selectors)
}

/// Run the `scap` binary with the given arguments.
#[allow(dead_code)]
pub fn run_scap(args: &[&str], root: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scap"))
        .args(args)
        .arg("--root")
        .arg(root)
        .env_remove("RUST_LOG")
        .output()
        .expect("run scap")
}
