//! Resource types derived from root-relative directory paths.
use crate::error::MetadataError;
use crate::version::Version;
use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    resource_type: String,
    version: Option<Version>,
}

impl ResourceType {
    /// Build a resource type from a normalized, slash-separated path.
    ///
    /// A trailing segment that is a valid version becomes the version and the
    /// parent path becomes the type.
    pub fn parse(path: &str) -> ResourceType {
        let path = path.trim_end_matches('/');
        if let Some((parent, last)) = path.rsplit_once('/') {
            if !parent.is_empty() {
                if let Some(version) = Version::parse(last) {
                    return ResourceType {
                        resource_type: parent.to_string(),
                        version: Some(version),
                    };
                }
            }
        }
        ResourceType {
            resource_type: path.to_string(),
            version: None,
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// The trailing label scripts are matched against, e.g. `page` for
    /// `my/components/page`.
    pub fn label(&self) -> &str {
        let segment = self
            .resource_type
            .rsplit('/')
            .next()
            .unwrap_or(&self.resource_type);
        segment_label(segment)
    }

    /// Every string the runtime may use to name this type under the given
    /// search paths. A type below a search path yields its absolute and its
    /// search-path-relative form; any other type yields itself.
    pub fn expand(&self, search_paths: &BTreeSet<String>) -> BTreeSet<String> {
        let mut types = BTreeSet::new();
        let absolute = format!("/{}", self.resource_type.trim_start_matches('/'));
        for search_path in search_paths {
            let prefix = if search_path.ends_with('/') {
                search_path.clone()
            } else {
                format!("{search_path}/")
            };
            if let Some(relative) = absolute.strip_prefix(&prefix) {
                types.insert(absolute.clone());
                types.insert(relative.to_string());
            }
        }
        if types.is_empty() {
            types.insert(self.resource_type.clone());
        }
        types
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/{version}", self.resource_type),
            None => f.write_str(&self.resource_type),
        }
    }
}

/// The part of a path segment after its final `.`, or the whole segment.
pub fn segment_label(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(index) if index + 1 < segment.len() => &segment[index + 1..],
        _ => segment,
    }
}

/// Normalize a slash-separated resource type path: collapse `//` and `.`,
/// resolve `..`, turn `\` into `/`. Climbing above the first segment fails.
pub fn normalize_resource_type(raw: &str, source: &Path) -> Result<String> {
    let unified = raw.trim().replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(MetadataError::MalformedDirective {
                        path: source.to_path_buf(),
                        reason: format!("resource type {raw:?} escapes its root"),
                    }
                    .into());
                }
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return Err(MetadataError::MalformedDirective {
            path: source.to_path_buf(),
            reason: format!("resource type {raw:?} is empty"),
        }
        .into());
    }
    let joined = segments.join("/");
    Ok(if absolute { format!("/{joined}") } else { joined })
}
