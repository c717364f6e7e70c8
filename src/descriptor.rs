//! Directive files inside a resource type directory.
//!
//! Three files may declare relationships for a resource type:
//! - `extends`: exactly one clause naming the super type,
//! - `requires`: one clause per line, each naming a required type,
//! - `.content.xml`: a document-view descriptor whose root element may carry
//!   `sling:resourceSuperType` and `sling:requiredResourceTypes`.
//!
//! Clauses follow the header syntax in [`crate::header`] and may only use the
//! `version` attribute and the `resolution:` directive.
use crate::capability::RequiredResourceTypeCapability;
use crate::error::MetadataError;
use crate::header::{parse_header, Clause};
use crate::resource_type::normalize_resource_type;
use crate::version::VersionRange;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const EXTENDS_FILE: &str = "extends";
pub const REQUIRES_FILE: &str = "requires";
pub const CONTENT_DESCRIPTOR_FILE: &str = ".content.xml";

const RESOLUTION_DIRECTIVE: &str = "resolution:";
const VERSION_ATTRIBUTE: &str = "version";
const ALLOWED_ATTRIBUTES: &[&str] = &[RESOLUTION_DIRECTIVE, VERSION_ATTRIBUTE];

const JCR_NAMESPACE: &str = "http://www.jcp.org/jcr/1.0";
const SLING_NAMESPACE: &str = "http://sling.apache.org/jcr/sling/1.0";
const RESOURCE_SUPER_TYPE: &str = "resourceSuperType";
const REQUIRED_RESOURCE_TYPES: &str = "requiredResourceTypes";

/// One parsed `extends` / `requires` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub resource_type: String,
    pub version_range: Option<VersionRange>,
    pub optional: bool,
}

impl Directive {
    pub fn to_requirement(&self) -> Result<RequiredResourceTypeCapability> {
        let mut requirement = RequiredResourceTypeCapability::new(&self.resource_type)?
            .with_optional(self.optional);
        if let Some(range) = &self.version_range {
            requirement = requirement.with_version_range(range.clone());
        }
        Ok(requirement)
    }
}

/// Relationships declared by a `.content.xml` root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub resource_super_type: Option<String>,
    pub required_resource_types: Vec<String>,
}

/// Read an `extends` file: one non-blank line holding one clause.
pub fn read_extends_file(path: &Path) -> Result<Directive> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() != 1 {
        return Err(MetadataError::MalformedDirective {
            path: path.to_path_buf(),
            reason: format!("must contain exactly one line (found {})", lines.len()),
        }
        .into());
    }
    parse_directive(lines[0], path)
}

/// Read a `requires` file: every non-blank line is one clause.
pub fn read_requires_file(path: &Path) -> Result<Vec<Directive>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_directive(line, path))
        .collect()
}

/// Parse a single directive clause read from `source`.
pub fn parse_directive(line: &str, source: &Path) -> Result<Directive> {
    let clauses = parse_header(line).map_err(|err| MetadataError::MalformedDirective {
        path: source.to_path_buf(),
        reason: err.to_string(),
    })?;
    let clause = match clauses.as_slice() {
        [clause] => clause,
        _ => {
            return Err(MetadataError::MalformedDirective {
                path: source.to_path_buf(),
                reason: format!(
                    "each line must contain exactly one clause (found {} in {:?})",
                    clauses.len(),
                    line.trim()
                ),
            }
            .into())
        }
    };
    check_attributes(clause, source)?;
    let resource_type = normalize_resource_type(&clause.name, source)?;
    let optional = clause.attribute(RESOLUTION_DIRECTIVE) == Some("optional");
    let version_range = clause
        .attribute(VERSION_ATTRIBUTE)
        .and_then(|raw| match VersionRange::parse(raw) {
            Some(range) => Some(range),
            None => {
                warn!(
                    path = %source.display(),
                    version = raw,
                    "invalid version range; ignoring the constraint"
                );
                None
            }
        });
    Ok(Directive {
        resource_type,
        version_range,
        optional,
    })
}

fn check_attributes(clause: &Clause, source: &Path) -> Result<()> {
    for name in clause.attributes.keys() {
        if !ALLOWED_ATTRIBUTES.contains(&name.as_str()) {
            return Err(MetadataError::UnsupportedAttribute {
                path: source.to_path_buf(),
                name: name.clone(),
                allowed: ALLOWED_ATTRIBUTES,
            }
            .into());
        }
    }
    Ok(())
}

/// Read the relationship attributes of a document-view `.content.xml`.
pub fn read_content_descriptor(path: &Path) -> Result<ContentDescriptor> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let malformed = |reason: String| MetadataError::MalformedDescriptor {
        path: path.to_path_buf(),
        reason,
    };
    let document = roxmltree::Document::parse(&text).map_err(|err| malformed(err.to_string()))?;
    let root = document.root_element();
    let jcr_roots = document.descendants().filter(is_jcr_root).count();
    if jcr_roots != 1 || !is_jcr_root(&root) {
        return Err(malformed(
            "not a document view file (expected a single jcr:root element)".to_string(),
        )
        .into());
    }

    let mut descriptor = ContentDescriptor::default();
    if let Some(raw) = non_empty_attribute(&root, RESOURCE_SUPER_TYPE) {
        match parse_docview_value(raw) {
            DocViewValue::Single(value) => descriptor.resource_super_type = Some(value),
            DocViewValue::Multi(_) | DocViewValue::WrongType(_) => {
                return Err(malformed(format!(
                    "invalid sling:{RESOURCE_SUPER_TYPE} value {raw:?}; expected a single string"
                ))
                .into())
            }
        }
    }
    if let Some(raw) = non_empty_attribute(&root, REQUIRED_RESOURCE_TYPES) {
        match parse_docview_value(raw) {
            DocViewValue::Multi(values) => descriptor.required_resource_types = values,
            DocViewValue::Single(_) | DocViewValue::WrongType(_) => {
                return Err(malformed(format!(
                    "invalid sling:{REQUIRED_RESOURCE_TYPES} value {raw:?}; expected a multi-valued string list"
                ))
                .into())
            }
        }
    }
    debug!(
        path = %path.display(),
        super_type = ?descriptor.resource_super_type,
        required = descriptor.required_resource_types.len(),
        "read content descriptor"
    );
    Ok(descriptor)
}

/// True when `path` is a `.content.xml` declaring a resource super type.
pub fn declares_super_type(path: &Path) -> Result<bool> {
    Ok(read_content_descriptor(path)?.resource_super_type.is_some())
}

fn is_jcr_root(node: &roxmltree::Node<'_, '_>) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(JCR_NAMESPACE)
        && node.tag_name().name() == "root"
}

fn non_empty_attribute<'a>(node: &roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((SLING_NAMESPACE, name))
        .filter(|value| !value.is_empty())
}

#[derive(Debug, PartialEq, Eq)]
enum DocViewValue {
    Single(String),
    Multi(Vec<String>),
    WrongType(String),
}

/// Parse a document-view property value: an optional `{Type}` prefix
/// followed by a plain value or a `[a,b]` list with `\`-escapes.
fn parse_docview_value(raw: &str) -> DocViewValue {
    let mut value = raw;
    if let Some(rest) = value.strip_prefix('{') {
        if let Some(end) = rest.find('}') {
            let type_name = &rest[..end];
            if !type_name.is_empty() && type_name.chars().all(|ch| ch.is_ascii_alphabetic()) {
                if type_name != "String" {
                    return DocViewValue::WrongType(type_name.to_string());
                }
                value = &rest[end + 1..];
            }
        }
    }
    if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
        let inner = &value[1..value.len() - 1];
        if inner.is_empty() {
            return DocViewValue::Multi(Vec::new());
        }
        return DocViewValue::Multi(split_escaped_list(inner));
    }
    let single = match value.strip_prefix('\\') {
        Some(rest) if rest.starts_with('{') || rest.starts_with('[') => rest,
        _ => value,
    };
    DocViewValue::Single(single.to_string())
}

fn split_escaped_list(inner: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    items.push(current);
    items
}
