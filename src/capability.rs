//! Capability values and the set they are collected into.
//!
//! Provided resource type capabilities are accumulated in a
//! [`CapabilitySetBuilder`] keyed by the fields that identify an endpoint
//! (resource types, version, selectors, request extension and method). An
//! `extends` declaration and the scripts serving the same endpoint therefore
//! meet in one entry no matter which is seen first.
use crate::error::MetadataError;
use crate::version::{Version, VersionRange};
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One endpoint the analysed tree can serve.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProvidedResourceTypeCapability {
    resource_types: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<Version>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    selectors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    script_engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    script_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extends_resource_type: Option<String>,
}

impl ProvidedResourceTypeCapability {
    pub fn new(resource_types: BTreeSet<String>) -> Result<Self> {
        if resource_types.is_empty() || resource_types.iter().any(|t| t.trim().is_empty()) {
            return Err(MetadataError::EmptyResourceTypes.into());
        }
        Ok(ProvidedResourceTypeCapability {
            resource_types,
            version: None,
            selectors: Vec::new(),
            request_extension: None,
            request_method: None,
            script_engine: None,
            script_extension: None,
            extends_resource_type: None,
        })
    }

    pub fn with_version(mut self, version: Option<Version>) -> Self {
        self.version = version;
        self
    }

    pub fn with_selectors(mut self, selectors: Vec<String>) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_request_extension(mut self, extension: Option<String>) -> Self {
        self.request_extension = extension;
        self
    }

    pub fn with_request_method(mut self, method: Option<String>) -> Self {
        self.request_method = method;
        self
    }

    pub fn with_script(mut self, engine: impl Into<String>, extension: impl Into<String>) -> Self {
        self.script_engine = Some(engine.into());
        self.script_extension = Some(extension.into());
        self
    }

    pub fn with_extends_resource_type(mut self, extends: Option<String>) -> Self {
        self.extends_resource_type = extends;
        self
    }

    pub fn resource_types(&self) -> &BTreeSet<String> {
        &self.resource_types
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    pub fn request_extension(&self) -> Option<&str> {
        self.request_extension.as_deref()
    }

    pub fn request_method(&self) -> Option<&str> {
        self.request_method.as_deref()
    }

    pub fn script_engine(&self) -> Option<&str> {
        self.script_engine.as_deref()
    }

    pub fn script_extension(&self) -> Option<&str> {
        self.script_extension.as_deref()
    }

    pub fn extends_resource_type(&self) -> Option<&str> {
        self.extends_resource_type.as_deref()
    }

    fn key(&self) -> EndpointKey {
        EndpointKey {
            resource_types: self.resource_types.clone(),
            version: self.version.clone(),
            selectors: self.selectors.clone(),
            request_extension: self.request_extension.clone(),
            request_method: self.request_method.clone(),
        }
    }
}

/// A resource type the analysed tree depends on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequiredResourceTypeCapability {
    resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_range: Option<VersionRange>,
    optional: bool,
}

impl RequiredResourceTypeCapability {
    pub fn new(resource_type: &str) -> Result<Self> {
        if resource_type.trim().is_empty() {
            return Err(MetadataError::EmptyResourceType.into());
        }
        Ok(RequiredResourceTypeCapability {
            resource_type: resource_type.to_string(),
            version_range: None,
            optional: false,
        })
    }

    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = Some(range);
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn version_range(&self) -> Option<&VersionRange> {
        self.version_range.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// A requirement is met by a selector-less capability naming the type
    /// whose version, if a range is given, falls inside the range.
    pub fn is_satisfied(&self, provided: &ProvidedResourceTypeCapability) -> bool {
        if !provided.selectors.is_empty() || !provided.resource_types.contains(&self.resource_type) {
            return false;
        }
        match &self.version_range {
            None => true,
            Some(range) => provided
                .version
                .as_ref()
                .is_some_and(|version| range.includes(version)),
        }
    }
}

/// A script outside every resource type root, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProvidedScriptCapability {
    path: String,
    script_extension: String,
    script_engine: String,
}

impl ProvidedScriptCapability {
    /// Fails when the path's extension has no script engine mapping.
    pub fn new(path: &str, script_engine_mappings: &BTreeMap<String, String>) -> Result<Self> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let extension = match file_name.rfind('.') {
            Some(index) if index + 1 < file_name.len() => &file_name[index + 1..],
            _ => "",
        };
        let Some(engine) = script_engine_mappings.get(extension) else {
            return Err(MetadataError::UnmappedScriptExtension {
                path: path.to_string(),
            }
            .into());
        };
        Ok(ProvidedScriptCapability {
            path: path.to_string(),
            script_extension: extension.to_string(),
            script_engine: engine.clone(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn script_extension(&self) -> &str {
        &self.script_extension
    }

    pub fn script_engine(&self) -> &str {
        &self.script_engine
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EndpointKey {
    resource_types: BTreeSet<String>,
    version: Option<Version>,
    selectors: Vec<String>,
    request_extension: Option<String>,
    request_method: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Endpoint {
    extends_resource_type: Option<String>,
    /// `(engine, extension)` pairs of the scripts serving the endpoint.
    scripts: BTreeSet<(String, String)>,
}

/// Accumulates capability fragments during one analysis run.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySetBuilder {
    endpoints: BTreeMap<EndpointKey, Endpoint>,
    scripts: BTreeSet<ProvidedScriptCapability>,
    required: BTreeSet<RequiredResourceTypeCapability>,
}

impl CapabilitySetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a provided capability. Script bindings accumulate per endpoint;
    /// a super type replaces the endpoint's previous one.
    pub fn provide(&mut self, capability: ProvidedResourceTypeCapability) {
        let endpoint = self.endpoints.entry(capability.key()).or_default();
        if let (Some(engine), Some(extension)) =
            (capability.script_engine, capability.script_extension)
        {
            endpoint.scripts.insert((engine, extension));
        }
        if capability.extends_resource_type.is_some() {
            endpoint.extends_resource_type = capability.extends_resource_type;
        }
    }

    /// Attach a super type to the root endpoint of a resource type.
    pub fn declare_extends(
        &mut self,
        resource_types: BTreeSet<String>,
        version: Option<Version>,
        extends: &str,
    ) -> Result<()> {
        let root = ProvidedResourceTypeCapability::new(resource_types)?
            .with_version(version)
            .with_extends_resource_type(Some(extends.to_string()));
        self.provide(root);
        Ok(())
    }

    pub fn provide_script(&mut self, capability: ProvidedScriptCapability) {
        self.scripts.insert(capability);
    }

    pub fn require(&mut self, capability: RequiredResourceTypeCapability) {
        self.required.insert(capability);
    }

    pub fn merge(&mut self, other: CapabilitySetBuilder) {
        for (key, endpoint) in other.endpoints {
            let target = self.endpoints.entry(key).or_default();
            target.scripts.extend(endpoint.scripts);
            if endpoint.extends_resource_type.is_some() {
                target.extends_resource_type = endpoint.extends_resource_type;
            }
        }
        self.scripts.extend(other.scripts);
        self.required.extend(other.required);
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty() && self.scripts.is_empty() && self.required.is_empty()
    }

    /// Materialize the endpoints: one capability per script binding, or a
    /// single script-less capability for an endpoint that only extends.
    pub fn build(self) -> CapabilitySet {
        let mut provided = BTreeSet::new();
        for (key, endpoint) in self.endpoints {
            let base = ProvidedResourceTypeCapability {
                resource_types: key.resource_types,
                version: key.version,
                selectors: key.selectors,
                request_extension: key.request_extension,
                request_method: key.request_method,
                script_engine: None,
                script_extension: None,
                extends_resource_type: endpoint.extends_resource_type,
            };
            if endpoint.scripts.is_empty() {
                provided.insert(base);
                continue;
            }
            for (engine, extension) in endpoint.scripts {
                provided.insert(base.clone().with_script(engine, extension));
            }
        }
        CapabilitySet::new(provided, self.scripts, self.required)
    }
}

/// The result of one analysis run. Unresolved requirements are computed once
/// at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    provided_resource_types: BTreeSet<ProvidedResourceTypeCapability>,
    provided_scripts: BTreeSet<ProvidedScriptCapability>,
    required_resource_types: BTreeSet<RequiredResourceTypeCapability>,
    unresolved_required: BTreeSet<RequiredResourceTypeCapability>,
}

impl CapabilitySet {
    pub fn new(
        provided_resource_types: BTreeSet<ProvidedResourceTypeCapability>,
        provided_scripts: BTreeSet<ProvidedScriptCapability>,
        required_resource_types: BTreeSet<RequiredResourceTypeCapability>,
    ) -> Self {
        let unresolved_required = required_resource_types
            .iter()
            .filter(|required| {
                !provided_resource_types
                    .iter()
                    .any(|provided| required.is_satisfied(provided))
            })
            .cloned()
            .collect();
        CapabilitySet {
            provided_resource_types,
            provided_scripts,
            required_resource_types,
            unresolved_required,
        }
    }

    pub fn provided_resource_types(&self) -> &BTreeSet<ProvidedResourceTypeCapability> {
        &self.provided_resource_types
    }

    pub fn provided_scripts(&self) -> &BTreeSet<ProvidedScriptCapability> {
        &self.provided_scripts
    }

    pub fn required_resource_types(&self) -> &BTreeSet<RequiredResourceTypeCapability> {
        &self.required_resource_types
    }

    pub fn unresolved_required(&self) -> &BTreeSet<RequiredResourceTypeCapability> {
        &self.unresolved_required
    }

    pub fn is_unresolved(&self, required: &RequiredResourceTypeCapability) -> bool {
        self.unresolved_required.contains(required)
    }
}
