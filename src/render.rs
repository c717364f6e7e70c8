//! `Provide-Capability` / `Require-Capability` header rendering.
//!
//! Every capability is rendered in the `sling.servlet` namespace. Requirements
//! become LDAP filters that only match selector-less capabilities.
use crate::capability::{
    CapabilitySet, ProvidedResourceTypeCapability, ProvidedScriptCapability,
    RequiredResourceTypeCapability,
};
use crate::header::{quote_list, quote_value};
use serde::Serialize;

pub const NAMESPACE: &str = "sling.servlet";
const RESOURCE_TYPES: &str = "sling.servlet.resourceTypes";
const SELECTORS: &str = "sling.servlet.selectors";
const EXTENSIONS: &str = "sling.servlet.extensions";
const METHODS: &str = "sling.servlet.methods";
const PATHS: &str = "sling.servlet.paths";
const VERSION: &str = "version";

pub fn provide_capability_header(set: &CapabilitySet) -> String {
    let mut clauses: Vec<String> = set
        .provided_resource_types()
        .iter()
        .map(render_provided)
        .collect();
    clauses.extend(set.provided_scripts().iter().map(render_script));
    clauses.join(",")
}

/// Render requirements; with `missing_optional`, unresolved ones are optional.
pub fn require_capability_header(set: &CapabilitySet, missing_optional: bool) -> String {
    set.required_resource_types()
        .iter()
        .map(|required| {
            let optional =
                required.is_optional() || (missing_optional && set.is_unresolved(required));
            render_required(required, optional)
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn render_provided(capability: &ProvidedResourceTypeCapability) -> String {
    let mut clause = format!(
        "{NAMESPACE};{RESOURCE_TYPES}:List<String>={}",
        quote_list(capability.resource_types().iter().map(String::as_str))
    );
    if let Some(engine) = capability.script_engine() {
        clause.push_str(&format!(";scriptEngine={}", quote_value(engine)));
    }
    if let Some(extension) = capability.script_extension() {
        clause.push_str(&format!(";scriptExtension={}", quote_value(extension)));
    }
    if let Some(version) = capability.version() {
        clause.push_str(&format!(";{VERSION}:Version=\"{version}\""));
    }
    if let Some(extends) = capability.extends_resource_type() {
        clause.push_str(&format!(";extends={}", quote_value(extends)));
    }
    if let Some(method) = capability.request_method() {
        clause.push_str(&format!(";{METHODS}={}", quote_value(method)));
    }
    if let Some(extension) = capability.request_extension() {
        clause.push_str(&format!(";{EXTENSIONS}={}", quote_value(extension)));
    }
    if !capability.selectors().is_empty() {
        clause.push_str(&format!(
            ";{SELECTORS}:List<String>={}",
            quote_list(capability.selectors().iter().map(String::as_str))
        ));
    }
    clause
}

fn render_script(capability: &ProvidedScriptCapability) -> String {
    format!(
        "{NAMESPACE};{PATHS}={};scriptEngine={};scriptExtension={}",
        quote_value(capability.path()),
        quote_value(capability.script_engine()),
        quote_value(capability.script_extension())
    )
}

fn render_required(required: &RequiredResourceTypeCapability, optional: bool) -> String {
    let type_term = format!(
        "({RESOURCE_TYPES}={})",
        escape_filter_value(required.resource_type())
    );
    let filter = match required.version_range() {
        Some(range) => format!(
            "(&(!({SELECTORS}=*))(&{}{type_term}))",
            range.to_filter_string(VERSION)
        ),
        None => format!("(&(!({SELECTORS}=*)){type_term})"),
    };
    let mut clause = format!("{NAMESPACE};filter:={}", quote_value(&filter));
    if optional {
        clause.push_str(";resolution:=optional");
    }
    clause
}

fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '*' | '(' | ')') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Machine-readable report of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataReport {
    pub provide_capability: String,
    pub require_capability: String,
    pub capabilities: CapabilitySet,
}

impl MetadataReport {
    pub fn new(capabilities: CapabilitySet, missing_requirements_optional: bool) -> Self {
        MetadataReport {
            provide_capability: provide_capability_header(&capabilities),
            require_capability: require_capability_header(
                &capabilities,
                missing_requirements_optional,
            ),
            capabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySetBuilder;
    use crate::version::{Version, VersionRange};
    use std::collections::{BTreeMap, BTreeSet};

    fn types(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn provided_clause_attribute_order() {
        let capability = ProvidedResourceTypeCapability::new(types(&["my/type", "/apps/my/type"]))
            .unwrap()
            .with_version(Some(Version::new(1, 0, 0)))
            .with_selectors(vec!["a".to_string(), "b,c".to_string()])
            .with_request_extension(Some("json".to_string()))
            .with_request_method(Some("POST".to_string()))
            .with_script("htl", "html")
            .with_extends_resource_type(Some("base".to_string()));
        assert_eq!(
            render_provided(&capability),
            "sling.servlet;sling.servlet.resourceTypes:List<String>=\"/apps/my/type,my/type\";\
             scriptEngine=htl;scriptExtension=html;version:Version=\"1.0.0\";extends=base;\
             sling.servlet.methods=POST;sling.servlet.extensions=json;\
             sling.servlet.selectors:List<String>=\"a,b\\,c\""
        );
    }

    #[test]
    fn path_script_clause() {
        let mappings: BTreeMap<String, String> = [("jsp".to_string(), "jsp".to_string())].into();
        let script = ProvidedScriptCapability::new("/libs/x/helper.jsp", &mappings).unwrap();
        assert_eq!(
            render_script(&script),
            "sling.servlet;sling.servlet.paths=\"/libs/x/helper.jsp\";scriptEngine=jsp;scriptExtension=jsp"
        );
    }

    #[test]
    fn required_filters() {
        let plain = RequiredResourceTypeCapability::new("org/apache/sling/bar").unwrap();
        assert_eq!(
            render_required(&plain, false),
            "sling.servlet;filter:=\"(&(!(sling.servlet.selectors=*))(sling.servlet.resourceTypes=org/apache/sling/bar))\""
        );
        let ranged = RequiredResourceTypeCapability::new("org/apache/sling/bar")
            .unwrap()
            .with_version_range(VersionRange::parse("[1.0.0,2.0.0)").unwrap());
        assert_eq!(
            render_required(&ranged, true),
            "sling.servlet;filter:=\"(&(!(sling.servlet.selectors=*))(&(&(version>=1.0.0)(!(version>=2.0.0)))(sling.servlet.resourceTypes=org/apache/sling/bar)))\";resolution:=optional"
        );
    }

    #[test]
    fn unresolved_requirements_follow_the_flag() {
        let mut builder = CapabilitySetBuilder::new();
        builder.require(RequiredResourceTypeCapability::new("missing").unwrap());
        let set = builder.build();
        assert!(require_capability_header(&set, true).ends_with(";resolution:=optional"));
        assert!(!require_capability_header(&set, false).contains("resolution:=optional"));
    }

    #[test]
    fn report_serializes_headers_and_capabilities() {
        let mut builder = CapabilitySetBuilder::new();
        builder.provide(
            ProvidedResourceTypeCapability::new(types(&["a"]))
                .unwrap()
                .with_script("htl", "html"),
        );
        let report = MetadataReport::new(builder.build(), true);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["capabilities"]["provided_resource_types"][0]["script_engine"],
            "htl"
        );
        assert!(value["provide_capability"]
            .as_str()
            .unwrap()
            .starts_with("sling.servlet;"));
        assert_eq!(value["require_capability"], "");
    }
}
