//! Integration tests for the `scap` binary.

mod common;

use common::{run_scap, ScriptTree};
use std::fs;
use std::process::Command;

fn component_tree() -> ScriptTree {
    let tree = ScriptTree::new();
    tree.scripts(&["apps/my/comp/comp.html", "apps/my/comp/teaser/small.html"])
        .file("apps/my/comp/extends", "my/base\n");
    tree
}

#[test]
fn metadata_prints_headers() {
    let tree = component_tree();
    let output = run_scap(&["metadata"], tree.root());
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    let provide = lines.next().unwrap_or_default();
    let require = lines.next().unwrap_or_default();
    assert!(provide.starts_with("Provide-Capability: sling.servlet;"));
    assert!(provide.contains(
        "sling.servlet.resourceTypes:List<String>=\"/apps/my/comp,my/comp\";scriptEngine=htl;scriptExtension=html;extends=\"my/base\""
    ));
    assert!(provide.contains("sling.servlet.selectors:List<String>=\"teaser,small\""));
    assert_eq!(
        require,
        "Require-Capability: sling.servlet;filter:=\"(&(!(sling.servlet.selectors=*))(sling.servlet.resourceTypes=my/base))\";resolution:=optional"
    );
}

#[test]
fn strict_requirements_drop_optional_resolution() {
    let tree = component_tree();
    let output = run_scap(&["metadata", "--strict-requirements"], tree.root());
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("resolution:=optional"));
}

#[test]
fn metadata_json_report() {
    let tree = component_tree();
    let out = tree.root().join("reports/capabilities.json");
    let out_arg = out.to_string_lossy().into_owned();
    let output = run_scap(&["metadata", "--json", "--out", &out_arg], tree.root());
    assert!(output.status.success(), "{output:?}");
    assert!(output.stdout.is_empty());

    let text = fs::read_to_string(&out).expect("read report");
    let report: serde_json::Value = serde_json::from_str(&text).expect("parse report");
    let provided = report["capabilities"]["provided_resource_types"]
        .as_array()
        .expect("provided array");
    assert_eq!(provided.len(), 2);
    assert_eq!(
        report["capabilities"]["unresolved_required"][0]["resource_type"],
        "my/base"
    );
    assert!(report["provide_capability"]
        .as_str()
        .unwrap_or_default()
        .contains("extends=\"my/base\""));
}

#[test]
fn config_file_and_flags_are_applied() {
    let tree = ScriptTree::new();
    tree.scripts(&["custom/comp/comp.hbs"]);
    let config = tree.root().join("scap.json");
    fs::write(&config, r#"{"search_paths": ["/custom"]}"#).expect("write config");
    let config_arg = config.to_string_lossy().into_owned();
    let output = run_scap(
        &[
            "metadata",
            "--config",
            &config_arg,
            "--script-engine",
            "hbs:handlebars",
            "--json",
        ],
        tree.root(),
    );
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("parse report");
    let capability = &report["capabilities"]["provided_resource_types"][0];
    assert_eq!(capability["script_engine"], "handlebars");
    assert_eq!(
        capability["resource_types"],
        serde_json::json!(["/custom/comp", "comp"])
    );
}

#[test]
fn malformed_directive_fails_the_run() {
    let tree = ScriptTree::new();
    tree.scripts(&["a/a.html"]).file("a/extends", "b\nc\n");
    let output = run_scap(&["metadata"], tree.root());
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed directive file"), "{stderr}");
}

#[test]
fn config_command_prints_defaults() {
    let output = Command::new(env!("CARGO_BIN_EXE_scap"))
        .arg("config")
        .output()
        .expect("run scap config");
    assert!(output.status.success(), "{output:?}");
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse config");
    assert_eq!(config["search_paths"], serde_json::json!(["/apps", "/libs"]));
    assert_eq!(config["script_engine_mappings"]["html"], "htl");
    assert_eq!(config["missing_requirements_optional"], true);
}
