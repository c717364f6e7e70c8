//! Analysis configuration.
//!
//! Defaults are pure constants. A JSON config file and command line flags are
//! both expressed as [`ConfigOverrides`] and applied on top of the defaults
//! before a run starts; the resulting [`AnalysisConfig`] is never mutated
//! during analysis.
use anyhow::{anyhow, Context, Result};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub const DEFAULT_SEARCH_PATHS: [&str; 2] = ["/apps", "/libs"];

pub const DEFAULT_SCRIPT_ENGINE_MAPPINGS: [(&str, &str); 9] = [
    ("ftl", "freemarker"),
    ("gst", "gstring"),
    ("html", "htl"),
    ("java", "java"),
    ("esp", "rhino"),
    ("ecma", "rhino"),
    ("jsp", "jsp"),
    ("jspf", "jsp"),
    ("jspx", "jsp"),
];

/// Editor backups and version control metadata.
pub const DEFAULT_EXCLUDES: [&str; 17] = [
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    "**/.svn",
    "**/.svn/**",
    "**/.bzr",
    "**/.bzr/**",
    "**/.DS_Store",
    "**/.hg",
    "**/.hg/**",
    "**/.git",
    "**/.git/**",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    pub search_paths: BTreeSet<String>,
    pub script_engine_mappings: BTreeMap<String, String>,
    /// Render unresolved requirements as optional.
    pub missing_requirements_optional: bool,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// File and folder names are content-package platform names.
    pub content_package: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(|p| p.to_string()).collect(),
            script_engine_mappings: DEFAULT_SCRIPT_ENGINE_MAPPINGS
                .iter()
                .map(|(ext, engine)| (ext.to_string(), engine.to_string()))
                .collect(),
            missing_requirements_optional: true,
            includes: Vec::new(),
            excludes: DEFAULT_EXCLUDES.iter().map(|g| g.to_string()).collect(),
            content_package: false,
        }
    }
}

/// Partial configuration as read from a config file or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub search_paths: Option<Vec<String>>,
    /// Merged over the default mappings.
    pub script_engine_mappings: Option<BTreeMap<String, String>>,
    pub missing_requirements_optional: Option<bool>,
    pub includes: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    pub content_package: Option<bool>,
}

impl AnalysisConfig {
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(search_paths) = overrides.search_paths {
            self.search_paths = search_paths.into_iter().collect();
        }
        if let Some(mappings) = overrides.script_engine_mappings {
            self.script_engine_mappings.extend(mappings);
        }
        if let Some(optional) = overrides.missing_requirements_optional {
            self.missing_requirements_optional = optional;
        }
        if let Some(includes) = overrides.includes {
            self.includes = includes;
        }
        if let Some(excludes) = overrides.excludes {
            self.excludes = excludes;
        }
        if let Some(content_package) = overrides.content_package {
            self.content_package = content_package;
        }
    }

    pub fn validate(&self) -> Result<()> {
        for search_path in &self.search_paths {
            if search_path.trim().is_empty() {
                return Err(anyhow!("search paths must be non-empty"));
            }
            if !search_path.starts_with('/') {
                return Err(anyhow!(
                    "search path {search_path:?} must be absolute (start with '/')"
                ));
            }
        }
        for (extension, engine) in &self.script_engine_mappings {
            if extension.trim().is_empty() || engine.trim().is_empty() {
                return Err(anyhow!(
                    "script engine mapping {extension:?} -> {engine:?} must name both an extension and an engine"
                ));
            }
        }
        PathFilter::new(&self.includes, &self.excludes)?;
        Ok(())
    }

    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.includes, &self.excludes)
    }
}

/// Load a JSON config file.
pub fn load_config(path: &Path) -> Result<ConfigOverrides> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let overrides: ConfigOverrides = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(overrides)
}

/// Render the default config as pretty JSON.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&AnalysisConfig::default()).context("serialize default config")
}

/// Parse one `ext:engine` script engine mapping.
pub fn parse_mapping(entry: &str) -> Result<(String, String)> {
    let invalid = || anyhow!("invalid script engine mapping {entry:?} (expected ext:engine)");
    let (extension, engine) = entry.split_once(':').ok_or_else(invalid)?;
    let (extension, engine) = (extension.trim(), engine.trim());
    if extension.is_empty() || engine.is_empty() {
        return Err(invalid());
    }
    Ok((extension.to_string(), engine.to_string()))
}

/// Include/exclude globs matched against root-relative `/`-separated paths.
///
/// Excludes prune both directories and files. Includes select files only; an
/// empty include list selects everything. `*` and `?` stay within one path
/// segment, `**` spans segments and `{a,b}` alternatives are expanded.
#[derive(Debug, Clone)]
pub struct PathFilter {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl PathFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        Ok(PathFilter {
            includes: compile_globs(includes)?,
            excludes: compile_globs(excludes)?,
        })
    }

    pub fn allow_all() -> Self {
        PathFilter {
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    pub fn accepts_dir(&self, relative: &str) -> bool {
        !self.excludes.iter().any(|glob| matches(glob, relative))
    }

    pub fn accepts_file(&self, relative: &str) -> bool {
        if !self.accepts_dir(relative) {
            return false;
        }
        self.includes.is_empty() || self.includes.iter().any(|glob| matches(glob, relative))
    }
}

fn matches(glob: &Pattern, relative: &str) -> bool {
    glob.matches_with(
        relative,
        MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        },
    )
}

fn compile_globs(globs: &[String]) -> Result<Vec<Pattern>> {
    let mut patterns = Vec::new();
    for glob in globs {
        for expanded in expand_braces(glob.trim_start_matches('/')) {
            patterns.push(
                Pattern::new(&expanded).with_context(|| format!("compile glob {glob:?}"))?,
            );
        }
    }
    Ok(patterns)
}

/// `a.{x,y}` becomes `a.x` and `a.y`. Groups do not nest.
fn expand_braces(glob: &str) -> Vec<String> {
    let Some(open) = glob.find('{') else {
        return vec![glob.to_string()];
    };
    let Some(close) = glob[open..].find('}').map(|offset| open + offset) else {
        return vec![glob.to_string()];
    };
    let (head, tail) = (&glob[..open], &glob[close + 1..]);
    glob[open + 1..close]
        .split(',')
        .flat_map(|alternative| expand_braces(&format!("{head}{alternative}{tail}")))
        .collect()
}

/// Root-relative path with `/` separators, or `None` outside the root.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AnalysisConfig::default();
        assert!(config.search_paths.contains("/apps"));
        assert!(config.search_paths.contains("/libs"));
        assert_eq!(config.script_engine_mappings.get("html").map(String::as_str), Some("htl"));
        assert_eq!(config.script_engine_mappings.get("jspx").map(String::as_str), Some("jsp"));
        assert!(config.missing_requirements_optional);
        config.validate().unwrap();
    }

    #[test]
    fn overrides_merge_mappings_and_replace_lists() {
        let mut config = AnalysisConfig::default();
        let overrides: ConfigOverrides = serde_json::from_str(
            r#"{"search_paths": ["/custom"], "script_engine_mappings": {"ts": "typescript", "html": "thymeleaf"}}"#,
        )
        .unwrap();
        config.apply(overrides);
        assert_eq!(config.search_paths, BTreeSet::from(["/custom".to_string()]));
        assert_eq!(config.script_engine_mappings["ts"], "typescript");
        assert_eq!(config.script_engine_mappings["html"], "thymeleaf");
        assert_eq!(config.script_engine_mappings["jsp"], "jsp");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<ConfigOverrides, _> = serde_json::from_str(r#"{"serach_paths": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn load_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scap.json");
        fs::write(&path, r#"{"content_package": true}"#).unwrap();
        assert_eq!(load_config(&path).unwrap().content_package, Some(true));

        fs::write(&path, "{").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("scap.json"));
    }

    #[test]
    fn validate_rejects_relative_search_paths_and_blank_mappings() {
        let mut config = AnalysisConfig::default();
        config.search_paths.insert("apps".to_string());
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config
            .script_engine_mappings
            .insert("ts".to_string(), " ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn mapping_pairs() {
        assert_eq!(
            parse_mapping(" hbs : handlebars").unwrap(),
            ("hbs".to_string(), "handlebars".to_string())
        );
        assert!(parse_mapping("ts").is_err());
        assert!(parse_mapping("ts:").is_err());
        assert!(parse_mapping(":typescript").is_err());
    }

    #[test]
    fn default_excludes_prune_vcs_and_backups() {
        let filter = AnalysisConfig::default().path_filter().unwrap();
        assert!(!filter.accepts_dir(".git"));
        assert!(!filter.accepts_dir("apps/.svn"));
        assert!(!filter.accepts_file("apps/x/.svn/entries"));
        assert!(!filter.accepts_file("apps/x/x.html~"));
        assert!(!filter.accepts_file(".DS_Store"));
        assert!(filter.accepts_file("apps/x/x.html"));
        assert!(filter.accepts_dir("apps/git"));
    }

    #[test]
    fn includes_select_files() {
        let filter = PathFilter::new(&["**/*.html".to_string()], &[]).unwrap();
        assert!(filter.accepts_file("a/b/c.html"));
        assert!(filter.accepts_file("c.html"));
        assert!(!filter.accepts_file("a/b/c.jsp"));
        assert!(filter.accepts_dir("a/b"));
    }

    #[test]
    fn character_classes_and_alternatives() {
        let filter = PathFilter::new(
            &[],
            &["**/[Tt]mp/**".to_string(), "**/*.{bak,orig}".to_string()],
        )
        .unwrap();
        assert!(!filter.accepts_file("a/Tmp/x.html"));
        assert!(!filter.accepts_file("a/tmp/x.html"));
        assert!(filter.accepts_file("a/Temp/x.html"));
        assert!(!filter.accepts_file("a/x.bak"));
        assert!(!filter.accepts_file("x.orig"));
        assert!(filter.accepts_file("a/x.html"));
    }

    #[test]
    fn single_star_stays_in_one_segment() {
        let filter = PathFilter::new(&["apps/*.html".to_string()], &[]).unwrap();
        assert!(filter.accepts_file("apps/x.html"));
        assert!(!filter.accepts_file("apps/x/y.html"));
    }

    #[test]
    fn malformed_glob_is_an_error() {
        assert!(PathFilter::new(&[], &["a/[".to_string()]).is_err());
    }

    #[test]
    fn relative_paths_use_slashes() {
        let root = Path::new("/tmp/root");
        assert_eq!(
            relative_slash_path(root, &root.join("a").join("b.html")).as_deref(),
            Some("a/b.html")
        );
        assert_eq!(relative_slash_path(root, Path::new("/elsewhere")), None);
    }
}
