//! Decides whether a directory is a resource type root or a selector folder.
use crate::config::{relative_slash_path, PathFilter};
use crate::descriptor::{declares_super_type, CONTENT_DESCRIPTOR_FILE, EXTENDS_FILE};
use crate::platform_name::repository_name;
use crate::resource_type::segment_label;
use crate::script::ScriptName;
use crate::version::Version;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Memoized root predicate for a single analysis run.
///
/// A directory is a root when one of its regular files is an `extends`
/// file, a `.content.xml` declaring a super type, or a script named after the
/// directory's label (or a nameless `html`/`GET` script).
pub struct ResourceTypeClassifier<'a> {
    root: &'a Path,
    filter: &'a PathFilter,
    content_package: bool,
    cache: RefCell<HashMap<PathBuf, bool>>,
}

impl<'a> ResourceTypeClassifier<'a> {
    pub fn new(root: &'a Path, filter: &'a PathFilter, content_package: bool) -> Self {
        ResourceTypeClassifier {
            root,
            filter,
            content_package,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn is_resource_type_root(&self, dir: &Path) -> Result<bool> {
        if let Some(known) = self.cache.borrow().get(dir) {
            return Ok(*known);
        }
        let decision = self.classify(dir)?;
        self.cache.borrow_mut().insert(dir.to_path_buf(), decision);
        Ok(decision)
    }

    fn classify(&self, dir: &Path) -> Result<bool> {
        let Some(label) = self.label(dir) else {
            return Ok(false);
        };
        let mut files = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_file())
                .collect::<Vec<_>>(),
            Err(err) => {
                error!(
                    dir = %dir.display(),
                    error = %err,
                    "could not check whether folder denotes a resource type"
                );
                return Ok(false);
            }
        };
        files.sort();
        for path in files {
            if let Some(relative) = relative_slash_path(self.root, &path) {
                if !self.filter.accepts_file(&relative) {
                    continue;
                }
            }
            let Some(file_name) = path.file_name().map(|name| name.to_string_lossy()) else {
                continue;
            };
            if file_name == EXTENDS_FILE {
                debug!(dir = %dir.display(), "resource type root (extends file)");
                return Ok(true);
            }
            if file_name == CONTENT_DESCRIPTOR_FILE {
                if declares_super_type(&path)? {
                    debug!(dir = %dir.display(), "resource type root (content descriptor)");
                    return Ok(true);
                }
                continue;
            }
            let name = self.decode(&file_name);
            if let Some(script) = ScriptName::parse(&name) {
                let matches = match script.name.as_deref() {
                    Some(script_name) => script_name == label,
                    None => {
                        script.request_extension.as_deref() == Some("html")
                            || script.request_method.as_deref() == Some("GET")
                    }
                };
                if matches {
                    debug!(dir = %dir.display(), script = %name, "resource type root");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Label of a directory; a version folder takes its parent's label.
    fn label(&self, dir: &Path) -> Option<String> {
        let own = dir.file_name()?.to_string_lossy().into_owned();
        let segment = if Version::parse(&own).is_some() {
            match dir.parent().and_then(Path::file_name) {
                Some(parent) => parent.to_string_lossy().into_owned(),
                None => own,
            }
        } else {
            own
        };
        Some(self.decode(segment_label(&segment)))
    }

    fn decode(&self, name: &str) -> String {
        if self.content_package {
            repository_name(name)
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    fn is_root(root: &Path, dir: &str) -> bool {
        let filter = PathFilter::allow_all();
        ResourceTypeClassifier::new(root, &filter, false)
            .is_resource_type_root(&root.join(dir))
            .unwrap()
    }

    #[test]
    fn script_named_after_label() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("org/apache/sling/foo/foo.html"));
        touch(&dir.path().join("org/apache/sling/foo/depth1/selector.html"));
        assert!(is_root(dir.path(), "org/apache/sling/foo"));
        assert!(!is_root(dir.path(), "org/apache/sling/foo/depth1"));
        assert!(!is_root(dir.path(), "org/apache/sling"));
    }

    #[test]
    fn versioned_folder_uses_parent_label() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("org/apache/sling/bar/1.0.0/bar.html"));
        assert!(is_root(dir.path(), "org/apache/sling/bar/1.0.0"));
    }

    #[test]
    fn dotted_folder_label() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sling/org.apache.sling.wrapper/wrapper.html"));
        assert!(is_root(dir.path(), "sling/org.apache.sling.wrapper"));
    }

    #[test]
    fn nameless_html_or_get_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/GET.jsp"));
        touch(&dir.path().join("b/extends"));
        touch(&dir.path().join("c/POST.jsp"));
        assert!(is_root(dir.path(), "a"));
        assert!(is_root(dir.path(), "b"));
        assert!(!is_root(dir.path(), "c"));
    }

    #[test]
    fn content_descriptor_with_super_type() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("x");
        fs::create_dir_all(&folder).unwrap();
        fs::write(
            folder.join(CONTENT_DESCRIPTOR_FILE),
            "<jcr:root xmlns:jcr=\"http://www.jcp.org/jcr/1.0\" \
             xmlns:sling=\"http://sling.apache.org/jcr/sling/1.0\" \
             sling:resourceSuperType=\"base\"/>",
        )
        .unwrap();
        assert!(is_root(dir.path(), "x"));
    }

    #[test]
    fn excluded_files_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/a.html~"));
        let filter = PathFilter::new(&[], &["**/*~".to_string()]).unwrap();
        let classifier = ResourceTypeClassifier::new(dir.path(), &filter, false);
        assert!(!classifier
            .is_resource_type_root(&dir.path().join("a"))
            .unwrap());
    }

    #[test]
    fn missing_directory_is_not_a_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_root(dir.path(), "does/not/exist"));
    }

    #[test]
    fn content_package_names_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("_sling_page/_sling_page.html"));
        let filter = PathFilter::allow_all();
        let classifier = ResourceTypeClassifier::new(dir.path(), &filter, true);
        assert!(classifier
            .is_resource_type_root(&dir.path().join("_sling_page"))
            .unwrap());
    }
}
