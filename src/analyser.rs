//! Tree analysis: resource type roots, their selector folders, and scripts
//! addressed by path only.
use crate::capability::{
    CapabilitySet, CapabilitySetBuilder, ProvidedResourceTypeCapability, ProvidedScriptCapability,
};
use crate::classifier::ResourceTypeClassifier;
use crate::config::{relative_slash_path, AnalysisConfig, PathFilter};
use crate::descriptor::{
    parse_directive, read_content_descriptor, read_extends_file, read_requires_file, Directive,
    CONTENT_DESCRIPTOR_FILE, EXTENDS_FILE, REQUIRES_FILE,
};
use crate::platform_name::{repository_name, repository_path};
use crate::resource_type::{normalize_resource_type, ResourceType};
use crate::script::ScriptName;
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Analyse every resource type root and path-only script below `root`.
pub fn analyse_tree(root: &Path, config: &AnalysisConfig) -> Result<CapabilitySet> {
    config.validate().context("validate analysis config")?;
    let filter = config.path_filter()?;
    let analyser = TreeAnalyser::new(root, config, &filter);
    let builder = analyser.analyse()?;
    let set = builder.build();
    info!(
        root = %root.display(),
        provided = set.provided_resource_types().len(),
        scripts = set.provided_scripts().len(),
        required = set.required_resource_types().len(),
        unresolved = set.unresolved_required().len(),
        "analysed script tree"
    );
    Ok(set)
}

pub struct TreeAnalyser<'a> {
    root: &'a Path,
    config: &'a AnalysisConfig,
    filter: &'a PathFilter,
    classifier: ResourceTypeClassifier<'a>,
}

impl<'a> TreeAnalyser<'a> {
    pub fn new(root: &'a Path, config: &'a AnalysisConfig, filter: &'a PathFilter) -> Self {
        TreeAnalyser {
            root,
            config,
            filter,
            classifier: ResourceTypeClassifier::new(root, filter, config.content_package),
        }
    }

    /// Walk the whole tree depth-first.
    pub fn analyse(&self) -> Result<CapabilitySetBuilder> {
        let metadata = fs::metadata(self.root)
            .with_context(|| format!("read scripts directory {}", self.root.display()))?;
        if !metadata.is_dir() {
            return Err(anyhow!(
                "scripts directory {} is not a directory",
                self.root.display()
            ));
        }
        let mut builder = CapabilitySetBuilder::new();
        let walker = WalkDir::new(self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !entry.file_type().is_dir() || self.accepts_dir(entry.path())
            });
        for entry in walker {
            let entry = entry.with_context(|| format!("walk {}", self.root.display()))?;
            let path = entry.path();
            if entry.depth() == 0 {
                continue;
            }
            if entry.file_type().is_dir() {
                if self.classifier.is_resource_type_root(path)? {
                    builder.merge(self.analyse_resource_type(path)?);
                }
            } else if path.is_file() && self.accepts_file(path) {
                builder.merge(self.analyse_path_only_script(path)?);
            }
        }
        Ok(builder)
    }

    /// Capabilities of one resource type root, including its selector folders.
    pub fn analyse_resource_type(&self, dir: &Path) -> Result<CapabilitySetBuilder> {
        let mut builder = CapabilitySetBuilder::new();
        if !self.classifier.is_resource_type_root(dir)? {
            return Ok(builder);
        }
        let resource_type = self.resource_type_of(dir)?;
        let resource_types = resource_type.expand(&self.config.search_paths);
        let mut entries = fs::read_dir(dir)
            .with_context(|| format!("read resource type folder {}", dir.display()))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()
            .with_context(|| format!("list {}", dir.display()))?;
        entries.sort();

        for path in entries {
            if path.is_file() {
                if !self.accepts_file(&path) {
                    continue;
                }
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match file_name.as_str() {
                    EXTENDS_FILE => {
                        let directive = read_extends_file(&path)?;
                        apply_extends(&mut builder, &resource_type, &resource_types, &directive)?;
                    }
                    REQUIRES_FILE => {
                        for directive in read_requires_file(&path)? {
                            builder.require(directive.to_requirement()?);
                        }
                    }
                    CONTENT_DESCRIPTOR_FILE => {
                        let descriptor = read_content_descriptor(&path)?;
                        if let Some(super_type) = &descriptor.resource_super_type {
                            let directive = parse_directive(super_type, &path)?;
                            apply_extends(
                                &mut builder,
                                &resource_type,
                                &resource_types,
                                &directive,
                            )?;
                        }
                        for required in &descriptor.required_resource_types {
                            builder.require(parse_directive(required, &path)?.to_requirement()?);
                        }
                    }
                    _ => self.process_script(
                        dir,
                        &path,
                        &resource_type,
                        &resource_types,
                        &mut builder,
                    )?,
                }
            } else if path.is_dir() {
                if !self.accepts_dir(&path) || self.classifier.is_resource_type_root(&path)? {
                    continue;
                }
                self.process_selector_folder(
                    dir,
                    &path,
                    &resource_type,
                    &resource_types,
                    &mut builder,
                )?;
            }
        }
        debug!(
            resource_type = %resource_type,
            fragments = !builder.is_empty(),
            "analysed resource type folder"
        );
        Ok(builder)
    }

    /// Scripts below a selector folder, skipping subtrees owned by another root.
    fn process_selector_folder(
        &self,
        resource_type_dir: &Path,
        folder: &Path,
        resource_type: &ResourceType,
        resource_types: &BTreeSet<String>,
        builder: &mut CapabilitySetBuilder,
    ) -> Result<()> {
        let walker = WalkDir::new(folder)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !entry.file_type().is_dir() || self.accepts_dir(entry.path()));
        for entry in walker {
            let entry = entry.with_context(|| format!("walk selector folder {}", folder.display()))?;
            let path = entry.path();
            if !path.is_file() || !self.accepts_file(path) {
                continue;
            }
            if self.below_nested_root(resource_type_dir, path)? {
                continue;
            }
            self.process_script(resource_type_dir, path, resource_type, resource_types, builder)?;
        }
        Ok(())
    }

    fn below_nested_root(&self, resource_type_dir: &Path, file: &Path) -> Result<bool> {
        let mut current = file.parent();
        while let Some(dir) = current {
            if dir == resource_type_dir || !dir.starts_with(resource_type_dir) {
                return Ok(false);
            }
            if self.classifier.is_resource_type_root(dir)? {
                return Ok(true);
            }
            current = dir.parent();
        }
        Ok(false)
    }

    fn process_script(
        &self,
        resource_type_dir: &Path,
        script_path: &Path,
        resource_type: &ResourceType,
        resource_types: &BTreeSet<String>,
        builder: &mut CapabilitySetBuilder,
    ) -> Result<()> {
        let Ok(relative) = script_path.strip_prefix(resource_type_dir) else {
            return Err(anyhow!(
                "script {} is outside {}",
                script_path.display(),
                resource_type_dir.display()
            ));
        };
        let mut segments: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some(file_name) = segments.pop() else {
            return Ok(());
        };
        if !file_name.contains('.') {
            return Ok(());
        }
        let mut selectors: Vec<String> =
            segments.iter().map(|segment| self.decode(segment)).collect();
        let decoded_name = self.decode(&file_name);
        let Some(script) = ScriptName::parse(&decoded_name) else {
            debug!(
                path = %script_path.display(),
                "skipping file that does not follow the script naming conventions"
            );
            return Ok(());
        };
        let Some(engine) = self.config.script_engine_mappings.get(&script.script_extension) else {
            debug!(
                path = %script_path.display(),
                extension = %script.script_extension,
                "no script engine mapping for script"
            );
            return Ok(());
        };
        let base = ProvidedResourceTypeCapability::new(resource_types.clone())?
            .with_version(resource_type.version().cloned())
            .with_script(engine.as_str(), script.script_extension.as_str());

        let label = resource_type.label();
        match script.name.as_deref() {
            Some(name) if name != label && script.name_is_ambiguous() => {
                let mut with_selector = selectors.clone();
                with_selector.push(name.to_string());
                builder.provide(
                    base.clone()
                        .with_selectors(with_selector)
                        .with_request_method(script.request_method.clone()),
                );
                builder.provide(
                    base.with_selectors(selectors)
                        .with_request_extension(Some(name.to_string()))
                        .with_request_method(script.request_method.clone()),
                );
            }
            name => {
                if let Some(name) = name.filter(|name| *name != label) {
                    selectors.push(name.to_string());
                }
                builder.provide(
                    base.with_selectors(selectors)
                        .with_request_extension(script.request_extension.clone())
                        .with_request_method(script.request_method.clone()),
                );
            }
        }
        Ok(())
    }

    /// A mapped script with no resource type root between it and the tree
    /// root is provided by path, together with its folder's `requires`.
    pub fn analyse_path_only_script(&self, file: &Path) -> Result<CapabilitySetBuilder> {
        let mut builder = CapabilitySetBuilder::new();
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = match file_name.rfind('.') {
            Some(index) if index + 1 < file_name.len() => &file_name[index + 1..],
            _ => return Ok(builder),
        };
        if !self.config.script_engine_mappings.contains_key(extension) {
            return Ok(builder);
        }
        let Some(parent) = file.parent() else {
            return Ok(builder);
        };
        let mut current = Some(parent);
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(self.root) {
                break;
            }
            if self.classifier.is_resource_type_root(dir)? {
                return Ok(builder);
            }
            current = dir.parent();
        }
        let Some(relative) = relative_slash_path(self.root, file) else {
            return Ok(builder);
        };
        let relative = if self.config.content_package {
            repository_path(&relative)
        } else {
            relative
        };
        let script_path = normalize_resource_type(&format!("/{relative}"), file)?;
        builder.provide_script(ProvidedScriptCapability::new(
            &script_path,
            &self.config.script_engine_mappings,
        )?);
        let requires = parent.join(REQUIRES_FILE);
        if requires.is_file() && self.accepts_file(&requires) {
            for directive in read_requires_file(&requires)? {
                builder.require(directive.to_requirement()?);
            }
        }
        debug!(path = %script_path, "path-only script");
        Ok(builder)
    }

    fn resource_type_of(&self, dir: &Path) -> Result<ResourceType> {
        let relative = relative_slash_path(self.root, dir)
            .ok_or_else(|| anyhow!("{} is outside {}", dir.display(), self.root.display()))?;
        let relative = if self.config.content_package {
            repository_path(&relative)
        } else {
            relative
        };
        let normalized = normalize_resource_type(&relative, dir)?;
        Ok(ResourceType::parse(&normalized))
    }

    fn decode(&self, name: &str) -> String {
        if self.config.content_package {
            repository_name(name)
        } else {
            name.to_string()
        }
    }

    fn accepts_dir(&self, path: &Path) -> bool {
        match relative_slash_path(self.root, path) {
            Some(relative) => self.filter.accepts_dir(&relative),
            None => true,
        }
    }

    fn accepts_file(&self, path: &Path) -> bool {
        match relative_slash_path(self.root, path) {
            Some(relative) => self.filter.accepts_file(&relative),
            None => true,
        }
    }
}

fn apply_extends(
    builder: &mut CapabilitySetBuilder,
    resource_type: &ResourceType,
    resource_types: &BTreeSet<String>,
    directive: &Directive,
) -> Result<()> {
    builder.declare_extends(
        resource_types.clone(),
        resource_type.version().cloned(),
        &directive.resource_type,
    )?;
    builder.require(directive.to_requirement()?);
    Ok(())
}
