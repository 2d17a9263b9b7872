//! Template engine
//!
//! Server-side HTML rendering using Tera. Templates are loaded from a
//! directory at startup; `base.html` is registered first so the page
//! templates can extend it.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

/// Template engine for rendering pages
pub struct TemplateEngine {
    tera: Tera,
    templates_path: PathBuf,
}

impl TemplateEngine {
    /// Create a new template engine, loading every `.html` file under the
    /// given directory (recursively, names relative to the directory root).
    pub fn new(templates_path: &Path) -> Result<Self> {
        let mut templates: Vec<(String, String)> = Vec::new();
        collect_templates(templates_path, templates_path, &mut templates)
            .with_context(|| format!("Failed to load templates from {:?}", templates_path))?;

        // Base templates first so inheritance resolves
        templates.sort_by_key(|(name, _)| !is_base_template(name));

        let mut tera = Tera::default();
        for (name, content) in &templates {
            tera.add_raw_template(name, content)
                .with_context(|| format!("Failed to add template {}", name))?;
        }
        tera.build_inheritance_chains()
            .context("Failed to build template inheritance")?;

        Ok(Self {
            tera,
            templates_path: templates_path.to_path_buf(),
        })
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).with_context(|| {
            format!(
                "Failed to render template {} from {:?}",
                template, self.templates_path
            )
        })
    }
}

fn is_base_template(name: &str) -> bool {
    name == "base.html" || name.ends_with("/base.html")
}

fn collect_templates(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    if !current_path.exists() {
        anyhow::bail!("Templates directory does not exist: {:?}", current_path);
    }

    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_templates(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .context("Failed to get relative template path")?;

            // Forward slashes for template names (cross-platform)
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}
