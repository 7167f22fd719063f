//! Layout composition using the Tera template engine
//!
//! Layouts are HTML templates with a `{{ content }}` slot. They are looked up
//! by name, usually from a document's `layout:` front-matter key. A layout can
//! carry front-matter of its own, and its `layout:` key wraps the result again
//! in a parent layout.

mod filters;

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use thiserror::Error;

use crate::config::SiteConfig;
use crate::content::FrontMatter;

/// Longest allowed chain of nested layouts
const MAX_DEPTH: usize = 8;

/// Built-in layout used when the site does not provide its own `default`
const DEFAULT_LAYOUT: &str = include_str!("default.html");

/// Layout composition errors
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Layout not found: {0}")]
    NotFound(String),

    #[error("Layout chain through {0:?} is cyclic or too deep")]
    Cycle(String),

    #[error("Failed to render layout {name:?}: {source}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },
}

/// A named page template
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: String,
    /// Layout's own front-matter; `layout:` names the parent
    pub front_matter: FrontMatter,
    template: String,
}

impl Layout {
    fn parse(name: &str, raw: &str) -> Self {
        let (front_matter, template) = FrontMatter::parse(raw);
        Self {
            name: name.to_string(),
            front_matter,
            template: template.to_string(),
        }
    }

    /// Name of the layout this one is wrapped in
    pub fn parent(&self) -> Option<&str> {
        self.front_matter.layout()
    }

    fn template_name(&self) -> String {
        format!("_layouts/{}", self.name)
    }
}

/// Lookup of layouts by name
pub trait LayoutRegistry {
    fn resolve(&self, name: &str) -> Option<&Layout>;

    /// Check if a layout exists
    fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

/// Layout registry and composer
pub struct Layouts {
    tera: Tera,
    layouts: IndexMap<String, Layout>,
}

impl Layouts {
    /// Only the built-in `default` layout
    pub fn builtin(config: &SiteConfig) -> Result<Self> {
        Self::from_sources(config, vec![("default".to_string(), DEFAULT_LAYOUT.to_string())], Vec::new())
    }

    /// Load layouts and includes from the site's directories
    pub fn load(config: &SiteConfig, layouts_dir: &Path, includes_dir: &Path) -> Result<Self> {
        let mut layouts = vec![("default".to_string(), DEFAULT_LAYOUT.to_string())];
        layouts.extend(read_html_dir(layouts_dir)?);

        let includes = read_html_dir(includes_dir)?
            .into_iter()
            .map(|(stem, content)| (format!("{}.html", stem), content))
            .collect();

        Self::from_sources(config, layouts, includes)
    }

    /// Build from `(name, source)` pairs; later layouts replace earlier ones
    pub fn from_sources(
        config: &SiteConfig,
        layouts: Vec<(String, String)>,
        includes: Vec<(String, String)>,
    ) -> Result<Self> {
        let mut registry = IndexMap::new();
        for (name, raw) in layouts {
            registry.insert(name.clone(), Layout::parse(&name, &raw));
        }

        let mut tera = Tera::default();

        // Content is already HTML; escaping it would mangle the page
        tera.autoescape_on(vec![]);

        let mut templates: Vec<(String, String)> = includes;
        templates.extend(
            registry
                .values()
                .map(|layout| (layout.template_name(), layout.template.clone())),
        );
        tera.add_raw_templates(templates)
            .context("Failed to compile layouts")?;

        filters::register(&mut tera, config);

        tracing::debug!(
            "Loaded {} layouts: {:?}",
            registry.len(),
            registry.keys().collect::<Vec<_>>()
        );

        Ok(Self {
            tera,
            layouts: registry,
        })
    }

    /// Names of all known layouts
    pub fn names(&self) -> Vec<&str> {
        self.layouts.keys().map(String::as_str).collect()
    }

    /// Substitute `content` into the named layout, then into its parents
    pub fn compose(&self, name: &str, content: &str, context: &Context) -> Result<String, LayoutError> {
        let mut output = content.to_string();
        let mut visited: Vec<&str> = Vec::new();
        let mut current = Some(name);

        while let Some(layout_name) = current {
            if visited.contains(&layout_name) || visited.len() >= MAX_DEPTH {
                return Err(LayoutError::Cycle(layout_name.to_string()));
            }

            let layout = self
                .resolve(layout_name)
                .ok_or_else(|| LayoutError::NotFound(layout_name.to_string()))?;

            let mut ctx = context.clone();
            ctx.insert("content", &output);
            ctx.insert("layout", &layout.front_matter);

            output = self
                .tera
                .render(&layout.template_name(), &ctx)
                .map_err(|source| LayoutError::Template {
                    name: layout_name.to_string(),
                    source,
                })?;

            visited.push(layout_name);
            current = layout.parent();
        }

        Ok(output)
    }
}

impl LayoutRegistry for Layouts {
    fn resolve(&self, name: &str) -> Option<&Layout> {
        self.layouts.get(name)
    }
}

/// Read every `*.html` file in a directory as `(file stem, contents)`
fn read_html_dir(dir: &Path) -> Result<Vec<(String, String)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_html = path
            .extension()
            .map(|ext| ext == "html" || ext == "htm")
            .unwrap_or(false);
        if !path.is_file() || !is_html {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        entries.push((stem.to_string(), content));
    }

    // read_dir order is platform dependent
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layouts(sources: &[(&str, &str)]) -> Layouts {
        let sources = sources
            .iter()
            .map(|(n, s)| (n.to_string(), s.to_string()))
            .collect();
        Layouts::from_sources(&SiteConfig::default(), sources, Vec::new()).unwrap()
    }

    #[test]
    fn test_compose_substitutes_content() {
        let layouts = layouts(&[("default", "<main>{{ content }}</main>")]);
        let html = layouts
            .compose("default", "<h1>Hello</h1>\n", &Context::new())
            .unwrap();
        assert_eq!(html, "<main><h1>Hello</h1>\n</main>");
    }

    #[test]
    fn test_missing_layout_is_not_found() {
        let layouts = layouts(&[("default", "{{ content }}")]);
        let err = layouts
            .compose("nonexistent", "<p>x</p>", &Context::new())
            .unwrap_err();
        assert!(matches!(err, LayoutError::NotFound(ref name) if name == "nonexistent"));
        assert!(!layouts.contains("nonexistent"));
    }

    #[test]
    fn test_layout_chain() {
        let layouts = layouts(&[
            ("base", "<html>{{ content }}</html>"),
            ("post", "---\nlayout: base\n---\n<article>{{ content }}</article>"),
        ]);
        let html = layouts.compose("post", "body", &Context::new()).unwrap();
        assert_eq!(html, "<html><article>body</article></html>");
    }

    #[test]
    fn test_layout_chain_missing_parent() {
        let layouts = layouts(&[("post", "---\nlayout: base\n---\n{{ content }}")]);
        let err = layouts.compose("post", "body", &Context::new()).unwrap_err();
        assert!(matches!(err, LayoutError::NotFound(ref name) if name == "base"));
    }

    #[test]
    fn test_layout_cycle() {
        let layouts = layouts(&[
            ("a", "---\nlayout: b\n---\n{{ content }}"),
            ("b", "---\nlayout: a\n---\n{{ content }}"),
        ]);
        let err = layouts.compose("a", "body", &Context::new()).unwrap_err();
        assert!(matches!(err, LayoutError::Cycle(_)));
    }

    #[test]
    fn test_context_variables() {
        let layouts = layouts(&[("default", "<title>{{ page.title }}</title>{{ content }}")]);
        let mut context = Context::new();
        context.insert("page", &serde_json::json!({ "title": "Containers" }));
        let html = layouts.compose("default", "x", &context).unwrap();
        assert_eq!(html, "<title>Containers</title>x");
    }

    #[test]
    fn test_builtin_default_layout() {
        let layouts = Layouts::builtin(&SiteConfig::default()).unwrap();
        assert!(layouts.contains("default"));

        let mut context = Context::new();
        context.insert("site", &SiteConfig::default());
        context.insert("page", &serde_json::json!({ "title": "Hello" }));
        let html = layouts
            .compose("default", "<h1>Hello</h1>", &context)
            .unwrap();
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<title>Hello"));
    }

    #[test]
    fn test_includes_are_available() {
        let layouts = Layouts::from_sources(
            &SiteConfig::default(),
            vec![(
                "default".to_string(),
                "{% include \"footer.html\" %}{{ content }}".to_string(),
            )],
            vec![("footer.html".to_string(), "<footer/>".to_string())],
        )
        .unwrap();
        let html = layouts.compose("default", "x", &Context::new()).unwrap();
        assert_eq!(html, "<footer/>x");
    }

    #[test]
    fn test_load_from_directory_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let layouts_dir = dir.path().join("_layouts");
        fs::create_dir_all(&layouts_dir).unwrap();
        fs::write(layouts_dir.join("default.html"), "[{{ content }}]").unwrap();
        fs::write(layouts_dir.join("notes.txt"), "ignored").unwrap();

        let layouts = Layouts::load(
            &SiteConfig::default(),
            &layouts_dir,
            &dir.path().join("_includes"),
        )
        .unwrap();
        assert_eq!(layouts.names(), vec!["default"]);
        assert_eq!(layouts.compose("default", "x", &Context::new()).unwrap(), "[x]");
    }
}
