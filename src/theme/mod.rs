//! Template engine
//!
//! Pages are rendered with Tera. The built-in templates are compiled into
//! the binary; `theme.path` may point at a directory whose `.html` files
//! replace built-in templates of the same relative name (for example
//! `blog/post/detail.html`) or add new ones.
//!
//! Registered filters:
//! - `markdown`: Markdown to HTML. Output must be marked `| safe`.
//! - `truncate_words(count=N)`: first N words followed by " …".

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::services::markdown::{truncate_words, MarkdownRenderer};

mod error;

pub use error::ThemeError;

const DEFAULT_TRUNCATE_WORDS: usize = 30;

/// Templates shipped with the binary, by template name
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("pagination.html", include_str!("../../templates/pagination.html")),
    ("404.html", include_str!("../../templates/404.html")),
    ("500.html", include_str!("../../templates/500.html")),
    ("sitemap.xml", include_str!("../../templates/sitemap.xml")),
    ("blog/post/list.html", include_str!("../../templates/blog/post/list.html")),
    ("blog/post/detail.html", include_str!("../../templates/blog/post/detail.html")),
    ("blog/post/share.html", include_str!("../../templates/blog/post/share.html")),
    ("blog/post/comment.html", include_str!("../../templates/blog/post/comment.html")),
    (
        "blog/post/latest_posts.html",
        include_str!("../../templates/blog/post/latest_posts.html"),
    ),
    (
        "blog/post/includes/comment_form.html",
        include_str!("../../templates/blog/post/includes/comment_form.html"),
    ),
];

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Engine with the built-in templates, overridden by any `.html` files
    /// found under `theme_path`
    pub fn new(theme_path: Option<&Path>, renderer: MarkdownRenderer) -> Result<Self> {
        let mut templates: BTreeMap<String, String> = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, body)| (name.to_string(), body.to_string()))
            .collect();

        if let Some(path) = theme_path {
            if !path.is_dir() {
                return Err(ThemeError::NotFound(path.display().to_string()).into());
            }
            let mut overrides = Vec::new();
            collect_templates(path, path, &mut overrides)?;
            for (name, body) in overrides {
                tracing::debug!("Template {} loaded from {}", name, path.display());
                templates.insert(name, body);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(error_chain(&e)))?;

        tera.register_filter(
            "markdown",
            move |value: &Value, _args: &HashMap<String, Value>| {
                let source = tera::try_get_value!("markdown", "value", String, value);
                Ok(Value::String(renderer.render(&source)))
            },
        );
        tera.register_filter("truncate_words", truncate_words_filter);

        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!(
                "Failed to render '{}': {}",
                template,
                error_chain(&e)
            ))
            .into()
        })
    }
}

fn truncate_words_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = tera::try_get_value!("truncate_words", "value", String, value);
    let count = match args.get("count") {
        Some(count) => tera::try_get_value!("truncate_words", "count", usize, count),
        None => DEFAULT_TRUNCATE_WORDS,
    };
    Ok(Value::String(truncate_words(&text, count)))
}

/// Error message followed by every `Caused by` in its source chain
fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Every `.html` file under `current`, named by its path relative to `base`
fn collect_templates(
    base: &Path,
    current: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates(base, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative = path
                .strip_prefix(base)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let name = relative.to_string_lossy().replace('\\', "/");
            let body = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((name, body));
        }
    }
    Ok(())
}
