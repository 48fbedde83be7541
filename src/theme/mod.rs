//! Theme rendering with Tera
//!
//! The default theme and the admin templates are embedded in the binary.
//! A site theme under `themes/<name>/templates/` overrides default templates
//! by name; the admin templates always come from the binary.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::content::parse_date_string;

const DEFAULT_TEMPLATES: [(&str, &str); 9] = [
    ("layout.html", include_str!("default/layout.html")),
    ("home.html", include_str!("default/home.html")),
    ("blog.html", include_str!("default/blog.html")),
    ("post.html", include_str!("default/post.html")),
    ("page.html", include_str!("default/page.html")),
    ("tag.html", include_str!("default/tag.html")),
    ("404.html", include_str!("default/404.html")),
    ("partials/nav.html", include_str!("default/partials/nav.html")),
    ("partials/pager.html", include_str!("default/partials/pager.html")),
];

const ADMIN_TEMPLATES: [(&str, &str); 12] = [
    ("admin/layout.html", include_str!("admin/layout.html")),
    ("admin/login.html", include_str!("admin/login.html")),
    ("admin/dashboard.html", include_str!("admin/dashboard.html")),
    ("admin/entries.html", include_str!("admin/entries.html")),
    ("admin/entry_form.html", include_str!("admin/entry_form.html")),
    ("admin/media.html", include_str!("admin/media.html")),
    ("admin/users.html", include_str!("admin/users.html")),
    ("admin/user_form.html", include_str!("admin/user_form.html")),
    ("admin/navigation.html", include_str!("admin/navigation.html")),
    ("admin/settings.html", include_str!("admin/settings.html")),
    ("admin/redirects.html", include_str!("admin/redirects.html")),
    ("admin/error.html", include_str!("admin/error.html")),
];

/// Renders public pages with the active theme and the admin panel
pub struct ThemeRenderer {
    tera: Tera,
    themes_dir: PathBuf,
    theme: String,
    tz: Tz,
    date_format: String,
    /// Theme `_config.yml` (IndexMap preserves YAML key order)
    config: IndexMap<String, serde_yaml::Value>,
}

impl ThemeRenderer {
    /// Build a renderer for `theme` found under `themes_dir`
    pub fn load<P: AsRef<Path>>(themes_dir: P, theme: &str, tz: Tz, date_format: &str) -> Result<Self> {
        let themes_dir = themes_dir.as_ref().to_path_buf();
        let (tera, config) = build(&themes_dir, theme, tz, date_format)?;
        Ok(Self {
            tera,
            themes_dir,
            theme: theme.to_string(),
            tz,
            date_format: date_format.to_string(),
            config,
        })
    }

    /// Rebuild for a (possibly different) theme
    ///
    /// On error the current templates stay in place.
    pub fn reload(&mut self, theme: &str) -> Result<()> {
        let (tera, config) = build(&self.themes_dir, theme, self.tz, &self.date_format)?;
        self.tera = tera;
        self.config = config;
        self.theme = theme.to_string();
        tracing::info!("Loaded theme '{}'", theme);
        Ok(())
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn config(&self) -> &IndexMap<String, serde_yaml::Value> {
        &self.config
    }

    /// Directory of the active theme (may not exist)
    pub fn theme_dir(&self) -> PathBuf {
        self.themes_dir.join(&self.theme)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.theme_dir().join("assets")
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Pick `<wanted>.html` when the theme has it, otherwise `fallback`
    pub fn select_template(&self, wanted: Option<&str>, fallback: &str) -> String {
        wanted
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\', '.']))
            .map(|name| format!("{}.html", name))
            .filter(|name| self.has_template(name))
            .unwrap_or_else(|| format!("{}.html", fallback))
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        let mut context = context.clone();
        context.insert("theme", &self.config);
        self.tera
            .render(template_name, &context)
            .map_err(|e| anyhow!("Failed to render {}: {}", template_name, error_chain(&e)))
    }
}

/// Tera hides the useful message in the error source chain
fn error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn build(
    themes_dir: &Path,
    theme: &str,
    tz: Tz,
    date_format: &str,
) -> Result<(Tera, IndexMap<String, serde_yaml::Value>)> {
    if theme.is_empty() || theme.contains(['/', '\\']) || theme.starts_with('.') {
        return Err(anyhow!("Invalid theme name: {:?}", theme));
    }

    let mut templates: IndexMap<String, String> = DEFAULT_TEMPLATES
        .iter()
        .map(|(name, body)| (name.to_string(), body.to_string()))
        .collect();

    let theme_dir = themes_dir.join(theme);
    let templates_dir = theme_dir.join("templates");
    if templates_dir.is_dir() {
        for (name, body) in read_theme_templates(&templates_dir)? {
            if name.starts_with("admin/") {
                tracing::warn!("Ignoring theme template {}: admin templates are built in", name);
                continue;
            }
            tracing::debug!("Theme template override: {}", name);
            templates.insert(name, body);
        }
    } else if theme != "default" {
        tracing::warn!(
            "Theme '{}' has no templates directory at {:?}, using the default templates",
            theme,
            templates_dir
        );
    }

    for (name, body) in ADMIN_TEMPLATES {
        templates.insert(name.to_string(), body.to_string());
    }

    let mut config = IndexMap::new();
    let config_path = theme_dir.join("_config.yml");
    if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        config = serde_yaml::from_str(&content)?;
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.iter())
        .map_err(|e| anyhow!("Theme '{}' failed to load: {}", theme, error_chain(&e)))?;

    // Register custom filters
    tera.register_filter("strip_html", strip_html_filter);
    tera.register_filter("truncate_chars", truncate_chars_filter);
    let default_format = date_format.to_string();
    tera.register_filter(
        "date_format",
        move |value: &tera::Value, args: &HashMap<String, tera::Value>| {
            date_format_filter(value, args, tz, &default_format)
        },
    );

    Ok((tera, config))
}

/// `*.html` files under `dir`, named by their `/`-separated relative path
fn read_theme_templates(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut templates = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let relative = path.strip_prefix(dir)?;
        let name: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        templates.push((name.join("/"), fs::read_to_string(path)?));
    }
    Ok(templates)
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    Ok(tera::Value::String(result))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "…".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Tera filter: format a timestamp in the site timezone
///
/// `LL` renders as "May 30, 2023"; anything else is a strftime string.
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
    tz: Tz,
    default_format: &str,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => default_format.to_string(),
    };

    let Some(date) = DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_date_string(&s))
    else {
        // Not a date; leave it alone
        return Ok(tera::Value::String(s));
    };

    let pattern = if format == "LL" { "%B %d, %Y" } else { format.as_str() };
    let mut out = String::new();
    use std::fmt::Write;
    write!(out, "{}", date.with_timezone(&tz).format(pattern))
        .map_err(|_| tera::Error::msg(format!("Invalid date format: {}", format)))?;
    Ok(tera::Value::String(out))
}
