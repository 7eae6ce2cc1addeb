//! Email body rendering.
//!
//! A rule's template goes through three stages:
//! 1. Handlebars substitution against the render context
//! 2. MJML expansion to responsive HTML (optionally minified)
//! 3. HTML to plain-text conversion for the multipart text fallback
//!
//! Templates are compiled fresh on every call; nothing is cached.

use std::time::Instant;

use handlebars::Handlebars;
use minify_html::Cfg;
use thiserror::Error;

use crate::config::RenderConfig;
use crate::metrics::NotificationMetrics;

const TEMPLATE_NAME: &str = "notification";

/// Errors raised while rendering a notification body
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template compilation failed: {0}")]
    Compile(#[from] Box<handlebars::TemplateError>),

    #[error("Template execution failed: {0}")]
    Execute(#[from] Box<handlebars::RenderError>),

    #[error("Invalid email markup: {0}")]
    Markup(String),

    #[error("Plain-text conversion failed: {0}")]
    Text(String),
}

/// Final HTML body and its plain-text alternative
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

/// Renders notification templates into HTML and text bodies
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    minify: bool,
    text_width: usize,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

impl TemplateRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            minify: config.minify,
            text_width: config.text_width.max(1),
        }
    }

    /// Render `template` with `context` bound as the template's variables
    #[tracing::instrument(name = "renderer.render", skip_all)]
    pub fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedEmail, RenderError> {
        let started = Instant::now();

        let markup = substitute(template, context)?;
        let html = self.expand(&markup)?;
        let text = html_to_text(&html, self.text_width)?;

        NotificationMetrics::observe_render(started.elapsed());

        Ok(RenderedEmail { html, text })
    }

    /// Expand MJML markup into final HTML
    fn expand(&self, markup: &str) -> Result<String, RenderError> {
        let parsed = mrml::parse(markup).map_err(|e| RenderError::Markup(e.to_string()))?;
        let options = mrml::prelude::render::RenderOptions::default();
        let html = parsed
            .render(&options)
            .map_err(|e| RenderError::Markup(e.to_string()))?;

        if self.minify {
            Ok(minify(&html))
        } else {
            Ok(html)
        }
    }
}

fn substitute(template: &str, context: &serde_json::Value) -> Result<String, RenderError> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(false);
    registry
        .register_template_string(TEMPLATE_NAME, template)
        .map_err(Box::new)?;

    Ok(registry.render(TEMPLATE_NAME, context).map_err(Box::new)?)
}

fn minify(html: &str) -> String {
    let mut cfg = Cfg::new();
    // Outlook conditional blocks live in comments
    cfg.keep_comments = true;
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.minify_css = true;

    let minified = minify_html::minify(html.as_bytes(), &cfg);
    String::from_utf8(minified).unwrap_or_else(|_| html.to_string())
}

/// Convert HTML to whitespace-normalized plain text
fn html_to_text(html: &str, width: usize) -> Result<String, RenderError> {
    // MJML sections are tables, rendered here without borders
    let raw = html2text::config::plain()
        .no_table_borders()
        .string_from_read(html.as_bytes(), width)
        .map_err(|e| RenderError::Text(e.to_string()))?;
    Ok(normalize_whitespace(&raw))
}

fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || lines.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}
