//! Job-definition rendering.
//!
//! The template is a job `config.xml` whose pipeline `<script>` holds a
//! `{{ jenkinsfile | forceescape() }}` placeholder. Rendering substitutes
//! the XML-escaped pipeline text for every placeholder occurrence.

use regex_lite::{Captures, Regex};

/// Placeholder, whitespace-insensitive, with an optional escape filter
const PLACEHOLDER: &str =
    r"\{\{\s*jenkinsfile\s*(?:\|\s*(?:forceescape|escape|e)\s*(?:\(\s*\))?\s*)?\}\}";

/// Bundled job template, used when none is given
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/template_job.xml");

/// Template errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template has no '{{{{ jenkinsfile }}}}' placeholder")]
    MissingPlaceholder,

    #[error("invalid placeholder pattern: {0}")]
    Pattern(#[from] regex_lite::Error),
}

/// Escape text for embedding in XML character data or attributes
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render `template` with `pipeline` substituted at the placeholder
pub fn render(template: &str, pipeline: &str) -> Result<String, TemplateError> {
    let pattern = Regex::new(PLACEHOLDER)?;
    if !pattern.is_match(template) {
        return Err(TemplateError::MissingPlaceholder);
    }

    let escaped = xml_escape(pipeline);
    Ok(pattern
        .replace_all(template, |_: &Captures<'_>| escaped.clone())
        .into_owned())
}
