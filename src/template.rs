//! `${VARIABLE_NAME}` template loading and substitution
//!
//! Uses minijinja with custom variable delimiters so Job templates keep the
//! familiar `${...}` placeholder convention. Undefined variables are strict
//! errors rather than rendering empty, so a template referencing a binding
//! that was never supplied fails the submission cycle instead of producing a
//! half-filled manifest.

use std::collections::HashMap;
use std::path::Path;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};
use thiserror::Error;

/// Template rendering failed: undefined binding or invalid syntax
#[derive(Debug, Error)]
#[error("template render error: {0}")]
pub struct TemplateError(#[from] minijinja::Error);

/// A textual Job template with `${...}` placeholders
#[derive(Debug, Clone)]
pub struct JobTemplate {
    source: String,
}

impl JobTemplate {
    /// Read a template from disk.
    ///
    /// An unreadable file is a configuration error: the template path is
    /// resolved at startup, before any submission begins.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("failed to read template {}: {}", path.display(), e))
        })?;
        Ok(Self::new(source))
    }

    /// Create a template from an in-memory string.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Substitute every `${NAME}` placeholder from `bindings`.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if the template references a binding not
    /// present in `bindings`, or if the template syntax is invalid.
    pub fn substitute(&self, bindings: &HashMap<String, String>) -> Result<String, TemplateError> {
        let env = environment();
        Ok(env.render_str(&self.source, bindings)?)
    }
}

/// Build the rendering environment: `${...}` variables, strict undefined
/// handling. A lone `$` without a brace passes through untouched.
fn environment() -> Environment<'static> {
    // Static, well-formed delimiters; failure here would mean a minijinja
    // API incompatibility, not bad input.
    let syntax = SyntaxConfig::builder()
        .variable_delimiters("${", "}")
        .block_delimiters("{%", "%}")
        .comment_delimiters("{#", "#}")
        .build()
        .expect("template syntax configuration is hardcoded and valid");

    let mut env = Environment::new();
    env.set_syntax(syntax);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_single_variable() {
        let template = JobTemplate::new("name: ${JOB_NAME}");
        let result = template
            .substitute(&bindings(&[("JOB_NAME", "job-cb-x-1")]))
            .expect("single variable should render");
        assert_eq!(result, "name: job-cb-x-1");
    }

    #[test]
    fn substitutes_multiple_variables() {
        let template = JobTemplate::new("${CONTAINER_NAME}:${CONTAINER_IMAGE}");
        let result = template
            .substitute(&bindings(&[
                ("CONTAINER_NAME", "cloudburst"),
                ("CONTAINER_IMAGE", "bhdockr/cloudburst:latest"),
            ]))
            .expect("multiple variables should render");
        assert_eq!(result, "cloudburst:bhdockr/cloudburst:latest");
    }

    #[test]
    fn undefined_binding_errors() {
        let template = JobTemplate::new("name: ${MISSING}");
        let result = template.substitute(&bindings(&[("JOB_NAME", "x")]));
        assert!(result.is_err());
    }

    #[test]
    fn literal_dollar_passes_through() {
        let template = JobTemplate::new("echo $PATH costs $5");
        let result = template
            .substitute(&bindings(&[]))
            .expect("literal dollars should pass through");
        assert_eq!(result, "echo $PATH costs $5");
    }

    #[test]
    fn unused_bindings_are_fine() {
        let template = JobTemplate::new("${A}");
        let result = template
            .substitute(&bindings(&[("A", "1"), ("B", "2")]))
            .expect("extra bindings should be ignored");
        assert_eq!(result, "1");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let result = JobTemplate::load(Path::new("/nonexistent/template.yaml"));
        assert!(matches!(result, Err(crate::Error::Config { .. })));
    }
}
