//! Template rendering.
//!
//! Rendering sits behind [`TemplateRenderer`] so the variable mapping can be
//! built and tested without a template engine, and alternate engines can be
//! plugged in. [`FileTemplateRenderer`] is the default: a MiniJinja
//! environment with a directory loader scoped to the template's folder.

use std::path::Path;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use dynrepo_shared::{DynRepoError, DynamicConfig, Result};

use crate::mapping::{TemplateVariables, escape_xml};

/// Renders a named template against a record's variable mapping.
pub trait TemplateRenderer {
    fn render(&self, template_name: &str, variables: &TemplateVariables) -> Result<String>;
}

impl<T: TemplateRenderer + ?Sized> TemplateRenderer for &T {
    fn render(&self, template_name: &str, variables: &TemplateVariables) -> Result<String> {
        (**self).render(template_name, variables)
    }
}

/// Jinja-compatible renderer loading templates from one directory.
///
/// Output is never auto-escaped; the abstract is escaped while building the
/// mapping. Templates escape other values with `|e` or, for URLs and
/// identifiers, with `|xml` (`&`, `<` and `>` only). Templates are cached
/// after first load.
pub struct FileTemplateRenderer {
    env: Environment<'static>,
}

impl FileTemplateRenderer {
    /// Create a renderer that loads templates from `dir`.
    pub fn new(dir: &Path, strict_undefined: bool) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir));
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("xml", |value: String| escape_xml(&value).into_owned());
        if strict_undefined {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        }
        Self { env }
    }

    /// Create a renderer scoped to the directory of `iso_template`.
    pub fn from_config(config: &DynamicConfig) -> Self {
        Self::new(config.template_dir(), config.strict_undefined)
    }
}

impl TemplateRenderer for FileTemplateRenderer {
    fn render(&self, template_name: &str, variables: &TemplateVariables) -> Result<String> {
        let template = self.env.get_template(template_name).map_err(|e| {
            DynRepoError::Template(format!("failed to load template '{template_name}': {e}"))
        })?;

        template.render(variables).map_err(|e| {
            DynRepoError::Template(format!("failed to render '{template_name}': {e:#}"))
        })
    }
}
