//! Template compilation for buffered render units.
//!
//! Each page's content is treated as an inline template and rendered against
//! the shared `[context]` table. Engines sit behind [`TemplateEngine`], so the
//! orchestrator never names a concrete one.

use super::{
    error::{BuildError, EngineError, Failures},
    transform::RenderUnit,
};
use crate::{
    config::{TemplateContext, TemplateEngineKind},
    debug,
    logger::Logger,
};
use minijinja::{AutoEscape, Environment};
use std::{fs, path::Path};

/// Conventional directory for shared layouts and partials.
pub const TEMPLATES_DIR: &str = "templates";

/// A page source that passed the engine's syntax check.
///
/// Pages are never registered with the engine, so one page cannot include
/// another page's output by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    name: String,
    source: String,
}

/// A template engine: compile a source string, render it against a context.
pub trait TemplateEngine {
    /// Engine name for logs.
    fn name(&self) -> &'static str;

    /// Parse `source` as an inline template. `name` only labels errors.
    fn compile(&self, name: &str, source: &str) -> Result<CompiledTemplate, EngineError>;

    /// Render a compiled template.
    fn render(
        &self,
        template: &CompiledTemplate,
        context: &TemplateContext,
    ) -> Result<String, EngineError>;
}

/// Jinja-style engine backed by minijinja.
///
/// The loader is rooted at the source directory, so `{% include %}` and
/// `{% extends %}` can name any file in the source tree.
pub struct JinjaEngine {
    env: Environment<'static>,
}

impl JinjaEngine {
    pub fn new(search_root: &Path, autoescape: bool) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(search_root.to_path_buf()));
        env.set_auto_escape_callback(move |_| {
            if autoescape {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });
        Self { env }
    }
}

impl TemplateEngine for JinjaEngine {
    fn name(&self) -> &'static str {
        "jinja"
    }

    fn compile(&self, name: &str, source: &str) -> Result<CompiledTemplate, EngineError> {
        // syntax check in a scratch environment, nothing is registered
        let scratch = Environment::empty();
        scratch.template_from_named_str(name, source)?;
        Ok(CompiledTemplate {
            name: name.to_owned(),
            source: source.to_owned(),
        })
    }

    fn render(
        &self,
        template: &CompiledTemplate,
        context: &TemplateContext,
    ) -> Result<String, EngineError> {
        Ok(self
            .env
            .render_named_str(&template.name, &template.source, context)?)
    }
}

/// Build the engine selected in `[build]`.
pub fn create_engine(
    kind: TemplateEngineKind,
    search_root: &Path,
    autoescape: bool,
) -> Box<dyn TemplateEngine> {
    match kind {
        TemplateEngineKind::Jinja => Box::new(JinjaEngine::new(search_root, autoescape)),
    }
}

/// Create `<source>/templates` if it does not exist yet.
pub fn ensure_templates_dir(source: &Path) -> Result<(), BuildError> {
    let dir = source.join(TEMPLATES_DIR);
    fs::create_dir_all(&dir).map_err(|source| BuildError::PrepareOutput { path: dir, source })
}

/// Compile and render every unit, replacing its content with the result.
///
/// Units that fail are dropped when the error policy allows it.
pub fn compile_units(
    units: Vec<RenderUnit>,
    engine: &dyn TemplateEngine,
    context: &TemplateContext,
    failures: &mut Failures,
    logger: &Logger,
) -> Result<Vec<RenderUnit>, BuildError> {
    let mut compiled = Vec::with_capacity(units.len());

    for mut unit in units {
        match compile_unit(&unit, engine, context) {
            Ok(content) => {
                debug!(logger, "template"; "{}", unit.relative_path);
                unit.content = content;
                compiled.push(unit);
            }
            Err(source) => failures.absorb(
                BuildError::Template {
                    path: unit.relative_path,
                    source,
                },
                logger,
            )?,
        }
    }

    Ok(compiled)
}

fn compile_unit(
    unit: &RenderUnit,
    engine: &dyn TemplateEngine,
    context: &TemplateContext,
) -> Result<String, EngineError> {
    let template = engine.compile(&unit.relative_path, &unit.content)?;
    engine.render(&template, context)
}
