//! Per-step rendering
//!
//! Steps are opaque to the parser. How a step name is spelled in the script
//! is decided here, through a table of renderers keyed by step name with a
//! default call renderer for every name without an entry.

use super::groovy;
use super::writer::ScriptWriter;
use crate::pipeline::{ArgValue, Step};
use std::collections::HashMap;

/// Renders one step.
///
/// Returns `false` when the step does not have the shape the renderer
/// handles; the default renderer is then used.
pub type RenderFn = fn(&Step, &mut ScriptWriter, &StepRenderers) -> bool;

/// Step renderers keyed by step name
#[derive(Clone)]
pub struct StepRenderers {
    renderers: HashMap<String, RenderFn>,
}

impl StepRenderers {
    /// An empty table: every step uses the default renderer
    #[must_use]
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// The built-in table
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.register("script", render_script);
        table.register("checkout", render_checkout);
        table
    }

    /// Adds or replaces the renderer for `name`
    pub fn register(&mut self, name: impl Into<String>, renderer: RenderFn) {
        self.renderers.insert(name.into(), renderer);
    }

    /// Returns true if `name` has a dedicated renderer
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// Renders a step list in order
    pub fn render_all(&self, steps: &[Step], writer: &mut ScriptWriter) {
        for step in steps {
            self.render(step, writer);
        }
    }

    /// Renders one step through its renderer, falling back to the default
    pub fn render(&self, step: &Step, writer: &mut ScriptWriter) {
        let handled = self
            .renderers
            .get(&step.name)
            .is_some_and(|renderer| renderer(step, writer, self));
        if !handled {
            render_call(step, writer, self);
        }
    }
}

impl Default for StepRenderers {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for StepRenderers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.renderers.keys().collect();
        names.sort();
        f.debug_struct("StepRenderers").field("steps", &names).finish()
    }
}

/// Default renderer.
///
/// `name 'x'` for a single positional string, `name()` without arguments,
/// `name(args)` otherwise; a nested block becomes a trailing closure.
pub fn render_call(step: &Step, writer: &mut ScriptWriter, renderers: &StepRenderers) {
    let args: Vec<_> = step.call_args().collect();
    let call = match (args.as_slice(), step.block()) {
        ([], Some(_)) => step.name.clone(),
        ([arg], None) if arg.is_positional() && matches!(arg.value, ArgValue::String(_)) => {
            format!("{} {}", step.name, groovy::value(&arg.value))
        }
        (args, _) => format!("{}({})", step.name, groovy::arguments(args.iter().copied())),
    };

    match step.block() {
        Some(block) => writer.block(&call, |w| renderers.render_all(block, w)),
        None => writer.line(&call),
    }
}

/// `script` holds raw Groovy, written line by line inside `script { }`
fn render_script(step: &Step, writer: &mut ScriptWriter, renderers: &StepRenderers) -> bool {
    if let Some(block) = step.block() {
        writer.block("script", |w| renderers.render_all(block, w));
        return true;
    }
    let mut positional = step.positional();
    let (Some(ArgValue::String(code)), None) = (positional.next(), positional.next()) else {
        return false;
    };
    if step.args.len() != 1 {
        return false;
    }
    writer.block("script", |w| {
        for line in code.trim_end().lines() {
            w.line(line.trim_end());
        }
    });
    true
}

/// `checkout scm` refers to the job's SCM variable, not a string
fn render_checkout(step: &Step, writer: &mut ScriptWriter, _: &StepRenderers) -> bool {
    match step.args.as_slice() {
        [arg] if arg.is_positional() && arg.value.as_str() == Some("scm") => {
            writer.line("checkout scm");
            true
        }
        _ => false,
    }
}
