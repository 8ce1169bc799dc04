//! Pipeline parser and validator
//!
//! Walks a loaded [`Node`] tree and maps it onto the typed
//! [`Pipeline`] model. Problems are collected rather than returned early:
//! a subtree with the wrong shape yields one error and is skipped while its
//! siblings keep being checked. After the walk the cross-cutting invariants
//! from [`crate::pipeline::validation`] run over the finished model.
//!
//! ```
//! use yamline::parser::parse_and_validate;
//!
//! let pipeline = parse_and_validate(
//!     "agent: any\nstages:\n  - name: Build\n    steps:\n      - echo hello\n",
//! )
//! .unwrap();
//! assert_eq!(pipeline.stages[0].name, "Build");
//! ```

mod agent;
mod directives;
mod environment;
mod post;
mod stage;
mod steps;
mod when;


use crate::document::{self, Entry, Node, Position, Scalar};
use crate::pipeline::errors::{FieldPath, PathSegment, ValidationError, ValidationErrorKind};
use crate::pipeline::registry::DirectiveRegistry;
use crate::pipeline::validation::{self, SourceMap};
use crate::pipeline::{AgentType, DirectiveSection, Pipeline, Post};

/// Nesting limit applied when no configuration is given
pub const DEFAULT_MAX_DEPTH: usize = 64;

const ROOT_KEYS: &[&str] = &[
    "agent",
    "environment",
    "options",
    "triggers",
    "parameters",
    "tools",
    "stages",
    "post",
];

/// Parser settings
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Deepest accepted nesting of stages, `when` combinators and step blocks
    pub max_depth: usize,
    /// Recognized directives
    pub registry: DirectiveRegistry,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            registry: DirectiveRegistry::builtin(),
        }
    }
}

/// Parses and validates a pipeline document with the default configuration.
///
/// # Errors
///
/// Returns every problem found. A document that fails to load yields a
/// single error.
pub fn parse_and_validate(text: &str) -> Result<Pipeline, Vec<ValidationError>> {
    parse_and_validate_with(text, &ParserConfig::default())
}

/// Parses and validates a pipeline document.
///
/// # Errors
///
/// Returns every problem found. A document that fails to load yields a
/// single error.
pub fn parse_and_validate_with(
    text: &str,
    config: &ParserConfig,
) -> Result<Pipeline, Vec<ValidationError>> {
    let root = document::load(text).map_err(|err| vec![ValidationError::from(err)])?;
    parse_node(&root, config)
}

/// Maps an already loaded document onto the pipeline model.
///
/// # Errors
///
/// Returns every problem found in the tree.
pub fn parse_node(root: &Node, config: &ParserConfig) -> Result<Pipeline, Vec<ValidationError>> {
    let result = PipelineParser::new(config).parse(root);
    match &result {
        Ok(pipeline) => tracing::debug!(stages = pipeline.stage_count(), "Pipeline parsed"),
        Err(errors) => tracing::debug!(errors = errors.len(), "Pipeline rejected"),
    }
    result
}

/// Tree walker holding the current location and everything found so far
pub(crate) struct PipelineParser<'a> {
    config: &'a ParserConfig,
    path: FieldPath,
    depth: usize,
    errors: Vec<ValidationError>,
    sources: SourceMap,
}

impl<'a> PipelineParser<'a> {
    pub(crate) fn new(config: &'a ParserConfig) -> Self {
        Self {
            config,
            path: FieldPath::root(),
            depth: 0,
            errors: Vec::new(),
            sources: SourceMap::new(),
        }
    }

    pub(crate) fn parse(mut self, root: &Node) -> Result<Pipeline, Vec<ValidationError>> {
        let pipeline = self.parse_root(root);
        if let Some(pipeline) = &pipeline {
            self.errors
                .extend(validation::check_invariants(pipeline, &self.sources));
        }

        match pipeline {
            Some(pipeline) if self.errors.is_empty() => Ok(pipeline),
            _ => Err(self.errors),
        }
    }

    fn parse_root(&mut self, root: &Node) -> Option<Pipeline> {
        let mut root = root;
        if let Some([entry]) = root.as_mapping()
            && entry.key == "pipeline"
        {
            root = &entry.value;
        }

        let entries = self.mapping(root, "pipeline mapping")?;
        self.check_keys(entries, ROOT_KEYS);

        let agent = match find(entries, "agent") {
            Some(entry) => self.at_key(entry, |p| p.parse_agent(&entry.value)),
            None => {
                self.missing("agent", root.position());
                None
            }
        };

        let environment = find(entries, "environment")
            .map(|entry| self.at_key(entry, |p| p.parse_environment(&entry.value)))
            .unwrap_or_default();

        let mut directives: [Vec<_>; 4] = Default::default();
        for (slot, section) in directives.iter_mut().zip(DirectiveSection::ALL) {
            if let Some(entry) = find(entries, section.as_str()) {
                *slot = self.at_key(entry, |p| p.parse_directives(section, &entry.value));
            }
        }
        let [options, parameters, triggers, tools] = directives;

        let stages = match find(entries, "stages") {
            Some(entry) => self.at_key(entry, |p| p.parse_stage_list(&entry.value, "stages")),
            None => {
                self.missing("stages", root.position());
                None
            }
        };

        let post = find(entries, "post")
            .map(|entry| self.at_key(entry, |p| p.parse_post(&entry.value)))
            .unwrap_or_else(Post::new);

        // A missing agent or stage list has been reported already; the
        // stand-ins only keep the rest of the tree checkable.
        Some(Pipeline {
            agent: agent.unwrap_or(AgentType::Any),
            environment,
            options,
            triggers,
            parameters,
            tools,
            stages: stages.unwrap_or_default(),
            post,
        })
    }

    // ---- location tracking ----

    /// Runs `f` with the path extended by a mapping key
    fn at_key<T>(&mut self, entry: &Entry, f: impl FnOnce(&mut Self) -> T) -> T {
        self.nested(PathSegment::Key(entry.key.clone()), entry.key_position, f)
    }

    /// Runs `f` with the path extended by a sequence index
    fn at_index<T>(&mut self, index: usize, node: &Node, f: impl FnOnce(&mut Self) -> T) -> T {
        self.nested(PathSegment::Index(index), node.position(), f)
    }

    fn nested<T>(
        &mut self,
        segment: PathSegment,
        position: Position,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.path.push(segment);
        self.sources.insert(self.path.clone(), position);
        let result = f(self);
        self.path.pop();
        result
    }

    /// Runs `f` one nesting level deeper, or reports the depth limit
    fn descend<T>(&mut self, position: Position, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.depth += 1;
        let result = if self.depth > self.config.max_depth {
            self.error(
                ValidationErrorKind::TooDeep {
                    max: self.config.max_depth,
                },
                position,
            );
            None
        } else {
            f(self)
        };
        self.depth -= 1;
        result
    }

    // ---- error helpers ----

    fn error(&mut self, kind: ValidationErrorKind, position: Position) {
        self.errors
            .push(ValidationError::new(self.path.clone(), kind, Some(position)));
    }

    fn error_at_key(&mut self, key: &str, kind: ValidationErrorKind, position: Position) {
        self.errors
            .push(ValidationError::new(self.path.key(key), kind, Some(position)));
    }

    fn missing(&mut self, key: &str, position: Position) {
        self.error(ValidationErrorKind::MissingKey { key: key.into() }, position);
    }

    fn wrong_type(&mut self, expected: &str, node: &Node) {
        self.error(
            ValidationErrorKind::WrongType {
                expected: expected.into(),
                found: node.type_name().into(),
            },
            node.position(),
        );
    }

    /// Reports every key not in `allowed`; returns true when all are known
    fn check_keys(&mut self, entries: &[Entry], allowed: &[&str]) -> bool {
        let mut known = true;
        for entry in entries {
            if !allowed.contains(&entry.key.as_str()) {
                known = false;
                self.error_at_key(
                    &entry.key,
                    ValidationErrorKind::UnknownKey {
                        key: entry.key.clone(),
                        allowed: allowed.iter().map(ToString::to_string).collect(),
                    },
                    entry.key_position,
                );
            }
        }
        known
    }

    // ---- shape helpers ----

    fn mapping<'n>(&mut self, node: &'n Node, expected: &str) -> Option<&'n [Entry]> {
        let entries = node.as_mapping();
        if entries.is_none() {
            self.wrong_type(expected, node);
        }
        entries
    }

    fn sequence<'n>(&mut self, node: &'n Node, expected: &str) -> Option<&'n [Node]> {
        let items = node.as_sequence();
        if items.is_none() {
            self.wrong_type(expected, node);
        }
        items
    }

    /// A non-empty sequence; reports `Empty { what }` otherwise
    fn non_empty_sequence<'n>(&mut self, node: &'n Node, what: &str) -> Option<&'n [Node]> {
        let items = self.sequence(node, "sequence")?;
        if items.is_empty() {
            let kind = if what == "stages" && self.path.segments().len() == 1 {
                ValidationErrorKind::EmptyStages
            } else {
                ValidationErrorKind::Empty { what: what.into() }
            };
            self.error(kind, node.position());
            return None;
        }
        Some(items)
    }

    /// A string scalar
    fn string(&mut self, node: &Node) -> Option<String> {
        match node.as_str() {
            Some(s) => Some(s.to_owned()),
            None => {
                self.wrong_type("string", node);
                None
            }
        }
    }

    /// Any non-null scalar, coerced to its textual form
    fn text(&mut self, node: &Node) -> Option<String> {
        match node.as_scalar().and_then(Scalar::to_text) {
            Some(text) => Some(text),
            None => {
                self.wrong_type("scalar", node);
                None
            }
        }
    }

    /// Coerced text that must not be blank
    fn non_empty_text(&mut self, node: &Node, what: &str) -> Option<String> {
        let text = self.text(node)?;
        if text.trim().is_empty() {
            self.error(ValidationErrorKind::Empty { what: what.into() }, node.position());
            return None;
        }
        Some(text)
    }

    fn boolean(&mut self, node: &Node) -> Option<bool> {
        match node.as_scalar() {
            Some(Scalar::Bool(value)) => Some(*value),
            _ => {
                self.wrong_type("boolean", node);
                None
            }
        }
    }

    /// Sequence of scalars coerced to text, non-empty
    fn text_list(&mut self, node: &Node, what: &str) -> Option<Vec<String>> {
        let items = self.non_empty_sequence(node, what)?;
        let mut values = Vec::with_capacity(items.len());
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            match self.at_index(index, item, |p| p.text(item)) {
                Some(text) => values.push(text),
                None => valid = false,
            }
        }
        valid.then_some(values)
    }
}

/// First entry with `key`
fn find<'n>(entries: &'n [Entry], key: &str) -> Option<&'n Entry> {
    entries.iter().find(|entry| entry.key == key)
}

/// Result of an optional key: `Some(None)` when absent, `None` when invalid
fn optional<T>(value: Option<Option<T>>) -> Option<Option<T>> {
    match value {
        None => Some(None),
        Some(parsed) => parsed.map(Some),
    }
}

/// Entries whose key appears in `candidates`, in source order
fn present<'n>(entries: &'n [Entry], candidates: &[&str]) -> Vec<&'n Entry> {
    entries
        .iter()
        .filter(|entry| candidates.contains(&entry.key.as_str()))
        .collect()
}
