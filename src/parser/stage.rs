use super::{PipelineParser, find, optional, present};
use crate::document::{Entry, Node};
use crate::pipeline::errors::ValidationErrorKind;
use crate::pipeline::validation::{MAX_STAGE_NAME, is_identifier};
use crate::pipeline::{
    AxisFilter, DirectiveSection, Environment, ExcludeAxis, Matrix, MatrixAxis, MatrixExclude,
    Post, Stage, StageBody,
};

const STAGE_KEYS: &[&str] = &[
    "name",
    "stage",
    "agent",
    "when",
    "environment",
    "options",
    "post",
    "failFast",
    "steps",
    "parallel",
    "matrix",
    "stages",
];
const BODY_KEYS: &[&str] = &["steps", "parallel", "matrix", "stages"];
const MATRIX_KEYS: &[&str] = &["axes", "excludes", "agent", "stages"];

impl PipelineParser<'_> {
    /// Parses a non-empty sequence of stages.
    ///
    /// An item that is not a stage at all leaves an unnamed placeholder, so
    /// `stages[i]` in the source map keeps pointing at the i-th item.
    pub(super) fn parse_stage_list(&mut self, node: &Node, what: &str) -> Option<Vec<Stage>> {
        let items = self.non_empty_sequence(node, what)?;
        let mut stages = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let stage = self.at_index(index, item, |p| {
                p.descend(item.position(), |p| p.parse_stage(item))
            });
            stages.push(stage.unwrap_or_else(|| Stage::new(String::new(), Vec::new())));
        }
        Some(stages)
    }

    /// Parses one stage.
    ///
    /// A stage whose parts have errors is still returned, with an empty
    /// body if needed, so its name takes part in the sibling checks.
    fn parse_stage(&mut self, node: &Node) -> Option<Stage> {
        let entries = self.mapping(node, "stage mapping")?;
        self.check_keys(entries, STAGE_KEYS);

        let name = self.parse_stage_name(node, entries).unwrap_or_default();
        tracing::trace!(stage = %name, path = %self.path, "Parsing stage");

        let agent = find(entries, "agent").and_then(|e| self.at_key(e, |p| p.parse_agent(&e.value)));
        let when = find(entries, "when").and_then(|e| self.at_key(e, |p| p.parse_when(&e.value)));
        let environment = find(entries, "environment")
            .map(|e| self.at_key(e, |p| p.parse_environment(&e.value)))
            .unwrap_or_else(Environment::new);
        let options = find(entries, "options")
            .map(|e| {
                self.at_key(e, |p| p.parse_directives(DirectiveSection::Options, &e.value))
            })
            .unwrap_or_default();

        let body_entries = present(entries, BODY_KEYS);
        let fail_fast = find(entries, "failFast").map(|e| {
            self.at_key(e, |p| {
                let composite = body_entries
                    .first()
                    .map(|body| body.key.as_str())
                    .filter(|key| matches!(*key, "parallel" | "matrix"));
                if composite.is_none() {
                    let second = body_entries.first().map_or("steps", |body| body.key.as_str());
                    p.error(
                        ValidationErrorKind::ConflictingKeys {
                            first: "failFast".into(),
                            second: second.into(),
                        },
                        e.key_position,
                    );
                    return None;
                }
                p.boolean(&e.value)
            })
        });
        let fail_fast = fail_fast.flatten().unwrap_or(false);

        let body = match body_entries.as_slice() {
            [] => {
                self.error(
                    ValidationErrorKind::MissingStageBody {
                        stage: name.clone(),
                    },
                    node.position(),
                );
                None
            }
            [entry] => self.at_key(entry, |p| p.parse_stage_body(entry, fail_fast)),
            [first, second, ..] => {
                self.error(
                    ValidationErrorKind::ConflictingStageBody {
                        stage: name.clone(),
                        first: first.key.clone(),
                        second: second.key.clone(),
                    },
                    second.key_position,
                );
                None
            }
        };

        let post = find(entries, "post")
            .map(|e| self.at_key(e, |p| p.parse_post(&e.value)))
            .unwrap_or_else(Post::new);

        Some(Stage {
            name,
            agent,
            when,
            environment,
            options,
            body: body.unwrap_or(StageBody::Steps(Vec::new())),
            post,
        })
    }

    /// Reads `name`, or its alias `stage`
    fn parse_stage_name(&mut self, node: &Node, entries: &[Entry]) -> Option<String> {
        let entry = match (find(entries, "name"), find(entries, "stage")) {
            (Some(_), Some(alias)) => {
                self.error_at_key(
                    "stage",
                    ValidationErrorKind::ConflictingKeys {
                        first: "name".into(),
                        second: "stage".into(),
                    },
                    alias.key_position,
                );
                return None;
            }
            (Some(entry), None) | (None, Some(entry)) => entry,
            (None, None) => {
                self.missing("name", node.position());
                return None;
            }
        };

        self.at_key(entry, |p| {
            let name = p.text(&entry.value)?;
            let length = name.chars().count();
            if name.trim().is_empty() {
                p.error(ValidationErrorKind::EmptyName, entry.value.position());
                return None;
            }
            if length > MAX_STAGE_NAME {
                p.error(
                    ValidationErrorKind::NameTooLong {
                        max: MAX_STAGE_NAME,
                        len: length,
                    },
                    entry.value.position(),
                );
                return None;
            }
            Some(name)
        })
    }

    fn parse_stage_body(&mut self, entry: &Entry, fail_fast: bool) -> Option<StageBody> {
        let node = &entry.value;
        match entry.key.as_str() {
            "steps" => self.parse_step_list(node).map(StageBody::Steps),
            "parallel" => self
                .parse_stage_list(node, "parallel")
                .map(|stages| StageBody::Parallel { stages, fail_fast }),
            "stages" => self
                .parse_stage_list(node, "stages")
                .map(StageBody::Sequential),
            _ => self.parse_matrix(node).map(|matrix| {
                StageBody::Matrix(Matrix {
                    fail_fast,
                    ..matrix
                })
            }),
        }
    }

    fn parse_matrix(&mut self, node: &Node) -> Option<Matrix> {
        let entries = self.mapping(node, "matrix mapping")?;
        let known = self.check_keys(entries, MATRIX_KEYS);

        let axes = match find(entries, "axes") {
            Some(entry) => self.at_key(entry, |p| p.parse_axes(&entry.value)),
            None => {
                self.missing("axes", node.position());
                None
            }
        };
        let excludes = find(entries, "excludes")
            .map(|entry| self.at_key(entry, |p| p.parse_excludes(&entry.value)));
        let agent = find(entries, "agent")
            .map(|entry| self.at_key(entry, |p| p.parse_agent(&entry.value)));
        let stages = match find(entries, "stages") {
            Some(entry) => self.at_key(entry, |p| p.parse_stage_list(&entry.value, "stages")),
            None => {
                self.missing("stages", node.position());
                None
            }
        };

        if !known {
            return None;
        }
        Some(Matrix {
            axes: axes?,
            excludes: optional(excludes)?.unwrap_or_default(),
            agent: optional(agent)?,
            fail_fast: false,
            stages: stages?,
        })
    }

    fn parse_axes(&mut self, node: &Node) -> Option<Vec<MatrixAxis>> {
        let items = self.non_empty_sequence(node, "axes")?;
        let mut axes = Vec::with_capacity(items.len());
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            match self.at_index(index, item, |p| p.parse_axis(item)) {
                Some(axis) => axes.push(axis),
                None => valid = false,
            }
        }
        valid.then_some(axes)
    }

    fn parse_axis(&mut self, node: &Node) -> Option<MatrixAxis> {
        let entries = self.mapping(node, "axis mapping")?;
        let known = self.check_keys(entries, &["name", "values"]);

        let name = match find(entries, "name") {
            Some(entry) => self.at_key(entry, |p| p.axis_name(&entry.value)),
            None => {
                self.missing("name", node.position());
                None
            }
        };
        let values = match find(entries, "values") {
            Some(entry) => self.at_key(entry, |p| p.text_list(&entry.value, "values")),
            None => {
                self.missing("values", node.position());
                None
            }
        };

        if !known {
            return None;
        }
        Some(MatrixAxis::new(name?, values?))
    }

    fn axis_name(&mut self, node: &Node) -> Option<String> {
        let name = self.string(node)?;
        if !is_identifier(&name) {
            self.error(ValidationErrorKind::InvalidIdentifier { name }, node.position());
            return None;
        }
        Some(name)
    }

    fn parse_excludes(&mut self, node: &Node) -> Option<Vec<MatrixExclude>> {
        let items = self.sequence(node, "sequence of excludes")?;
        let mut excludes = Vec::with_capacity(items.len());
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            let exclude = self.at_index(index, item, |p| {
                let references = p.non_empty_sequence(item, "exclude")?;
                let mut exclude = MatrixExclude::default();
                let mut valid = true;
                for (position, reference) in references.iter().enumerate() {
                    match p.at_index(position, reference, |p| p.parse_exclude_axis(reference)) {
                        Some(axis) => exclude.axes.push(axis),
                        None => valid = false,
                    }
                }
                valid.then_some(exclude)
            });
            match exclude {
                Some(exclude) => excludes.push(exclude),
                None => valid = false,
            }
        }
        valid.then_some(excludes)
    }

    fn parse_exclude_axis(&mut self, node: &Node) -> Option<ExcludeAxis> {
        let entries = self.mapping(node, "axis reference mapping")?;
        let known = self.check_keys(entries, &["name", "values", "notValues"]);

        let name = match find(entries, "name") {
            Some(entry) => self.at_key(entry, |p| p.axis_name(&entry.value)),
            None => {
                self.missing("name", node.position());
                None
            }
        };
        let filter = match (find(entries, "values"), find(entries, "notValues")) {
            (Some(_), Some(not_values)) => {
                self.error_at_key(
                    "notValues",
                    ValidationErrorKind::ConflictingKeys {
                        first: "values".into(),
                        second: "notValues".into(),
                    },
                    not_values.key_position,
                );
                None
            }
            (Some(entry), None) => self
                .at_key(entry, |p| p.text_list(&entry.value, "values"))
                .map(AxisFilter::Values),
            (None, Some(entry)) => self
                .at_key(entry, |p| p.text_list(&entry.value, "notValues"))
                .map(AxisFilter::NotValues),
            (None, None) => {
                self.missing("values", node.position());
                None
            }
        };

        if !known {
            return None;
        }
        Some(ExcludeAxis {
            name: name?,
            filter: filter?,
        })
    }
}
