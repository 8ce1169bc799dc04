use super::{PipelineParser, find};
use crate::document::{Entry, Node};
use crate::pipeline::errors::ValidationErrorKind;
use crate::pipeline::validation::is_identifier;
use crate::pipeline::{When, WhenCondition};

const CONDITIONS: &[&str] = &[
    "branch",
    "tag",
    "environment",
    "expression",
    "allOf",
    "anyOf",
    "not",
];

impl PipelineParser<'_> {
    pub(super) fn parse_when(&mut self, node: &Node) -> Option<When> {
        let entries = self.mapping(node, "mapping of conditions")?;

        let mut when = When::default();
        let mut valid = true;
        for entry in entries {
            if entry.key == "beforeAgent" {
                match self.at_key(entry, |p| p.boolean(&entry.value)) {
                    Some(value) => when.before_agent = value,
                    None => valid = false,
                }
                continue;
            }
            match self.parse_condition(entry) {
                Some(condition) => when.conditions.push(condition),
                None => valid = false,
            }
        }

        if valid && when.conditions.is_empty() {
            self.error(
                ValidationErrorKind::Empty {
                    what: "when".into(),
                },
                node.position(),
            );
            return None;
        }
        valid.then_some(when)
    }

    /// Parses one `keyword: value` condition
    fn parse_condition(&mut self, entry: &Entry) -> Option<WhenCondition> {
        if !CONDITIONS.contains(&entry.key.as_str()) {
            self.error_at_key(
                &entry.key,
                ValidationErrorKind::UnknownCondition {
                    name: entry.key.clone(),
                },
                entry.key_position,
            );
            return None;
        }

        self.at_key(entry, |p| {
            let node = &entry.value;
            match entry.key.as_str() {
                "branch" => p.non_empty_text(node, "branch").map(WhenCondition::branch),
                "tag" => p.non_empty_text(node, "tag").map(WhenCondition::tag),
                "expression" => p
                    .non_empty_text(node, "expression")
                    .map(WhenCondition::expression),
                "environment" => p.parse_environment_condition(node),
                "not" => p.descend(node.position(), |p| {
                    p.single_condition(node).map(WhenCondition::not)
                }),
                combinator => p.descend(node.position(), |p| {
                    let conditions = p.parse_condition_list(node, combinator)?;
                    Some(if combinator == "allOf" {
                        WhenCondition::all_of(conditions)
                    } else {
                        WhenCondition::any_of(conditions)
                    })
                }),
            }
        })
    }

    fn parse_condition_list(&mut self, node: &Node, what: &str) -> Option<Vec<WhenCondition>> {
        let items = self.non_empty_sequence(node, what)?;
        let mut conditions = Vec::with_capacity(items.len());
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            match self.at_index(index, item, |p| p.single_condition(item)) {
                Some(condition) => conditions.push(condition),
                None => valid = false,
            }
        }
        valid.then_some(conditions)
    }

    /// A mapping holding exactly one condition
    fn single_condition(&mut self, node: &Node) -> Option<WhenCondition> {
        match self.mapping(node, "single condition mapping")? {
            [entry] => self.parse_condition(entry),
            entries => {
                self.error(
                    ValidationErrorKind::WrongType {
                        expected: "exactly one condition".into(),
                        found: format!("{} conditions", entries.len()),
                    },
                    node.position(),
                );
                None
            }
        }
    }

    fn parse_environment_condition(&mut self, node: &Node) -> Option<WhenCondition> {
        let entries = self.mapping(node, "mapping with name and value")?;
        let known = self.check_keys(entries, &["name", "value"]);

        let name = match find(entries, "name") {
            Some(entry) => self.at_key(entry, |p| {
                let name = p.string(&entry.value)?;
                if !is_identifier(&name) {
                    p.error(
                        ValidationErrorKind::InvalidIdentifier { name },
                        entry.value.position(),
                    );
                    return None;
                }
                Some(name)
            }),
            None => {
                self.missing("name", node.position());
                None
            }
        };
        let value = match find(entries, "value") {
            Some(entry) => self.at_key(entry, |p| p.text(&entry.value)),
            None => {
                self.missing("value", node.position());
                None
            }
        };

        if !known {
            return None;
        }
        Some(WhenCondition::environment(name?, value?))
    }
}
