use super::PipelineParser;
use crate::document::{Node, NodeKind, Position, Scalar};
use crate::pipeline::errors::ValidationErrorKind;
use crate::pipeline::validation::is_identifier;
use crate::pipeline::{ArgValue, Argument, Step};

/// A parsed `name args` invocation, shared by steps and directives
pub(super) struct Invocation {
    pub(super) name: String,
    pub(super) args: Vec<Argument>,
}

impl PipelineParser<'_> {
    /// Parses a non-empty sequence of steps
    pub(super) fn parse_step_list(&mut self, node: &Node) -> Option<Vec<Step>> {
        let items = self.non_empty_sequence(node, "steps")?;
        let mut steps = Vec::with_capacity(items.len());
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            match self.at_index(index, item, |p| p.parse_invocation(item, true)) {
                Some(Invocation { name, args }) => steps.push(Step { name, args }),
                None => valid = false,
            }
        }
        valid.then_some(steps)
    }

    /// Parses the string or single-key mapping form of an invocation
    pub(super) fn parse_invocation(&mut self, node: &Node, allow_block: bool) -> Option<Invocation> {
        match node.kind() {
            NodeKind::Scalar(Scalar::String(text)) => self.parse_command(text, node.position()),
            NodeKind::Mapping(entries) => match entries.as_slice() {
                [entry] => {
                    if !self.check_name(&entry.key, entry.key_position) {
                        return None;
                    }
                    let args = self.at_key(entry, |p| p.parse_args(&entry.value, allow_block))?;
                    Some(Invocation {
                        name: entry.key.clone(),
                        args,
                    })
                }
                _ => {
                    self.error(
                        ValidationErrorKind::InvalidStep {
                            reason: format!(
                                "a step mapping must have exactly one key, found {}",
                                entries.len()
                            ),
                        },
                        node.position(),
                    );
                    None
                }
            },
            _ => {
                self.wrong_type("step string or single-key mapping", node);
                None
            }
        }
    }

    /// Arguments of the mapping form: null, scalar, list or keyword mapping
    pub(super) fn parse_args(&mut self, node: &Node, allow_block: bool) -> Option<Vec<Argument>> {
        match node.kind() {
            NodeKind::Scalar(Scalar::Null) => Some(Vec::new()),
            NodeKind::Scalar(scalar) => Some(vec![Argument::positional(scalar_value(scalar)?)]),
            NodeKind::Sequence(_) => Some(
                self.scalar_list(node)?
                    .into_iter()
                    .map(Argument::positional)
                    .collect(),
            ),
            NodeKind::Mapping(entries) => {
                let mut args = Vec::with_capacity(entries.len());
                let mut valid = true;
                for entry in entries {
                    let parsed = self.at_key(entry, |p| match entry.key.as_str() {
                        "args" => p.positional_args(&entry.value),
                        "steps" if allow_block => p
                            .descend(entry.key_position, |p| p.parse_step_list(&entry.value))
                            .map(|steps| vec![Argument::keyword("steps", ArgValue::Block(steps))]),
                        "steps" => {
                            p.error(
                                ValidationErrorKind::InvalidStep {
                                    reason: "blocks are not allowed here".into(),
                                },
                                entry.key_position,
                            );
                            None
                        }
                        keyword => {
                            if !p.check_name(keyword, entry.key_position) {
                                return None;
                            }
                            p.keyword_value(&entry.value)
                                .map(|value| vec![Argument::keyword(keyword, value)])
                        }
                    });
                    match parsed {
                        Some(mut parsed) => args.append(&mut parsed),
                        None => valid = false,
                    }
                }
                valid.then_some(args)
            }
        }
    }

    fn positional_args(&mut self, node: &Node) -> Option<Vec<Argument>> {
        let values = match node.as_scalar() {
            Some(_) => vec![self.keyword_value(node)?],
            None => self.scalar_list(node)?,
        };
        Some(values.into_iter().map(Argument::positional).collect())
    }

    /// A non-null scalar or a list of them
    fn keyword_value(&mut self, node: &Node) -> Option<ArgValue> {
        match node.kind() {
            NodeKind::Sequence(_) => self.scalar_list(node).map(ArgValue::List),
            NodeKind::Scalar(scalar) => {
                let value = scalar_value(scalar);
                if value.is_none() {
                    self.wrong_type("argument value", node);
                }
                value
            }
            NodeKind::Mapping(_) => {
                self.wrong_type("scalar or list of scalars", node);
                None
            }
        }
    }

    fn scalar_list(&mut self, node: &Node) -> Option<Vec<ArgValue>> {
        let items = self.sequence(node, "list of scalars")?;
        let mut values = Vec::with_capacity(items.len());
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            let value = self.at_index(index, item, |p| {
                let value = item.as_scalar().and_then(scalar_value);
                if value.is_none() {
                    p.wrong_type("scalar argument", item);
                }
                value
            });
            match value {
                Some(value) => values.push(value),
                None => valid = false,
            }
        }
        valid.then_some(values)
    }

    /// `"name rest"`: rest becomes one positional string with outer quotes stripped
    fn parse_command(&mut self, text: &str, position: Position) -> Option<Invocation> {
        let text = text.trim();
        if text.is_empty() {
            self.error(
                ValidationErrorKind::InvalidStep {
                    reason: "step must not be empty".into(),
                },
                position,
            );
            return None;
        }

        let (name, rest) = match text.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (text, ""),
        };
        if !self.check_name(name, position) {
            return None;
        }

        let args = if rest.is_empty() {
            Vec::new()
        } else {
            vec![Argument::positional(strip_quotes(rest))]
        };
        Some(Invocation {
            name: name.to_owned(),
            args,
        })
    }

    fn check_name(&mut self, name: &str, position: Position) -> bool {
        let valid = is_identifier(name);
        if !valid {
            self.error(
                ValidationErrorKind::InvalidIdentifier { name: name.into() },
                position,
            );
        }
        valid
    }
}

fn scalar_value(scalar: &Scalar) -> Option<ArgValue> {
    match scalar {
        Scalar::Null => None,
        Scalar::Bool(value) => Some(ArgValue::Boolean(*value)),
        Scalar::Integer(value) => Some(ArgValue::Integer(*value)),
        Scalar::Float(value) => Some(ArgValue::Float(*value)),
        Scalar::String(value) => Some(ArgValue::String(value.clone())),
    }
}

/// Removes one pair of matching outer quotes
pub(super) fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'make test'"), "make test");
        assert_eq!(strip_quotes("\"make\""), "make");
        assert_eq!(strip_quotes("'unbalanced\""), "'unbalanced\"");
        assert_eq!(strip_quotes("'"), "'");
        assert_eq!(strip_quotes("plain"), "plain");
    }
}
