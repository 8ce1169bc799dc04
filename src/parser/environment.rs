use super::PipelineParser;
use crate::document::{Node, NodeKind, Scalar};
use crate::pipeline::errors::ValidationErrorKind;
use crate::pipeline::validation::is_identifier;
use crate::pipeline::{CredentialId, EnvValue, Environment};
use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static CREDENTIALS_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*credentials\(\s*(?:'([^']*)'|"([^"]*)")\s*\)\s*$"#)
        .expect("credentials pattern")
});

impl PipelineParser<'_> {
    /// Parses an `environment` mapping; invalid entries are reported and left out
    pub(super) fn parse_environment(&mut self, node: &Node) -> Environment {
        let mut environment = Environment::new();
        let Some(entries) = self.mapping(node, "mapping of variable names to values") else {
            return environment;
        };

        for entry in entries {
            let value = self.at_key(entry, |p| {
                if !is_identifier(&entry.key) {
                    p.error(
                        ValidationErrorKind::InvalidIdentifier {
                            name: entry.key.clone(),
                        },
                        entry.key_position,
                    );
                    return None;
                }
                p.parse_env_value(&entry.value)
            });
            if let Some(value) = value {
                environment.push(entry.key.clone(), value);
            }
        }

        environment
    }

    fn parse_env_value(&mut self, node: &Node) -> Option<EnvValue> {
        match node.kind() {
            NodeKind::Scalar(Scalar::String(text)) => match CREDENTIALS_CALL.captures(text) {
                Some(captures) => {
                    let id = captures
                        .get(1)
                        .or_else(|| captures.get(2))
                        .map_or("", |m| m.as_str());
                    self.credential(id, node)
                }
                None => Some(EnvValue::Literal(text.clone())),
            },
            NodeKind::Scalar(Scalar::Null) => {
                self.wrong_type("scalar value or credentials reference", node);
                None
            }
            NodeKind::Scalar(scalar) => scalar.to_text().map(EnvValue::Literal),
            NodeKind::Mapping(entries) => {
                if !self.check_keys(entries, &["credentials"]) {
                    return None;
                }
                match entries.as_slice() {
                    [entry] => self.at_key(entry, |p| {
                        let id = p.string(&entry.value)?;
                        p.credential(&id, &entry.value)
                    }),
                    _ => {
                        self.missing("credentials", node.position());
                        None
                    }
                }
            }
            NodeKind::Sequence(_) => {
                self.wrong_type("scalar value or credentials reference", node);
                None
            }
        }
    }

    fn credential(&mut self, id: &str, node: &Node) -> Option<EnvValue> {
        let id = id.trim();
        if id.is_empty() {
            self.error(
                ValidationErrorKind::InvalidCredential {
                    reason: "credential id must not be empty".into(),
                },
                node.position(),
            );
            return None;
        }
        Some(EnvValue::Credential(CredentialId::new(id)))
    }
}
