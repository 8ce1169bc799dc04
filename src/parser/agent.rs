use super::{PipelineParser, find, optional};
use crate::document::Node;
use crate::pipeline::errors::ValidationErrorKind;
use crate::pipeline::{AgentType, DockerConfig};

const AGENT_KEYS: &[&str] = &["label", "docker"];
const DOCKER_KEYS: &[&str] = &["image", "args", "reuseNode", "alwaysPull"];

impl PipelineParser<'_> {
    pub(super) fn parse_agent(&mut self, node: &Node) -> Option<AgentType> {
        if let Some(name) = node.as_str() {
            return match name {
                "any" => Some(AgentType::Any),
                "none" => Some(AgentType::None),
                other => {
                    self.error(
                        ValidationErrorKind::InvalidAgent(format!(
                            "unknown agent '{other}', expected any, none, label or docker"
                        )),
                        node.position(),
                    );
                    None
                }
            };
        }

        let entries = self.mapping(node, "'any', 'none' or an agent mapping")?;
        if !self.check_keys(entries, AGENT_KEYS) {
            return None;
        }
        match entries {
            [] => {
                self.error(
                    ValidationErrorKind::InvalidAgent("agent mapping is empty".into()),
                    node.position(),
                );
                None
            }
            [entry] if entry.key == "label" => self.at_key(entry, |p| {
                p.non_empty_text(&entry.value, "label").map(AgentType::Label)
            }),
            [entry] => self.at_key(entry, |p| p.parse_docker(&entry.value)),
            [first, second, ..] => {
                self.error(
                    ValidationErrorKind::ConflictingKeys {
                        first: first.key.clone(),
                        second: second.key.clone(),
                    },
                    second.key_position,
                );
                None
            }
        }
    }

    fn parse_docker(&mut self, node: &Node) -> Option<AgentType> {
        if node.as_scalar().is_some() {
            return self
                .non_empty_text(node, "docker image")
                .map(AgentType::docker);
        }

        let entries = self.mapping(node, "image name or docker mapping")?;
        let known = self.check_keys(entries, DOCKER_KEYS);

        let image = match find(entries, "image") {
            Some(entry) => self.at_key(entry, |p| p.non_empty_text(&entry.value, "docker image")),
            None => {
                self.missing("image", node.position());
                None
            }
        };
        let args = find(entries, "args").map(|entry| self.at_key(entry, |p| p.string(&entry.value)));
        let reuse_node = find(entries, "reuseNode")
            .map(|entry| self.at_key(entry, |p| p.boolean(&entry.value)));
        let always_pull = find(entries, "alwaysPull")
            .map(|entry| self.at_key(entry, |p| p.boolean(&entry.value)));

        if !known {
            return None;
        }
        Some(AgentType::Docker(DockerConfig {
            image: image?,
            args: optional(args)?,
            reuse_node: optional(reuse_node)?.unwrap_or(false),
            always_pull: optional(always_pull)?.unwrap_or(false),
        }))
    }
}
