use super::PipelineParser;
use super::steps::Invocation;
use crate::document::{Node, NodeKind, Position};
use crate::pipeline::errors::ValidationErrorKind;
use crate::pipeline::{Directive, DirectiveSection};

impl PipelineParser<'_> {
    /// Parses a directive section written as a sequence or a mapping
    pub(super) fn parse_directives(
        &mut self,
        section: DirectiveSection,
        node: &Node,
    ) -> Vec<Directive> {
        let mut directives = Vec::new();
        match node.kind() {
            NodeKind::Sequence(items) => {
                for (index, item) in items.iter().enumerate() {
                    let directive = self.at_index(index, item, |p| {
                        let invocation = p.parse_invocation(item, false)?;
                        p.check_directive(section, invocation, item.position())
                    });
                    directives.extend(directive);
                }
            }
            NodeKind::Mapping(entries) => {
                for entry in entries {
                    let directive = self.at_key(entry, |p| {
                        let args = p.parse_args(&entry.value, false)?;
                        let invocation = Invocation {
                            name: entry.key.clone(),
                            args,
                        };
                        p.check_directive(section, invocation, entry.key_position)
                    });
                    directives.extend(directive);
                }
            }
            NodeKind::Scalar(_) => self.wrong_type("sequence or mapping of directives", node),
        }
        directives
    }

    fn check_directive(
        &mut self,
        section: DirectiveSection,
        invocation: Invocation,
        position: Position,
    ) -> Option<Directive> {
        let directive = Directive {
            name: invocation.name,
            args: invocation.args,
        };

        let config = self.config;
        let Some(spec) = config.registry.get(section, &directive.name) else {
            self.error(
                ValidationErrorKind::UnknownDirective {
                    section: section.to_string(),
                    name: directive.name,
                },
                position,
            );
            return None;
        };

        if let Err(reason) = spec.check(&directive) {
            self.error(
                ValidationErrorKind::InvalidArguments {
                    name: directive.name,
                    reason,
                },
                position,
            );
            return None;
        }

        tracing::trace!(%section, name = %directive.name, "Directive accepted");
        Some(directive)
    }
}
