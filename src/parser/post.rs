use super::PipelineParser;
use crate::document::Node;
use crate::pipeline::errors::ValidationErrorKind;
use crate::pipeline::{Post, PostCondition};

impl PipelineParser<'_> {
    pub(super) fn parse_post(&mut self, node: &Node) -> Post {
        let mut post = Post::new();
        let Some(entries) = self.mapping(node, "mapping of post conditions to steps") else {
            return post;
        };

        for entry in entries {
            let Ok(condition) = entry.key.parse::<PostCondition>() else {
                self.error_at_key(
                    &entry.key,
                    ValidationErrorKind::UnknownPostCondition {
                        name: entry.key.clone(),
                    },
                    entry.key_position,
                );
                continue;
            };
            if let Some(steps) = self.at_key(entry, |p| p.parse_step_list(&entry.value)) {
                post = post.on(condition, steps);
            }
        }

        post
    }
}
