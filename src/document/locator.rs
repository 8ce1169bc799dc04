//! Source positions for deserialized nodes
//!
//! `serde_yaml` does not expose node marks, so positions are recovered by
//! scanning the source once, in document order. Keys and scalars appear in
//! the text in the same order as a pre-order walk of the tree, which lets a
//! single forward cursor find each of them. When a token cannot be found
//! (aliases, exotic scalar spellings) the node gets the cursor position and
//! the cursor stays put.

use super::{Node, NodeKind, Position, Scalar};

pub(super) struct Locator<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
    cursor: usize,
}

impl<'a> Locator<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            text,
            line_starts,
            cursor: 0,
        }
    }

    pub(super) fn locate(&mut self, node: &mut Node) {
        let start = self.cursor;
        match &mut node.kind {
            NodeKind::Scalar(scalar) => {
                node.position = self.find_scalar(scalar);
            }
            NodeKind::Sequence(items) => {
                for item in items.iter_mut() {
                    self.locate(item);
                }
                node.position = items
                    .first()
                    .map_or_else(|| self.position_at(start), Node::position);
            }
            NodeKind::Mapping(entries) => {
                for entry in entries.iter_mut() {
                    entry.key_position = self.find_key(&entry.key);
                    self.locate(&mut entry.value);
                }
                node.position = entries
                    .first()
                    .map_or_else(|| self.position_at(start), |e| e.key_position);
            }
        }
    }

    fn find_scalar(&mut self, scalar: &Scalar) -> Position {
        let needle = match scalar {
            Scalar::Null => return self.position_at(self.cursor),
            Scalar::String(s) => match s.lines().map(str::trim).find(|l| !l.is_empty()) {
                Some(first) => first.to_owned(),
                None => return self.position_at(self.cursor),
            },
            other => other.to_string(),
        };

        let Some(found) = self.text[self.cursor..].find(&needle) else {
            return self.position_at(self.cursor);
        };
        let at = self.cursor + found;
        self.cursor = at + needle.len();

        // Skip over the remaining lines of block scalars so their content
        // is never mistaken for keys.
        if let Scalar::String(s) = scalar
            && let Some(last) = s.lines().map(str::trim).rfind(|l| !l.is_empty())
            && last != needle
            && let Some(end) = self.text[self.cursor..].find(last)
        {
            self.cursor += end + last.len();
        }

        self.position_at(at)
    }

    fn find_key(&mut self, key: &str) -> Position {
        let rest = &self.text[self.cursor..];
        for (offset, _) in rest.match_indices(key) {
            let at = self.cursor + offset;
            if self.is_key_at(at, key) {
                self.cursor = at + key.len();
                return self.position_at(at);
            }
        }
        self.position_at(self.cursor)
    }

    fn is_key_at(&self, at: usize, key: &str) -> bool {
        let before = self.text[..at].chars().next_back();
        if before.is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return false;
        }
        let after = self.text[at + key.len()..]
            .trim_start_matches(['"', '\''])
            .trim_start_matches([' ', '\t']);
        after.starts_with(':')
    }

    fn position_at(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self.text[line_start..offset].chars().count() + 1;
        Position::new(line, column)
    }
}
