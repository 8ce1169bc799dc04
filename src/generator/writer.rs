//! Indentation-aware text buffer

/// Accumulates script lines at the current nesting depth
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    buffer: String,
    depth: usize,
    indent: String,
}

impl ScriptWriter {
    /// Creates a writer indenting each level by `indent_width` spaces
    #[must_use]
    pub fn new(indent_width: usize) -> Self {
        Self {
            buffer: String::new(),
            depth: 0,
            indent: " ".repeat(indent_width),
        }
    }

    /// Writes one line at the current depth
    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.buffer.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.buffer.push_str(&self.indent);
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    /// Writes `header {` and indents
    pub fn open(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.depth += 1;
    }

    /// Dedents and writes `}`
    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Writes `header { ... }` around whatever `body` emits
    pub fn block(&mut self, header: &str, body: impl FnOnce(&mut Self)) {
        self.open(header);
        body(self);
        self.close();
    }

    /// Current nesting depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the text written so far
    #[must_use]
    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_blocks() {
        let mut writer = ScriptWriter::new(4);
        writer.block("pipeline", |w| {
            w.line("agent any");
            w.block("stages", |w| w.line("stage('x') {}"));
        });
        assert_eq!(
            writer.finish(),
            "pipeline {\n    agent any\n    stages {\n        stage('x') {}\n    }\n}\n"
        );
    }

    #[test]
    fn test_custom_indent_width() {
        let mut writer = ScriptWriter::new(2);
        writer.block("a", |w| w.line("b"));
        assert_eq!(writer.finish(), "a {\n  b\n}\n");
    }

    #[test]
    fn test_close_never_underflows() {
        let mut writer = ScriptWriter::new(4);
        writer.close();
        assert_eq!(writer.depth(), 0);
    }
}
