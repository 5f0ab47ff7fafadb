use crate::dataflow_log;

/// Indentation-structured text log produced alongside the analysis.
///
/// The log is informational only. Nothing reads it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisLog {
    lines: Vec<LogLine>,
    depth: usize,
    indent_width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub depth: usize,
    pub text: String,
}

impl AnalysisLog {
    pub fn new(indent_width: usize) -> Self {
        Self {
            lines: Vec::new(),
            depth: 0,
            indent_width,
        }
    }

    pub fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        dataflow_log!(format!(
            "[Dataflow] {}{}",
            " ".repeat(self.depth * self.indent_width),
            text
        ));
        self.lines.push(LogLine {
            depth: self.depth,
            text,
        });
    }

    /// A heading followed by an indented block.
    pub fn section(&mut self, title: impl Into<String>) {
        self.line(title);
        self.indent();
    }

    pub fn end_section(&mut self) {
        self.dedent();
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Drops every line from `len` on. The indentation depth is left as it is.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.lines.truncate(len);
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.text.contains(needle))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&" ".repeat(line.depth * self.indent_width));
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}
