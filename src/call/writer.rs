use std::sync::Arc;

use crate::call::{describe_call, CompletedCall};

/// Text sink used when rendering failure messages
pub trait OutputWriter {
    /// Writes `text`, indenting every new line by the current indentation
    fn write(&mut self, text: &str);

    /// Writes `text` followed by a line break
    fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }

    /// Increases the indentation of subsequent lines
    fn indent(&mut self);

    /// Decreases the indentation of subsequent lines
    fn unindent(&mut self);
}

/// An [`OutputWriter`] collecting into a `String`, indenting by two spaces per level
#[derive(Debug)]
pub struct StringOutputWriter {
    buffer: String,
    level: usize,
    at_line_start: bool,
}

impl StringOutputWriter {
    /// Creates an empty writer
    #[must_use]
    pub fn new() -> Self {
        StringOutputWriter {
            buffer: String::new(),
            level: 0,
            at_line_start: true,
        }
    }

    /// The text written so far
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Consumes the writer, returning the text
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl Default for StringOutputWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputWriter for StringOutputWriter {
    fn write(&mut self, text: &str) {
        for piece in text.split_inclusive('\n') {
            if self.at_line_start && piece != "\n" {
                self.buffer.push_str(&"  ".repeat(self.level));
            }
            self.buffer.push_str(piece);
            self.at_line_start = piece.ends_with('\n');
        }
    }

    fn indent(&mut self) {
        self.level += 1;
    }

    fn unindent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

/// Writes a bounded list of calls.
///
/// Consecutive calls with identical descriptions collapse into one line annotated with
/// the repeat count. At most `max_lines` lines are rendered; the remaining calls are
/// summarized in a trailing line.
#[derive(Debug, Clone, Copy)]
pub struct CallWriter {
    max_lines: usize,
}

impl CallWriter {
    /// Creates a writer rendering at most `max_lines` collapsed lines
    #[must_use]
    pub fn new(max_lines: usize) -> Self {
        CallWriter { max_lines }
    }

    /// Renders `calls` into `writer`, numbering each line by the position of its first call
    pub fn write_calls(&self, calls: &[Arc<CompletedCall>], writer: &mut dyn OutputWriter) {
        // (position of the first call, description, repeat count)
        let mut groups: Vec<(usize, String, usize)> = Vec::new();
        for (index, call) in calls.iter().enumerate() {
            let description = describe_call(call.as_ref());
            match groups.last_mut() {
                Some((_, last, count)) if *last == description => *count += 1,
                _ => groups.push((index + 1, description, 1)),
            }
        }

        let mut rendered = 0;
        for (position, description, count) in groups.iter().take(self.max_lines) {
            if *count > 1 {
                writer.write_line(&format!("{position}: {description} repeated {count} times"));
            } else {
                writer.write_line(&format!("{position}: {description}"));
            }
            rendered += count;
        }

        let remaining = calls.len() - rendered;
        if remaining > 0 {
            writer.write_line(&format!(
                "... Found {remaining} more calls not displayed here."
            ));
        }
    }
}

impl Default for CallWriter {
    fn default() -> Self {
        CallWriter::new(19)
    }
}
