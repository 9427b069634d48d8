#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset just past the content, excluding the line terminator.
    pub end: usize,
    /// Byte offset where the following line begins (`text.len()` on the last line).
    pub next: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Line table and second-level headings of one document, built once per text.
///
/// Heading lookups around an offset are binary searches over the heading list.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    lines: Vec<Line>,
    sections: Vec<Heading>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0usize;
        while start < text.len() {
            let (end, next) = match text[start..].find('\n') {
                Some(relative) => (start + relative, start + relative + 1),
                None => (text.len(), text.len()),
            };
            let end = if text[start..end].ends_with('\r') {
                end - 1
            } else {
                end
            };
            lines.push(Line { start, end, next });
            start = next;
        }

        let sections = lines
            .iter()
            .filter_map(|line| {
                let content = &text[line.start..line.end];
                let title = content.strip_prefix("## ")?;
                if title.is_empty() {
                    return None;
                }
                Some(Heading {
                    start: line.start,
                    end: line.end,
                    text: title.trim().to_string(),
                })
            })
            .collect();

        Self {
            text,
            lines,
            sections,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line_text(&self, line: &Line) -> &'a str {
        &self.text[line.start..line.end]
    }

    /// The nearest second-level heading whose line starts before `offset`.
    pub fn section_before(&self, offset: usize) -> Option<&Heading> {
        let count = self.sections.partition_point(|heading| heading.start < offset);
        count.checked_sub(1).map(|index| &self.sections[index])
    }

    /// The first second-level heading whose line starts after `offset`.
    pub fn section_after(&self, offset: usize) -> Option<&Heading> {
        let index = self.sections.partition_point(|heading| heading.start <= offset);
        self.sections.get(index)
    }

    /// Text of the first top-level (`# `) heading.
    pub fn title(&self) -> Option<&Line> {
        self.lines.iter().find(|line| {
            self.line_text(line)
                .strip_prefix("# ")
                .is_some_and(|title| !title.is_empty())
        })
    }

    pub fn title_text(&self) -> Option<&'a str> {
        self.title()
            .map(|line| &self.text[line.start + 2..line.end])
    }
}
