use serde::Serialize;

use crate::config::DialectSection;
use crate::lines::LineIndex;

/// One extractable fenced block, positioned against the unmodified document text.
///
/// `start` is the first byte of the opening fence line and `end` is just past the
/// closing fence token, so replacing `start..end` swaps the whole fence for a
/// reference while keeping whatever follows the closing token on its line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionBlock {
    pub heading: Option<String>,
    pub start: usize,
    pub end: usize,
    pub code: String,
}

/// Find every block that sits under an extraction heading, in document order.
///
/// Each marker line owns the region up to the next marker (or end of text). Inside that
/// region the first line equal to the opening fence starts the block and the first
/// later line starting with the closing fence ends it. A marker with no complete fence
/// contributes nothing.
pub fn extract_blocks(text: &str, dialect: &DialectSection) -> Vec<ExtractionBlock> {
    let index = LineIndex::new(text);
    extract_blocks_indexed(&index, dialect)
}

pub fn extract_blocks_indexed(index: &LineIndex<'_>, dialect: &DialectSection) -> Vec<ExtractionBlock> {
    let lines = index.lines();
    let markers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| index.line_text(line) == dialect.extraction_heading)
        .map(|(position, _)| position)
        .collect();

    let mut blocks = Vec::new();
    for (ordinal, &marker) in markers.iter().enumerate() {
        let region_end = markers.get(ordinal + 1).copied().unwrap_or(lines.len());
        let region = &lines[marker + 1..region_end];

        let Some(open_offset) = region
            .iter()
            .position(|line| index.line_text(line) == dialect.fence_open)
        else {
            continue;
        };
        let Some(close) = region[open_offset + 1..]
            .iter()
            .find(|line| index.line_text(line).starts_with(&dialect.fence_close))
        else {
            continue;
        };

        let open = &region[open_offset];
        let code_start = open.next;
        let code_end = close.start.saturating_sub(1).max(code_start);
        let code = index.text()[code_start..code_end]
            .trim_end_matches('\r')
            .to_string();

        blocks.push(ExtractionBlock {
            heading: index
                .section_before(lines[marker].start)
                .map(|heading| heading.text.clone()),
            start: open.start,
            end: close.start + dialect.fence_close.len(),
            code,
        });
    }
    blocks
}
