//! The memory image built up while a program is scanned.
//!
//! Cells are indexed by their offset from the start of the program.
//! They hold wider values than a machine word so that an oversized
//! value can still be recorded and reported when the image is
//! emitted, rather than being silently truncated.
use std::collections::BTreeMap;

use super::types::LineNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cell {
    Word(u32),
    /// The statement which should have produced this word could not
    /// be assembled.  An error has already been reported for it.
    Invalid,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryImage {
    cells: Vec<Cell>,
    /// Source line of each instruction word.
    lines: BTreeMap<usize, LineNumber>,
    /// Runs of data words, keyed by their first offset, with the end
    /// of the run and the line of the directive which produced them.
    /// These only locate diagnostics; data words have no entry in the
    /// address to source line map.
    data_lines: BTreeMap<usize, (usize, LineNumber)>,
}

impl MemoryImage {
    /// The offset at which the next word will be placed.
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn push_instruction(&mut self, cell: Cell, line: LineNumber) {
        self.lines.insert(self.cells.len(), line);
        self.cells.push(cell);
    }

    pub(crate) fn push_data(&mut self, words: &[u32], line: LineNumber) {
        self.record_data(words.len(), line);
        self.cells.extend(words.iter().copied().map(Cell::Word));
    }

    /// Placeholders for a data directive which could not be
    /// assembled, so that later words keep their offsets.
    pub(crate) fn push_invalid_data(&mut self, count: usize, line: LineNumber) {
        self.record_data(count, line);
        self.cells.extend(std::iter::repeat(Cell::Invalid).take(count));
    }

    fn record_data(&mut self, count: usize, line: LineNumber) {
        if count > 0 {
            let start = self.cells.len();
            self.data_lines.insert(start, (start + count, line));
        }
    }

    /// Overwrite placeholder words.
    pub(crate) fn patch(&mut self, offset: usize, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            match self.cells.get_mut(offset + i) {
                Some(cell) => *cell = Cell::Word(*word),
                None => unreachable!("fixup at offset {offset} patches beyond the end of the image"),
            }
        }
    }

    pub(crate) fn invalidate(&mut self, offset: usize, length: usize) {
        let end = (offset + length).min(self.cells.len());
        for cell in &mut self.cells[offset.min(end)..end] {
            *cell = Cell::Invalid;
        }
    }

    /// The line of the instruction assembled at `offset`.
    pub(crate) fn instruction_line(&self, offset: usize) -> Option<LineNumber> {
        self.lines.get(&offset).copied()
    }

    /// The line of whatever statement produced the word at `offset`.
    pub(crate) fn line_at(&self, offset: usize) -> Option<LineNumber> {
        self.instruction_line(offset).or_else(|| {
            self.data_lines
                .range(..=offset)
                .next_back()
                .filter(|(_, (end, _))| offset < *end)
                .map(|(_, (_, line))| *line)
        })
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = (usize, Cell)> + '_ {
        self.cells.iter().copied().enumerate()
    }
}

#[test]
fn test_only_instructions_have_instruction_lines() {
    let mut image = MemoryImage::default();
    image.push_instruction(Cell::Word(0x1042), 1);
    image.push_data(&[1, 2], 2);
    image.push_instruction(Cell::Invalid, 4);
    assert_eq!(image.len(), 4);
    assert_eq!(image.instruction_line(0), Some(1));
    assert_eq!(image.instruction_line(1), None);
    assert_eq!(image.instruction_line(3), Some(4));
}

#[test]
fn test_data_words_are_located() {
    let mut image = MemoryImage::default();
    image.push_data(&[], 0);
    image.push_data(&[1, 2, 3], 1);
    image.push_instruction(Cell::Word(0xF025), 2);
    image.push_invalid_data(2, 3);
    assert_eq!(image.len(), 6);
    assert_eq!(image.line_at(0), Some(1));
    assert_eq!(image.line_at(2), Some(1));
    assert_eq!(image.line_at(3), Some(2));
    assert_eq!(image.line_at(5), Some(3));
    assert_eq!(image.line_at(6), None);
    assert_eq!(
        image.cells().map(|(_, c)| c).skip(4).collect::<Vec<_>>(),
        vec![Cell::Invalid, Cell::Invalid]
    );
}

#[test]
fn test_patch_and_invalidate() {
    let mut image = MemoryImage::default();
    image.push_data(&[0, 0, 0], 0);
    image.patch(1, &[7, 8]);
    assert_eq!(
        image.cells().map(|(_, c)| c).collect::<Vec<_>>(),
        vec![Cell::Word(0), Cell::Word(7), Cell::Word(8)]
    );
    image.invalidate(0, 2);
    assert_eq!(
        image.cells().map(|(_, c)| c).collect::<Vec<_>>(),
        vec![Cell::Invalid, Cell::Invalid, Cell::Word(8)]
    );
}
