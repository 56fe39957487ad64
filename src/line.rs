use bitflags::bitflags;

use crate::abs::Abs;

/// The width budget available to each line of a paragraph.
///
/// The first `first_count` lines receive `first`, all remaining lines
/// receive `rest`. This models indented first lines as well as text that
/// flows around an intrusion spanning a fixed number of lines.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineWidths {
    first: Abs,
    first_count: usize,
    rest: Abs,
}

impl LineWidths {
    /// Create a width policy with a distinct budget for the leading lines.
    pub fn new(first: f64, first_count: usize, rest: f64) -> Self {
        Self {
            first: Abs::raw(first),
            first_count,
            rest: Abs::raw(rest),
        }
    }

    /// Create a width policy with one budget for all lines.
    pub fn constant(width: f64) -> Self {
        Self::new(width, 0, width)
    }

    /// The width budget of the line with the given zero-based index.
    pub fn get(&self, line: usize) -> Abs {
        if line < self.first_count {
            self.first
        } else {
            self.rest
        }
    }
}

bitflags! {
    /// Properties of a single broken line.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct LineFlags: u8 {
        /// The line contains at least one tab.
        const TAB = 1 << 0;
        /// The line ends in a word split because no legal break opportunity
        /// was admissible.
        const BROKEN_WORD = 1 << 1;
    }
}

/// The result of one breaking pass.
///
/// Stores one entry per emitted line: the break offset into the source text,
/// the width the line consumed and its flags. Offsets are strictly
/// increasing and the final offset equals the text length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lines {
    breaks: Vec<usize>,
    widths: Vec<Abs>,
    flags: Vec<LineFlags>,
}

impl Lines {
    /// Create an empty result with room for `capacity` lines.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            breaks: Vec::with_capacity(capacity),
            widths: Vec::with_capacity(capacity),
            flags: Vec::with_capacity(capacity),
        }
    }

    /// Append a line ending at `end` to the result.
    pub(crate) fn push(&mut self, end: usize, width: Abs, flags: LineFlags) {
        self.breaks.push(end);
        self.widths.push(width);
        self.flags.push(flags);
    }

    /// Reverse the line order in place.
    ///
    /// The optimized breaker emits its backtrace from the last line to the
    /// first; this turns it into forward order.
    pub(crate) fn reverse(&mut self) {
        self.breaks.reverse();
        self.widths.reverse();
        self.flags.reverse();
    }

    /// The number of lines.
    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    /// Whether there are no lines.
    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    /// The break offsets, one per line, strictly increasing.
    pub fn breaks(&self) -> &[usize] {
        &self.breaks
    }

    /// The consumed width of each line.
    pub fn widths(&self) -> &[Abs] {
        &self.widths
    }

    /// The flags of each line.
    pub fn flags(&self) -> &[LineFlags] {
        &self.flags
    }

    /// Iterate over `(end, width, flags)` per line.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Abs, LineFlags)> + '_ {
        self.breaks
            .iter()
            .zip(&self.widths)
            .zip(&self.flags)
            .map(|((&end, &width), &flags)| (end, width, flags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_widths() {
        let widths = LineWidths::new(30.0, 2, 50.0);
        assert_eq!(widths.get(0), Abs::raw(30.0));
        assert_eq!(widths.get(1), Abs::raw(30.0));
        assert_eq!(widths.get(2), Abs::raw(50.0));
        assert_eq!(widths.get(100), Abs::raw(50.0));

        let constant = LineWidths::constant(40.0);
        assert_eq!(constant.get(0), Abs::raw(40.0));
        assert_eq!(constant.get(7), Abs::raw(40.0));
    }

    #[test]
    fn test_reverse() {
        let mut lines = Lines::default();
        lines.push(9, Abs::raw(12.0), LineFlags::TAB);
        lines.push(4, Abs::raw(8.0), LineFlags::empty());
        lines.reverse();
        assert_eq!(lines.breaks(), &[4, 9]);
        assert_eq!(lines.widths(), &[Abs::raw(8.0), Abs::raw(12.0)]);
        assert_eq!(lines.flags(), &[LineFlags::empty(), LineFlags::TAB]);
    }
}
