use std::ops::Range;

use crate::abs::Abs;
use crate::line::{LineWidths, Lines};
use crate::linebreak::{linebreak, Linebreaks};
use crate::prim::{Primitive, PrimitiveKind, INFINITY};
use crate::tabs::TabStops;

/// An ordinary breakable space.
const SPACE: u16 = 0x0020;
/// A horizontal tab.
const TAB: u16 = 0x0009;
/// A line feed. Absorbed by the mandatory break that follows it.
const NEWLINE: u16 = 0x000A;
/// A zero width space. Breakable like an ordinary space.
const ZWSP: u16 = 0x200B;

/// Buffers beyond this capacity are released on [`reset`](Breaker::reset)
/// instead of being retained for the next paragraph.
const MAX_BUF_RETAIN: usize = 32768;

/// A paragraph reduced to its primitive sequence, ready for line breaking.
#[derive(Debug)]
pub struct Preparation<'a> {
    prims: Vec<Primitive<'a>>,
}

impl<'a> Preparation<'a> {
    /// Wrap an externally built primitive sequence.
    ///
    /// The sequence must be ordered by non-decreasing location and end in a
    /// mandatory penalty; both are caller contracts.
    pub fn new(prims: Vec<Primitive<'a>>) -> Self {
        debug_assert!(
            prims.windows(2).all(|w| w[0].location <= w[1].location),
            "primitives out of order",
        );
        debug_assert!(
            prims.last().is_some_and(Primitive::is_mandatory),
            "missing terminal mandatory penalty",
        );
        Self { prims }
    }

    /// The primitive sequence.
    pub fn primitives(&self) -> &[Primitive<'a>] {
        &self.prims
    }
}

/// Reduces a paragraph to a primitive sequence.
///
/// Each code unit contributes primitives according to its class: spaces and
/// zero width spaces become glue, tabs become variable-width primitives
/// sharing the one tab resolver, line feeds contribute nothing and all other
/// units become boxes. A box is preceded by a zero-cost penalty when its
/// offset is a legal break opportunity and by a fallback wordbreak otherwise,
/// the latter only when the box has a nonzero advance so that zero-width
/// combining content cannot split a word. A terminal mandatory penalty at the
/// text's end is always appended.
///
/// The opportunity offsets must be sorted and must not include offset zero;
/// both are contracts of the external break-opportunity provider.
pub fn prepare<'a>(
    text: &[u16],
    advances: &[Abs],
    opportunities: &[usize],
    tabs: &'a TabStops,
) -> Preparation<'a> {
    debug_assert_eq!(text.len(), advances.len());
    debug_assert!(opportunities.windows(2).all(|w| w[0] <= w[1]));

    let mut prims = Vec::with_capacity(text.len() + 1);
    let mut cursor = 0;

    for (i, (&unit, &advance)) in text.iter().zip(advances).enumerate() {
        match unit {
            SPACE | ZWSP => {
                prims.push(Primitive { location: i, kind: PrimitiveKind::Glue(advance) });
            }
            TAB => {
                prims.push(Primitive { location: i, kind: PrimitiveKind::Variable(tabs) });
            }
            NEWLINE => {}
            _ => {
                while opportunities.get(cursor).is_some_and(|&b| b < i) {
                    cursor += 1;
                }
                if opportunities.get(cursor) == Some(&i) {
                    prims.push(Primitive {
                        location: i,
                        kind: PrimitiveKind::Penalty { width: Abs::zero(), cost: 0.0 },
                    });
                } else if advance != Abs::zero() {
                    prims.push(Primitive { location: i, kind: PrimitiveKind::Wordbreak });
                }
                prims.push(Primitive { location: i, kind: PrimitiveKind::Box(advance) });
            }
        }
    }

    prims.push(Primitive {
        location: text.len(),
        kind: PrimitiveKind::Penalty { width: Abs::zero(), cost: -INFINITY },
    });

    Preparation { prims }
}

/// A reusable paragraph breaking engine.
///
/// Holds the text and advance-width buffers for one paragraph at a time. The
/// text is set first; advance widths are then filled in per measured run by
/// the shaping collaborator. The buffers survive across paragraphs so that
/// repeated layout passes do not reallocate; [`reset`](Self::reset) trims
/// them once they outgrow a retention threshold.
///
/// A `Breaker` is single-writer: one pass at a time.
#[derive(Debug, Default)]
pub struct Breaker {
    text: Vec<u16>,
    advances: Vec<Abs>,
}

impl Breaker {
    /// Create a breaker with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the paragraph text, resetting all advance widths to zero.
    pub fn set_text(&mut self, text: &[u16]) {
        self.text.clear();
        self.text.extend_from_slice(text);
        self.advances.clear();
        self.advances.resize(text.len(), Abs::zero());
    }

    /// The current paragraph text.
    pub fn text(&self) -> &[u16] {
        &self.text
    }

    /// Fill in the advance widths of a measured run starting at `start`.
    pub fn add_measured_run(&mut self, start: usize, advances: &[f64]) {
        for (slot, &advance) in self.advances[start..start + advances.len()]
            .iter_mut()
            .zip(advances)
        {
            *slot = Abs::raw(advance);
        }
    }

    /// Replace a run with a single opaque object of the given width.
    ///
    /// The width is attributed to the run's first code unit; the remaining
    /// units get zero advances, so the run cannot be split from within.
    pub fn add_replacement_run(&mut self, range: Range<usize>, width: f64) {
        self.advances[range.start] = Abs::raw(width);
        for slot in &mut self.advances[range.start + 1..range.end] {
            *slot = Abs::zero();
        }
    }

    /// The advance widths accumulated so far.
    pub fn advances(&self) -> &[Abs] {
        &self.advances
    }

    /// Break the current paragraph into lines.
    pub fn compute(
        &self,
        opportunities: &[usize],
        tabs: &TabStops,
        widths: &LineWidths,
        mode: Linebreaks,
    ) -> Lines {
        let prepared = prepare(&self.text, &self.advances, opportunities, tabs);
        linebreak(&prepared, widths, mode)
    }

    /// Clear the buffers for the next paragraph.
    ///
    /// Capacity up to the retention threshold is kept so that paragraphs of
    /// similar size reuse the allocation; larger buffers are released.
    pub fn reset(&mut self) {
        self.text.clear();
        self.advances.clear();
        if self.text.capacity() > MAX_BUF_RETAIN {
            self.text.shrink_to_fit();
        }
        if self.advances.capacity() > MAX_BUF_RETAIN {
            self.advances.shrink_to_fit();
        }
    }
}
