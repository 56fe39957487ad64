use smallvec::{smallvec, SmallVec};

use crate::abs::Abs;
use crate::line::{LineFlags, LineWidths, Lines};
use crate::prepare::Preparation;
use crate::prim::{Cost, Primitive, PrimitiveKind, INFINITY};

/// How to determine line breaks.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Linebreaks {
    /// Determine the line breaks in a simple first-fit style.
    Simple,
    /// Optimize the line breaks over the whole paragraph.
    ///
    /// Produces more evenly filled lines by minimizing the total squared
    /// deviation of each line from its width budget.
    Optimized,
}

/// Breaks the paragraph into lines.
pub fn linebreak(p: &Preparation, widths: &LineWidths, mode: Linebreaks) -> Lines {
    match mode {
        Linebreaks::Simple => linebreak_simple(p, widths),
        Linebreaks::Optimized => linebreak_optimized(p, widths),
    }
}

/// A pending break opportunity in the simple breaker.
#[derive(Debug, Copy, Clone)]
struct Candidate {
    /// The index of the break primitive.
    index: usize,
    /// The printed width up to the break.
    width: Abs,
}

/// Performs line breaking in simple first-fit style. This means that we build
/// lines greedily, always taking the longest possible line. This may lead to
/// very unbalanced lines, but is fast and simple.
///
/// The pass tracks two pending candidates since the last chosen break: a
/// _good_ one (a penalty whose printed width still fit the budget when it was
/// seen) and a _fallback_ (a wordbreak, or a penalty seen while the line was
/// already overfull). Once the printed content overflows the budget, the
/// better candidate wins and the scan rewinds to just after it.
fn linebreak_simple(p: &Preparation, widths: &LineWidths) -> Lines {
    let prims = p.primitives();
    let mut lines = Lines::with_capacity(16);

    let mut line_num = 0;
    let mut max_width = widths.get(line_num);

    // All width since the line start, including pending glue, and the width
    // up to the last box. Only the latter decides overflow, so trailing
    // spaces never overflow a line.
    let mut width = Abs::zero();
    let mut printed = Abs::zero();

    // Candidate indices only ever move forward, even across emitted lines.
    let mut good: Option<Candidate> = None;
    let mut fallback: Option<Candidate> = None;
    let mut good_index = 0;
    let mut fallback_index = 0;

    // The first tab since the line start, to decide the tab flag.
    let mut first_tab: Option<usize> = None;

    let mut i = 0;
    while i < prims.len() {
        let prim = prims[i];

        match prim.kind {
            PrimitiveKind::Box(w) => {
                width += w;
                printed = width;
            }
            PrimitiveKind::Glue(w) => width += w,
            PrimitiveKind::Variable(tabs) => {
                width = tabs.width(width);
                first_tab.get_or_insert(i);
            }
            _ => {}
        }

        // The examined content no longer fits: break at the better pending
        // candidate and rescan from just after it. Without any candidate we
        // keep going; at least one box lands on every line even when it
        // overflows, which guarantees forward progress.
        if printed > max_width {
            if let Some(cand) = good.or(fallback) {
                let mut flags = LineFlags::empty();
                if first_tab.is_some_and(|t| t < cand.index) {
                    flags |= LineFlags::TAB;
                }
                if good.is_none()
                    && matches!(prims[cand.index].kind, PrimitiveKind::Wordbreak)
                {
                    flags |= LineFlags::BROKEN_WORD;
                }
                lines.push(prims[cand.index].location, cand.width, flags);
                line_num += 1;
                max_width = widths.get(line_num);
                width = Abs::zero();
                printed = Abs::zero();
                good = None;
                fallback = None;
                first_tab = None;
                i = cand.index + 1;
                continue;
            }
        }

        // Update the pending candidates. Penalty widths are not consulted;
        // the builder always emits them with zero width.
        match prim.kind {
            PrimitiveKind::Penalty { cost, .. } if cost < INFINITY => {
                if cost <= -INFINITY {
                    // A mandatory break is emitted on the spot, bypassing the
                    // candidate machinery.
                    let mut flags = LineFlags::empty();
                    if first_tab.is_some_and(|t| t < i) {
                        flags |= LineFlags::TAB;
                    }
                    lines.push(prim.location, printed, flags);
                    line_num += 1;
                    max_width = widths.get(line_num);
                    width = Abs::zero();
                    printed = Abs::zero();
                    good = None;
                    fallback = None;
                    first_tab = None;
                    i += 1;
                    continue;
                }
                if i > fallback_index && (printed <= max_width || fallback.is_none()) {
                    fallback = Some(Candidate { index: i, width: printed });
                    fallback_index = i;
                }
                if i > good_index && printed <= max_width {
                    good = Some(Candidate { index: i, width: printed });
                    good_index = i;
                }
            }
            PrimitiveKind::Wordbreak => {
                // Splitting a word is a last resort, so wordbreaks only ever
                // feed the fallback candidate.
                if i > fallback_index && (printed <= max_width || fallback.is_none()) {
                    fallback = Some(Candidate { index: i, width: printed });
                    fallback_index = i;
                }
            }
            _ => {}
        }

        i += 1;
    }

    // Flush trailing content after the last emitted break. With the usual
    // terminal mandatory penalty this is unreachable, but sequences without
    // one still get their last line here.
    if let Some(cand) = good.or(fallback) {
        let mut flags = LineFlags::empty();
        if first_tab.is_some_and(|t| t < cand.index) {
            flags |= LineFlags::TAB;
        }
        if good.is_none() && matches!(prims[cand.index].kind, PrimitiveKind::Wordbreak) {
            flags |= LineFlags::BROKEN_WORD;
        }
        lines.push(prims[cand.index].location, cand.width, flags);
    }

    lines
}

/// An entry in the dynamic programming table of the optimized breaker.
///
/// Entries live in an arena addressed by index; `prev` points back into the
/// same arena, with `None` marking the start-of-paragraph sentinel.
#[derive(Debug)]
struct Entry {
    /// The arena index of the predecessor break.
    prev: Option<usize>,
    /// The primitive this break happens at.
    prim: usize,
    /// The number of lines up to and including this break.
    lines: usize,
    /// The total demerits of this break and its chain of predecessors.
    total: Cost,
    /// The printed width of the line ending at this break.
    width: Abs,
    /// The flags of the line ending at this break.
    flags: LineFlags,
}

/// Performs line breaking in optimized Knuth-Plass style. Here, we use more
/// context to determine the line breaks than in the simple first-fit style:
/// a line may be cut short even though more content would still fit, if that
/// improves the fit of the following lines.
///
/// To find the layout with the minimal total demerits, the algorithm uses
/// dynamic programming: every selectable penalty is a potential line end and
/// for each one we walk the still-active earlier breaks, rate the line that
/// would span between them and keep the cheapest predecessor. Tab widths
/// depend on the width accumulated since the line's start, so every candidate
/// line is measured from scratch; nothing can be shared across predecessors.
///
/// A predecessor whose line to the current penalty is overfull is removed
/// from the active set for good, since spans only grow as the scan advances.
/// If the active set ever drains completely, a desperate break forces the
/// scan onward, so termination is guaranteed even for content that fits no
/// budget at all.
fn linebreak_optimized(p: &Preparation, widths: &LineWidths) -> Lines {
    let prims = p.primitives();

    // Dynamic programming table.
    let mut table = vec![Entry {
        prev: None,
        prim: 0,
        lines: 0,
        total: 0.0,
        width: Abs::zero(),
        flags: LineFlags::empty(),
    }];

    // Table indices of breaks that can still start a line.
    let mut active: SmallVec<[usize; 16]> = smallvec![0];
    let mut last = 0;

    let mut i = 0;
    while i < prims.len() {
        if let PrimitiveKind::Penalty { cost, .. } = prims[i].kind {
            // Forbidden breaks are never selected.
            if cost < INFINITY {
                let is_final = i + 1 == prims.len();
                let mut best: Option<Entry> = None;

                // Find the optimal predecessor, dropping the ones that can
                // no longer reach any break within budget.
                active.retain(|&mut idx| {
                    let pred = &table[idx];
                    let max_width = widths.get(pred.lines);
                    let (printed, flags) = metrics(&prims[pred.prim..i]);
                    if printed > max_width {
                        return false;
                    }

                    let total =
                        pred.total + demerits(max_width, printed, is_final, cost);
                    if best.as_ref().map_or(true, |best| total < best.total) {
                        best = Some(Entry {
                            prev: Some(idx),
                            prim: i,
                            lines: pred.lines + 1,
                            total,
                            width: printed,
                            flags,
                        });
                    }
                    true
                });

                // Nothing before a mandatory break can start a line after it.
                if cost <= -INFINITY {
                    active.clear();
                }

                if let Some(best) = best {
                    table.push(best);
                    last = table.len() - 1;
                    active.push(last);
                }

                if active.is_empty() {
                    // No break since the last recorded one fits any budget,
                    // but we can't give up: force a break and rescan from
                    // just after it.
                    let start = table[last].prim;
                    let lines = table[last].lines;
                    let max_width = widths.get(lines);
                    if let Some(forced) = desperate(prims, start, max_width) {
                        table.push(Entry {
                            prev: Some(last),
                            prim: forced.index,
                            lines: lines + 1,
                            total: 0.0,
                            width: forced.width,
                            flags: forced.flags,
                        });
                        last = table.len() - 1;
                        active.push(last);
                        i = forced.index;
                    }
                }
            }
        }

        i += 1;
    }

    // Retrace the best path, back to front.
    let mut lines = Lines::with_capacity(table[table.len() - 1].lines);
    let mut idx = table.len() - 1;
    while let Some(prev) = table[idx].prev {
        let entry = &table[idx];
        lines.push(prims[entry.prim].location, entry.width, entry.flags);
        idx = prev;
    }
    lines.reverse();
    lines
}

/// Measures a span of primitives forming one candidate line.
///
/// Returns the printed width up to the span's last box and the flags the
/// span contributes to its line. Tabs resolve against the running width,
/// which includes trailing glue and is why spans must be measured per
/// predecessor.
fn metrics(prims: &[Primitive]) -> (Abs, LineFlags) {
    let mut width = Abs::zero();
    let mut printed = Abs::zero();
    let mut flags = LineFlags::empty();
    for prim in prims {
        match prim.kind {
            PrimitiveKind::Box(w) => {
                width += w;
                printed = width;
            }
            PrimitiveKind::Glue(w) => width += w,
            PrimitiveKind::Variable(tabs) => {
                width = tabs.width(width);
                flags |= LineFlags::TAB;
            }
            _ => {}
        }
    }
    (printed, flags)
}

/// Rates a line: the squared deviation from the width budget plus the cost
/// of the break ending it. The deviation of the paragraph's last line does
/// not count; a short last line is perfectly fine.
fn demerits(max_width: Abs, printed: Abs, is_final: bool, cost: Cost) -> Cost {
    let deviation = if is_final { 0.0 } else { (max_width - printed).to_raw() };
    deviation * deviation + cost
}

/// A break forced upon an overfull region.
#[derive(Debug)]
struct Desperate {
    /// The primitive the forced break happens at.
    index: usize,
    /// The printed width of the line ending at the forced break.
    width: Abs,
    /// The flags of the line ending at the forced break.
    flags: LineFlags,
}

/// Scans forward from `start` for the furthest break primitive that still
/// precedes the first overflow past an already recorded candidate. If even
/// the first candidate overflows, it is taken anyway; one primitive of
/// progress beats not terminating.
fn desperate(prims: &[Primitive], start: usize, max_width: Abs) -> Option<Desperate> {
    let mut width = Abs::zero();
    let mut printed = Abs::zero();
    let mut first_tab: Option<usize> = None;
    let mut found: Option<Desperate> = None;

    for (i, prim) in prims.iter().enumerate().skip(start) {
        match prim.kind {
            PrimitiveKind::Box(w) => {
                width += w;
                printed = width;
            }
            PrimitiveKind::Glue(w) => width += w,
            PrimitiveKind::Variable(tabs) => {
                width = tabs.width(width);
                first_tab.get_or_insert(i);
            }
            _ => {}
        }

        if printed > max_width && found.is_some() {
            break;
        }

        // Must make progress, so the break has to lie past the start.
        if i > start
            && matches!(
                prim.kind,
                PrimitiveKind::Penalty { .. } | PrimitiveKind::Wordbreak
            )
        {
            let mut flags = LineFlags::empty();
            if first_tab.is_some_and(|t| t < i) {
                flags |= LineFlags::TAB;
            }
            if matches!(prim.kind, PrimitiveKind::Wordbreak) {
                flags |= LineFlags::BROKEN_WORD;
            }
            found = Some(Desperate { index: i, width: printed, flags });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabs::TabStops;

    fn boxed(location: usize, width: f64) -> Primitive<'static> {
        Primitive { location, kind: PrimitiveKind::Box(Abs::raw(width)) }
    }

    fn glue(location: usize, width: f64) -> Primitive<'static> {
        Primitive { location, kind: PrimitiveKind::Glue(Abs::raw(width)) }
    }

    fn penalty(location: usize, cost: Cost) -> Primitive<'static> {
        Primitive {
            location,
            kind: PrimitiveKind::Penalty { width: Abs::zero(), cost },
        }
    }

    fn mandatory(location: usize) -> Primitive<'static> {
        penalty(location, -INFINITY)
    }

    fn wordbreak(location: usize) -> Primitive<'static> {
        Primitive { location, kind: PrimitiveKind::Wordbreak }
    }

    fn variable(location: usize, tabs: &TabStops) -> Primitive<'_> {
        Primitive { location, kind: PrimitiveKind::Variable(tabs) }
    }

    /// Five words of width 10 separated by glue of width 5, as the engine
    /// would produce for "AA BB CC DD EE" with per-letter advances of 5.
    fn five_words() -> Preparation<'static> {
        let mut prims = Vec::new();
        for word in 0..5 {
            let start = word * 3;
            if word > 0 {
                prims.push(glue(start - 1, 5.0));
                prims.push(penalty(start, 0.0));
            }
            prims.push(boxed(start, 5.0));
            prims.push(wordbreak(start + 1));
            prims.push(boxed(start + 1, 5.0));
        }
        prims.push(mandatory(14));
        Preparation::new(prims)
    }

    /// The total demerits of a result under the cost formula the optimized
    /// breaker minimizes, excluding the last line's deviation term. All test
    /// penalties are zero-cost, so only deviations count.
    fn demerit_sum(lines: &Lines, widths: &LineWidths) -> f64 {
        lines
            .iter()
            .enumerate()
            .take(lines.len() - 1)
            .map(|(i, (_, width, _))| {
                let deviation = (widths.get(i) - width).to_raw();
                deviation * deviation
            })
            .sum()
    }

    #[test]
    fn test_everything_fits_on_one_line() {
        let p = five_words();
        let widths = LineWidths::constant(1000.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[14]);
            assert_eq!(lines.widths(), &[Abs::raw(70.0)]);
            assert_eq!(lines.flags(), &[LineFlags::empty()]);
        }
    }

    #[test]
    fn test_offsets_cover_text() {
        let p = five_words();
        for max in [3.0, 11.0, 25.0, 40.0, 70.0] {
            let widths = LineWidths::constant(max);
            for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
                let lines = linebreak(&p, &widths, mode);
                assert!(lines.breaks().windows(2).all(|w| w[0] < w[1]));
                assert_eq!(lines.breaks().last(), Some(&14));
            }
        }
    }

    #[test]
    fn test_simple_scenario() {
        let p = five_words();
        let widths = LineWidths::constant(25.0);
        let lines = linebreak(&p, &widths, Linebreaks::Simple);
        assert_eq!(lines.breaks(), &[6, 12, 14]);
        assert_eq!(lines.widths(), &[Abs::raw(25.0), Abs::raw(25.0), Abs::raw(10.0)]);
    }

    #[test]
    fn test_optimized_no_worse_than_simple() {
        let p = five_words();
        for max in [12.0, 25.0, 26.0, 40.0, 55.0] {
            let widths = LineWidths::constant(max);
            let simple = linebreak(&p, &widths, Linebreaks::Simple);
            let optimized = linebreak(&p, &widths, Linebreaks::Optimized);
            assert!(demerit_sum(&optimized, &widths) <= demerit_sum(&simple, &widths));
        }
    }

    #[test]
    fn test_optimized_beats_simple() {
        // Words of widths 7, 7, 6 and 10 with glue of width 2. The simple
        // breaker maximizes the first line (7 + 2 + 7 = 16) and strands the
        // third word on a nearly empty middle line; cutting the first line
        // short balances the paragraph.
        let p = Preparation::new(vec![
            boxed(0, 7.0),
            glue(1, 2.0),
            penalty(2, 0.0),
            boxed(2, 7.0),
            glue(3, 2.0),
            penalty(4, 0.0),
            boxed(4, 6.0),
            glue(5, 2.0),
            penalty(6, 0.0),
            boxed(6, 10.0),
            mandatory(7),
        ]);
        let widths = LineWidths::constant(16.0);

        let simple = linebreak(&p, &widths, Linebreaks::Simple);
        assert_eq!(simple.breaks(), &[4, 6, 7]);
        assert_eq!(simple.widths(), &[Abs::raw(16.0), Abs::raw(6.0), Abs::raw(10.0)]);

        let optimized = linebreak(&p, &widths, Linebreaks::Optimized);
        assert_eq!(optimized.breaks(), &[2, 6, 7]);
        assert_eq!(
            optimized.widths(),
            &[Abs::raw(7.0), Abs::raw(15.0), Abs::raw(10.0)],
        );

        assert_eq!(demerit_sum(&simple, &widths), 100.0);
        assert_eq!(demerit_sum(&optimized, &widths), 82.0);
    }

    #[test]
    fn test_mandatory_break_always_emitted() {
        let p = Preparation::new(vec![
            boxed(0, 3.0),
            mandatory(1),
            boxed(1, 3.0),
            mandatory(2),
        ]);
        let widths = LineWidths::constant(100.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[1, 2]);
            assert_eq!(lines.widths(), &[Abs::raw(3.0), Abs::raw(3.0)]);
        }
    }

    #[test]
    fn test_overflow_wins_over_mandatory() {
        // When content overflows right at a mandatory break, the pending
        // good break is taken first and the mandatory break ends its own,
        // shorter line.
        let p = Preparation::new(vec![
            boxed(0, 6.0),
            penalty(1, 0.0),
            boxed(1, 6.0),
            mandatory(2),
        ]);
        let widths = LineWidths::constant(8.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[1, 2]);
            assert_eq!(lines.widths(), &[Abs::raw(6.0), Abs::raw(6.0)]);
        }
    }

    #[test]
    fn test_oversized_box_terminates() {
        // A single box wider than any line, with no break opportunity around
        // it. The simple breaker places it anyway; the optimized breaker
        // goes through the desperate path. Either way the whole input ends
        // up on exactly one line.
        let p = Preparation::new(vec![boxed(0, 100.0), mandatory(1)]);
        let widths = LineWidths::constant(10.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[1]);
            assert_eq!(lines.widths(), &[Abs::raw(100.0)]);
        }
    }

    #[test]
    fn test_word_splitting() {
        // One long word with wordbreaks between its letters and no legal
        // break anywhere: both breakers must split it, flagging every line
        // that ends inside the word.
        let p = Preparation::new(vec![
            boxed(0, 5.0),
            wordbreak(1),
            boxed(1, 5.0),
            wordbreak(2),
            boxed(2, 5.0),
            mandatory(3),
        ]);
        let widths = LineWidths::constant(8.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[1, 2, 3]);
            assert_eq!(
                lines.widths(),
                &[Abs::raw(5.0), Abs::raw(5.0), Abs::raw(5.0)],
            );
            assert_eq!(
                lines.flags(),
                &[LineFlags::BROKEN_WORD, LineFlags::BROKEN_WORD, LineFlags::empty()],
            );
        }
    }

    #[test]
    fn test_tab_resolution_and_flag() {
        let tabs = TabStops::regular(8.0);
        let p = Preparation::new(vec![
            boxed(0, 5.0),
            variable(1, &tabs),
            boxed(2, 5.0),
            mandatory(3),
        ]);
        let widths = LineWidths::constant(100.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[3]);
            // The tab advances the running width to the next multiple of 8.
            assert_eq!(lines.widths(), &[Abs::raw(13.0)]);
            assert_eq!(lines.flags(), &[LineFlags::TAB]);
        }
    }

    #[test]
    fn test_first_line_width() {
        let p = Preparation::new(vec![
            boxed(0, 10.0),
            glue(1, 5.0),
            penalty(2, 0.0),
            boxed(2, 10.0),
            glue(3, 5.0),
            penalty(4, 0.0),
            boxed(4, 10.0),
            mandatory(5),
        ]);
        let widths = LineWidths::new(12.0, 1, 27.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[2, 5]);
            assert_eq!(lines.widths(), &[Abs::raw(10.0), Abs::raw(25.0)]);
        }
    }

    #[test]
    fn test_empty_paragraph() {
        let p = Preparation::new(vec![mandatory(0)]);
        let widths = LineWidths::constant(10.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let lines = linebreak(&p, &widths, mode);
            assert_eq!(lines.breaks(), &[0]);
            assert_eq!(lines.widths(), &[Abs::zero()]);
        }
    }

    #[test]
    fn test_deterministic() {
        let p = five_words();
        let widths = LineWidths::constant(25.0);
        for mode in [Linebreaks::Simple, Linebreaks::Optimized] {
            let first = linebreak(&p, &widths, mode);
            let second = linebreak(&p, &widths, mode);
            assert_eq!(first, second);
        }
    }
}
