use crate::abs::Abs;
use crate::tabs::TabStops;

/// The cost of breaking at a penalty.
pub type Cost = f64;

/// The cost of a forbidden break. A penalty with cost `-INFINITY` is a
/// mandatory break, one with cost `INFINITY` is never selected.
pub const INFINITY: Cost = 1e7;

/// A single element of the box-glue-penalty model a paragraph is reduced to
/// before line breaking.
///
/// Primitives are ordered by non-decreasing location and the last primitive
/// of a paragraph is always a mandatory penalty at the text's end, so every
/// paragraph produces at least one break.
#[derive(Debug, Copy, Clone)]
pub struct Primitive<'a> {
    /// The offset into the source text that a break at this primitive
    /// reports.
    pub location: usize,
    /// What the primitive contributes to a line.
    pub kind: PrimitiveKind<'a>,
}

/// The kinds of line breaking primitives.
#[derive(Debug, Copy, Clone)]
pub enum PrimitiveKind<'a> {
    /// An unbreakable unit of printed content with a fixed width.
    Box(Abs),
    /// Breakable, trailing space. Contributes to the line's width, but not to
    /// its printed extent, so trailing spaces never overflow a line.
    Glue(Abs),
    /// A legal break opportunity carrying a cost.
    Penalty {
        /// Extra width the line gains when it breaks here. The current
        /// breakers do not consult it; the builder always emits zero.
        width: Abs,
        /// The cost of breaking here.
        cost: Cost,
    },
    /// A tab. Its effective width depends on the width accumulated since the
    /// last break, so it is resolved during the breaking pass. All tabs of a
    /// paragraph reference one shared resolver that must outlive the pass.
    Variable(&'a TabStops),
    /// A fallback break opportunity inside a word, used only when no penalty
    /// break is admissible.
    Wordbreak,
}

impl Primitive<'_> {
    /// Whether this is a penalty with a cost that forces a break.
    pub fn is_mandatory(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Penalty { cost, .. } if cost <= -INFINITY)
    }
}
