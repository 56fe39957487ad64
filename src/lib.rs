//! Paragraph line breaking.
//!
//! A paragraph of measured text is reduced to a sequence of _primitives_ in
//! the box-glue-penalty model: unbreakable boxes of printed content, glue for
//! breakable spaces, penalties marking break opportunities with a cost, tabs
//! whose width is resolved during breaking and wordbreaks as a last resort
//! between the letters of a word. Two breakers then turn the sequence into
//! lines:
//!
//! - [`Linebreaks::Simple`] fills each line greedily with as much content as
//!   fits.
//! - [`Linebreaks::Optimized`] minimizes the total squared deviation of all
//!   lines from their width budget via dynamic programming.
//!
//! Both report the same shape of result: strictly increasing break offsets
//! into the source text that always end at the text's length, together with
//! each line's consumed width and flags.
//!
//! The engine performs no text measurement itself. Advance widths come from
//! an external shaping collaborator via [`Breaker`] and break opportunities
//! from an external segmenter; text is addressed in UTF-16 code units
//! throughout.

pub mod abs;
pub mod line;
pub mod linebreak;
pub mod prepare;
pub mod prim;
pub mod scalar;
pub mod tabs;

pub use crate::abs::Abs;
pub use crate::line::{LineFlags, LineWidths, Lines};
pub use crate::linebreak::{linebreak, Linebreaks};
pub use crate::prepare::{prepare, Breaker, Preparation};
pub use crate::prim::{Cost, Primitive, PrimitiveKind, INFINITY};
pub use crate::scalar::Scalar;
pub use crate::tabs::TabStops;
