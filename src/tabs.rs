use smallvec::SmallVec;

use crate::abs::Abs;

/// Resolves a running horizontal position to the next tab boundary.
///
/// A table consists of explicit, ascending stop positions and a default
/// spacing that takes over once the explicit stops are exhausted. The
/// explicit stops must be sorted by the caller; this is a contract, not a
/// defended error case.
#[derive(Debug, Clone)]
pub struct TabStops {
    stops: SmallVec<[Abs; 4]>,
    default: Abs,
}

impl TabStops {
    /// Create a tab stop table from explicit stop positions and a default
    /// spacing.
    pub fn new(stops: &[f64], default: f64) -> Self {
        debug_assert!(stops.windows(2).all(|w| w[0] <= w[1]), "tab stops unsorted");
        debug_assert!(default > 0.0, "default tab spacing must be positive");
        Self {
            stops: stops.iter().map(|&s| Abs::raw(s)).collect(),
            default: Abs::raw(default),
        }
    }

    /// Create a table without explicit stops.
    pub fn regular(default: f64) -> Self {
        Self::new(&[], default)
    }

    /// The position of the first tab boundary strictly after `current`.
    ///
    /// Returns the first explicit stop greater than `current` or, past the
    /// explicit stops, the next multiple of the default spacing.
    pub fn width(&self, current: Abs) -> Abs {
        for &stop in &self.stops {
            if stop > current {
                return stop;
            }
        }
        let spacing = self.default.to_raw();
        Abs::raw(((current.to_raw() + spacing) / spacing).floor() * spacing)
    }
}
