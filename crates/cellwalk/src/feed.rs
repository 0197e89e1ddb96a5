//! Feeds: cursors over the cells being evaluated
//!
//! A feed walks an array (or cells produced on demand by the host) and can
//! have further sequences spliced in front of its remaining input. It keeps
//! the last cell fetched, a cache of what the upcoming word looks up to,
//! and the two lookahead flags that coordinate enfix deferral between
//! nested frames sharing it.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::environment::Context;
use crate::value::{Cell, Series};

bitflags! {
    /// Flags shared by every frame evaluating from the same feed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FeedFlags: u8 {
        /// Skip one round of enfix lookahead: an enfix operator just took
        /// its left argument tightly.
        const NO_LOOKAHEAD = 1 << 0;
        /// An enfix operator was left for an enclosing frame to run.
        const DEFERRING_ENFIX = 1 << 1;
    }
}

/// Cells a generated source keeps buffered ahead of the cursor.
const PEEK_DEPTH: usize = 3;

enum Source {
    Array {
        array: Rc<Vec<Cell>>,
        index: usize,
    },
    Generated {
        iter: Box<dyn Iterator<Item = Cell>>,
        buffer: VecDeque<Cell>,
    },
}

impl Source {
    fn buffered(&self) -> usize {
        match self {
            Source::Array { array, index } => array.len().saturating_sub(*index),
            Source::Generated { buffer, .. } => buffer.len(),
        }
    }

    fn get(&self, n: usize) -> Option<&Cell> {
        match self {
            Source::Array { array, index } => array.get(index + n),
            Source::Generated { buffer, .. } => buffer.get(n),
        }
    }

    fn take(&mut self) -> Option<Cell> {
        match self {
            Source::Array { array, index } => {
                let cell = array.get(*index).cloned();
                if cell.is_some() {
                    *index += 1;
                }
                cell
            }
            Source::Generated { buffer, .. } => {
                let cell = buffer.pop_front();
                self.prime();
                cell
            }
        }
    }

    // Generated sources keep as many cells buffered as lookahead peeks at
    // (the current cell and the two after it), so peeking never pulls.
    fn prime(&mut self) {
        if let Source::Generated { iter, buffer } = self {
            while buffer.len() < PEEK_DEPTH {
                match iter.next() {
                    Some(cell) => buffer.push_back(cell),
                    None => break,
                }
            }
        }
    }
}

struct Level {
    source: Source,
    scope: Context,
}

/// Cursor over the sequence being evaluated.
pub struct Feed {
    levels: Vec<Level>,
    lookback: Option<Cell>,
    gotten: Option<Cell>,
    flags: FeedFlags,
}

impl Feed {
    /// A feed over a series, resolving words in `scope`.
    pub fn new(series: &Series, scope: Context) -> Self {
        Self::with_source(
            Source::Array {
                array: Rc::clone(series.array()),
                index: series.index(),
            },
            scope,
        )
    }

    /// A feed over loose cells.
    pub fn from_cells(cells: Vec<Cell>, scope: Context) -> Self {
        Self::new(&Series::new(cells), scope)
    }

    /// A feed over cells generated on demand.
    pub fn from_iter<I>(iter: I, scope: Context) -> Self
    where
        I: IntoIterator<Item = Cell>,
        I::IntoIter: 'static,
    {
        let mut source = Source::Generated {
            iter: Box::new(iter.into_iter()),
            buffer: VecDeque::new(),
        };
        source.prime();
        Self::with_source(source, scope)
    }

    /// A feed that is already at its end.
    pub fn empty(scope: Context) -> Self {
        Self::from_cells(Vec::new(), scope)
    }

    fn with_source(source: Source, scope: Context) -> Self {
        Self {
            levels: vec![Level { source, scope }],
            lookback: None,
            gotten: None,
            flags: FeedFlags::empty(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Peeking
    // ═══════════════════════════════════════════════════════════════════

    /// The `n`th upcoming cell (0 is the current one) with the scope its
    /// words resolve in, looking through spliced sequences.
    pub fn upcoming(&self, n: usize) -> Option<(&Cell, &Context)> {
        let mut n = n;
        for level in self.levels.iter().rev() {
            let available = level.source.buffered();
            if n < available {
                return level.source.get(n).map(|cell| (cell, &level.scope));
            }
            n -= available;
        }
        None
    }

    /// The current cell.
    pub fn current(&self) -> Option<&Cell> {
        self.upcoming(0).map(|(cell, _)| cell)
    }

    /// The cell after the current one.
    pub fn peek_after(&self) -> Option<&Cell> {
        self.upcoming(1).map(|(cell, _)| cell)
    }

    /// Whether the feed is exhausted.
    pub fn is_end(&self) -> bool {
        self.upcoming(0).is_none()
    }

    /// Scope of the sequence currently being read.
    pub fn scope(&self) -> &Context {
        match self.upcoming(0) {
            Some((_, scope)) => scope,
            None => &self.levels[0].scope,
        }
    }

    /// The cell most recently fetched.
    pub fn lookback(&self) -> Option<&Cell> {
        self.lookback.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Advancing
    // ═══════════════════════════════════════════════════════════════════

    /// Take the current cell and the scope it was found in.
    pub fn fetch(&mut self) -> Option<(Cell, Context)> {
        let level = self.levels.last_mut()?;
        let cell = level.source.take()?;
        let scope = level.scope.clone();
        self.lookback = Some(cell.clone());
        self.gotten = None;
        self.drop_finished();
        Some((cell, scope))
    }

    /// Run `series` before the rest of the input.
    pub fn splice(&mut self, series: &Series, scope: Context) {
        self.levels.push(Level {
            source: Source::Array {
                array: Rc::clone(series.array()),
                index: series.index(),
            },
            scope,
        });
        self.gotten = None;
        self.drop_finished();
    }

    fn drop_finished(&mut self) {
        while self.levels.len() > 1
            && self
                .levels
                .last()
                .is_some_and(|level| level.source.buffered() == 0)
        {
            self.levels.pop();
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookup Cache and Flags
    // ═══════════════════════════════════════════════════════════════════

    /// Cached lookup of the current word, if one has been made since the
    /// last fetch.
    pub fn gotten(&self) -> Option<&Cell> {
        self.gotten.as_ref()
    }

    /// Remember what the current word looks up to.
    pub fn set_gotten(&mut self, cell: Cell) {
        self.gotten = Some(cell);
    }

    /// Take the cached lookup, leaving none.
    pub fn take_gotten(&mut self) -> Option<Cell> {
        self.gotten.take()
    }

    /// Forget the cached lookup; arbitrary code may have changed variables.
    pub fn invalidate_gotten(&mut self) {
        self.gotten = None;
    }

    /// Whether a flag is set.
    pub fn has(&self, flag: FeedFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Set a flag.
    pub fn set(&mut self, flag: FeedFlags) {
        self.flags.insert(flag);
    }

    /// Clear a flag.
    pub fn clear(&mut self, flag: FeedFlags) {
        self.flags.remove(flag);
    }
}

impl fmt::Debug for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("current", &self.current())
            .field("depth", &self.levels.len())
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Cell> {
        values.iter().map(|i| Cell::integer(*i)).collect()
    }

    #[test]
    fn test_fetch_records_lookback() {
        let mut feed = Feed::from_cells(ints(&[1, 2]), Context::new(None));
        assert_eq!(feed.current(), Some(&Cell::integer(1)));
        assert_eq!(feed.peek_after(), Some(&Cell::integer(2)));
        feed.fetch();
        assert_eq!(feed.lookback(), Some(&Cell::integer(1)));
        feed.fetch();
        assert!(feed.is_end());
        assert!(feed.fetch().is_none());
    }

    #[test]
    fn test_splice_runs_first_then_resumes() {
        let mut feed = Feed::from_cells(ints(&[1, 4]), Context::new(None));
        feed.fetch();
        feed.splice(&Series::new(ints(&[2, 3])), Context::new(None));

        let mut seen = Vec::new();
        while let Some((cell, _)) = feed.fetch() {
            seen.push(cell.as_integer().unwrap());
        }
        assert_eq!(seen, vec![2, 3, 4]);
    }

    #[test]
    fn test_peek_after_crosses_splice_boundary() {
        let mut feed = Feed::from_cells(ints(&[9]), Context::new(None));
        feed.splice(&Series::new(ints(&[8])), Context::new(None));
        assert_eq!(feed.current(), Some(&Cell::integer(8)));
        assert_eq!(feed.peek_after(), Some(&Cell::integer(9)));
    }

    #[test]
    fn test_empty_splice_is_dropped() {
        let mut feed = Feed::from_cells(ints(&[1]), Context::new(None));
        feed.splice(&Series::new(vec![]), Context::new(None));
        assert_eq!(feed.current(), Some(&Cell::integer(1)));
    }

    #[test]
    fn test_generated_source() {
        let mut feed = Feed::from_iter((1..=3).map(Cell::integer), Context::new(None));
        assert_eq!(feed.peek_after(), Some(&Cell::integer(2)));
        let mut count = 0;
        while feed.fetch().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_generated_source_sees_as_far_as_an_array() {
        let cells = ints(&[1, 2, 3, 4]);
        let array = Feed::from_cells(cells.clone(), Context::new(None));
        let mut generated = Feed::from_iter(cells, Context::new(None));
        assert_eq!(generated.upcoming(2).map(|(c, _)| c), array.upcoming(2).map(|(c, _)| c));
        generated.fetch();
        assert_eq!(generated.upcoming(2).map(|(c, _)| c), Some(&Cell::integer(4)));
        generated.fetch();
        assert!(generated.upcoming(2).is_none());
    }

    #[test]
    fn test_fetch_clears_gotten() {
        let mut feed = Feed::from_cells(ints(&[1, 2]), Context::new(None));
        feed.set_gotten(Cell::integer(10));
        assert!(feed.gotten().is_some());
        feed.fetch();
        assert!(feed.gotten().is_none());
    }
}
