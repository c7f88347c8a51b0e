//! Filter lists.
//!
//! A [`FilterList`] is an ordered pipeline of filters that stays folded:
//! adding a filter that merges with the last one replaces the last one by
//! the merged result, and a merge that cancels out removes it entirely.
//!
//! # Example
//!
//! ```rust
//! use pixfx_ops::{FilterList, Transformer, brightness, transform};
//!
//! let mut list = FilterList::new();
//! list.add(brightness(30.0));
//! list.add(brightness(-30.0));
//! assert!(list.is_empty());
//!
//! list.add(transform(Transformer::Rotate90));
//! list.add(transform(Transformer::Rotate90));
//! assert_eq!(list.len(), 1);
//! ```

use pixfx_core::{Parallelism, PixelBuffer, PixelLayout, PixelSource, Rect};
use tracing::{debug, trace};

use crate::filter::Filter;

/// Ordered, maximally folded sequence of filters.
#[derive(Debug, Clone, Default)]
pub struct FilterList {
    filters: Vec<Filter>,
}

impl FilterList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Appends `filter`, merging it into the last filter when possible.
    ///
    /// `None` is ignored, so neutral constructors can be passed directly.
    pub fn add(&mut self, filter: impl Into<Option<Filter>>) {
        let Some(filter) = filter.into() else {
            return;
        };
        if let Some(last) = self.filters.pop() {
            match last.merge(&filter) {
                Ok(merged) if merged.skip() => {
                    debug!(kind = filter.kind(), "merged filter is a no-op, dropped");
                    return;
                }
                Ok(merged) => {
                    debug!(kind = filter.kind(), "filter merged into last");
                    self.filters.push(merged);
                    return;
                }
                Err(last) => self.filters.push(last),
            }
        }
        self.filters.push(filter);
    }

    /// Removes a previously added `filter` from the last element.
    ///
    /// The last element is dropped when nothing is left of it. A
    /// non-merging last element is popped as a whole; a merging one that
    /// cannot undo `filter` stays as it is.
    pub fn undo(&mut self, filter: &Filter) {
        let Some(last) = self.filters.pop() else {
            return;
        };
        match last.undo(filter) {
            Ok(Some(rest)) => self.filters.push(rest),
            Ok(None) => debug!(kind = filter.kind(), "undo emptied last filter, dropped"),
            Err(last) if last.is_merging() => {
                debug!(kind = last.kind(), other = filter.kind(), "last filter cannot undo, kept");
                self.filters.push(last);
            }
            Err(last) => debug!(kind = last.kind(), "last filter is not merging, popped"),
        }
    }

    /// Output rectangle for an input rectangle.
    pub fn bounds(&self, src: Rect) -> Rect {
        self.active().fold(src, |r, f| f.bounds(r))
    }

    /// Runs the pipeline from `src` into `dst`.
    ///
    /// `dst` should be sized by [`bounds`](Self::bounds).
    pub fn apply(&self, dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
        let stages: Vec<&Filter> = self.active().collect();
        run_stages(&stages, dst, src, par);
    }

    /// Removes every filter.
    pub fn clear(&mut self) {
        self.filters.clear();
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// `true` when the list holds no filter.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filters in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    fn active(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| !f.skip())
    }
}

impl Extend<Filter> for FilterList {
    fn extend<I: IntoIterator<Item = Filter>>(&mut self, iter: I) {
        iter.into_iter().for_each(|f| self.add(f));
    }
}

impl FromIterator<Filter> for FilterList {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<'a> IntoIterator for &'a FilterList {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

/// Runs `stages` in order. Intermediate results live in `RgbaF32`
/// buffers sized by each stage's bounds; the last stage writes `dst`.
pub(crate) fn run_stages(stages: &[&Filter], dst: &mut PixelBuffer, src: &dyn PixelSource, par: Parallelism) {
    trace!(stages = stages.len(), width = dst.width(), height = dst.height(), "run_stages");
    let Some((last, head)) = stages.split_last() else {
        dst.copy_from(src, par);
        return;
    };
    let mut current: Option<PixelBuffer> = None;
    for stage in head {
        let input: &dyn PixelSource = match &current {
            Some(buf) => buf,
            None => src,
        };
        let mut next = PixelBuffer::new(PixelLayout::RgbaF32, stage.bounds(input.bounds()));
        stage.apply(&mut next, input, par);
        current = Some(next);
    }
    let input: &dyn PixelSource = match &current {
        Some(buf) => buf,
        None => src,
    };
    last.apply(dst, input, par);
}
