//! Fixed-size pages over an ordered sample list.
//!
//! [`PageState`] is a plain value: every transition returns a new state that
//! is already clamped to `1..=total_pages`, so a caller holding one can never
//! point past the end, even right after switching to a shorter language.

use serde::Serialize;
use std::num::NonZeroUsize;

/// Number of pages needed for `total_items`; an empty list still has one page
pub fn total_pages(total_items: usize, page_size: NonZeroUsize) -> usize {
    total_items.div_ceil(page_size.get()).max(1)
}

/// Pull `page` into `1..=total_pages`
pub fn clamp(page: usize, total_pages: usize) -> usize {
    page.max(1).min(total_pages.max(1))
}

/// Items on `page`, clamping first so no index can be out of range
pub fn slice<T>(items: &[T], page: usize, page_size: NonZeroUsize) -> &[T] {
    let page = clamp(page, total_pages(items.len(), page_size));
    let start = ((page - 1) * page_size.get()).min(items.len());
    let end = (start + page_size.get()).min(items.len());
    &items[start..end]
}

/// Position within a paginated list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageState {
    page_size: NonZeroUsize,
    total_items: usize,
    current_page: usize,
}

impl PageState {
    /// Start at `page`, clamped to the pages `total_items` yields
    pub fn new(page_size: NonZeroUsize, total_items: usize, page: usize) -> Self {
        Self {
            page_size,
            total_items,
            current_page: clamp(page, total_pages(total_items, page_size)),
        }
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_items, self.page_size)
    }

    pub fn first(self) -> Self {
        self.goto(1)
    }

    pub fn prev(self) -> Self {
        self.goto(self.current_page.saturating_sub(1))
    }

    pub fn next(self) -> Self {
        self.goto(self.current_page.saturating_add(1))
    }

    pub fn last(self) -> Self {
        self.goto(self.total_pages())
    }

    /// Jump to `page`, clamped
    pub fn goto(self, page: usize) -> Self {
        Self::new(self.page_size, self.total_items, page)
    }

    /// Same position against a list of a different length
    pub fn with_total_items(self, total_items: usize) -> Self {
        Self::new(self.page_size, total_items, self.current_page)
    }

    /// Same page number with a different page size
    pub fn with_page_size(self, page_size: NonZeroUsize) -> Self {
        Self::new(page_size, self.total_items, self.current_page)
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Items of `items` on the current page
    ///
    /// `items` is the list this state was computed for; a list of another
    /// length is re-clamped rather than indexed blindly.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        slice(items, self.current_page, self.page_size)
    }
}

/// One page cut out of a list, with the numbers a pager needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Cut `requested_page` out of `items`; the page number is clamped, never trusted
pub fn paginate<T: Clone>(items: &[T], requested_page: usize, page_size: NonZeroUsize) -> Page<T> {
    let state = PageState::new(page_size, items.len(), requested_page);

    Page {
        items: state.slice(items).to_vec(),
        page: state.current_page(),
        page_size: page_size.get(),
        total_pages: state.total_pages(),
        total_items: items.len(),
        has_prev: state.has_prev(),
        has_next: state.has_next(),
    }
}
