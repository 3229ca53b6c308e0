//! Page slicing for ordered feeds
//!
//! Pure and stateless. Out-of-range page numbers clamp to the nearest valid
//! page instead of failing, matching list-view behaviour where a stale
//! `?page=` link should still render something.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// One page of an ordered result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served (after clamping)
    pub number: usize,
    pub page_size: usize,
    pub total_count: usize,
    /// Always at least 1, even for an empty sequence
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

/// Number of pages needed for `total_count` items
pub fn total_pages(total_count: usize, page_size: NonZeroUsize) -> usize {
    total_count.div_ceil(page_size.get()).max(1)
}

/// Slice `items` into the requested page.
pub fn paginate<T: Clone>(items: &[T], page_size: NonZeroUsize, page_number: i64) -> Page<T> {
    let total_count = items.len();
    let total_pages = total_pages(total_count, page_size);

    let number = usize::try_from(page_number.max(1))
        .unwrap_or(usize::MAX)
        .min(total_pages);

    let start = (number - 1) * page_size.get();
    let end = (start + page_size.get()).min(total_count);
    let slice = items.get(start..end).unwrap_or(&[]);

    Page {
        items: slice.to_vec(),
        number,
        page_size: page_size.get(),
        total_count,
        total_pages,
        has_next: number < total_pages,
        has_previous: number > 1,
    }
}
