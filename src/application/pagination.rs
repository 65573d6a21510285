//! Page-number pagination for post listings.
//!
//! Requested page numbers never fail: anything unparsable selects the first
//! page and out-of-range numbers clamp to the nearest page that exists. An
//! empty collection still has a single, empty page.

use std::num::{IntErrorKind, NonZeroU32};

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pages shown on each side of the current one before eliding.
const NEIGHBOURS: u64 = 2;

/// The `?page=` query parameter, kept raw so bad input can be recovered from.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParam {
    pub page: Option<String>,
}

impl PageParam {
    pub fn requested(&self) -> u64 {
        parse_page_number(self.page.as_deref())
    }
}

/// Interpret a raw page parameter as a 1-based page number.
pub fn parse_page_number(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return 1;
    };

    match raw.parse::<i64>() {
        Ok(number) if number >= 1 => number as u64,
        Ok(_) => 1,
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => u64::MAX,
            _ => 1,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: NonZeroU32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            per_page: NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl Paginator {
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.get()
    }

    /// Resolve `requested` against a collection of `total` items.
    pub fn window(&self, total: u64, requested: u64) -> PageWindow {
        let per_page = u64::from(self.per_page.get());
        let num_pages = total.div_ceil(per_page).max(1);
        let number = requested.clamp(1, num_pages);
        PageWindow {
            number,
            num_pages,
            total,
            per_page,
        }
    }

    /// Slice an already materialised collection.
    pub fn paginate<T>(&self, items: Vec<T>, requested: u64) -> Page<T> {
        let window = self.window(items.len() as u64, requested);
        let items = items
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .collect();
        Page::new(items, window)
    }
}

/// Position of one page within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub per_page: u64,
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Number { number: u64, current: bool },
    Gap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }

    pub fn number(&self) -> u64 {
        self.window.number
    }

    pub fn num_pages(&self) -> u64 {
        self.window.num_pages
    }

    pub fn total(&self) -> u64 {
        self.window.total
    }

    pub fn has_next(&self) -> bool {
        self.window.number < self.window.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.window.number > 1
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.window.number + 1)
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.window.number - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }

    /// Page links for a paginator bar: first, last and the neighbourhood of
    /// the current page, with gaps elided.
    pub fn slots(&self) -> Vec<PageSlot> {
        let current = self.window.number;
        let last = self.window.num_pages;
        let low = current.saturating_sub(NEIGHBOURS).max(1);
        let high = current.saturating_add(NEIGHBOURS).min(last);

        let mut slots = Vec::new();
        if low > 1 {
            slots.push(PageSlot::Number {
                number: 1,
                current: false,
            });
            if low > 2 {
                slots.push(PageSlot::Gap);
            }
        }
        for number in low..=high {
            slots.push(PageSlot::Number {
                number,
                current: number == current,
            });
        }
        if high < last {
            if high + 1 < last {
                slots.push(PageSlot::Gap);
            }
            slots.push(PageSlot::Number {
                number: last,
                current: false,
            });
        }
        slots
    }
}
