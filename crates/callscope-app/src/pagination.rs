// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page cursor plus server-reported totals. `page` always stays within
/// `1..=max(1, total_pages)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page: u32,
    page_size: u32,
    total_records: u64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_records: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn total_pages(&self) -> u64 {
        self.total_records.div_ceil(u64::from(self.page_size))
    }

    pub fn last_page(&self) -> u32 {
        u32::try_from(self.total_pages().max(1)).unwrap_or(u32::MAX)
    }

    /// Returns whether the page changed.
    pub fn go_to(&mut self, page: u32) -> bool {
        let target = page.clamp(1, self.last_page());
        let changed = target != self.page;
        self.page = target;
        changed
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.page.saturating_add(1))
    }

    pub fn prev(&mut self) -> bool {
        self.go_to(self.page.saturating_sub(1))
    }

    pub fn reset(&mut self) -> bool {
        let changed = self.page != 1;
        self.page = 1;
        changed
    }

    /// Records new server totals; returns whether the page had to be clamped.
    pub fn set_total_records(&mut self, total_records: u64) -> bool {
        self.total_records = total_records;
        let last = self.last_page();
        if self.page > last {
            self.page = last;
            return true;
        }
        false
    }

    /// One-based inclusive bounds of the visible rows, `(0, 0)` when empty.
    pub fn window(&self) -> (u64, u64) {
        if self.total_records == 0 {
            return (0, 0);
        }
        let size = u64::from(self.page_size);
        let first = u64::from(self.page - 1) * size + 1;
        let last = (u64::from(self.page) * size).min(self.total_records);
        (first.min(last), last)
    }

    pub fn window_label(&self) -> String {
        let (first, last) = self.window();
        format!("showing {first}–{last} of {}", self.total_records)
    }
}
