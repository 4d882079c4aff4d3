use std::num::NonZeroUsize;

/// Client-side pagination over an owned list. Pages are 1-based and
/// `next`/`prev` wrap around instead of stopping at the ends.
#[derive(Debug, Clone)]
pub struct Pager<T> {
    items: Vec<T>,
    page_size: NonZeroUsize,
    current: usize,
}

impl<T> Pager<T> {
    pub fn new(items: Vec<T>, page_size: NonZeroUsize) -> Self {
        Self {
            items,
            page_size,
            current: 1,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    /// `0` for an empty list.
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size.get())
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    /// Items `[(n-1)*size, n*size)`, clipped to the list; empty when out of range.
    pub fn page(&self, n: usize) -> &[T] {
        let size = self.page_size.get();
        let Some(start) = n.checked_sub(1).and_then(|index| index.checked_mul(size)) else {
            return &[];
        };
        if start >= self.items.len() {
            return &[];
        }
        let end = start.saturating_add(size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn current(&self) -> &[T] {
        self.page(self.current)
    }

    pub fn next(&mut self) -> &[T] {
        let total = self.total_pages();
        self.current = if total == 0 || self.current >= total {
            1
        } else {
            self.current + 1
        };
        self.current()
    }

    pub fn prev(&mut self) -> &[T] {
        let total = self.total_pages();
        self.current = if total == 0 {
            1
        } else if self.current > 1 {
            self.current - 1
        } else {
            total
        };
        self.current()
    }

    /// Jumps to page `n`, clamped into the valid range.
    pub fn go_to(&mut self, n: usize) -> &[T] {
        self.current = n.clamp(1, self.total_pages().max(1));
        self.current()
    }
}

#[cfg(test)]
#[path = "tests/pager_tests.rs"]
mod tests;
