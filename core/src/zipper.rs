use crate::error::CoreErr;
use crate::error::Result;

/// Circular list with one focused element. Navigation wraps in both
/// directions and never changes the order of the elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zipper<T> {
    items: Vec<T>,
    focus: usize,
}

#[allow(clippy::len_without_is_empty)]
impl<T> Zipper<T> {
    /// Focus starts on the first element.
    pub fn new(items: Vec<T>) -> Result<Self> {
        if items.is_empty() {
            return Err(CoreErr::EmptyZipper);
        }
        Ok(Self { items, focus: 0 })
    }

    pub fn focus(&self) -> &T {
        &self.items[self.focus]
    }

    pub fn position(&self) -> usize {
        self.focus
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn right(&mut self) {
        self.focus = (self.focus + 1) % self.items.len();
    }

    pub fn left(&mut self) {
        let len = self.items.len();
        self.focus = (self.focus + len - 1) % len;
    }

    /// Move focus to the nearest element satisfying `pred`, starting with the
    /// focused element and scanning rightward with wraparound. Focus is left
    /// alone when nothing matches. Returns whether a match was found.
    pub fn find_right<P>(&mut self, mut pred: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        let len = self.items.len();
        let found = (0..len)
            .map(|step| (self.focus + step) % len)
            .find(|&idx| pred(&self.items[idx]));
        match found {
            Some(idx) => {
                self.focus = idx;
                true
            }
            None => false,
        }
    }

    /// Elements in ring order, starting from index 0 (not from the focus).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: PartialEq> Zipper<T> {
    /// Replace the ring contents. Focus stays on the same element when it is
    /// still present, otherwise it moves to the first element.
    pub fn update_list(&mut self, items: Vec<T>) -> Result<()> {
        if items.is_empty() {
            return Err(CoreErr::EmptyZipper);
        }
        let current = self.focus();
        let focus = items.iter().position(|item| item == current).unwrap_or(0);
        self.items = items;
        self.focus = focus;
        Ok(())
    }
}
