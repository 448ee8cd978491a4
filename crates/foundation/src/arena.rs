use crate::handles::Handle;

/// Append-only arena keyed by [`Handle`].
///
/// Nothing is ever freed, so every handle stays at generation 0. The
/// generation is still checked on lookup so handles minted by a different
/// arena generation scheme never alias.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, v: T) -> Handle {
        self.items.push(v);
        Handle::new((self.items.len() - 1) as u32, 0)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        if handle.generation() != 0 {
            return None;
        }
        self.items.get(handle.index() as usize)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if handle.generation() != 0 {
            return None;
        }
        self.items.get_mut(handle.index() as usize)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates `(handle, item)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, item)| (Handle::new(idx as u32, 0), item))
    }
}
