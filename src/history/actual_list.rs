use std::sync::{Mutex, MutexGuard, PoisonError};

/// A sequence of snapshots with one "actual" cursor.
///
/// The elements and the cursor live behind a single lock, so every operation
/// (including compound reads like [`ActualList::actual`]) is atomic. The cursor
/// stays inside `[0, len - 1]` whenever the list is non-empty.
#[derive(Debug)]
pub struct ActualList<T> {
    inner: Mutex<Inner<T>>,
}

#[derive(Debug)]
struct Inner<T> {
    objects: Vec<T>,
    cursor: usize,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            cursor: 0,
        }
    }
}

impl<T> Inner<T> {
    fn last_index(&self) -> usize {
        self.objects.len().saturating_sub(1)
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.last_index());
    }
}

impl<T: Clone> ActualList<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn seeded(item: T) -> Self {
        Self::from_parts(vec![item], 0)
    }

    /// Rebuild a list from stored elements; the cursor is clamped into range.
    pub fn from_parts(objects: Vec<T>, cursor: usize) -> Self {
        let mut inner = Inner { objects, cursor };
        inner.clamp_cursor();
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add at the end and move the cursor onto it.
    pub fn append(&self, item: T) {
        let mut inner = self.lock();
        inner.objects.push(item);
        inner.cursor = inner.objects.len() - 1;
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.lock().objects.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    pub fn actual_pos(&self) -> usize {
        self.lock().cursor
    }

    /// The element at the cursor.
    pub fn actual(&self) -> Option<T> {
        let inner = self.lock();
        inner.objects.get(inner.cursor).cloned()
    }

    /// Run `f` on the element at the cursor without cloning it.
    pub fn with_actual<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let inner = self.lock();
        inner.objects.get(inner.cursor).map(f)
    }

    pub fn first(&self) -> Option<T> {
        self.lock().objects.first().cloned()
    }

    pub fn last(&self) -> Option<T> {
        self.lock().objects.last().cloned()
    }

    /// Clamp `pos` into range and move the cursor there.
    ///
    /// Returns how many more elements must be appended before `pos` exists,
    /// i.e. `max(0, pos - (len - 1))`. An empty list needs `pos + 1`.
    pub fn set_cursor(&self, pos: usize) -> usize {
        let mut inner = self.lock();
        if inner.objects.is_empty() {
            return pos + 1;
        }
        let last = inner.last_index();
        inner.cursor = pos.min(last);
        pos.saturating_sub(last)
    }

    /// Move the cursor by `delta`, saturating at both ends. Returns the new position.
    pub fn shift_cursor(&self, delta: i64) -> usize {
        let mut inner = self.lock();
        let last = inner.last_index() as i64;
        let target = (inner.cursor as i64).saturating_add(delta).clamp(0, last);
        inner.cursor = target as usize;
        inner.cursor
    }

    /// Returns whether the cursor moved.
    pub fn step_forward(&self) -> bool {
        let mut inner = self.lock();
        if inner.cursor < inner.last_index() {
            inner.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Returns whether the cursor moved.
    pub fn step_back(&self) -> bool {
        let mut inner = self.lock();
        if inner.cursor > 0 {
            inner.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn move_to_start(&self) {
        self.lock().cursor = 0;
    }

    pub fn move_to_end(&self) {
        let mut inner = self.lock();
        inner.cursor = inner.last_index();
    }

    /// Discard everything after the cursor.
    ///
    /// Returns true when something was discarded: history diverged and whoever
    /// holds live state must resynchronize it with [`ActualList::actual`].
    pub fn truncate_from_cursor(&self) -> bool {
        let mut inner = self.lock();
        if inner.objects.is_empty() || inner.cursor >= inner.last_index() {
            return false;
        }
        let keep = inner.cursor + 1;
        inner.objects.truncate(keep);
        true
    }

    /// Overwrite the element at the cursor. Appends when the list is empty.
    pub fn replace_actual(&self, item: T) {
        let mut inner = self.lock();
        let cursor = inner.cursor;
        if cursor < inner.objects.len() {
            inner.objects[cursor] = item;
        } else {
            inner.objects.push(item);
            inner.cursor = 0;
        }
    }

    /// Clear and seed with a single element.
    pub fn reset(&self, item: T) {
        let mut inner = self.lock();
        inner.objects.clear();
        inner.objects.push(item);
        inner.cursor = 0;
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.objects.clear();
        inner.cursor = 0;
    }

    pub fn pop_front(&self) -> Option<T> {
        let mut inner = self.lock();
        if inner.objects.is_empty() {
            return None;
        }
        let item = inner.objects.remove(0);
        inner.cursor = inner.cursor.saturating_sub(1);
        Some(item)
    }

    pub fn pop_back(&self) -> Option<T> {
        let mut inner = self.lock();
        let item = inner.objects.pop();
        inner.clamp_cursor();
        item
    }

    /// Keep only elements matching `keep`; the cursor moves to the last survivor.
    ///
    /// Refuses (returning false) when nothing would survive, so a non-empty list
    /// never becomes empty this way.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> bool {
        let mut inner = self.lock();
        let mask: Vec<bool> = inner.objects.iter().map(&mut keep).collect();
        if !mask.contains(&true) {
            return false;
        }
        let mut flags = mask.into_iter();
        inner.objects.retain(|_| flags.next().unwrap_or(false));
        inner.cursor = inner.last_index();
        true
    }

    /// Append a copy of the last element. Does nothing on an empty list.
    pub fn duplicate_last(&self) {
        let mut inner = self.lock();
        if let Some(last) = inner.objects.last().cloned() {
            inner.objects.push(last);
            inner.cursor = inner.objects.len() - 1;
        }
    }

    /// Swap in a whole new sequence; the cursor is clamped into range.
    pub fn replace_all(&self, objects: Vec<T>, cursor: usize) {
        let mut inner = self.lock();
        inner.objects = objects;
        inner.cursor = cursor;
        inner.clamp_cursor();
    }

    /// All elements and the cursor, read under one lock.
    pub fn to_vec(&self) -> (Vec<T>, usize) {
        let inner = self.lock();
        (inner.objects.clone(), inner.cursor)
    }
}
