//! Case-insensitively named collections (templates, flows).

use serde::{Deserialize, Serialize};

/// Items that carry a user-facing name.
pub trait Named {
    /// The item's name.
    fn name(&self) -> &str;
}

/// An insertion-ordered collection keyed by case-insensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedSet<T> {
    items: Vec<T>,
}

impl<T> Default for NamedSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Named> NamedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks an item up by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.items
            .iter()
            .find(|item| item.name().eq_ignore_ascii_case(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.items
            .iter_mut()
            .find(|item| item.name().eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts an item, replacing (in place) any item with the same name.
    ///
    /// Returns the replaced item.
    pub fn insert(&mut self, item: T) -> Option<T> {
        match self.get_mut(item.name()) {
            Some(existing) => Some(std::mem::replace(existing, item)),
            None => {
                self.items.push(item);
                None
            }
        }
    }

    /// Removes the item called `name`.
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let index = self
            .items
            .iter()
            .position(|item| item.name().eq_ignore_ascii_case(name))?;
        Some(self.items.remove(index))
    }

    /// Names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(Named::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Named> FromIterator<T> for NamedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = NamedSet::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}
