//! One-shot load state for request field groups.

/// Load state of a lazily fetched field group.
///
/// Both variants carry the group's storage: values set by the transport
/// before the first read live in `Pending` and are merged with whatever the
/// connection supplies when the group is loaded. There is no way back from
/// `Loaded`, so a group is fetched at most once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Not fetched yet. Holds locally set values.
    Pending(T),
    /// Fetched. Further reads never hit the connection.
    Loaded(T),
}

impl<T> LoadState<T> {
    /// Returns `true` once the group has been loaded.
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    /// Current storage, whatever the state.
    pub fn get(&self) -> &T {
        match self {
            LoadState::Pending(value) | LoadState::Loaded(value) => value,
        }
    }

    /// Mutable storage, whatever the state. Does not trigger a load.
    pub fn get_mut(&mut self) -> &mut T {
        match self {
            LoadState::Pending(value) | LoadState::Loaded(value) => value,
        }
    }

    /// Runs `load` over the pending storage, at most once for the lifetime
    /// of this state, and returns the loaded value.
    pub fn load_with<F>(&mut self, load: F) -> &mut T
    where
        T: Default,
        F: FnOnce(&mut T),
    {
        if let LoadState::Pending(value) = self {
            let mut value = std::mem::take(value);
            load(&mut value);
            *self = LoadState::Loaded(value);
        }

        self.get_mut()
    }

    /// Consumes the state, returning the storage.
    pub fn into_inner(self) -> T {
        match self {
            LoadState::Pending(value) | LoadState::Loaded(value) => value,
        }
    }
}

impl<T: Default> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Pending(T::default())
    }
}
