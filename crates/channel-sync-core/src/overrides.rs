use anyhow::Result;
use channel_sync_config::SettingsStore;
use tracing::{debug, warn};

/// Temporarily overrides settings keys and puts the previous values back.
///
/// Each [`set`](Self::set) records the value it replaces. Restoration runs in
/// reverse order, exactly once: through [`restore`](Self::restore), or on drop
/// (including unwinding) when `restore` was never called. Keys that did not
/// exist before are removed again.
pub struct ScopedOverrides<'a> {
    store: &'a mut dyn SettingsStore,
    saved: Vec<(String, Option<toml::Value>)>,
}

impl<'a> ScopedOverrides<'a> {
    pub fn new(store: &'a mut dyn SettingsStore) -> Self {
        Self {
            store,
            saved: Vec::new(),
        }
    }

    /// Apply every override in order. If one fails, those already applied are restored.
    pub fn apply<I>(store: &'a mut dyn SettingsStore, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, toml::Value)>,
    {
        let mut scope = Self::new(store);
        for (key, value) in overrides {
            scope.set(&key, value)?;
        }
        Ok(scope)
    }

    pub fn set(&mut self, key: &str, value: toml::Value) -> Result<()> {
        let previous = self.store.load_key(key);
        self.store.update_key(key, Some(value))?;
        debug!(key, "Settings override applied");
        self.saved.push((key.to_string(), previous));
        Ok(())
    }

    /// Number of overrides currently in effect.
    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    /// The underlying store, for reads or for nesting another scope.
    pub fn store(&mut self) -> &mut dyn SettingsStore {
        &mut *self.store
    }

    /// Restore every override now. All keys are attempted; the first error is returned.
    pub fn restore(mut self) -> Result<()> {
        self.restore_all()
    }

    fn restore_all(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some((key, previous)) = self.saved.pop() {
            match self.store.update_key(&key, previous) {
                Ok(()) => debug!(key = %key, "Settings override restored"),
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to restore settings key");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for ScopedOverrides<'_> {
    fn drop(&mut self) {
        if !self.saved.is_empty() {
            let _ = self.restore_all();
        }
    }
}
