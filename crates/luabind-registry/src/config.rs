//! Registry configuration.

use rustc_hash::FxHashSet;

/// Settings applied when the registry is built.
///
/// Loading these from a file is left to the host; this is the in-memory
/// form.
#[derive(Debug, Clone, Default)]
pub struct BindingConfig {
    disabled_generic_methods: FxHashSet<String>,
}

impl BindingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude the generic source with id `id` at registration.
    pub fn disable_generic_methods(mut self, id: impl Into<String>) -> Self {
        self.disabled_generic_methods.insert(id.into());
        self
    }

    pub fn with_disabled_generic_methods<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_generic_methods
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn is_generic_disabled(&self, id: &str) -> bool {
        self.disabled_generic_methods.contains(id)
    }

    pub fn disabled_generic_methods(&self) -> impl Iterator<Item = &str> {
        self.disabled_generic_methods.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_ids_accumulate() {
        let config = BindingConfig::new()
            .disable_generic_methods("inventory")
            .with_disabled_generic_methods(["fluid_storage", "energy_storage"]);
        assert!(config.is_generic_disabled("inventory"));
        assert!(config.is_generic_disabled("fluid_storage"));
        assert!(!config.is_generic_disabled("computer"));
        assert_eq!(config.disabled_generic_methods().count(), 3);
    }
}
