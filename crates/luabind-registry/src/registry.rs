//! The binding registry.
//!
//! One [`BindingRegistry`] is built at startup and shared by every worker
//! for the lifetime of the host. It owns the generic method index and one
//! [`MethodSupplier`] per binding family.

use std::fmt;
use std::sync::Arc;

use luabind_core::GenericSource;
use tracing::debug;

use crate::config::BindingConfig;
use crate::family::{LuaMethods, PeripheralMethods};
use crate::generic::GenericMethods;
use crate::supplier::MethodSupplier;

pub struct BindingRegistry {
    config: BindingConfig,
    generics: Arc<GenericMethods>,
    lua: MethodSupplier<LuaMethods>,
    peripheral: MethodSupplier<PeripheralMethods>,
}

impl BindingRegistry {
    /// A registry with default configuration and no generic sources.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> BindingRegistryBuilder {
        BindingRegistryBuilder::default()
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    pub fn generic_methods(&self) -> &GenericMethods {
        &self.generics
    }

    /// Methods for computer APIs and plain objects.
    pub fn lua_methods(&self) -> &MethodSupplier<LuaMethods> {
        &self.lua
    }

    /// Methods for peripherals.
    pub fn peripheral_methods(&self) -> &MethodSupplier<PeripheralMethods> {
        &self.peripheral
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("config", &self.config)
            .field("generic_methods", &self.generics.len())
            .field("lua", &self.lua)
            .field("peripheral", &self.peripheral)
            .finish()
    }
}

/// Collects configuration and generic sources for a [`BindingRegistry`].
#[derive(Default)]
pub struct BindingRegistryBuilder {
    config: BindingConfig,
    sources: Vec<Arc<dyn GenericSource>>,
}

impl BindingRegistryBuilder {
    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn generic_source(mut self, source: Arc<dyn GenericSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn generic_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn GenericSource>>,
    {
        self.sources.extend(sources);
        self
    }

    pub fn build(self) -> BindingRegistry {
        let generics = self
            .sources
            .into_iter()
            .fold(GenericMethods::builder(&self.config), |builder, source| {
                builder.register(source)
            })
            .build();
        debug!(
            target: "luabind::generic",
            methods = generics.len(),
            "registered generic methods"
        );

        let generics = Arc::new(generics);
        BindingRegistry {
            lua: MethodSupplier::new(Arc::clone(&generics)),
            peripheral: MethodSupplier::new(Arc::clone(&generics)),
            generics,
            config: self.config,
        }
    }
}
