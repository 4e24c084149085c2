//! Binding generation, caching and per-object method dispatch.
//!
//! The entry point is [`BindingRegistry`]. It validates host declarations
//! into descriptors, composes argument extractors with the host function
//! into [`Binding`]s, caches them per type and enumerates the methods of an
//! object through a [`MethodSupplier`].
//!
//! ```ignore
//! let registry = BindingRegistry::builder()
//!     .generic_source(Arc::new(InventoryMethods))
//!     .build();
//!
//! let methods = registry.peripheral_methods().collect_methods(&chest);
//! let result = methods["size"].call(&context, &arguments)?;
//! ```

pub mod config;
pub mod descriptor;
pub mod family;
pub mod generator;
pub mod generic;
pub mod int_cache;
pub mod main_thread;
pub mod marshal;
pub mod registry;
pub mod supplier;

pub use config::BindingConfig;
pub use descriptor::{DescriptorError, MethodDescriptor, Receiver};
pub use family::{
    ContextValues, LuaCtx, LuaMethod, LuaMethods, MethodFamily, PeripheralCtx, PeripheralMethod,
    PeripheralMethods,
};
pub use generator::{Binding, Generator};
pub use generic::{GenericMethod, GenericMethods, GenericMethodsBuilder};
pub use int_cache::IntCache;
pub use main_thread::{IntegrityError, MainThread, MainThreadContext, MainThreadHandle};
pub use marshal::{Coerce, ParamSpec};
pub use registry::{BindingRegistry, BindingRegistryBuilder};
pub use supplier::{BoundMethod, MethodSupplier, NamedMethod};
