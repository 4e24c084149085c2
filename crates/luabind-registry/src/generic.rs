//! Generic methods.
//!
//! A [`GenericSource`] is a stand-alone object whose methods take their
//! target as a parameter. [`GenericMethods`] indexes those methods by
//! target type once at startup; an object then gains every method whose
//! target type it is assignable to.

use std::any::TypeId;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{info, warn};

use luabind_core::{ClassDecl, GenericSource, LuaObject, MethodDecl, PeripheralType, TypeRef};

use crate::config::BindingConfig;

/// One method of a generic source.
#[derive(Debug)]
pub struct GenericMethod {
    source: Arc<dyn GenericSource>,
    source_id: Arc<str>,
    class: ClassDecl,
    decl: MethodDecl,
    target: TypeRef,
    tag: Option<PeripheralType>,
}

impl GenericMethod {
    pub fn source(&self) -> &Arc<dyn GenericSource> {
        &self.source
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The source's declaration.
    pub fn class(&self) -> &ClassDecl {
        &self.class
    }

    pub fn decl(&self) -> &MethodDecl {
        &self.decl
    }

    /// The type this method applies to.
    pub fn target(&self) -> TypeRef {
        self.target
    }

    /// The source's peripheral type, if it has one.
    pub fn tag(&self) -> Option<&PeripheralType> {
        self.tag.as_ref()
    }
}

/// Generic methods indexed by target type.
#[derive(Debug, Default)]
pub struct GenericMethods {
    /// Target types in first-registration order.
    targets: Vec<TypeRef>,
    by_target: FxHashMap<TypeId, Vec<Arc<GenericMethod>>>,
}

impl GenericMethods {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder(config: &BindingConfig) -> GenericMethodsBuilder<'_> {
        GenericMethodsBuilder {
            config,
            methods: GenericMethods::default(),
            names: FxHashMap::default(),
        }
    }

    /// Every method applicable to `object`, in registration order of its
    /// target type.
    pub fn matching(&self, object: &dyn LuaObject) -> Vec<Arc<GenericMethod>> {
        self.methods_for(&self.matching_targets(object)).cloned().collect()
    }

    /// Positions of the target types `object` is assignable to.
    ///
    /// Upcasts are decided per instance, so this is evaluated afresh for
    /// every object.
    pub fn matching_targets(&self, object: &dyn LuaObject) -> Vec<usize> {
        self.targets
            .iter()
            .enumerate()
            .filter(|(_, target)| object.assignable_to(target.id).is_some())
            .map(|(index, _)| index)
            .collect()
    }

    /// Methods of the target types at `targets`, as returned by
    /// [`matching_targets`](Self::matching_targets).
    pub fn methods_for<'a>(
        &'a self,
        targets: &'a [usize],
    ) -> impl Iterator<Item = &'a Arc<GenericMethod>> + 'a {
        targets
            .iter()
            .filter_map(move |&index| self.targets.get(index))
            .flat_map(move |target| self.for_target(target.id).iter())
    }

    pub fn len(&self) -> usize {
        self.by_target.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<GenericMethod>> {
        self.targets
            .iter()
            .flat_map(|target| self.for_target(target.id).iter())
    }

    fn for_target(&self, target: TypeId) -> &[Arc<GenericMethod>] {
        self.by_target
            .get(&target)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Collects generic sources into a [`GenericMethods`].
pub struct GenericMethodsBuilder<'a> {
    config: &'a BindingConfig,
    methods: GenericMethods,
    /// Source ids already exposing each `(target, name)`.
    names: FxHashMap<(TypeId, &'static str), FxHashSet<Arc<str>>>,
}

impl GenericMethodsBuilder<'_> {
    /// Add every generic method `source` declares.
    ///
    /// Sources disabled in the configuration are skipped. Methods that are
    /// not generic are skipped with a warning.
    pub fn register(mut self, source: Arc<dyn GenericSource>) -> Self {
        let id: Arc<str> = source.id().into();
        if self.config.is_generic_disabled(&id) {
            info!(
                target: "luabind::generic",
                source = %id,
                "generic source disabled by configuration"
            );
            return self;
        }

        let class = source.class();
        let tag = source.peripheral_type();
        for decl in class.methods() {
            let Some(target) = decl.generic_target() else {
                warn!(
                    target: "luabind::generic",
                    source = %id,
                    method = decl.name(),
                    "method of a generic source is not generic. Skipping."
                );
                continue;
            };

            for &name in decl.exposed_names() {
                let owners = self.names.entry((target.id, name)).or_default();
                if owners.iter().any(|owner| *owner != id) {
                    warn!(
                        target: "luabind::generic",
                        source = %id,
                        method = name,
                        target_type = %target,
                        "generic method name is already provided by another source"
                    );
                }
                owners.insert(Arc::clone(&id));
            }

            if !self.methods.by_target.contains_key(&target.id) {
                self.methods.targets.push(target);
            }
            self.methods
                .by_target
                .entry(target.id)
                .or_default()
                .push(Arc::new(GenericMethod {
                    source: Arc::clone(&source),
                    source_id: Arc::clone(&id),
                    class: class.clone(),
                    decl: decl.clone(),
                    target,
                    tag: tag.clone(),
                }));
        }
        self
    }

    pub fn build(self) -> GenericMethods {
        self.methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Chest;

    impl LuaObject for Chest {}

    struct Barrel {
        chest: Chest,
    }

    impl LuaObject for Barrel {
        fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
            (target == TypeId::of::<Chest>()).then_some(&self.chest as &dyn Any)
        }
    }

    struct Furnace;

    impl LuaObject for Furnace {}

    struct Inventory;

    impl Inventory {
        fn size(&self, _target: &Chest) -> i32 {
            27
        }

        fn stray(&self) -> i32 {
            0
        }
    }

    impl GenericSource for Inventory {
        fn id(&self) -> &str {
            "inventory"
        }

        fn peripheral_type(&self) -> Option<PeripheralType> {
            Some(PeripheralType::of_additional("inventory"))
        }

        fn class(&self) -> ClassDecl {
            ClassDecl::of::<Inventory>()
                .declare(MethodDecl::generic("size", Inventory::size))
                .declare(MethodDecl::method("stray", Inventory::stray))
        }
    }

    struct OtherInventory;

    impl OtherInventory {
        fn size(&self, _target: &Chest) -> i32 {
            54
        }
    }

    impl GenericSource for OtherInventory {
        fn id(&self) -> &str {
            "other_inventory"
        }

        fn class(&self) -> ClassDecl {
            ClassDecl::of::<OtherInventory>()
                .declare(MethodDecl::generic("size", OtherInventory::size))
        }
    }

    #[test]
    fn methods_are_indexed_by_target() {
        let config = BindingConfig::new();
        let methods = GenericMethods::builder(&config)
            .register(Arc::new(Inventory))
            .build();
        assert_eq!(methods.len(), 1);

        let matched = methods.matching(&Chest);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].source_id(), "inventory");
        assert_eq!(
            matched[0].tag(),
            Some(&PeripheralType::of_additional("inventory"))
        );
        assert!(methods.matching(&Furnace).is_empty());
    }

    #[test]
    fn upcasts_count_as_assignable() {
        let config = BindingConfig::new();
        let methods = GenericMethods::builder(&config)
            .register(Arc::new(Inventory))
            .build();
        assert_eq!(methods.matching(&Barrel { chest: Chest }).len(), 1);
    }

    struct Cart {
        chest: Option<Chest>,
    }

    impl LuaObject for Cart {
        fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
            if target == TypeId::of::<Chest>() {
                self.chest.as_ref().map(|chest| chest as &dyn Any)
            } else {
                None
            }
        }
    }

    #[test]
    fn targets_are_matched_per_instance() {
        let config = BindingConfig::new();
        let methods = GenericMethods::builder(&config)
            .register(Arc::new(Inventory))
            .build();
        assert!(methods.matching_targets(&Cart { chest: None }).is_empty());
        let loaded = Cart { chest: Some(Chest) };
        assert_eq!(methods.matching_targets(&loaded), [0]);
        assert_eq!(methods.methods_for(&[0]).count(), 1);
    }

    #[test]
    fn disabled_sources_are_skipped() {
        let config = BindingConfig::new().disable_generic_methods("inventory");
        let methods = GenericMethods::builder(&config)
            .register(Arc::new(Inventory))
            .build();
        assert!(methods.is_empty());
    }

    #[test]
    fn same_named_methods_from_two_sources_are_both_kept() {
        let config = BindingConfig::new();
        let methods = GenericMethods::builder(&config)
            .register(Arc::new(Inventory))
            .register(Arc::new(OtherInventory))
            .build();
        let ids: Vec<_> = methods
            .matching(&Chest)
            .iter()
            .map(|m| m.source_id().to_owned())
            .collect();
        assert_eq!(ids, ["inventory", "other_inventory"]);
    }
}
