use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::thread::{self, ThreadId};

use uuid::Uuid;

use crate::definitions::{Capability, Definition, DefinitionRegistry, ObjectScope, Supplier};
use crate::errors::{ContextError, ContextResult};
use crate::extensions::{Extension, ExtensionKind, Interceptor};
use crate::factory::{Instance, Object, SourceInstance};

/// Builds and caches objects from the definitions of a registry
///
/// Creation runs every registered interceptor, in registration order, around each
/// new instance. Interceptors registered later only see objects created later.
#[derive(Debug)]
pub struct ObjectFactory {
    /// Unique identity, used by the processed-phase guards
    id: Uuid,
    /// Definitions this factory instantiates
    registry: Arc<DefinitionRegistry>,
    /// Finished singleton instances
    singletons: RwLock<HashMap<String, Instance>>,
    /// Names whose construction is in progress, with the thread building each
    in_creation: Mutex<HashMap<String, ThreadId>>,
    /// Signalled whenever a name leaves `in_creation`
    creation_finished: Condvar,
    /// Interceptor chain in registration order
    interceptors: RwLock<Vec<Interceptor>>,
}

/// Marks a name as in creation until dropped
#[derive(Debug)]
pub struct CreationGuard<'a> {
    factory: &'a ObjectFactory,
    name: String,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_creation) = self.factory.in_creation.lock() {
            in_creation.remove(&self.name);
        }
        self.factory.creation_finished.notify_all();
    }
}

impl ObjectFactory {
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
            singletons: RwLock::new(HashMap::new()),
            in_creation: Mutex::new(HashMap::new()),
            creation_finished: Condvar::new(),
            interceptors: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// Get the instance for a name, creating it if needed
    ///
    /// A lookup racing another thread's creation of the same name waits for it
    /// and then returns the cached singleton.
    pub fn get(&self, name: &str) -> ContextResult<Instance> {
        if let Some(existing) = self.singleton(name)? {
            return Ok(existing);
        }

        let definition = self.registry.definition(name)?;
        let _guard = self.mark_in_creation(name)?;
        if let Some(existing) = self.singleton(name)? {
            return Ok(existing);
        }
        let instance = self.create(name, definition.clone())?;

        if definition.scope == ObjectScope::Singleton {
            let mut singletons = self.singletons_write()?;
            let cached = singletons.entry(name.to_string()).or_insert(instance);
            return Ok(cached.clone());
        }
        Ok(instance)
    }

    pub fn get_object(&self, name: &str) -> ContextResult<Object> {
        self.get(name)?
            .as_object()
            .ok_or_else(|| ContextError::unexpected_instance(name, "object"))
    }

    pub fn get_typed<T: Send + Sync + 'static>(&self, name: &str) -> ContextResult<Arc<T>> {
        self.get(name)?
            .downcast::<T>()
            .ok_or_else(|| ContextError::unexpected_instance(name, std::any::type_name::<T>()))
    }

    pub fn get_extension(&self, name: &str) -> ContextResult<Extension> {
        match self.get(name)? {
            Instance::Extension(extension) => Ok(extension),
            _ => Err(ContextError::unexpected_instance(name, "extension")),
        }
    }

    pub fn get_interceptor(&self, name: &str) -> ContextResult<Interceptor> {
        match self.get(name)? {
            Instance::Interceptor(interceptor) => Ok(interceptor),
            _ => Err(ContextError::unexpected_instance(name, "interceptor")),
        }
    }

    pub fn get_source(&self, name: &str) -> ContextResult<Arc<SourceInstance>> {
        match self.get(name)? {
            Instance::Source(source) => Ok(source),
            _ => Err(ContextError::unexpected_instance(name, "configuration source")),
        }
    }

    /// Register a finished instance under a name, bypassing definitions and interceptors
    pub fn register_singleton(&self, name: impl Into<String>, instance: Instance) -> ContextResult<()> {
        let name = name.into();
        tracing::debug!("Registering singleton '{}' ({})", name, instance.kind_name());
        self.singletons_write()?.insert(name, instance);
        Ok(())
    }

    pub fn contains_singleton(&self, name: &str) -> ContextResult<bool> {
        Ok(self.singletons_read()?.contains_key(name))
    }

    pub fn singleton_names(&self) -> ContextResult<Vec<String>> {
        let mut names: Vec<String> = self.singletons_read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn is_currently_in_creation(&self, name: &str) -> ContextResult<bool> {
        Ok(self.in_creation_lock()?.contains_key(name))
    }

    /// Claim a name for construction
    ///
    /// Fails if the calling thread is already building the name. Blocks while
    /// another thread is building it.
    pub fn mark_in_creation(&self, name: &str) -> ContextResult<CreationGuard<'_>> {
        let current = thread::current().id();
        let mut in_creation = self.in_creation_lock()?;
        loop {
            match in_creation.get(name) {
                Some(owner) if *owner == current => {
                    return Err(ContextError::currently_in_creation(name));
                }
                Some(_) => {
                    tracing::trace!("Waiting for another thread to finish creating '{}'", name);
                    in_creation = self
                        .creation_finished
                        .wait(in_creation)
                        .map_err(|_| ContextError::lock("in_creation"))?;
                }
                None => break,
            }
        }
        in_creation.insert(name.to_string(), current);
        Ok(CreationGuard {
            factory: self,
            name: name.to_string(),
        })
    }

    /// Append an interceptor; a previously registered instance is moved to the end
    pub fn add_interceptor(&self, interceptor: Interceptor) -> ContextResult<()> {
        let mut interceptors = self.interceptors_write()?;
        let identity = interceptor.identity();
        interceptors.retain(|existing| existing.identity() != identity);
        tracing::debug!("Adding interceptor '{}'", interceptor.name());
        interceptors.push(interceptor);
        Ok(())
    }

    pub fn interceptor_count(&self) -> ContextResult<usize> {
        Ok(self.interceptors_read()?.len())
    }

    pub fn interceptor_names(&self) -> ContextResult<Vec<String>> {
        Ok(self
            .interceptors_read()?
            .iter()
            .map(|i| i.name().to_string())
            .collect())
    }

    pub fn interceptors(&self) -> ContextResult<Vec<Interceptor>> {
        Ok(self.interceptors_read()?.clone())
    }

    /// Create every non-lazy singleton object and source; returns how many were created
    pub fn pre_instantiate_singletons(&self) -> ContextResult<usize> {
        let names = self.registry.names_matching(|definition| {
            definition.scope == ObjectScope::Singleton
                && !definition.lazy
                && matches!(definition.capability(), Capability::Object | Capability::Source)
                && definition.supplier.is_some()
        })?;

        let mut created = 0;
        for name in names {
            if !self.contains_singleton(&name)? {
                self.get(&name)?;
                created += 1;
            }
        }
        tracing::debug!("Pre-instantiated {} singletons", created);
        Ok(created)
    }

    fn create(&self, name: &str, mut merged: Definition) -> ContextResult<Instance> {
        let chain = self.interceptors()?;
        for interceptor in &chain {
            if let Interceptor::MergedDefinition(i) = interceptor {
                i.post_process_merged_definition(&mut merged, name)?;
            }
        }

        tracing::trace!("Creating '{}' ({})", name, merged.type_name);
        let mut instance = self.instantiate(name, &merged)?;

        for interceptor in &chain {
            instance = interceptor.before_initialization(instance, name, self)?;
        }
        for interceptor in &chain {
            instance = interceptor.after_initialization(instance, name, self)?;
        }
        Ok(instance)
    }

    fn instantiate(&self, name: &str, definition: &Definition) -> ContextResult<Instance> {
        let supplier = definition.supplier.as_ref().ok_or_else(|| {
            ContextError::configuration(format!(
                "Definition '{}' of type '{}' has no instance supplier",
                name, definition.type_name
            ))
        })?;

        let result = match supplier {
            Supplier::Object(create) => create(self).map(Instance::Object),
            Supplier::Extension { kind, create } => create(self).and_then(|extension| {
                check_extension_kind(name, *kind, &extension)?;
                Ok(Instance::Extension(extension))
            }),
            Supplier::Interceptor(create) => create(self).map(Instance::Interceptor),
            Supplier::Source(spec) => Ok(Instance::Source(Arc::new(SourceInstance::plain(
                name,
                spec.clone(),
            )))),
            Supplier::EnhancedSource(enhanced) => Ok(Instance::Source(Arc::new(
                SourceInstance::enhanced(name, enhanced),
            ))),
            Supplier::FactoryMethod { source, method } => {
                if method.is_static {
                    self.static_spec(source)
                        .and_then(|spec| spec.invoke_static(&method.name, self))
                } else {
                    self.get_source(source)
                        .and_then(|instance| instance.invoke(&method.name, self))
                }
            }
        };

        result.map_err(|err| match err {
            ContextError::ObjectCreation { .. } | ContextError::UnexpectedInstance { .. } => err,
            other => ContextError::creation_failed(name, other),
        })
    }

    fn static_spec(&self, source: &str) -> ContextResult<Arc<crate::factory::SourceSpec>> {
        match self.registry.definition(source)?.supplier {
            Some(Supplier::Source(spec)) => Ok(spec),
            Some(Supplier::EnhancedSource(enhanced)) => Ok(Arc::new(enhanced.spec.clone())),
            _ => Err(ContextError::unexpected_instance(source, "configuration source")),
        }
    }

    fn singleton(&self, name: &str) -> ContextResult<Option<Instance>> {
        Ok(self.singletons_read()?.get(name).cloned())
    }

    fn singletons_read(&self) -> ContextResult<std::sync::RwLockReadGuard<'_, HashMap<String, Instance>>> {
        self.singletons.read().map_err(|_| ContextError::lock("singletons"))
    }

    fn singletons_write(&self) -> ContextResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Instance>>> {
        self.singletons.write().map_err(|_| ContextError::lock("singletons"))
    }

    fn interceptors_read(&self) -> ContextResult<std::sync::RwLockReadGuard<'_, Vec<Interceptor>>> {
        self.interceptors.read().map_err(|_| ContextError::lock("interceptors"))
    }

    fn interceptors_write(&self) -> ContextResult<std::sync::RwLockWriteGuard<'_, Vec<Interceptor>>> {
        self.interceptors.write().map_err(|_| ContextError::lock("interceptors"))
    }

    fn in_creation_lock(&self) -> ContextResult<MutexGuard<'_, HashMap<String, ThreadId>>> {
        self.in_creation.lock().map_err(|_| ContextError::lock("in_creation"))
    }
}

impl std::fmt::Display for ObjectFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectFactory({})", self.id)
    }
}

fn check_extension_kind(name: &str, declared: ExtensionKind, extension: &Extension) -> ContextResult<()> {
    if extension.kind() != declared {
        return Err(ContextError::unexpected_instance(
            name,
            format!("{:?} extension", declared),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::CreationInterceptor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(usize);

    struct Recording {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl CreationInterceptor for Recording {
        fn after_initialization(
            &self,
            instance: Instance,
            name: &str,
            _factory: &ObjectFactory,
        ) -> ContextResult<Instance> {
            self.seen.lock().unwrap().push(name.to_string());
            Ok(instance)
        }
    }

    fn factory_with(definitions: Vec<Definition>) -> ObjectFactory {
        let registry = Arc::new(DefinitionRegistry::new());
        for definition in definitions {
            registry.register(definition).unwrap();
        }
        ObjectFactory::new(registry)
    }

    #[test]
    fn test_singleton_is_created_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let factory = factory_with(vec![Definition::object("counter", move |_| {
            Ok(Counter(counted.fetch_add(1, Ordering::SeqCst)))
        })]);

        let first = factory.get_typed::<Counter>("counter").unwrap();
        let second = factory.get_typed::<Counter>("counter").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prototype_is_created_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let factory = factory_with(vec![Definition::object("counter", move |_| {
            Ok(Counter(counted.fetch_add(1, Ordering::SeqCst)))
        })
        .with_scope(ObjectScope::Prototype)]);

        factory.get("counter").unwrap();
        factory.get("counter").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!factory.contains_singleton("counter").unwrap());
    }

    #[test]
    fn test_self_reference_reports_in_creation() {
        let factory = factory_with(vec![Definition::object("cyclic", |factory: &ObjectFactory| {
            factory.get("cyclic")?;
            Ok(Counter(0))
        })]);

        let err = factory.get("cyclic").unwrap_err();
        assert_eq!(err.in_creation_name(), Some("cyclic"));
        assert!(!factory.is_currently_in_creation("cyclic").unwrap());
    }

    #[test]
    fn test_concurrent_lookups_share_one_singleton() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let factory = factory_with(vec![Definition::object("slow", move |_| {
            std::thread::sleep(std::time::Duration::from_millis(100));
            Ok(Counter(counted.fetch_add(1, Ordering::SeqCst)))
        })]);
        let barrier = std::sync::Barrier::new(2);

        let results: Vec<ContextResult<Arc<Counter>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        factory.get_typed::<Counter>("slow")
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        let instances: Vec<Arc<Counter>> = results.into_iter().map(|result| result.unwrap()).collect();
        assert!(Arc::ptr_eq(&instances[0], &instances[1]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!factory.is_currently_in_creation("slow").unwrap());
    }

    #[test]
    fn test_interceptors_only_see_later_creations() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let factory = factory_with(vec![
            Definition::object("early", |_| Ok(Counter(1))),
            Definition::object("late", |_| Ok(Counter(2))),
        ]);

        factory.get("early").unwrap();
        factory
            .add_interceptor(Interceptor::standard(Recording { seen: seen.clone() }))
            .unwrap();
        factory.get("late").unwrap();
        factory.get("early").unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["late".to_string()]);
    }

    #[test]
    fn test_re_adding_interceptor_moves_it_last() {
        let factory = factory_with(vec![]);
        let first = Interceptor::standard(Recording { seen: Arc::default() });
        let second = Interceptor::standard(Recording { seen: Arc::default() });

        factory.add_interceptor(first.clone()).unwrap();
        factory.add_interceptor(second.clone()).unwrap();
        factory.add_interceptor(first.clone()).unwrap();

        let chain = factory.interceptors().unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].identity(), second.identity());
        assert_eq!(chain[1].identity(), first.identity());
    }

    #[test]
    fn test_missing_definition() {
        let factory = factory_with(vec![]);
        let err = factory.get("nothing").unwrap_err();
        assert!(matches!(err, ContextError::DefinitionNotFound { .. }));
    }

    #[test]
    fn test_pre_instantiate_skips_lazy_and_prototype() {
        let factory = factory_with(vec![
            Definition::object("eager", |_| Ok(Counter(1))),
            Definition::object("lazy", |_| Ok(Counter(2))).lazy(),
            Definition::object("proto", |_| Ok(Counter(3))).with_scope(ObjectScope::Prototype),
        ]);

        assert_eq!(factory.pre_instantiate_singletons().unwrap(), 1);
        assert_eq!(factory.singleton_names().unwrap(), vec!["eager".to_string()]);
    }
}
