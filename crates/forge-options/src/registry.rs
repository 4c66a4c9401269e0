//! Object registry: maps type-tag namespaces and identifier strings to factories producing
//! [`Customizable`] instances, including ones loaded from shared libraries at runtime.

use std::{
    collections::HashMap,
    fmt,
    sync::{atomic::{AtomicU64, Ordering}, Arc, Mutex},
};

use libloading::{Library, Symbol};

use crate::{
    configurable::Customizable,
    context::InvocationContext,
    error::{ConfigError, ConfigResult},
};

/// How a registered pattern matches a requested identifier.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches only the exact identifier.
    Exact(String),
    /// Matches any identifier starting with this prefix (e.g. a URI scheme tail).
    Prefix(String),
}

impl Pattern {
    fn matches(&self, id: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == id,
            Self::Prefix(prefix) => id.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(formatter, "{name}"),
            Self::Prefix(prefix) => write!(formatter, "{prefix}*"),
        }
    }
}

type Factory = dyn Fn(&str, &InvocationContext) -> ConfigResult<Box<dyn Customizable>> + Send + Sync;

/// Opaque handle to a completed registration, returned by [`ObjectRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationId(u64);

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
struct Entry {
    id: RegistrationId,
    pattern: Pattern,
    factory: Arc<Factory>,
}

/// Maps `(namespace, identifier)` pairs to factories. `namespace` is the compile-time
/// discriminator named `T` in the component design -- in practice, the `&'static str` carried by a
/// [`TypeTag::Customizable`](crate::descriptor::TypeTag::Customizable) field.
///
/// Cloning deep-copies the factory tables (so a child scope's registrations never leak back to its
/// parent) while sharing the set of loaded dynamic libraries (so factories obtained from a library
/// remain valid for as long as any clone in the registry's lineage is alive).
#[derive(Clone)]
pub struct ObjectRegistry {
    namespaces: HashMap<&'static str, Vec<Entry>>,
    libraries: Arc<Mutex<Vec<Arc<Library>>>>,
    loaded_library_names: Arc<Mutex<Vec<String>>>,
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ObjectRegistry")
            .field("namespaces", &self.namespaces.keys().collect::<Vec<_>>())
            .field("loaded_libraries", &self.loaded_library_names.lock().unwrap())
            .finish()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            namespaces: HashMap::new(),
            libraries: Arc::new(Mutex::new(Vec::new())),
            loaded_library_names: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers a factory for `namespace`, matched against requested ids by `pattern`.
    pub fn register<F>(&mut self, namespace: &'static str, pattern: Pattern, factory: F) -> RegistrationId
    where
        F: Fn(&str, &InvocationContext) -> ConfigResult<Box<dyn Customizable>> + Send + Sync + 'static,
    {
        let id = RegistrationId(NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(namespace, registration.id = id.0, "registering factory");
        self.namespaces.entry(namespace).or_default().push(Entry {
            id,
            pattern,
            factory: Arc::new(factory),
        });
        id
    }

    /// Invokes `register_fn(self)` under a named scope, tracked for introspection via
    /// [`Self::loaded_library_names`].
    pub fn add_local_library(&mut self, name: impl Into<String>, register_fn: fn(&mut Self)) {
        register_fn(self);
        self.loaded_library_names.lock().unwrap().push(name.into());
    }

    /// Resolves a shared library by path, locates `entry_symbol` in it, and calls it as if it were
    /// a local registration. The library is kept loaded for the lifetime of this registry's
    /// lineage so that factories it registered remain callable.
    ///
    /// # Safety of the loaded symbol
    ///
    /// `entry_symbol` must name a function with signature `extern "C" fn(&mut ObjectRegistry)`
    /// exported by the target library. Calling an export with a mismatched signature is undefined
    /// behavior; this is inherent to dynamic library loading and not something this crate can
    /// check.
    pub fn add_dynamic_library(&mut self, lib_name: &str, entry_symbol: &str) -> ConfigResult<()> {
        let library = unsafe { Library::new(lib_name) }?;
        let entry: Symbol<'_, unsafe extern "C" fn(&mut ObjectRegistry)> =
            unsafe { library.get(entry_symbol.as_bytes()) }?;
        unsafe { entry(self) };
        self.libraries.lock().unwrap().push(Arc::new(library));
        self.loaded_library_names.lock().unwrap().push(lib_name.to_owned());
        tracing::info!(lib_name, entry_symbol, "loaded dynamic library into registry");
        Ok(())
    }

    /// Finds the first factory in `namespace` whose pattern matches `id` and materializes it.
    pub fn new_object(
        &self,
        namespace: &str,
        id: &str,
        ctx: &InvocationContext,
    ) -> ConfigResult<Box<dyn Customizable>> {
        let entries = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| ConfigError::not_found(format!("no objects registered under '{namespace}'")))?;
        let factory = entries
            .iter()
            .find(|entry| entry.pattern.matches(id))
            .map(|entry| Arc::clone(&entry.factory))
            .ok_or_else(|| {
                ConfigError::not_found(format!("no factory matching id '{id}' in namespace '{namespace}'"))
            })?;
        tracing::debug!(namespace, id, "constructing registered object");
        factory(id, ctx)
    }

    /// Names of every library loaded into this registry's lineage, in load order.
    pub fn loaded_libraries(&self) -> Vec<String> {
        self.loaded_library_names.lock().unwrap().clone()
    }

    /// Number of factories registered under `namespace`.
    pub fn factory_count(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map_or(0, Vec::len)
    }
}
