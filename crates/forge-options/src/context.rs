//! Invocation context threaded through every parse, serialize, and comparison call.
//!
//! The context is a plain value, never installed in thread-local or global storage: every
//! recursive call receives an explicit, possibly-overridden clone of its caller's context. This
//! keeps `Configure`/`Serialize`/`Match` free of ambient state, at the cost of callers having to
//! thread `ctx` through every call — the same tradeoff the engine's upstream counterpart makes
//! with its `DeserializeContext` borrow chain.

use std::{any::Any, fmt, sync::Arc};

use crate::registry::ObjectRegistry;

/// How strictly two option trees must agree for [`crate::ConfigurableObject::matches`] to report
/// equality.
///
/// Ordered from loosest to strictest; a comparison requested at [`Self::LooselyCompatible`]
/// tolerates differences a strict byte-for-byte diff would flag, while [`Self::ExactMatch`] does
/// not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SanityLevel {
    /// No comparison is performed; the option is exempt from equivalence checking.
    None,
    /// Tolerate known-equivalent spellings of the same effective value.
    #[default]
    LooselyCompatible,
    /// Require the canonical serialized form to match exactly.
    ExactMatch,
}

impl fmt::Display for SanityLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::None => "none",
            Self::LooselyCompatible => "loosely-compatible",
            Self::ExactMatch => "exact-match",
        })
    }
}

/// Opaque platform/host handle passed to registry factories at construction time.
///
/// Kept as a trait object rather than a concrete type so that embedders can carry whatever
/// platform resources (clocks, thread pools, cloud clients) their polymorphic components need,
/// without the engine itself depending on any of it.
pub trait HostEnv: Any + Send + Sync {
    /// Upcasts to `&dyn Any` so factories can `downcast_ref` to their expected concrete env type.
    fn as_any(&self) -> &dyn Any;
}

/// Opaque diagnostic sink that `Prepare`/`Validate` hooks may write human-readable progress to.
pub trait InfoLog: Send + Sync {
    fn log(&self, message: &str);
}

/// An [`InfoLog`] that discards everything; the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl InfoLog for NullLog {
    fn log(&self, _message: &str) {}
}

/// Per-call parameters shared by parsing, serialization, and comparison.
///
/// Built with the [`Self::top_level`] constructor and the `with_*` builder methods; recursion into
/// a nested struct, vector element, or polymorphic child goes through [`Self::embedded`], which
/// forces the delimiter to `;` and resets `invoke_prepare_options`, matching the "embedded context"
/// convention used throughout the engine.
#[derive(Clone)]
pub struct InvocationContext {
    delimiter: char,
    input_strings_escaped: bool,
    ignore_unknown_options: bool,
    ignore_unknown_objects: bool,
    sanity_level: SanityLevel,
    invoke_prepare_options: bool,
    registry: ObjectRegistry,
    env: Arc<dyn HostEnv>,
    info_log: Arc<dyn InfoLog>,
    depth: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct NoEnv;

impl HostEnv for NoEnv {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InvocationContext")
            .field("delimiter", &self.delimiter)
            .field("input_strings_escaped", &self.input_strings_escaped)
            .field("ignore_unknown_options", &self.ignore_unknown_options)
            .field("ignore_unknown_objects", &self.ignore_unknown_objects)
            .field("sanity_level", &self.sanity_level)
            .field("invoke_prepare_options", &self.invoke_prepare_options)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl InvocationContext {
    /// A context for options supplied directly by the caller (a user-facing option string), with
    /// no host environment and a no-op diagnostic sink.
    pub fn top_level() -> Self {
        Self {
            delimiter: ';',
            input_strings_escaped: false,
            ignore_unknown_options: false,
            ignore_unknown_objects: false,
            sanity_level: SanityLevel::LooselyCompatible,
            invoke_prepare_options: false,
            registry: ObjectRegistry::new(),
            env: Arc::new(NoEnv),
            info_log: Arc::new(NullLog),
            depth: 0,
        }
    }

    /// A context for recursing into a nested struct, vector element, or polymorphic child: forces
    /// `;` as the delimiter and suspends `invoke_prepare_options`, per the "embedded context"
    /// convention.
    #[must_use]
    pub fn embedded(&self) -> Self {
        Self {
            delimiter: ';',
            invoke_prepare_options: false,
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_input_strings_escaped(mut self, escaped: bool) -> Self {
        self.input_strings_escaped = escaped;
        self
    }

    #[must_use]
    pub fn with_ignore_unknown_options(mut self, ignore: bool) -> Self {
        self.ignore_unknown_options = ignore;
        self
    }

    #[must_use]
    pub fn with_ignore_unknown_objects(mut self, ignore: bool) -> Self {
        self.ignore_unknown_objects = ignore;
        self
    }

    #[must_use]
    pub fn with_sanity_level(mut self, level: SanityLevel) -> Self {
        self.sanity_level = level;
        self
    }

    #[must_use]
    pub fn with_invoke_prepare_options(mut self, invoke: bool) -> Self {
        self.invoke_prepare_options = invoke;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ObjectRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: Arc<dyn HostEnv>) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_info_log(mut self, info_log: Arc<dyn InfoLog>) -> Self {
        self.info_log = info_log;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn input_strings_escaped(&self) -> bool {
        self.input_strings_escaped
    }

    pub fn ignore_unknown_options(&self) -> bool {
        self.ignore_unknown_options
    }

    pub fn ignore_unknown_objects(&self) -> bool {
        self.ignore_unknown_objects
    }

    pub fn sanity_level(&self) -> SanityLevel {
        self.sanity_level
    }

    pub fn invoke_prepare_options(&self) -> bool {
        self.invoke_prepare_options
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn env(&self) -> &Arc<dyn HostEnv> {
        &self.env
    }

    pub fn info_log(&self) -> &Arc<dyn InfoLog> {
        &self.info_log
    }

    /// Nesting depth below the top-level call; `0` at the top level.
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::top_level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_forces_semicolon_and_suspends_prepare() {
        let top = InvocationContext::top_level()
            .with_delimiter(':')
            .with_invoke_prepare_options(true)
            .with_ignore_unknown_options(true);
        let child = top.embedded();
        assert_eq!(child.delimiter(), ';');
        assert!(!child.invoke_prepare_options());
        assert!(child.ignore_unknown_options());
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn sanity_level_orders_loosest_to_strictest() {
        assert!(SanityLevel::None < SanityLevel::LooselyCompatible);
        assert!(SanityLevel::LooselyCompatible < SanityLevel::ExactMatch);
    }
}
