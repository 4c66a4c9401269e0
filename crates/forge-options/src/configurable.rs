//! `ConfigurableObject`: the uniform Configure/Serialize/Match/Prepare/Validate protocol, plus the
//! lifecycle cache and the registry-backed polymorphic child slot.

use std::{any::Any, fmt};

use crate::{
    context::InvocationContext,
    descriptor::PolymorphicOps,
    error::{ConfigError, ConfigErrorKind, ConfigResult},
    group::{self, DescribeFields},
    lexer,
};

/// The uniform protocol every Configurable implements, whether a leaf option struct or a
/// registry-constructed polymorphic subsystem.
///
/// Object-safe by design: polymorphic child slots hold `Box<dyn ConfigurableObject>`, so the
/// registry and the descriptor codecs never need to know the concrete type of a child beyond what
/// this trait exposes.
pub trait ConfigurableObject: Send + Sync + fmt::Debug {
    fn configure_from_map(
        &mut self,
        pairs: &[(String, String)],
        ctx: &InvocationContext,
    ) -> ConfigResult<Vec<String>>;

    fn configure_option(&mut self, name: &str, value: &str, ctx: &InvocationContext) -> ConfigResult<()>;

    fn get_option_string(&self, ctx: &InvocationContext) -> String;

    /// Structural equality against another `ConfigurableObject`. Implementations should downcast
    /// `other` via [`Self::as_any`] and fail the comparison (rather than panic) on a type
    /// mismatch, since two children of a `Customizable` slot may carry unrelated concrete types.
    fn matches(&self, other: &dyn ConfigurableObject, ctx: &InvocationContext) -> Result<(), String>;

    fn prepare_options(&mut self, ctx: &InvocationContext) -> ConfigResult<()>;

    fn validate_options(&self, ctx: &InvocationContext) -> ConfigResult<()>;

    fn clone_box(&self) -> Box<dyn ConfigurableObject>;

    fn as_any(&self) -> &dyn Any;

    /// `StringToMap` followed by `ConfigureFromMap`.
    fn configure_from_string(&mut self, text: &str, ctx: &InvocationContext) -> ConfigResult<Vec<String>> {
        let pairs = lexer::string_to_map(text, ctx.delimiter())?;
        self.configure_from_map(&pairs, ctx)
    }
}

impl Clone for Box<dyn ConfigurableObject> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A [`ConfigurableObject`] additionally identified by a registry id, constructible by identifier.
pub trait Customizable: ConfigurableObject {
    fn get_id(&self) -> &str;

    fn clone_customizable(&self) -> Box<dyn Customizable>;
}

impl Clone for Box<dyn Customizable> {
    fn clone(&self) -> Self {
        self.clone_customizable()
    }
}

/// Last outcome of `PrepareOptions`/`ValidateOptions`, cached so re-entrant calls after a failure
/// replay the stored status instead of re-running the check.
#[derive(Debug, Clone, Default)]
pub enum LifecycleState {
    #[default]
    NotPrepared,
    Prepared,
    Failed(ConfigError),
}

/// Wraps a `DescribeFields` record with the lifecycle cache, turning it into a full
/// [`ConfigurableObject`] without per-type boilerplate. The derive macro generates one of these
/// (or an [`IdentifiedRecord`], for `Customizable` targets) per annotated struct.
#[derive(Debug, Clone)]
pub struct OptionRecord<R> {
    inner: R,
    lifecycle: LifecycleState,
}

impl<R: Default> Default for OptionRecord<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R> OptionRecord<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lifecycle: LifecycleState::NotPrepared,
        }
    }

    pub fn get(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn lifecycle(&self) -> &LifecycleState {
        &self.lifecycle
    }
}

impl<R> ConfigurableObject for OptionRecord<R>
where
    R: DescribeFields + fmt::Debug + Send + Sync + Clone + 'static,
{
    fn configure_from_map(
        &mut self,
        pairs: &[(String, String)],
        ctx: &InvocationContext,
    ) -> ConfigResult<Vec<String>> {
        let unused = group::configure_pairs(&mut self.inner, pairs, ctx)?;
        if ctx.invoke_prepare_options() {
            self.prepare_options(ctx)?;
        }
        Ok(unused)
    }

    fn configure_option(&mut self, name: &str, value: &str, ctx: &InvocationContext) -> ConfigResult<()> {
        group::configure_one(&mut self.inner, name, value, ctx)
    }

    fn get_option_string(&self, ctx: &InvocationContext) -> String {
        group::serialize_fields(&self.inner, ctx)
    }

    fn matches(&self, other: &dyn ConfigurableObject, ctx: &InvocationContext) -> Result<(), String> {
        let other = other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| "type mismatch".to_owned())?;
        group::compare_fields(&self.inner, &other.inner, ctx)
    }

    fn prepare_options(&mut self, ctx: &InvocationContext) -> ConfigResult<()> {
        if let LifecycleState::Prepared = self.lifecycle {
            tracing::trace!("prepare_options: already prepared, replaying cached success");
            return Ok(());
        }
        let span = tracing::debug_span!("prepare_options", depth = ctx.depth());
        let _enter = span.enter();
        match group::prepare_fields(&mut self.inner, ctx) {
            Ok(()) => {
                tracing::debug!("prepare succeeded");
                self.lifecycle = LifecycleState::Prepared;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "prepare failed, caching failure for replay");
                self.lifecycle = LifecycleState::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn validate_options(&self, ctx: &InvocationContext) -> ConfigResult<()> {
        match &self.lifecycle {
            LifecycleState::Failed(err) => return Err(err.clone()),
            LifecycleState::NotPrepared => {
                return Err(ConfigError::not_supported(
                    "ValidateOptions called before a successful PrepareOptions",
                ));
            }
            LifecycleState::Prepared => {}
        }
        let span = tracing::debug_span!("validate_options", depth = ctx.depth());
        let _enter = span.enter();
        group::validate_fields(&self.inner, ctx)
    }

    fn clone_box(&self) -> Box<dyn ConfigurableObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An [`OptionRecord`] additionally carrying the registry id it was constructed with, implementing
/// [`Customizable`].
#[derive(Debug, Clone)]
pub struct IdentifiedRecord<R> {
    id: String,
    record: OptionRecord<R>,
}

impl<R> IdentifiedRecord<R> {
    pub fn new(id: impl Into<String>, inner: R) -> Self {
        Self {
            id: id.into(),
            record: OptionRecord::new(inner),
        }
    }

    pub fn get(&self) -> &R {
        self.record.get()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.record.get_mut()
    }
}

impl<R> ConfigurableObject for IdentifiedRecord<R>
where
    R: DescribeFields + fmt::Debug + Send + Sync + Clone + 'static,
{
    fn configure_from_map(
        &mut self,
        pairs: &[(String, String)],
        ctx: &InvocationContext,
    ) -> ConfigResult<Vec<String>> {
        self.record.configure_from_map(pairs, ctx)
    }

    fn configure_option(&mut self, name: &str, value: &str, ctx: &InvocationContext) -> ConfigResult<()> {
        self.record.configure_option(name, value, ctx)
    }

    fn get_option_string(&self, ctx: &InvocationContext) -> String {
        let rest = self.record.get_option_string(ctx);
        let id = format!("id={}", self.id);
        if rest.is_empty() {
            id
        } else {
            format!("{id}{}{rest}", ctx.delimiter())
        }
    }

    fn matches(&self, other: &dyn ConfigurableObject, ctx: &InvocationContext) -> Result<(), String> {
        let other = other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| "type mismatch".to_owned())?;
        if self.id != other.id {
            return Err("id".to_owned());
        }
        self.record.matches(&other.record, ctx)
    }

    fn prepare_options(&mut self, ctx: &InvocationContext) -> ConfigResult<()> {
        self.record.prepare_options(ctx)
    }

    fn validate_options(&self, ctx: &InvocationContext) -> ConfigResult<()> {
        self.record.validate_options(ctx)
    }

    fn clone_box(&self) -> Box<dyn ConfigurableObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<R> Customizable for IdentifiedRecord<R>
where
    R: DescribeFields + fmt::Debug + Send + Sync + Clone + 'static,
{
    fn get_id(&self) -> &str {
        &self.id
    }

    fn clone_customizable(&self) -> Box<dyn Customizable> {
        Box::new(self.clone())
    }
}

/// An owned, registry-constructed child. `None` before the first successful configuration (or
/// after a polymorphic swap drops the prior child in favor of a freshly constructed one).
pub type PolymorphicSlot = Option<Box<dyn Customizable>>;

/// [`PolymorphicOps`] implementation for a `Customizable` field reached through a pair of accessor
/// function pointers into a [`PolymorphicSlot`].
pub struct PolymorphicField<R> {
    pub get: fn(&R) -> &PolymorphicSlot,
    pub get_mut: fn(&mut R) -> &mut PolymorphicSlot,
    /// The registry namespace this field resolves identifiers against.
    pub namespace: &'static str,
}

impl<R> PolymorphicOps<R> for PolymorphicField<R> {
    fn configure(&self, record: &mut R, text: &str, ctx: &InvocationContext) -> ConfigResult<()> {
        if !text.contains('=') {
            let child = match ctx.registry().new_object(self.namespace, text, ctx) {
                Ok(child) => child,
                Err(err) if ctx.ignore_unknown_objects() && err.kind() == ConfigErrorKind::NotFound => {
                    return Ok(());
                }
                Err(err) => return Err(err),
            };
            *(self.get_mut)(record) = Some(child);
            return Ok(());
        }

        let pairs = lexer::string_to_map(text, ctx.delimiter())?;
        if let Some(pos) = pairs.iter().position(|(key, _)| key == "id") {
            let id = pairs[pos].1.clone();
            let mut child = match ctx.registry().new_object(self.namespace, &id, ctx) {
                Ok(child) => child,
                Err(err) if ctx.ignore_unknown_objects() && err.kind() == ConfigErrorKind::NotFound => {
                    return Ok(());
                }
                Err(err) => return Err(err),
            };
            let rest: Vec<_> = pairs.into_iter().filter(|(key, _)| key != "id").collect();
            let unused = child.configure_from_map(&rest, ctx)?;
            if !unused.is_empty() && !ctx.ignore_unknown_options() {
                return Err(ConfigError::invalid_argument(format!(
                    "unknown nested field(s): {}",
                    unused.join(", ")
                )));
            }
            // Drop the previous child's ownership before the new one takes its place.
            *(self.get_mut)(record) = Some(child);
            Ok(())
        } else {
            let slot = (self.get_mut)(record);
            let Some(child) = slot else {
                return Err(ConfigError::not_found(
                    "no child object configured and no 'id' supplied",
                ));
            };
            let unused = child.configure_from_map(&pairs, ctx)?;
            if !unused.is_empty() && !ctx.ignore_unknown_options() {
                return Err(ConfigError::invalid_argument(format!(
                    "unknown nested field(s): {}",
                    unused.join(", ")
                )));
            }
            Ok(())
        }
    }

    fn serialize(&self, record: &R, ctx: &InvocationContext, shallow: bool) -> String {
        let Some(child) = (self.get)(record) else {
            return String::new();
        };
        if shallow {
            child.get_id().to_owned()
        } else {
            child.get_option_string(ctx)
        }
    }

    fn matches(&self, a: &R, b: &R, ctx: &InvocationContext) -> Result<(), String> {
        match ((self.get)(a), (self.get)(b)) {
            (None, None) => Ok(()),
            (Some(left), Some(right)) => left.matches(right.as_ref(), ctx),
            _ => Err("presence".to_owned()),
        }
    }

    fn prepare(&self, record: &mut R, ctx: &InvocationContext) -> ConfigResult<()> {
        match (self.get_mut)(record) {
            Some(child) => child.prepare_options(ctx),
            None => Ok(()),
        }
    }

    fn validate(&self, record: &R, ctx: &InvocationContext) -> ConfigResult<()> {
        match (self.get)(record) {
            Some(child) => child.validate_options(ctx),
            None => Ok(()),
        }
    }
}
