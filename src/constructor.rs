//! Constructor declarations.
//!
//! A [`Constructor`] is the explicit stand-in for a class constructor plus its
//! parameter metadata: it lists the declared parameters in order, records
//! explicit injection keys per position, and carries the closure that builds
//! the instance once the container has resolved the arguments.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{short_type_name, Key};

/// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

type BuildFn = dyn Fn(&mut CtorArgs) -> DiResult<AnyArc> + Send + Sync;

/// Declared kind of a constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A managed, class-like dependency identified by its type name
    Class(&'static str),
    /// A primitive or otherwise unmanaged value; the container passes nothing
    Primitive(&'static str),
}

/// One declared constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    kind: ParamKind,
}

impl ParamSpec {
    pub fn class<T: ?Sized>() -> Self {
        Self { kind: ParamKind::Class(short_type_name::<T>()) }
    }

    pub fn class_named(type_name: &'static str) -> Self {
        Self { kind: ParamKind::Class(type_name) }
    }

    pub fn primitive(label: &'static str) -> Self {
        Self { kind: ParamKind::Primitive(label) }
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn is_class_like(&self) -> bool {
        matches!(self.kind, ParamKind::Class(_))
    }

    /// Declared type name (or label for primitives).
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ParamKind::Class(name) | ParamKind::Primitive(name) => name,
        }
    }
}

/// Declared constructor of an injectable type.
///
/// # Examples
///
/// ```rust
/// use lightspring::{Constructor, Container, ParamSpec, ServiceOptions};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database>, retries: Option<Arc<u32>> }
///
/// let container = Container::new();
/// container.register(
///     "Database",
///     Constructor::of::<Database>(|_| Ok(Database { url: "postgres://localhost".into() })),
///     ServiceOptions::singleton(),
/// );
/// container.register(
///     "UserService",
///     Constructor::of::<UserService>(|args| {
///         Ok(UserService { db: args.take(0)?, retries: args.take_optional(1)? })
///     })
///     .param(ParamSpec::class::<Database>())
///     .param(ParamSpec::primitive("retries"))
///     .inject(0, "Database"),
///     ServiceOptions::default(),
/// );
///
/// let users = container.resolve::<UserService>("UserService").unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// assert!(users.retries.is_none());
/// ```
#[derive(Clone)]
pub struct Constructor {
    name: &'static str,
    params: Vec<ParamSpec>,
    injections: BTreeMap<usize, Key>,
    build: Arc<BuildFn>,
}

impl Constructor {
    pub fn new<T: Send + Sync + 'static>(
        name: &'static str,
        build: impl Fn(&mut CtorArgs) -> DiResult<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            params: Vec::new(),
            injections: BTreeMap::new(),
            build: Arc::new(move |args: &mut CtorArgs| -> DiResult<AnyArc> {
                Ok(Arc::new(build(args)?))
            }),
        }
    }

    /// Constructor named after the short type name of `T`.
    pub fn of<T: Send + Sync + 'static>(
        build: impl Fn(&mut CtorArgs) -> DiResult<T> + Send + Sync + 'static,
    ) -> Self {
        Self::new(short_type_name::<T>(), build)
    }

    /// Constructor for a value that is already built and shared.
    pub(crate) fn shared<T: Send + Sync + 'static>(name: &'static str, value: Arc<T>) -> Self {
        Self {
            name,
            params: Vec::new(),
            injections: BTreeMap::new(),
            build: Arc::new(move |_: &mut CtorArgs| -> DiResult<AnyArc> { Ok(value.clone()) }),
        }
    }

    /// Appends a declared parameter.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Records an explicit injection key for the parameter at `index`.
    pub fn inject(mut self, index: usize, key: impl Into<Key>) -> Self {
        self.injections.insert(index, key.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn injection(&self, index: usize) -> Option<&Key> {
        self.injections.get(&index)
    }

    pub(crate) fn construct(&self, values: Vec<Option<AnyArc>>) -> DiResult<AnyArc> {
        let mut args = CtorArgs { owner: self.name, values };
        (self.build)(&mut args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("injections", &self.injections)
            .finish()
    }
}

/// Resolved arguments handed to a constructor's build closure, by position.
pub struct CtorArgs {
    owner: &'static str,
    values: Vec<Option<AnyArc>>,
}

impl CtorArgs {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes the argument at `index`, failing if nothing was resolved for it.
    pub fn take<T: Send + Sync + 'static>(&mut self, index: usize) -> DiResult<Arc<T>> {
        self.take_optional(index)?.ok_or_else(|| DiError::MissingArgument {
            service: self.owner.to_string(),
            index,
        })
    }

    /// Takes the argument at `index`; `None` for unmanaged parameters.
    pub fn take_optional<T: Send + Sync + 'static>(&mut self, index: usize) -> DiResult<Option<Arc<T>>> {
        match self.values.get_mut(index).and_then(Option::take) {
            Some(any) => any
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
            None => Ok(None),
        }
    }
}

/// A type the container knows how to build.
///
/// Implementing this trait is the equivalent of marking a class as a service:
/// [`Container::add_service`](crate::Container::add_service) registers the
/// type under its constructor name.
pub trait Injectable: Send + Sync + Sized + 'static {
    fn constructor() -> Constructor;
}
