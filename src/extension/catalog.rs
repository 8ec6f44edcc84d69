//! Type catalogs
//!
//! An artifact describes what it offers through a [`TypeCatalog`]: the
//! concrete types it exposes, which capabilities each one implements, which
//! tags it carries and which constructors it declares. The registry reads
//! catalogs once and never needs reflection afterwards.
//!
//! ```
//! use modhost::extension::{Args, ExposedType, ParamType, TypeCatalog};
//!
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//! struct GreeterTag;
//!
//! struct English(String);
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         format!("hello {}", self.0)
//!     }
//! }
//!
//! let catalog = TypeCatalog::new("content-a").with_type(
//!     ExposedType::of::<English>()
//!         .implements::<dyn Greeter>(|t| Box::new(t))
//!         .tag::<GreeterTag>("english")
//!         .constructor(&[ParamType::of::<String>()], |args: &Args| {
//!             Ok(English(args.get::<String>(0)?.clone()))
//!         })
//!         .build(),
//! );
//! assert_eq!(catalog.types().len(), 1);
//! ```

use std::any::{type_name, Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Builds one instance from construction arguments
pub(crate) type BuildFn = Arc<dyn Fn(&Args) -> anyhow::Result<Box<dyn Any>> + Send + Sync>;

/// Turns a boxed concrete value into a boxed `Box<dyn Capability>`
pub(crate) type UpcastFn = Arc<dyn Fn(Box<dyn Any>) -> Option<Box<dyn Any>> + Send + Sync>;

macro_rules! type_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name {
            id: TypeId,
            name: &'static str,
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                self.name
            }

            pub fn type_id(&self) -> TypeId {
                self.id
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name)
            }
        }
    };
}

type_key!(
    /// Identity of a capability, usually a `dyn Trait`
    CapabilityId
);
type_key!(
    /// Identity of a tag (marker) type
    TagId
);
type_key!(
    /// One constructor parameter type
    ParamType
);

impl CapabilityId {
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }
}

impl TagId {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Tags order by type name first so tie-breaks are stable across builds
impl Ord for TagId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for TagId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl ParamType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Positional, dynamically typed construction arguments
#[derive(Default)]
pub struct Args {
    values: Vec<(ParamType, Box<dyn Any>)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument
    pub fn with<T: Any>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Any>(&mut self, value: T) {
        self.values.push((ParamType::of::<T>(), Box::new(value)));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Runtime types, in order
    pub fn types(&self) -> Vec<ParamType> {
        self.values.iter().map(|(t, _)| *t).collect()
    }

    /// Whether the runtime types equal `signature` exactly
    pub fn matches(&self, signature: &[ParamType]) -> bool {
        self.values.len() == signature.len()
            && self.values.iter().zip(signature).all(|((t, _), s)| t == s)
    }

    /// Borrow argument `index` as `T`
    pub fn get<T: Any>(&self, index: usize) -> anyhow::Result<&T> {
        let (ty, value) = self
            .values
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("missing argument {}", index))?;
        value.downcast_ref::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "argument {} is {}, not {}",
                index,
                ty.name(),
                type_name::<T>()
            )
        })
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(|(t, _)| t))
            .finish()
    }
}

/// Build [`Args`] from a list of values
#[macro_export]
macro_rules! args {
    () => { $crate::extension::Args::new() };
    ($($value:expr),+ $(,)?) => {
        $crate::extension::Args::new()$(.with($value))+
    };
}

/// A declared constructor
#[derive(Clone)]
pub struct Constructor {
    params: Vec<ParamType>,
    pub(crate) build: BuildFn,
}

impl Constructor {
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}

/// A concrete type exposed by an artifact
#[derive(Clone)]
pub struct ExposedType {
    type_id: TypeId,
    type_name: &'static str,
    pub(crate) upcasts: Vec<(CapabilityId, UpcastFn)>,
    tags: Vec<(TagId, String)>,
    constructors: Vec<Constructor>,
}

impl ExposedType {
    /// Start describing `T`
    pub fn of<T: 'static>() -> TypeBuilder<T> {
        TypeBuilder {
            exposed: ExposedType {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                upcasts: Vec::new(),
                tags: Vec::new(),
                constructors: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Capabilities this type can be upcast into
    pub fn capabilities(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.upcasts.iter().map(|(c, _)| *c)
    }

    pub fn implements(&self, capability: CapabilityId) -> bool {
        self.upcasts.iter().any(|(c, _)| *c == capability)
    }

    /// Applied tags with their keys, in declaration order
    pub fn tags(&self) -> &[(TagId, String)] {
        &self.tags
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// First constructor whose parameters equal `signature`
    pub fn constructor_for(&self, signature: &[ParamType]) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.params == signature)
    }

    pub(crate) fn upcast_for(&self, capability: CapabilityId) -> Option<&UpcastFn> {
        self.upcasts
            .iter()
            .find(|(c, _)| *c == capability)
            .map(|(_, u)| u)
    }
}

impl fmt::Debug for ExposedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExposedType")
            .field("type_name", &self.type_name)
            .field("capabilities", &self.capabilities().collect::<Vec<_>>())
            .field("tags", &self.tags)
            .field("constructors", &self.constructors)
            .finish()
    }
}

/// Builder returned by [`ExposedType::of`]
pub struct TypeBuilder<T> {
    exposed: ExposedType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> TypeBuilder<T> {
    /// Override the reported type name
    pub fn named(mut self, name: &'static str) -> Self {
        self.exposed.type_name = name;
        self
    }

    /// Declare that `T` implements capability `C`
    pub fn implements<C: ?Sized + 'static>(mut self, upcast: fn(T) -> Box<C>) -> Self {
        let convert: UpcastFn = Arc::new(move |value: Box<dyn Any>| {
            value
                .downcast::<T>()
                .ok()
                .map(|concrete| Box::new(upcast(*concrete)) as Box<dyn Any>)
        });
        self.exposed.upcasts.push((CapabilityId::of::<C>(), convert));
        self
    }

    /// Apply tag `Tag` with `key`
    pub fn tag<Tag: ?Sized + 'static>(mut self, key: impl Into<String>) -> Self {
        self.exposed.tags.push((TagId::of::<Tag>(), key.into()));
        self
    }

    /// Declare a constructor taking `params`
    pub fn constructor<F>(mut self, params: &[ParamType], build: F) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let build: BuildFn = Arc::new(move |args: &Args| {
            build(args).map(|value| Box::new(value) as Box<dyn Any>)
        });
        self.exposed.constructors.push(Constructor {
            params: params.to_vec(),
            build,
        });
        self
    }

    pub fn build(self) -> ExposedType {
        self.exposed
    }
}

impl<T: 'static> From<TypeBuilder<T>> for ExposedType {
    fn from(builder: TypeBuilder<T>) -> Self {
        builder.build()
    }
}

/// Everything one artifact exposes
pub struct TypeCatalog {
    name: String,
    types: Vec<ExposedType>,
    // keeps the code behind the catalog's functions alive
    retain: Option<Arc<dyn Any + Send + Sync>>,
}

impl TypeCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            retain: None,
        }
    }

    pub fn with_type(mut self, exposed: impl Into<ExposedType>) -> Self {
        self.types.push(exposed.into());
        self
    }

    pub fn add_type(&mut self, exposed: impl Into<ExposedType>) {
        self.types.push(exposed.into());
    }

    /// Keep `handle` alive for as long as anything built from this catalog
    pub fn with_retained(mut self, handle: Arc<dyn Any + Send + Sync>) -> Self {
        self.retain = Some(handle);
        self
    }

    /// Rename, e.g. to the unique name of the module that produced it
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[ExposedType] {
        &self.types
    }

    pub(crate) fn into_parts(self) -> (String, Vec<ExposedType>, Option<Arc<dyn Any + Send + Sync>>) {
        (self.name, self.types, self.retain)
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("name", &self.name)
            .field("types", &self.types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape {
        fn area(&self) -> u32;
    }

    struct Square(u32);

    impl Shape for Square {
        fn area(&self) -> u32 {
            self.0 * self.0
        }
    }

    struct ShapeTag;
    struct OtherTag;

    #[test]
    fn test_args_types_and_access() {
        let args = crate::args![3u32, "x".to_string()];
        assert_eq!(args.len(), 2);
        assert!(args.matches(&[ParamType::of::<u32>(), ParamType::of::<String>()]));
        assert!(!args.matches(&[ParamType::of::<u32>()]));
        assert!(!args.matches(&[ParamType::of::<u64>(), ParamType::of::<String>()]));
        assert_eq!(*args.get::<u32>(0).unwrap(), 3);
        assert!(args.get::<u64>(0).is_err());
        assert!(args.get::<u32>(5).is_err());
        assert!(crate::args![].is_empty());
    }

    #[test]
    fn test_constructor_and_upcast() {
        let exposed = ExposedType::of::<Square>()
            .implements::<dyn Shape>(|s| Box::new(s))
            .tag::<ShapeTag>("square")
            .constructor(&[ParamType::of::<u32>()], |args: &Args| {
                Ok(Square(*args.get::<u32>(0)?))
            })
            .build();

        assert!(exposed.implements(CapabilityId::of::<dyn Shape>()));
        assert!(exposed.constructor_for(&[]).is_none());
        let ctor = exposed
            .constructor_for(&[ParamType::of::<u32>()])
            .unwrap();

        let value = (ctor.build)(&Args::new().with(4u32)).unwrap();
        let upcast = exposed
            .upcast_for(CapabilityId::of::<dyn Shape>())
            .unwrap();
        let shape = upcast(value).unwrap().downcast::<Box<dyn Shape>>().unwrap();
        assert_eq!(shape.area(), 16);
    }

    #[test]
    fn test_tag_order_by_name() {
        let a = TagId::of::<OtherTag>();
        let b = TagId::of::<ShapeTag>();
        // both live in the same module path, so the short names decide
        assert!(a < b);
        assert_eq!(a, TagId::of::<OtherTag>());
    }
}
