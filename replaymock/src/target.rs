// vim: tw=80
//! What a mock stands in for: a primary type, extra interfaces and the
//! arguments for the base type's constructor.

use std::{
    any::{self, TypeId},
    fmt,
    hash::{Hash, Hasher},
    mem,
};

use crate::{error::MockError, value::Arguments};

/// Whether a type only declares behavior or also carries an implementation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TypeKind {
    /// A trait.  It has no base implementation to delegate to.
    Interface,
    /// A concrete type with real method bodies.
    Class,
}

/// Identity of a type that a mock can impersonate.
///
/// Traits are identified through their trait object type, so
/// `TypeInfo::interface::<dyn Calculator>()`.  Concrete base types use
/// `TypeInfo::class::<Accumulator>()`.
#[derive(Clone, Copy, Debug)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

impl TypeInfo {
    pub fn interface<T: ?Sized + 'static>() -> Self {
        TypeInfo {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
            kind: TypeKind::Interface
        }
    }

    pub fn class<T: 'static>() -> Self {
        TypeInfo {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
            kind: TypeKind::Class
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Fully qualified name, as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The last path segment of the name, e.g. "Calculator".
    pub fn short_name(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        name.rsplit("::").next().unwrap_or(name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Normalized description of what to mock.
#[derive(Debug)]
pub struct TargetDescriptor {
    primary: TypeInfo,
    extra_types: Vec<TypeInfo>,
    constructor_arguments: Arguments,
}

impl TargetDescriptor {
    /// Validate and bundle a mock target.
    ///
    /// Fails if `extra_types` repeats `primary` or repeats itself.  The
    /// constructor arguments are not checked here; that is the generator's
    /// job.
    pub fn describe(primary: TypeInfo, extra_types: &[TypeInfo],
                    constructor_arguments: Arguments)
        -> Result<Self, MockError>
    {
        for (i, extra) in extra_types.iter().enumerate() {
            if *extra == primary {
                return Err(MockError::InvalidTarget {
                    reason: format!("extra type {extra} duplicates the \
                                     primary type")
                });
            }
            if extra_types[..i].contains(extra) {
                return Err(MockError::InvalidTarget {
                    reason: format!("extra type {extra} is listed twice")
                });
            }
        }
        Ok(TargetDescriptor {
            primary,
            extra_types: extra_types.to_vec(),
            constructor_arguments
        })
    }

    pub fn primary(&self) -> TypeInfo {
        self.primary
    }

    pub fn extra_types(&self) -> &[TypeInfo] {
        &self.extra_types
    }

    /// Every type this mock was requested to satisfy, primary first.
    pub fn types(&self) -> impl Iterator<Item=TypeInfo> + '_ {
        std::iter::once(self.primary).chain(self.extra_types.iter().copied())
    }

    pub fn constructor_arguments(&self) -> &Arguments {
        &self.constructor_arguments
    }

    /// Remove the constructor arguments, leaving an empty list behind.
    pub(crate) fn take_constructor_arguments(&mut self) -> Arguments {
        mem::take(&mut self.constructor_arguments)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        for extra in self.extra_types.iter() {
            write!(f, " + {extra}")?;
        }
        Ok(())
    }
}
