// vim: tw=80
//! Type-erased call arguments and return values.
//!
//! Stand-ins capture every argument of an intercepted call into an
//! [`Arguments`] list so the dispatch engine can compare it against recorded
//! expectations without knowing the concrete types.  Return values travel the
//! other way as a [`ReturnValue`].

use std::{
    any::{self, TypeId},
    fmt,
    marker::PhantomData,
};

use downcast::{downcast, Any};

use crate::error::MockError;

/// A value produced by a mocked method, boxed for transport through the
/// dispatch engine.
pub type ReturnValue = Box<dyn any::Any + Send>;

/// Produces the default value of a method's return type.
pub type DefaultFn = fn() -> ReturnValue;

/// An argument captured from an intercepted call.
///
/// Implemented for every owned, `Debug`, comparable type.  Reference
/// arguments are captured as their owned equivalent.
pub trait Argument: Any + Send + fmt::Debug {
    /// Compare with another captured argument of possibly different type.
    fn eq_argument(&self, other: &dyn Argument) -> bool;

    /// Name of the concrete type, for diagnostics.
    fn argument_type(&self) -> &'static str;
}

downcast!(dyn Argument);

impl<T> Argument for T
    where T: any::Any + Send + fmt::Debug + PartialEq
{
    fn eq_argument(&self, other: &dyn Argument) -> bool {
        other.downcast_ref::<T>()
            .map_or(false, |o| self == o)
    }

    fn argument_type(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// An ordered list of captured arguments.
#[derive(Debug, Default)]
pub struct Arguments(Vec<Box<dyn Argument>>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument.
    pub fn push<T: Argument>(&mut self, arg: T) -> &mut Self {
        self.0.push(Box::new(arg));
        self
    }

    /// Builder-style version of [`push`](#method.push).
    pub fn with<T: Argument>(mut self, arg: T) -> Self {
        self.push(arg);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the argument at `index`, if it exists and has type `T`.
    pub fn get<T: Argument>(&self, index: usize) -> Option<&T> {
        self.0.get(index)
            .and_then(|a| a.downcast_ref::<T>().ok())
    }

    /// Borrow the argument at `index` without knowing its type.
    pub fn get_dyn(&self, index: usize) -> Option<&dyn Argument> {
        self.0.get(index).map(|a| &**a)
    }

    /// Read the arguments back out, in order.
    pub fn reader(self) -> ArgumentReader {
        let found = self.0.len();
        ArgumentReader{inner: self.0.into_iter(), position: 0, found}
    }

    /// Do these arguments equal `other`, element by element?
    pub fn matches(&self, other: &Arguments) -> bool {
        self.0.len() == other.0.len() &&
            self.0.iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.eq_argument(&**b))
    }

    pub(crate) fn into_inner(self) -> Vec<Box<dyn Argument>> {
        self.0
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item=&dyn Argument> {
        self.0.iter().map(|a| &**a)
    }

    /// Fail unless the list is empty.  Handy for [`Construct`] impls of base
    /// types whose constructor takes nothing.
    ///
    /// [`Construct`]: crate::Construct
    pub fn expect_none(self) -> Result<(), MockError> {
        self.reader().finish()
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg:?}")?;
        }
        write!(f, ")")
    }
}

/// Build an [`Arguments`] list.
///
/// # Examples
/// ```
/// # use replaymock::*;
/// let args = args![2, "three".to_owned()];
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.to_string(), "(2, \"three\")");
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut args = $crate::Arguments::new();
            $( args.push($arg); )*
            args
        }
    };
}

/// Consumes an [`Arguments`] list, producing typed values in order.
pub struct ArgumentReader {
    inner: std::vec::IntoIter<Box<dyn Argument>>,
    position: usize,
    found: usize,
}

impl ArgumentReader {
    /// Take the next argument, which must have type `T`.
    pub fn next<T: Argument>(&mut self) -> Result<T, MockError> {
        let position = self.position;
        self.position += 1;
        let arg = self.inner.next()
            .ok_or(MockError::ArgumentCount {
                expected: self.position,
                found: self.found
            })?;
        let found = arg.argument_type();
        arg.downcast::<T>()
            .map(|b| *b)
            .map_err(|_| MockError::ArgumentMismatch {
                position,
                expected: any::type_name::<T>(),
                found
            })
    }

    /// Discard the next argument.
    pub fn skip(&mut self) {
        self.position += 1;
        self.inner.next();
    }

    /// Fail if any arguments remain unread.
    pub fn finish(self) -> Result<(), MockError> {
        if self.position >= self.found {
            Ok(())
        } else {
            Err(MockError::ArgumentCount {
                expected: self.position,
                found: self.found
            })
        }
    }
}

/// Tag type used to look up a default return value by autoref
/// specialization.
///
/// Generated stand-ins write
/// `(&DefaultReturner::<R>::new()).default_fn()` with both [`ViaDefault`] and
/// [`NoDefault`] in scope.  Method resolution tries the by-value receiver
/// first, which only `ViaDefault` provides, and only when `R: Default`.
#[doc(hidden)]
pub struct DefaultReturner<O>(PhantomData<fn() -> O>);

impl<O> DefaultReturner<O> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        DefaultReturner(PhantomData)
    }
}

#[doc(hidden)]
pub trait ViaDefault {
    fn default_fn(&self) -> Option<DefaultFn>;
}

impl<O: Default + Send + 'static> ViaDefault for DefaultReturner<O> {
    fn default_fn(&self) -> Option<DefaultFn> {
        let f: DefaultFn = default_value::<O>;
        Some(f)
    }
}

#[doc(hidden)]
pub trait NoDefault {
    fn default_fn(&self) -> Option<DefaultFn>;
}

impl<O> NoDefault for &DefaultReturner<O> {
    fn default_fn(&self) -> Option<DefaultFn> {
        None
    }
}

fn default_value<O: Default + Send + 'static>() -> ReturnValue {
    Box::new(O::default())
}

/// `TypeId` and name of a return type, bundled for [`Signature`].
///
/// [`Signature`]: crate::Signature
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReturnType {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl ReturnType {
    pub(crate) fn of<T: any::Any>() -> Self {
        ReturnType{id: TypeId::of::<T>(), name: any::type_name::<T>()}
    }
}
