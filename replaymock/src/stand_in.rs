// vim: tw=80
//! The boundary between the runtime and generated stand-in types.

use crate::{
    error::MockError,
    state::Binding,
    target::{TargetDescriptor, TypeInfo},
    value::Arguments,
};

/// A type that can impersonate a target and route its calls through a
/// [`Binding`].
///
/// Implemented by the [`stand_in!`](crate::stand_in) macro.  Hand-written
/// implementations are possible, but rarely worth the trouble.
pub trait StandIn: Sized {
    /// The type this stand-in impersonates: the base type for class mocks,
    /// otherwise the first trait.
    fn target() -> TypeInfo;

    /// Every trait the stand-in implements besides its target.
    fn interfaces() -> Vec<TypeInfo>;

    /// Decide whether this stand-in can satisfy `descriptor`.
    ///
    /// The default accepts any extra types that are interfaces the stand-in
    /// implements.
    fn check_target(descriptor: &TargetDescriptor) -> Result<(), MockError> {
        let interfaces = Self::interfaces();
        for extra in descriptor.extra_types() {
            if !extra.is_interface() {
                return Err(MockError::unsupported(descriptor,
                    format!("{extra} is not an interface")));
            }
            if !interfaces.contains(extra) {
                return Err(MockError::unsupported(descriptor,
                    format!("{} does not implement {extra}", Self::target())));
            }
        }
        Ok(())
    }

    /// Build a new instance bound to `binding`.  Class stand-ins construct
    /// their base from `constructor_args`; others must receive none.
    fn generate(binding: Binding, constructor_args: Arguments)
        -> Result<Self, MockError>;

    fn binding(&self) -> &Binding;
}

/// Build a base type from type-erased constructor arguments.
///
/// Partial mocks need a real instance of the base type to delegate to.
///
/// # Examples
/// ```
/// # use replaymock::*;
/// struct Accumulator { total: i64 }
///
/// impl Construct for Accumulator {
///     fn construct(args: Arguments) -> Result<Self, MockError> {
///         let mut args = args.reader();
///         let total = args.next::<i64>()?;
///         args.finish()?;
///         Ok(Accumulator { total })
///     }
/// }
///
/// let a = Accumulator::construct(args![5i64]).unwrap();
/// assert_eq!(a.total, 5);
/// assert!(Accumulator::construct(args![]).is_err());
/// ```
pub trait Construct: Sized {
    fn construct(args: Arguments) -> Result<Self, MockError>;
}

impl<T: Default> Construct for T {
    fn construct(args: Arguments) -> Result<Self, MockError> {
        args.expect_none()?;
        Ok(T::default())
    }
}

/// Support code for `stand_in!`.  Not public API.
#[doc(hidden)]
pub mod __private {
    use std::{any, panic};

    use crate::{
        call::{CallOutcome, Signature},
        error::MockError,
        state::Binding,
        value::{Argument, ArgumentReader, Arguments, ReturnValue},
    };

    pub use crate::value::{DefaultReturner, NoDefault, ViaDefault};

    use super::Construct;

    /// Dispatch a call.  Mock failures surface as panics in the code under
    /// test.
    pub fn dispatch(binding: &Binding, signature: &Signature, args: Arguments)
        -> CallOutcome
    {
        match binding.dispatch(signature, args) {
            Ok(CallOutcome::Throw(payload)) => panic::resume_unwind(payload),
            Ok(outcome) => outcome,
            Err(e) => panic!("{e}")
        }
    }

    pub fn downcast_return<R: any::Any>(signature: &Signature,
                                        value: ReturnValue) -> R
    {
        match value.downcast::<R>() {
            Ok(r) => *r,
            Err(_) => panic!("{signature} returned something other than a {}",
                             any::type_name::<R>())
        }
    }

    pub fn unpack<T: Argument>(signature: &Signature,
                               args: &mut ArgumentReader) -> T
    {
        match args.next::<T>() {
            Ok(v) => v,
            Err(e) => panic!("{signature}: {e}")
        }
    }

    pub fn construct<B: Construct>(args: Arguments) -> Result<B, MockError> {
        B::construct(args)
            .map_err(|e| MockError::construction(any::type_name::<B>(), e))
    }

    /// Reached when a method without a base implementation is asked to
    /// delegate.
    pub fn no_base(signature: &Signature) -> ! {
        panic!("{signature} has no base implementation")
    }
}
