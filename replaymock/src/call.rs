// vim: tw=80
//! Intercepted calls as the dispatch engine sees them.

use std::{any, fmt};

use crate::{
    target::TypeInfo,
    value::{Arguments, DefaultFn, ReturnType, ReturnValue},
};

/// Identifies one mockable method and knows how to make its default value.
#[derive(Clone, Copy)]
pub struct Signature {
    owner: TypeInfo,
    method: &'static str,
    return_type: ReturnType,
    default_fn: Option<DefaultFn>,
    has_base: bool,
}

impl Signature {
    /// A method of `owner` returning `()`, with no base implementation.
    pub fn new(owner: TypeInfo, method: &'static str) -> Self {
        Signature {
            owner,
            method,
            return_type: ReturnType::of::<()>(),
            default_fn: Some(unit as DefaultFn),
            has_base: false
        }
    }

    /// Set the return type.
    ///
    /// `default_fn` produces the type-appropriate default, when the type has
    /// one.  Generated stand-ins compute it with autoref specialization.
    pub fn returning<R: any::Any>(mut self, default_fn: Option<DefaultFn>)
        -> Self
    {
        self.return_type = ReturnType::of::<R>();
        self.default_fn = default_fn;
        self
    }

    /// Declare that a real implementation exists for partial mocks to fall
    /// back on.
    pub fn with_base(mut self, has_base: bool) -> Self {
        self.has_base = has_base;
        self
    }

    pub fn owner(&self) -> TypeInfo {
        self.owner
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn return_type_name(&self) -> &'static str {
        self.return_type.name
    }

    /// Does this method return a `R`?
    pub fn returns<R: any::Any>(&self) -> bool {
        self.return_type.id == any::TypeId::of::<R>()
    }

    pub fn has_base(&self) -> bool {
        self.has_base
    }

    /// The return type's default value, if it has one.
    pub fn default_value(&self) -> Option<ReturnValue> {
        self.default_fn.map(|f| f())
    }

    /// Render a call of this method, like "Calculator::add(2, 3)".
    pub fn render(&self, args: &Arguments) -> String {
        format!("{self}{args}")
    }
}

fn unit() -> ReturnValue {
    Box::new(())
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.method == other.method
    }
}

impl Eq for Signature {}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature")
            .field("owner", &self.owner.name())
            .field("method", &self.method)
            .field("return_type", &self.return_type.name)
            .field("has_default", &self.default_fn.is_some())
            .field("has_base", &self.has_base)
            .finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.method)
    }
}

/// What the stand-in must do to finish an intercepted call.
pub enum CallOutcome {
    /// Return this value, which has the method's return type.
    Return(ReturnValue),
    /// Unwind with this payload.
    Throw(ReturnValue),
    /// Run the base implementation with these arguments.
    Delegate(Arguments),
}

impl fmt::Debug for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallOutcome::Return(_) => f.write_str("Return(..)"),
            CallOutcome::Throw(_) => f.write_str("Throw(..)"),
            CallOutcome::Delegate(args) => write!(f, "Delegate{args}"),
        }
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::args;

    trait Calculator {}
    trait Other {}

    fn zero() -> ReturnValue {
        Box::new(0i32)
    }

    fn add() -> Signature {
        Signature::new(TypeInfo::interface::<dyn Calculator>(), "add")
            .returning::<i32>(Some(zero as DefaultFn))
    }

    #[test]
    fn equality_ignores_return_type() {
        let plain = Signature::new(TypeInfo::interface::<dyn Calculator>(),
                                   "add");
        assert_eq!(add(), plain);
        assert_ne!(add(),
            Signature::new(TypeInfo::interface::<dyn Other>(), "add"));
        assert_ne!(add(),
            Signature::new(TypeInfo::interface::<dyn Calculator>(), "sub"));
    }

    #[test]
    fn render() {
        assert_eq!(add().render(&args![2i32, 3i32]), "Calculator::add(2, 3)");
    }

    #[test]
    fn default_value() {
        let v = add().default_value().unwrap();
        assert_eq!(*v.downcast::<i32>().unwrap(), 0);
        let none = add().returning::<String>(None);
        assert!(none.default_value().is_none());
        assert!(none.returns::<String>());
        assert!(!none.returns::<i32>());
    }
}
