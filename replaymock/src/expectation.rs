// vim: tw=80
//! Recorded expectations and the handle used to configure them.

use std::{
    any::{self, Any},
    fmt,
    marker::PhantomData,
    mem,
    ops::Range,
};

use fragile::Fragile;
use predicates::prelude::Predicate;
use predicates_tree::CaseTreeExt;

use crate::{
    call::{CallOutcome, Signature},
    error::MockError,
    state::Binding,
    value::{Argument, Arguments, ReturnValue},
};

/// How many times an expectation may be, and must be, called.
#[derive(Debug)]
pub(crate) struct Times {
    /// How many times has the expectation already been called?
    count: usize,
    range: Range<usize>
}

impl Times {
    pub(crate) fn call(&mut self) {
        self.count += 1;
    }

    pub(crate) fn any(&mut self) {
        self.range = 0..usize::MAX;
    }

    /// Has this expectation already been called the maximum allowed number of
    /// times?
    pub(crate) fn is_done(&self) -> bool {
        self.count >= self.range.end.saturating_sub(1)
    }

    /// Has this expectation already been called the minimum required number of
    /// times?
    pub(crate) fn is_satisfied(&self) -> bool {
        self.count >= self.range.start
    }

    /// May this expectation be called any number of times?
    pub(crate) fn is_unbounded(&self) -> bool {
        self.range.end == usize::MAX
    }

    pub(crate) fn max(&self) -> usize {
        self.range.end.saturating_sub(1)
    }

    pub(crate) fn n(&mut self, n: usize) {
        self.range = n..n.saturating_add(1);
    }

    pub(crate) fn never(&mut self) {
        self.range = 0..1;
    }

    pub(crate) fn range(&mut self, range: Range<usize>) {
        assert!(range.start < range.end,
            "Call count ranges must not be empty");
        self.range = range;
    }
}

impl Default for Times {
    fn default() -> Self {
        // A recorded call is expected exactly once unless told otherwise
        Times{count: 0, range: 1..2}
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "called {}, at least {}", self.count, self.range.start)
        } else if self.range.end - self.range.start == 1 {
            write!(f, "called {} of {}", self.count, self.range.start)
        } else {
            write!(f, "called {} of {}..={}", self.count, self.range.start,
                   self.max())
        }
    }
}

/// Type-erased argument predicate.
trait ArgCheck: Send {
    fn eval(&self, arg: &dyn Argument) -> bool;

    /// Why `arg` fails this check.
    fn explain(&self, arg: &dyn Argument) -> String;

    fn describe(&self) -> String;
}

struct PredicateCheck<T, P> {
    predicate: P,
    // fn(&T) keeps this Send regardless of T
    _t: PhantomData<fn(&T)>
}

impl<T, P> ArgCheck for PredicateCheck<T, P>
    where T: Argument, P: Predicate<T> + Send
{
    fn eval(&self, arg: &dyn Argument) -> bool {
        arg.downcast_ref::<T>()
            .map_or(false, |v| self.predicate.eval(v))
    }

    fn explain(&self, arg: &dyn Argument) -> String {
        match arg.downcast_ref::<T>() {
            Ok(v) => self.predicate.find_case(false, v)
                .map(|case| case.tree().to_string())
                .unwrap_or_else(|| self.predicate.to_string()),
            Err(_) => format!("{} is not a {}", arg.argument_type(),
                              any::type_name::<T>())
        }
    }

    fn describe(&self) -> String {
        self.predicate.to_string()
    }
}

enum ArgConstraint {
    Equal(Box<dyn Argument>),
    Check(Box<dyn ArgCheck>),
    Anything,
}

impl ArgConstraint {
    fn eval(&self, arg: &dyn Argument) -> bool {
        match self {
            ArgConstraint::Equal(expected) => expected.eq_argument(arg),
            ArgConstraint::Check(check) => check.eval(arg),
            ArgConstraint::Anything => true
        }
    }
}

impl fmt::Display for ArgConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArgConstraint::Equal(expected) => write!(f, "{expected:?}"),
            ArgConstraint::Check(check) => f.write_str(&check.describe()),
            ArgConstraint::Anything => f.write_str("_")
        }
    }
}

/// Decides which calls an expectation accepts.
enum Matcher {
    /// One constraint per argument.  Starts out as equality with the recorded
    /// arguments.
    Args(Vec<ArgConstraint>),
    /// Any argument list at all.
    Any,
    Func(Box<dyn Fn(&Arguments) -> bool + Send>),
}

impl Matcher {
    fn matches(&self, args: &Arguments) -> bool {
        match self {
            Matcher::Args(constraints) => {
                constraints.len() == args.len() &&
                    constraints.iter()
                        .zip(args.iter())
                        .all(|(c, a)| c.eval(a))
            },
            Matcher::Any => true,
            Matcher::Func(f) => f(args)
        }
    }

    /// Explanations for each failing predicate, if any.
    fn explain(&self, args: &Arguments) -> Vec<String> {
        let Matcher::Args(constraints) = self else {
            return Vec::new();
        };
        constraints.iter()
            .zip(args.iter())
            .enumerate()
            .filter_map(|(i, (c, a))| match c {
                ArgConstraint::Check(check) if !check.eval(a) =>
                    Some(format!("argument {i}: {}", check.explain(a))),
                _ => None
            }).collect()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Matcher::Args(constraints) => {
                write!(f, "(")?;
                for (i, c) in constraints.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            },
            Matcher::Any => f.write_str("(..)"),
            Matcher::Func(_) => f.write_str("(<closure>)")
        }
    }
}

/// What an expectation does when it is matched.
enum Response {
    /// Return the type's default value
    Default,
    /// Indicates that a `return_once` expectation has already returned
    Expired,
    Mut(Box<dyn FnMut(&Arguments) -> ReturnValue + Send>),
    Once(Box<dyn FnOnce(&Arguments) -> ReturnValue + Send>),
    Throw(Box<dyn FnMut() -> ReturnValue + Send>),
    CallOriginal,
}

impl Response {
    fn respond(&mut self, signature: &Signature, args: Arguments)
        -> Result<CallOutcome, MockError>
    {
        match self {
            Response::Default => {
                signature.default_value()
                    .map(CallOutcome::Return)
                    .ok_or_else(|| MockError::NoReturnValue {
                        call: signature.render(&args),
                        return_type: signature.return_type_name()
                    })
            },
            Response::Expired => {
                Err(MockError::ReturnValueConsumed {
                    call: signature.render(&args)
                })
            },
            Response::Mut(f) => Ok(CallOutcome::Return(f(&args))),
            Response::Once(_) => {
                let Response::Once(f) = mem::replace(self, Response::Expired)
                else {
                    unreachable!()
                };
                Ok(CallOutcome::Return(f(&args)))
            },
            Response::Throw(f) => Ok(CallOutcome::Throw(f())),
            Response::CallOriginal => Ok(CallOutcome::Delegate(args))
        }
    }
}

/// A recorded description of an anticipated call.
pub(crate) struct Expectation {
    signature: Signature,
    matcher: Matcher,
    response: Response,
    times: Times,
}

impl Expectation {
    pub(crate) fn new(signature: Signature, args: Arguments) -> Self {
        let constraints = args.into_inner()
            .into_iter()
            .map(ArgConstraint::Equal)
            .collect();
        Expectation {
            signature,
            matcher: Matcher::Args(constraints),
            response: Response::Default,
            times: Times::default()
        }
    }

    pub(crate) fn signature(&self) -> &Signature {
        &self.signature
    }

    fn matches(&self, signature: &Signature, args: &Arguments) -> bool {
        self.signature == *signature && self.matcher.matches(args)
    }

    pub(crate) fn is_done(&self) -> bool {
        self.times.is_done()
    }

    pub(crate) fn is_satisfied(&self) -> bool {
        self.times.is_satisfied()
    }

    pub(crate) fn max_calls(&self) -> usize {
        self.times.max()
    }

    /// Consume one use and produce this expectation's outcome.
    fn call(&mut self, args: Arguments) -> Result<CallOutcome, MockError> {
        self.times.call();
        self.response.respond(&self.signature, args)
    }

    /// Render this expectation, optionally explaining why `actual` didn't
    /// match it.
    pub(crate) fn describe(&self, actual: Option<&Arguments>) -> String {
        let mut s = format!("{}{} [{}]", self.signature, self.matcher,
                            self.times);
        if let Some(args) = actual {
            for why in self.matcher.explain(args) {
                s.push_str("\n        ");
                s.push_str(&why);
            }
        }
        s
    }
}

/// Result of looking an intercepted call up in the book.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Lookup {
    /// The first matching expectation with uses left.
    Found(usize),
    /// Expectations matched, but all of them are used up.  Holds the first.
    Exhausted(usize),
    Missing,
}

/// Every expectation of one mock instance, in declaration order.
#[derive(Default)]
pub(crate) struct Expectations(Vec<Expectation>);

impl Expectations {
    pub(crate) fn push(&mut self, expectation: Expectation) -> usize {
        self.0.push(expectation);
        self.0.len() - 1
    }

    /// Find the expectation for a call.  Every current expectation will be
    /// checked in FIFO order and the first one with matching arguments and
    /// uses left will be chosen.
    pub(crate) fn lookup(&self, signature: &Signature, args: &Arguments)
        -> Lookup
    {
        let mut exhausted = None;
        for (i, e) in self.0.iter().enumerate() {
            if e.matches(signature, args) {
                if !e.is_done() {
                    return Lookup::Found(i);
                }
                exhausted.get_or_insert(i);
            }
        }
        exhausted.map_or(Lookup::Missing, Lookup::Exhausted)
    }

    /// Simulate calling the real method through expectation `index`.
    pub(crate) fn call(&mut self, index: usize, args: Arguments)
        -> Result<CallOutcome, MockError>
    {
        self.0[index].call(args)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Expectation> {
        self.0.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Expectation>
    {
        self.0.get_mut(index)
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Describe every expectation recorded for `signature`.
    pub(crate) fn describe_for(&self, signature: &Signature, args: &Arguments)
        -> Vec<String>
    {
        self.0.iter()
            .filter(|e| e.signature == *signature)
            .map(|e| e.describe(Some(args)))
            .collect()
    }

    /// Describe every expectation that was called too few times.
    pub(crate) fn unsatisfied(&self) -> Vec<String> {
        self.0.iter()
            .filter(|e| !e.is_satisfied())
            .map(|e| e.describe(None))
            .collect()
    }
}

/// Configures one recorded expectation.
///
/// Returned by [`Binding::expect`], [`Binding::last_call`], the repository's
/// `last_call` and the `expect_*` methods of generated stand-ins.  The handle
/// is only a reference; configuration takes effect immediately on the mock.
///
/// Misconfiguration, like returning a value of the wrong type, panics.
#[derive(Clone)]
pub struct ExpectationHandle {
    binding: Binding,
    index: usize,
    generation: u64,
}

impl ExpectationHandle {
    pub(crate) fn new(binding: Binding, index: usize, generation: u64) -> Self
    {
        ExpectationHandle{binding, index, generation}
    }

    fn update<F>(&mut self, f: F) -> &mut Self
        where F: FnOnce(&mut Expectation)
    {
        self.binding.with_expectation(self.index, self.generation, f);
        self
    }

    fn set_response<R: Any>(&mut self, what: &str, response: Response)
        -> &mut Self
    {
        self.update(|e| {
            assert!(e.signature.returns::<R>(),
                "{} returns {}, but {} was given a {}", e.signature,
                e.signature.return_type_name(), what, any::type_name::<R>());
            e.response = response;
        })
    }

    /// The mock this expectation belongs to.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The method this expectation is for.
    pub fn signature(&self) -> Signature {
        self.binding.inspect_expectation(self.index, self.generation,
                                         |e| *e.signature())
    }

    /// Return a constant value.  It is cloned for every matching call.
    pub fn returns<R>(&mut self, value: R) -> &mut Self
        where R: Clone + Send + 'static
    {
        let f = move |_: &Arguments| -> ReturnValue {
            Box::new(value.clone())
        };
        self.set_response::<R>("returns", Response::Mut(Box::new(f)))
    }

    /// Supply a closure that will provide the return value.  This is also the
    /// place for side effects.
    ///
    /// The closure runs while the mock's state is locked, so it must not call
    /// back into the same mock.  Doing so deadlocks.
    pub fn returning<R, F>(&mut self, mut f: F) -> &mut Self
        where R: Send + 'static, F: FnMut(&Arguments) -> R + Send + 'static
    {
        let rf = move |args: &Arguments| -> ReturnValue { Box::new(f(args)) };
        self.set_response::<R>("returning", Response::Mut(Box::new(rf)))
    }

    /// Single-threaded version of [`returning`](#method.returning).  Can be
    /// used when the closure isn't `Send`.
    ///
    /// It is a runtime error to call the mock method from a different thread
    /// than the one that originally called this method.
    pub fn returning_st<R, F>(&mut self, f: F) -> &mut Self
        where R: Send + 'static, F: FnMut(&Arguments) -> R + 'static
    {
        let mut fragile = Fragile::new(f);
        let rf = move |args: &Arguments| -> ReturnValue {
            Box::new((fragile.get_mut())(args))
        };
        self.set_response::<R>("returning_st", Response::Mut(Box::new(rf)))
    }

    /// Return `value` once.  Useful for return types that aren't `Clone`.
    pub fn return_once<R: Send + 'static>(&mut self, value: R) -> &mut Self {
        let f = move |_: &Arguments| -> ReturnValue { Box::new(value) };
        self.set_response::<R>("return_once", Response::Once(Box::new(f)))
    }

    /// Unwind with a clone of `payload` whenever this expectation matches.
    pub fn throwing<E>(&mut self, payload: E) -> &mut Self
        where E: Clone + Send + 'static
    {
        let f = move || -> ReturnValue { Box::new(payload.clone()) };
        self.update(|e| e.response = Response::Throw(Box::new(f)))
    }

    /// Run the real implementation when this expectation matches.  Only valid
    /// for methods with a base implementation.
    pub fn call_original(&mut self) -> &mut Self {
        self.update(|e| {
            assert!(e.signature.has_base(),
                "{} has no base implementation to call", e.signature);
            e.response = Response::CallOriginal;
        })
    }

    /// Expect this expectation to be called exactly once.  Shortcut for
    /// [`times(1)`](#method.times).
    pub fn once(&mut self) -> &mut Self {
        self.times(1)
    }

    /// Require this expectation to be called exactly `n` times.
    pub fn times(&mut self, n: usize) -> &mut Self {
        self.update(|e| e.times.n(n))
    }

    /// Allow this expectation to be called any number of times within a
    /// given range
    pub fn times_range(&mut self, range: Range<usize>) -> &mut Self {
        self.update(|e| e.times.range(range))
    }

    /// Make this expectation repeatable: it matches any number of calls and
    /// is never used up.
    pub fn repeat_any(&mut self) -> &mut Self {
        self.update(|e| e.times.any())
    }

    /// Forbid this expectation from ever being called.  A matching call is
    /// then treated as unexpected.
    pub fn never(&mut self) -> &mut Self {
        self.update(|e| e.times.never())
    }

    /// Match calls regardless of their arguments.
    pub fn ignore_arguments(&mut self) -> &mut Self {
        self.update(|e| e.matcher = Matcher::Any)
    }

    /// Constrain argument `index` with a [`Predicate`] instead of equality.
    ///
    /// # Examples
    /// ```no_run
    /// # use replaymock::*;
    /// # fn f(mut handle: ExpectationHandle) {
    /// handle.with_arg::<i32, _>(1, predicate::gt(10));
    /// # }
    /// ```
    pub fn with_arg<T, P>(&mut self, index: usize, predicate: P) -> &mut Self
        where T: Argument, P: Predicate<T> + Send + 'static
    {
        let check = PredicateCheck{predicate, _t: PhantomData::<fn(&T)>};
        self.update(|e| {
            let Matcher::Args(constraints) = &mut e.matcher else {
                panic!("with_arg needs a per-argument matcher");
            };
            assert!(index < constraints.len(),
                "{} has no argument {}", e.signature, index);
            constraints[index] = ArgConstraint::Check(Box::new(check));
        })
    }

    /// Accept argument `index`, whatever its value.
    pub fn any_arg(&mut self, index: usize) -> &mut Self {
        self.update(|e| {
            let Matcher::Args(constraints) = &mut e.matcher else {
                panic!("any_arg needs a per-argument matcher");
            };
            assert!(index < constraints.len(),
                "{} has no argument {}", e.signature, index);
            constraints[index] = ArgConstraint::Anything;
        })
    }

    /// Replace all argument constraints with a closure over the whole list.
    pub fn matching<F>(&mut self, f: F) -> &mut Self
        where F: Fn(&Arguments) -> bool + Send + 'static
    {
        self.update(|e| e.matcher = Matcher::Func(Box::new(f)))
    }
}

impl fmt::Debug for ExpectationHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ExpectationHandle")
            .field("mock", &self.binding.id())
            .field("index", &self.index)
            .finish()
    }
}
