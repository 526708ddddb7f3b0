// vim: tw=80
//! Record/replay mock objects for Rust.
//!
//! Replaymock creates stand-ins for traits and concrete types and drives them
//! through a two-phase protocol.  While *recording*, every call made on a
//! mock is written down as an expectation.  After the switch to *replaying*,
//! calls are checked against those expectations.  Finally the test asks the
//! repository to *verify* that everything that was expected actually
//! happened.
//!
//! # Usage
//!
//! * Describe the type to mock with [`stand_in!`].  It generates a struct
//!   named like the original, with "Mock" prepended.
//! * Create the mock through a [`MockRepository`], choosing a [`Strategy`].
//! * Call the mock the way the code under test will, and configure each
//!   recorded call through [`MockRepository::last_call`].
//! * [`replay_all`](MockRepository::replay_all), run the code under test, then
//!   [`verify_all`](MockRepository::verify_all).
//!
//! ```
//! use replaymock::*;
//!
//! pub trait Calculator {
//!     fn add(&self, a: i32, b: i32) -> i32;
//! }
//!
//! stand_in! {
//!     pub Calculator {}
//!     impl Calculator for Calculator {
//!         fn add(&self, a: i32, b: i32) -> i32;
//!     }
//! }
//!
//! let mut repo = MockRepository::new();
//! let calc = repo.create_strict::<MockCalculator>(args![]).unwrap();
//! calc.add(2, 3);
//! repo.last_call(&calc).unwrap().returns(5);
//! repo.replay_all().unwrap();
//!
//! assert_eq!(calc.add(2, 3), 5);
//! repo.verify_all().unwrap();
//! ```
//!
//! # Strategies
//!
//! A replaying mock first looks for a recorded expectation with the same
//! method and equal arguments that hasn't been used up.  Expectations are
//! searched in the order they were recorded.  When none matches, the
//! strategy decides:
//!
//! * [`Strict`](Strategy::Strict) mocks panic with an "unexpected call"
//!   message and remember the violation for `verify`.
//! * [`Dynamic`](Strategy::Dynamic) mocks return the method's default value,
//!   which is `Default::default()` of the return type.
//! * [`Partial`](Strategy::Partial) mocks run the base type's real
//!   implementation.  They are only available for stand-ins of concrete
//!   types.
//!
//! # Expectations
//!
//! A recorded call is expected exactly once, with exactly the recorded
//! arguments, and returns the default value.  [`ExpectationHandle`] changes
//! any of that:
//!
//! ```
//! # use replaymock::*;
//! # pub trait Calculator {
//! #     fn add(&self, a: i32, b: i32) -> i32;
//! # }
//! # stand_in! {
//! #     pub Calculator {}
//! #     impl Calculator for Calculator {
//! #         fn add(&self, a: i32, b: i32) -> i32;
//! #     }
//! # }
//! let mut repo = MockRepository::new();
//! let calc = repo.create_strict::<MockCalculator>(args![]).unwrap();
//! calc.add(0, 0);
//! repo.last_call(&calc).unwrap()
//!     .any_arg(0)
//!     .with_arg::<i32, _>(1, predicate::gt(10))
//!     .returning(|args| args.get::<i32>(0).unwrap() * 2)
//!     .times(2);
//! repo.replay_all().unwrap();
//!
//! assert_eq!(calc.add(4, 11), 8);
//! assert_eq!(calc.add(5, 99), 10);
//! repo.verify_all().unwrap();
//! ```
//!
//! Expectations can also be added without recording, through the generated
//! `expect_*` methods.  That works in either phase, and is the only way to
//! configure mocks made by the `generate_*` family, which start out
//! replaying.
//!
//! # Partial mocks
//!
//! Name the base type after a colon.  Its constructor arguments are passed
//! to [`Construct`], which is implemented automatically for `Default` types.
//!
//! ```
//! # use replaymock::*;
//! pub trait Calculator {
//!     fn add(&self, a: i32, b: i32) -> i32;
//! }
//! #[derive(Default)]
//! pub struct Adder;
//! impl Calculator for Adder {
//!     fn add(&self, a: i32, b: i32) -> i32 { a + b }
//! }
//!
//! stand_in! {
//!     pub Adder: Adder {}
//!     impl Calculator for Adder {
//!         fn add(&self, a: i32, b: i32) -> i32;
//!     }
//! }
//!
//! let mut repo = MockRepository::new();
//! let adder = repo.generate_partial_mock::<MockAdder>(args![]).unwrap();
//! adder.expect_add(1, 1).returns(0);
//! assert_eq!(adder.add(1, 1), 0);
//! assert_eq!(adder.add(4, 4), 8);
//! ```
//!
//! # Logging
//!
//! Replaymock emits [`tracing`](https://docs.rs/tracing) events: `debug`
//! for lifecycle changes, `trace` for every dispatch decision and `warn` for
//! rejected calls.  It never installs a subscriber.

mod call;
mod error;
mod expectation;
mod repository;
mod stand_in;
mod state;
mod strategy;
mod target;
mod value;

pub use crate::{
    call::{CallOutcome, Signature},
    error::MockError,
    expectation::ExpectationHandle,
    repository::MockRepository,
    stand_in::{Construct, StandIn},
    state::{Binding, MockId, Phase},
    strategy::Strategy,
    target::{TargetDescriptor, TypeInfo, TypeKind},
    value::{Argument, ArgumentReader, Arguments, DefaultFn, ReturnValue},
};
pub use predicates::prelude::{Predicate, predicate};
pub use replaymock_derive::stand_in;

#[doc(hidden)]
pub use crate::stand_in::__private;
