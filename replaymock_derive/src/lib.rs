// vim: tw=80
//! Proc macros for use with Replaymock
//!
//! You probably don't want to use this crate directly.  Instead, you use use
//! its reexports via the [`replaymock`](../replaymock/index.html) crate.

extern crate proc_macro;

use cfg_if::cfg_if;
use proc_macro2::Span;

mod stand_in;
use crate::stand_in::do_stand_in;

cfg_if! {
    // Spans only point at the offending tokens reliably when proc-macro2 is
    // built for nightly, and never in test mode.
    if #[cfg(all(feature = "nightly_derive", not(test)))] {
        fn compile_error(span: Span, msg: &str) -> syn::Error {
            syn::Error::new(span, msg)
        }
    } else {
        fn compile_error(span: Span, msg: &str) -> syn::Error {
            syn::Error::new(span, format!("{msg}.  More information may be \
                available when replaymock is built with the \"nightly\" \
                feature."))
        }
    }
}

/// Generate a stand-in struct that routes every call through a replaymock
/// `Binding`.
///
/// The syntax lists the type to impersonate, optionally its base type after a
/// colon, the base type's inherent methods, and then one `impl` block per
/// trait.  Method bodies are omitted.  The generated struct is named like the
/// original, with "Mock" prepended.
///
/// * Trait methods are intercepted.  Each one also gets an `expect_*` method
///   on the stand-in that records an expectation directly.
/// * Inherent methods are never intercepted; they always run the base type's
///   implementation.
/// * `#[no_base]` on an `impl` block marks a trait that the base type does
///   not implement.  Its methods have nothing to fall back on in partial
///   mocks.
///
/// Generic methods, `async` methods, methods taking `&mut` arguments and
/// methods returning references can't be intercepted.
///
/// # Examples
///
/// A stand-in for a trait:
/// ```ignore
/// # use replaymock::*;
/// pub trait Calculator {
///     fn add(&self, a: i32, b: i32) -> i32;
/// }
///
/// stand_in! {
///     pub Calculator {}
///     impl Calculator for Calculator {
///         fn add(&self, a: i32, b: i32) -> i32;
///     }
/// }
/// # fn main() {}
/// ```
///
/// A stand-in for a concrete type, which also implements a trait of its own:
/// ```ignore
/// # use replaymock::*;
/// pub trait Calculator {
///     fn add(&self, a: i32, b: i32) -> i32;
/// }
/// pub trait Named {
///     fn name(&self) -> String;
/// }
///
/// #[derive(Default)]
/// pub struct Accumulator { total: i64 }
/// impl Accumulator {
///     pub fn total(&self) -> i64 { self.total }
/// }
/// impl Calculator for Accumulator {
///     fn add(&self, a: i32, b: i32) -> i32 { a + b }
/// }
///
/// stand_in! {
///     pub Accumulator: Accumulator {
///         fn total(&self) -> i64;
///     }
///     impl Calculator for Accumulator {
///         fn add(&self, a: i32, b: i32) -> i32;
///     }
///     #[no_base]
///     impl Named for Accumulator {
///         fn name(&self) -> String;
///     }
/// }
/// # fn main() {}
/// ```
#[proc_macro]
pub fn stand_in(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    do_stand_in(item.into()).into()
}
