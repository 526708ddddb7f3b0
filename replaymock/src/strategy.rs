// vim: tw=80
//! The three policies for calls that no expectation covers.

use std::fmt;

use tracing::{trace, warn};

use crate::{
    call::{CallOutcome, Signature},
    error::MockError,
    expectation::{Expectation, Expectations, Lookup},
    value::Arguments,
};

/// How a mock treats calls, chosen once when the mock is created.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Strategy {
    /// Every replayed call must match a recorded expectation.
    Strict,
    /// Unmatched calls succeed and return the type's default value.
    Dynamic,
    /// Unmatched calls run the base type's real implementation.
    Partial,
}

impl Strategy {
    /// Register a call made while recording.  Returns the new expectation's
    /// index.
    pub(crate) fn on_recorded_call(self, book: &mut Expectations,
                                   signature: &Signature, args: Arguments)
        -> usize
    {
        trace!(strategy = ?self, call = %signature.render(&args),
               "recording expectation");
        book.push(Expectation::new(*signature, args))
    }

    /// Handle a call made while replaying.
    pub(crate) fn on_replayed_call(self, book: &mut Expectations,
                                   signature: &Signature, args: Arguments)
        -> Result<CallOutcome, MockError>
    {
        match book.lookup(signature, &args) {
            Lookup::Found(i) => {
                trace!(strategy = ?self, call = %signature.render(&args),
                       expectation = i, "matched expectation");
                book.call(i, args)
            },
            Lookup::Exhausted(i) => {
                let max = book.get(i)
                    .map_or(0, |e| e.max_calls());
                let exhausted = MockError::ExpectationExhausted {
                    call: signature.render(&args),
                    max
                };
                self.on_unmatched(book, signature, args, Some(exhausted))
            },
            Lookup::Missing => self.on_unmatched(book, signature, args, None)
        }
    }

    fn on_unmatched(self, book: &Expectations, signature: &Signature,
                    args: Arguments, exhausted: Option<MockError>)
        -> Result<CallOutcome, MockError>
    {
        match self {
            Strategy::Dynamic => {
                trace!(call = %signature.render(&args),
                       "accepting unmatched call");
                signature.default_value()
                    .map(CallOutcome::Return)
                    .ok_or_else(|| MockError::NoReturnValue {
                        call: signature.render(&args),
                        return_type: signature.return_type_name()
                    })
            },
            Strategy::Partial if signature.has_base() => {
                trace!(call = %signature.render(&args),
                       "delegating unmatched call to base");
                Ok(CallOutcome::Delegate(args))
            },
            Strategy::Strict | Strategy::Partial => {
                let call = signature.render(&args);
                warn!(strategy = ?self, %call, "unexpected call");
                Err(MockError::UnexpectedCall {
                    call,
                    expected: book.describe_for(signature, &args),
                    exhausted: exhausted.map(Box::new)
                })
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Strategy::Strict => "strict",
            Strategy::Dynamic => "dynamic",
            Strategy::Partial => "partial",
        })
    }
}
