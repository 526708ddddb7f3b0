// vim: tw=80
//! Errors reported by the mock repository and by intercepted calls.

use crate::state::MockId;

/// Everything that can go wrong while creating, driving or calling a mock.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MockError {
    /// The requested combination of types cannot describe a single mock.
    #[error("invalid mock target: {reason}")]
    InvalidTarget { reason: String },

    /// The target type cannot be mocked under the requested strategy.
    #[error("cannot mock {target}: {reason}")]
    UnsupportedTarget { target: String, reason: String },

    /// The base type could not be built from the constructor arguments.
    #[error("cannot construct {target}: {reason}")]
    Construction { target: String, reason: String },

    /// `begin_replay` was requested for a mock that is already replaying.
    #[error("{mock} is already in replay state")]
    AlreadyReplaying { mock: MockId },

    /// A replayed call matched no expectation and the strategy rejects it.
    #[error("unexpected call to {call}{}", render_expected(.expected))]
    UnexpectedCall {
        call: String,
        expected: Vec<String>,
        #[source]
        exhausted: Option<Box<MockError>>,
    },

    /// The matching expectation already used up its maximum call count.
    #[error("{call} was expected at most {max} time(s)")]
    ExpectationExhausted { call: String, max: usize },

    /// A value of the return type was needed but none was configured and the
    /// type has no default.
    #[error("{call} has no return value configured and {return_type} has no \
             default")]
    NoReturnValue { call: String, return_type: &'static str },

    /// A `return_once` value was requested a second time.
    #[error("{call} was configured with return_once but called again")]
    ReturnValueConsumed { call: String },

    /// Verification requires the mock to be replaying.
    #[error("{mock} is still recording; it must be replayed before \
             verification")]
    NotReplaying { mock: MockId },

    /// `last_call` was requested but nothing has been recorded.
    #[error("no call has been recorded on {mock}")]
    NoLastCall { mock: MockId },

    /// Verification found unmet expectations or rejected calls.
    #[error("{mock} failed verification:{}", render_list(.failures))]
    Unverified { mock: MockId, failures: Vec<String> },

    /// The mock was not created by this repository.
    #[error("{mock} does not belong to this repository")]
    UnknownMock { mock: MockId },

    /// An argument had a different type than the reader asked for.
    #[error("argument {position} is a {found}, not a {expected}")]
    ArgumentMismatch {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// The argument list had the wrong length.
    #[error("expected {expected} argument(s) but {found} were supplied")]
    ArgumentCount { expected: usize, found: usize },

    /// Several independent failures, e.g. from `verify_all`.
    #[error("{} mocks failed:{}", .0.len(), render_errors(.0))]
    Many(Vec<MockError>),
}

impl MockError {
    pub(crate) fn unsupported(target: impl ToString, reason: impl ToString)
        -> Self
    {
        MockError::UnsupportedTarget {
            target: target.to_string(),
            reason: reason.to_string()
        }
    }

    /// Wrap a failure to build `target` into a `Construction` error.
    pub fn construction(target: impl ToString, cause: MockError) -> Self {
        match cause {
            MockError::Construction{..} => cause,
            other => MockError::Construction {
                target: target.to_string(),
                reason: other.to_string()
            }
        }
    }

    /// Collapse a list of failures into one error, if there are any.
    pub(crate) fn collect(mut errors: Vec<MockError>) -> Result<(), Self> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(MockError::Many(errors))
        }
    }
}

fn render_expected(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!("; expected one of:{}", render_list(expected))
    }
}

fn render_list(items: &[String]) -> String {
    items.iter()
        .map(|i| format!("\n    {i}"))
        .collect()
}

fn render_errors(errors: &[MockError]) -> String {
    errors.iter()
        .map(|e| format!("\n  {e}"))
        .collect()
}
