// vim: tw=80
//! Per-mock state: the recording/replaying phase and the expectation book.
//!
//! Every stand-in owns a [`Binding`], a shared handle to its [`MockState`].
//! The repository keeps a clone of the same handle so that it can switch the
//! mock's phase and verify it later.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError
    },
};

use tracing::{debug, trace};

use crate::{
    call::{CallOutcome, Signature},
    error::MockError,
    expectation::{Expectation, ExpectationHandle, Expectations},
    strategy::Strategy,
    target::{TargetDescriptor, TypeInfo},
    value::Arguments,
};

/// Identifies one mock within the process.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MockId(u64);

impl MockId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        MockId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "mock #{}", self.0)
    }
}

/// Which half of the record/replay protocol a mock is in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Phase {
    /// Calls are registered as expectations.
    Recording,
    /// Calls are checked against the recorded expectations.
    Replaying,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Phase::Recording => "recording",
            Phase::Replaying => "replaying",
        })
    }
}

struct MockState {
    id: MockId,
    phase: Phase,
    strategy: Strategy,
    descriptor: TargetDescriptor,
    expectations: Expectations,
    /// Index of the expectation registered by the latest recorded call
    last_call: Option<usize>,
    /// Calls rejected while replaying, reported again by `verify`
    violations: Vec<String>,
    /// Bumped whenever the expectations are discarded, so that stale
    /// handles can't configure the wrong expectation.
    generation: u64,
}

/// Shared handle to one mock's state.
///
/// Cloning a `Binding` is cheap; every clone refers to the same mock.
#[derive(Clone)]
pub struct Binding(Arc<Mutex<MockState>>);

impl Binding {
    /// Create the state for a new mock, initially recording.
    pub(crate) fn new(id: MockId, strategy: Strategy,
                      descriptor: TargetDescriptor) -> Self
    {
        Binding(Arc::new(Mutex::new(MockState {
            id,
            phase: Phase::Recording,
            strategy,
            descriptor,
            expectations: Expectations::default(),
            last_call: None,
            violations: Vec::new(),
            generation: 0
        })))
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // Stand-ins panic on purpose, so the lock may be poisoned
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> MockId {
        self.lock().id
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn strategy(&self) -> Strategy {
        self.lock().strategy
    }

    /// The type this mock stands in for.
    pub fn primary_type(&self) -> TypeInfo {
        self.lock().descriptor.primary()
    }

    /// The additional interfaces this mock was requested to implement.
    pub fn extra_types(&self) -> Vec<TypeInfo> {
        self.lock().descriptor.extra_types().to_vec()
    }

    /// Human-readable description of the mocked types, like
    /// "Calculator + Named".
    pub fn target(&self) -> String {
        self.lock().descriptor.to_string()
    }

    /// Do both handles refer to the same mock?
    pub fn same_mock(&self, other: &Binding) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Switch from recording to replaying.
    pub fn begin_replay(&self) -> Result<(), MockError> {
        let mut state = self.lock();
        match state.phase {
            Phase::Recording => {
                state.phase = Phase::Replaying;
                debug!(mock = %state.id, expectations = state.expectations.len(),
                       "replaying");
                Ok(())
            },
            Phase::Replaying => Err(MockError::AlreadyReplaying {
                mock: state.id
            })
        }
    }

    /// Return to recording, discarding every expectation and every recorded
    /// violation.  The strategy is kept.
    pub fn back_to_record(&self) {
        let mut state = self.lock();
        state.expectations.clear();
        state.violations.clear();
        state.last_call = None;
        state.generation += 1;
        state.phase = Phase::Recording;
        debug!(mock = %state.id, "recording");
    }

    /// Route an intercepted call according to the phase and the strategy.
    ///
    /// While recording, the call becomes a new expectation and the method's
    /// default value is returned so the recording code can carry on.  While
    /// replaying, the strategy decides.
    pub fn dispatch(&self, signature: &Signature, args: Arguments)
        -> Result<CallOutcome, MockError>
    {
        let mut state = self.lock();
        let state = &mut *state;
        match state.phase {
            Phase::Recording => {
                let default = signature.default_value()
                    .ok_or_else(|| MockError::NoReturnValue {
                        call: signature.render(&args),
                        return_type: signature.return_type_name()
                    })?;
                let i = state.strategy.on_recorded_call(
                    &mut state.expectations, signature, args);
                state.last_call = Some(i);
                Ok(CallOutcome::Return(default))
            },
            Phase::Replaying => {
                let r = state.strategy.on_replayed_call(
                    &mut state.expectations, signature, args);
                // The code under test may catch the panic, so remember it
                match &r {
                    Err(MockError::UnexpectedCall{call, ..}) => state.violations
                        .push(format!("unexpected call to {call}")),
                    Err(e) => state.violations.push(e.to_string()),
                    Ok(_) => ()
                }
                r
            }
        }
    }

    /// Record an expectation directly, in any phase.
    ///
    /// This is what the `expect_*` methods of generated stand-ins use.  Unlike
    /// a recorded call, it does not need a default return value.
    pub fn expect(&self, signature: Signature, args: Arguments)
        -> ExpectationHandle
    {
        let mut state = self.lock();
        trace!(mock = %state.id, call = %signature.render(&args),
               "adding expectation");
        let i = state.expectations.push(Expectation::new(signature, args));
        state.last_call = Some(i);
        let generation = state.generation;
        drop(state);
        ExpectationHandle::new(self.clone(), i, generation)
    }

    /// The expectation registered by the most recent recorded call.
    pub fn last_call(&self) -> Result<ExpectationHandle, MockError> {
        let state = self.lock();
        match state.last_call {
            Some(i) => {
                let generation = state.generation;
                drop(state);
                Ok(ExpectationHandle::new(self.clone(), i, generation))
            },
            None => Err(MockError::NoLastCall{mock: state.id})
        }
    }

    /// Check that every expectation was called often enough and that no
    /// unexpected call was rejected.
    pub fn verify(&self) -> Result<(), MockError> {
        let state = self.lock();
        if state.phase != Phase::Replaying {
            return Err(MockError::NotReplaying{mock: state.id});
        }
        let mut failures = state.violations.clone();
        failures.extend(state.expectations.unsatisfied()
            .into_iter()
            .map(|e| format!("missing call: {e}")));
        debug!(mock = %state.id, failures = failures.len(), "verified");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MockError::Unverified{mock: state.id, failures})
        }
    }

    pub(crate) fn with_expectation<F>(&self, index: usize, generation: u64,
                                      f: F)
        where F: FnOnce(&mut Expectation)
    {
        let mut state = self.lock();
        assert_eq!(state.generation, generation,
            "Expectation handle outlived a back_to_record of {}", state.id);
        let id = state.id;
        match state.expectations.get_mut(index) {
            Some(e) => f(e),
            None => panic!("{id} has no expectation {index}")
        }
    }

    pub(crate) fn inspect_expectation<F, R>(&self, index: usize,
                                            generation: u64, f: F) -> R
        where F: FnOnce(&Expectation) -> R
    {
        let state = self.lock();
        assert_eq!(state.generation, generation,
            "Expectation handle outlived a back_to_record of {}", state.id);
        match state.expectations.get(index) {
            Some(e) => f(e),
            None => panic!("{} has no expectation {}", state.id, index)
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Binding")
            .field("id", &state.id)
            .field("target", &format_args!("{}", state.descriptor))
            .field("strategy", &state.strategy)
            .field("phase", &state.phase)
            .field("expectations", &state.expectations.len())
            .finish()
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::{args, value::{DefaultFn, ReturnValue}};

    trait Calculator {}

    fn zero() -> ReturnValue {
        Box::new(0i32)
    }

    fn add() -> Signature {
        Signature::new(TypeInfo::interface::<dyn Calculator>(), "add")
            .returning::<i32>(Some(zero as DefaultFn))
    }

    fn binding(strategy: Strategy) -> Binding {
        let d = TargetDescriptor::describe(
            TypeInfo::interface::<dyn Calculator>(), &[], args![]
        ).unwrap();
        Binding::new(MockId(1), strategy, d)
    }

    fn returned(outcome: CallOutcome) -> i32 {
        match outcome {
            CallOutcome::Return(v) => *v.downcast::<i32>().unwrap(),
            other => panic!("Unexpected outcome {other:?}")
        }
    }

    #[test]
    fn starts_recording() {
        let b = binding(Strategy::Strict);
        assert_eq!(b.phase(), Phase::Recording);
        assert_eq!(b.strategy(), Strategy::Strict);
        assert_eq!(b.target(), "Calculator");
    }

    #[test]
    fn begin_replay_twice() {
        let b = binding(Strategy::Strict);
        b.begin_replay().unwrap();
        assert_eq!(b.phase(), Phase::Replaying);
        let e = b.begin_replay().unwrap_err();
        assert_eq!(e.to_string(), "mock #1 is already in replay state");
    }

    #[test]
    fn recorded_call_returns_default() {
        let b = binding(Strategy::Strict);
        let o = b.dispatch(&add(), args![2i32, 3i32]).unwrap();
        assert_eq!(returned(o), 0);
        assert_eq!(b.last_call().unwrap().signature(), add());
    }

    #[test]
    fn recorded_call_without_default_registers_nothing() {
        let b = binding(Strategy::Strict);
        let sig = add().returning::<String>(None);
        let e = b.dispatch(&sig, args![]).unwrap_err();
        assert!(matches!(e, MockError::NoReturnValue{..}), "{e}");
        assert!(matches!(b.last_call(), Err(MockError::NoLastCall{..})));
    }

    #[test]
    fn record_then_replay() {
        let b = binding(Strategy::Strict);
        b.dispatch(&add(), args![2i32, 3i32]).unwrap();
        b.last_call().unwrap().returns(5i32);
        b.begin_replay().unwrap();
        let o = b.dispatch(&add(), args![2i32, 3i32]).unwrap();
        assert_eq!(returned(o), 5);
        b.verify().unwrap();
    }

    #[test]
    fn verify_reports_missing_calls() {
        let b = binding(Strategy::Strict);
        b.dispatch(&add(), args![2i32, 3i32]).unwrap();
        b.begin_replay().unwrap();
        let e = b.verify().unwrap_err();
        assert_eq!(e.to_string(),
            "mock #1 failed verification:\n    \
             missing call: Calculator::add(2, 3) [called 0 of 1]");
    }

    #[test]
    fn verify_reports_unexpected_calls() {
        let b = binding(Strategy::Strict);
        b.begin_replay().unwrap();
        b.dispatch(&add(), args![9i32, 9i32]).unwrap_err();
        let e = b.verify().unwrap_err();
        assert_eq!(e.to_string(),
            "mock #1 failed verification:\n    \
             unexpected call to Calculator::add(9, 9)");
    }

    #[test]
    fn verify_while_recording() {
        let b = binding(Strategy::Dynamic);
        let e = b.verify().unwrap_err();
        assert!(matches!(e, MockError::NotReplaying{..}), "{e}");
    }

    #[test]
    fn back_to_record_discards_everything() {
        let b = binding(Strategy::Strict);
        b.dispatch(&add(), args![2i32, 3i32]).unwrap();
        b.begin_replay().unwrap();
        b.dispatch(&add(), args![9i32, 9i32]).unwrap_err();
        b.back_to_record();
        assert_eq!(b.phase(), Phase::Recording);
        assert_eq!(b.strategy(), Strategy::Strict);
        assert!(b.last_call().is_err());
        b.begin_replay().unwrap();
        b.verify().unwrap();
    }

    #[test]
    #[should_panic(expected = "outlived a back_to_record")]
    fn stale_handle() {
        let b = binding(Strategy::Strict);
        b.dispatch(&add(), args![2i32, 3i32]).unwrap();
        let mut handle = b.last_call().unwrap();
        b.back_to_record();
        handle.returns(5i32);
    }

    #[test]
    fn expect_works_while_replaying() {
        let b = binding(Strategy::Strict);
        b.begin_replay().unwrap();
        b.expect(add(), args![1i32, 2i32]).returns(3i32);
        let o = b.dispatch(&add(), args![1i32, 2i32]).unwrap();
        assert_eq!(returned(o), 3);
    }

    #[test]
    fn clones_share_state() {
        let b = binding(Strategy::Dynamic);
        let c = b.clone();
        c.begin_replay().unwrap();
        assert_eq!(b.phase(), Phase::Replaying);
        assert!(b.same_mock(&c));
        assert!(!b.same_mock(&binding(Strategy::Dynamic)));
    }
}
