// vim: tw=80
//! Creates mocks and drives them through the record/replay protocol.

use tracing::debug;

use crate::{
    error::MockError,
    expectation::ExpectationHandle,
    stand_in::StandIn,
    state::{Binding, MockId, Phase},
    strategy::Strategy,
    target::{TargetDescriptor, TypeInfo, TypeKind},
    value::Arguments,
};

/// Factory and registry of mocks.
///
/// Every mock a repository creates starts out [recording], unless it was
/// created by one of the `generate_*` methods.  The repository can replay,
/// reset and verify its mocks one at a time or all together.
///
/// # Examples
/// ```
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
///
/// let mut repo = MockRepository::new();
/// let calc = repo.create_strict::<MockCalculator>(args![]).unwrap();
/// calc.add(2, 3);
/// repo.last_call(&calc).unwrap().returns(5);
/// repo.replay_all().unwrap();
/// assert_eq!(calc.add(2, 3), 5);
/// repo.verify_all().unwrap();
/// ```
///
/// [recording]: crate::Phase::Recording
#[derive(Debug, Default)]
pub struct MockRepository {
    mocks: Vec<Binding>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock of `S`'s target plus `extra_types`, in recording state.
    pub fn create<S: StandIn>(&mut self, strategy: Strategy,
                              extra_types: &[TypeInfo],
                              constructor_args: Arguments)
        -> Result<S, MockError>
    {
        let target = S::target();
        if strategy == Strategy::Partial && target.kind() != TypeKind::Class {
            return Err(MockError::unsupported(target,
                "partial mocks need a base type to delegate to"));
        }
        let mut descriptor = TargetDescriptor::describe(target, extra_types,
                                                        constructor_args)?;
        S::check_target(&descriptor)?;
        let args = descriptor.take_constructor_arguments();
        let id = MockId::next();
        let binding = Binding::new(id, strategy, descriptor);
        let mock = S::generate(binding.clone(), args)?;
        debug!(mock = %id, target = %binding.target(), %strategy, "created");
        self.mocks.push(binding);
        Ok(mock)
    }

    /// Create a mock that rejects every call it wasn't told to expect.
    pub fn create_strict<S: StandIn>(&mut self, constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.create(Strategy::Strict, &[], constructor_args)
    }

    /// Create a mock that answers unexpected calls with default values.
    pub fn create_dynamic<S: StandIn>(&mut self, constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.create(Strategy::Dynamic, &[], constructor_args)
    }

    /// Create a mock of a base type that runs the real implementation for
    /// unexpected calls.
    pub fn create_partial<S: StandIn>(&mut self, constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.create(Strategy::Partial, &[], constructor_args)
    }

    pub fn create_multi_strict<S: StandIn>(&mut self,
                                           extra_types: &[TypeInfo],
                                           constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.create(Strategy::Strict, extra_types, constructor_args)
    }

    pub fn create_multi_dynamic<S: StandIn>(&mut self,
                                            extra_types: &[TypeInfo],
                                            constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.create(Strategy::Dynamic, extra_types, constructor_args)
    }

    pub fn create_multi_partial<S: StandIn>(&mut self,
                                            extra_types: &[TypeInfo],
                                            constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.create(Strategy::Partial, extra_types, constructor_args)
    }

    /// Create a strict mock that is already replaying.  Expectations must be
    /// added through its `expect_*` methods.
    pub fn generate_strict_mock<S: StandIn>(&mut self,
                                            constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.generate(Strategy::Strict, constructor_args)
    }

    /// Create a dynamic mock that is already replaying.  Usable as a stub
    /// right away.
    pub fn generate_mock<S: StandIn>(&mut self, constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.generate(Strategy::Dynamic, constructor_args)
    }

    /// Create a partial mock that is already replaying.
    pub fn generate_partial_mock<S: StandIn>(&mut self,
                                             constructor_args: Arguments)
        -> Result<S, MockError>
    {
        self.generate(Strategy::Partial, constructor_args)
    }

    fn generate<S: StandIn>(&mut self, strategy: Strategy,
                            constructor_args: Arguments)
        -> Result<S, MockError>
    {
        let mock = self.create::<S>(strategy, &[], constructor_args)?;
        mock.binding().begin_replay()?;
        Ok(mock)
    }

    /// Switch one mock to replaying.
    pub fn replay<S: StandIn>(&self, mock: &S) -> Result<(), MockError> {
        self.owned(mock)?.begin_replay()
    }

    /// Switch every mock that is still recording to replaying.
    pub fn replay_all(&self) -> Result<(), MockError> {
        for b in self.mocks.iter() {
            if b.phase() == Phase::Recording {
                b.begin_replay()?;
            }
        }
        Ok(())
    }

    /// Return one mock to recording, discarding its expectations.
    pub fn back_to_record<S: StandIn>(&self, mock: &S)
        -> Result<(), MockError>
    {
        self.owned(mock)?.back_to_record();
        Ok(())
    }

    pub fn back_to_record_all(&self) {
        for b in self.mocks.iter() {
            b.back_to_record();
        }
    }

    /// Verify one mock.
    pub fn verify<S: StandIn>(&self, mock: &S) -> Result<(), MockError> {
        self.owned(mock)?.verify()
    }

    /// Verify every mock, reporting all failures together.
    pub fn verify_all(&self) -> Result<(), MockError> {
        let errors = self.mocks.iter()
            .filter_map(|b| b.verify().err())
            .collect();
        MockError::collect(errors)
    }

    /// The expectation registered by `mock`'s most recent recorded call.
    pub fn last_call<S: StandIn>(&self, mock: &S)
        -> Result<ExpectationHandle, MockError>
    {
        self.owned(mock)?.last_call()
    }

    /// How many mocks this repository has created.
    pub fn len(&self) -> usize {
        self.mocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mocks.is_empty()
    }

    fn owned<'a, S: StandIn>(&self, mock: &'a S)
        -> Result<&'a Binding, MockError>
    {
        let binding = mock.binding();
        if self.mocks.iter().any(|b| b.same_mock(binding)) {
            Ok(binding)
        } else {
            Err(MockError::UnknownMock{mock: binding.id()})
        }
    }
}
