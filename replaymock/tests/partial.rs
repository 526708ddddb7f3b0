// vim: tw=80
//! Partial mocks run the base type's real implementation for calls that no
//! expectation covers.

use std::sync::atomic::{AtomicUsize, Ordering};

use replaymock::*;

pub trait Calculator {
    fn add(&self, a: i32, b: i32) -> i32;
    fn describe(&self, label: &str) -> String;
}

pub trait Counter {
    fn bump(&mut self) -> u64;
}

pub trait Named {
    fn name(&self) -> String;
}

/// A real calculator that counts how often its methods ran.
#[derive(Debug, Default)]
pub struct Accumulator {
    calls: AtomicUsize,
    bumps: u64,
}

impl Accumulator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Calculator for Accumulator {
    fn add(&self, a: i32, b: i32) -> i32 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        a + b
    }

    fn describe(&self, label: &str) -> String {
        self.calls.fetch_add(1, Ordering::Relaxed);
        format!("{label}: accumulator")
    }
}

impl Counter for Accumulator {
    fn bump(&mut self) -> u64 {
        self.bumps += 1;
        self.bumps
    }
}

stand_in! {
    pub Accumulator: Accumulator {
        fn calls(&self) -> usize;
    }
    impl Calculator for Accumulator {
        fn add(&self, a: i32, b: i32) -> i32;
        fn describe(&self, label: &str) -> String;
    }
    impl Counter for Accumulator {
        fn bump(&mut self) -> u64;
    }
    #[no_base]
    impl Named for Accumulator {
        fn name(&self) -> String;
    }
}

/// A base type that needs constructor arguments
#[derive(Debug)]
pub struct Offset {
    by: i32,
}

impl Construct for Offset {
    fn construct(args: Arguments) -> Result<Self, MockError> {
        let mut args = args.reader();
        let by = args.next::<i32>()?;
        args.finish()?;
        Ok(Offset{by})
    }
}

impl Calculator for Offset {
    fn add(&self, a: i32, b: i32) -> i32 {
        a + b + self.by
    }

    fn describe(&self, label: &str) -> String {
        format!("{label} + {}", self.by)
    }
}

stand_in! {
    pub Offset: Offset {}
    impl Calculator for Offset {
        fn add(&self, a: i32, b: i32) -> i32;
        fn describe(&self, label: &str) -> String;
    }
}

#[test]
fn unrecorded_call_runs_base() {
    let mut repo = MockRepository::new();
    let acc = repo.create_partial::<MockAccumulator>(args![]).unwrap();
    repo.replay_all().unwrap();
    assert_eq!(acc.add(4, 4), 8);
    assert_eq!(acc.calls(), 1);
    repo.verify_all().unwrap();
}

#[test]
fn recorded_call_never_reaches_base() {
    let mut repo = MockRepository::new();
    let acc = repo.create_partial::<MockAccumulator>(args![]).unwrap();
    acc.add(4, 4);
    repo.last_call(&acc).unwrap().returns(100);
    repo.replay_all().unwrap();
    assert_eq!(acc.add(4, 4), 100);
    assert_eq!(acc.calls(), 0);
    assert_eq!(acc.add(4, 5), 9);
    assert_eq!(acc.calls(), 1);
    repo.verify_all().unwrap();
}

#[test]
fn exhausted_expectation_falls_back_to_base() {
    let mut repo = MockRepository::new();
    let acc = repo.create_partial::<MockAccumulator>(args![]).unwrap();
    acc.add(4, 4);
    repo.last_call(&acc).unwrap().returns(100);
    repo.replay_all().unwrap();
    assert_eq!(acc.add(4, 4), 100);
    assert_eq!(acc.add(4, 4), 8);
    assert_eq!(acc.calls(), 1);
    repo.verify_all().unwrap();
}

#[test]
fn recording_does_not_reach_base() {
    let mut repo = MockRepository::new();
    let acc = repo.create_partial::<MockAccumulator>(args![]).unwrap();
    assert_eq!(acc.add(4, 4), 0);
    assert_eq!(acc.calls(), 0);
}

#[test]
fn borrowed_arguments_are_delegated() {
    let mut repo = MockRepository::new();
    let acc = repo.generate_partial_mock::<MockAccumulator>(args![])
        .unwrap();
    acc.expect_describe("mocked").returns("canned".to_owned());
    assert_eq!(acc.describe("mocked"), "canned");
    assert_eq!(acc.describe("real"), "real: accumulator");
}

#[test]
fn mutable_receiver_is_delegated() {
    let mut repo = MockRepository::new();
    let mut acc = repo.generate_partial_mock::<MockAccumulator>(args![])
        .unwrap();
    assert_eq!(acc.bump(), 1);
    assert_eq!(acc.bump(), 2);
}

#[test]
fn call_original() {
    let mut repo = MockRepository::new();
    let acc = repo.create_partial::<MockAccumulator>(args![]).unwrap();
    acc.add(1, 2);
    repo.last_call(&acc).unwrap().call_original().times(2);
    repo.replay_all().unwrap();
    assert_eq!(acc.add(1, 2), 3);
    assert_eq!(acc.add(1, 2), 3);
    assert_eq!(acc.calls(), 2);
    repo.verify_all().unwrap();
}

#[test]
#[should_panic(expected = "unexpected call to Named::name()")]
fn trait_without_base_is_strict() {
    let mut repo = MockRepository::new();
    let acc = repo.generate_partial_mock::<MockAccumulator>(args![])
        .unwrap();
    acc.name();
}

#[test]
fn trait_without_base_uses_expectations() {
    let mut repo = MockRepository::new();
    let acc = repo.generate_partial_mock::<MockAccumulator>(args![])
        .unwrap();
    acc.expect_name().returns("acc".to_owned());
    assert_eq!(acc.name(), "acc");
}

#[test]
#[should_panic(expected = "has no base implementation to call")]
fn call_original_without_base() {
    let mut repo = MockRepository::new();
    let acc = repo.create_partial::<MockAccumulator>(args![]).unwrap();
    acc.expect_name().call_original();
}

#[test]
fn constructor_arguments() {
    let mut repo = MockRepository::new();
    let off = repo.generate_partial_mock::<MockOffset>(args![10i32]).unwrap();
    assert_eq!(off.add(1, 2), 13);
    assert_eq!(off.describe("x"), "x + 10");
}

#[test]
fn constructor_argument_mismatch() {
    let mut repo = MockRepository::new();
    let e = repo.create_partial::<MockOffset>(args!["ten".to_owned()])
        .unwrap_err();
    assert!(matches!(e, MockError::Construction{..}), "{e}");
    let e = repo.create_partial::<MockOffset>(args![]).unwrap_err();
    assert!(matches!(e, MockError::Construction{..}), "{e}");
    let e = repo.create_partial::<MockOffset>(args![1i32, 2i32]).unwrap_err();
    assert!(matches!(e, MockError::Construction{..}), "{e}");
    assert!(repo.is_empty());
}

#[test]
fn default_base_takes_no_arguments() {
    let mut repo = MockRepository::new();
    let e = repo.create_partial::<MockAccumulator>(args![5u8]).unwrap_err();
    assert!(e.to_string().starts_with("cannot construct"), "{e}");
}

#[test]
fn strict_class_mock() {
    let mut repo = MockRepository::new();
    let acc = repo.create_strict::<MockAccumulator>(args![]).unwrap();
    repo.replay_all().unwrap();
    let r = std::panic::catch_unwind(|| acc.add(4, 4));
    assert!(r.is_err());
    assert_eq!(acc.calls(), 0);
}

mod interface {
    use super::*;

    stand_in! {
        pub Calculator {}
        impl Calculator for Calculator {
            fn add(&self, a: i32, b: i32) -> i32;
            fn describe(&self, label: &str) -> String;
        }
    }

    #[test]
    fn partial_requires_a_base_type() {
        let mut repo = MockRepository::new();
        let e = repo.create_partial::<MockCalculator>(args![]).unwrap_err();
        assert!(matches!(e, MockError::UnsupportedTarget{..}), "{e}");
        let e = repo.generate_partial_mock::<MockCalculator>(args![])
            .unwrap_err();
        assert!(matches!(e, MockError::UnsupportedTarget{..}), "{e}");
        assert!(repo.is_empty());
    }
}
