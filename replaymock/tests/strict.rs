// vim: tw=80
//! Strict mocks reject every replayed call that no expectation covers.

use replaymock::*;

pub trait Calculator {
    fn add(&self, a: i32, b: i32) -> i32;
    fn clear(&self);
}

pub trait Store {
    fn take(&self) -> Vec<u8>;
}

#[derive(Debug, PartialEq)]
pub struct Ticket(u32);

pub trait Dispenser {
    fn dispense(&self) -> Ticket;
}

stand_in! {
    pub Store {}
    impl Store for Store {
        fn take(&self) -> Vec<u8>;
    }
}

stand_in! {
    pub Dispenser {}
    impl Dispenser for Dispenser {
        fn dispense(&self) -> Ticket;
    }
}

stand_in! {
    pub Calculator {}
    impl Calculator for Calculator {
        fn add(&self, a: i32, b: i32) -> i32;
        fn clear(&self);
    }
}

fn replaying() -> (MockRepository, MockCalculator) {
    let mut repo = MockRepository::new();
    let calc = repo.create_strict::<MockCalculator>(args![]).unwrap();
    calc.add(2, 3);
    repo.last_call(&calc).unwrap().returns(5);
    repo.replay(&calc).unwrap();
    (repo, calc)
}

#[test]
fn recorded_call_returns_configured_value() {
    let (repo, calc) = replaying();
    assert_eq!(calc.add(2, 3), 5);
    repo.verify(&calc).unwrap();
}

#[test]
#[should_panic(expected = "unexpected call to Calculator::add(9, 9)")]
fn unrecorded_arguments() {
    let (_repo, calc) = replaying();
    calc.add(9, 9);
}

#[test]
#[should_panic(expected = "unexpected call to Calculator::clear()")]
fn unrecorded_method() {
    let (_repo, calc) = replaying();
    calc.clear();
}

#[test]
#[should_panic(expected = "expected one of:\n    Calculator::add(2, 3)")]
fn failure_lists_expectations() {
    let (_repo, calc) = replaying();
    calc.add(2, 4);
}

#[test]
#[should_panic(expected = "unexpected call to Calculator::add(2, 3)")]
fn exhausted() {
    let (_repo, calc) = replaying();
    calc.add(2, 3);
    calc.add(2, 3);
}

#[test]
fn nothing_recorded() {
    let mut repo = MockRepository::new();
    let calc = repo.create_strict::<MockCalculator>(args![]).unwrap();
    repo.replay_all().unwrap();
    for (a, b) in [(0, 0), (1, -1), (i32::MAX, i32::MIN)] {
        let r = std::panic::catch_unwind(|| calc.add(a, b));
        assert!(r.is_err(), "add({a}, {b}) should have been rejected");
    }
}

#[test]
fn verify_reports_rejected_calls() {
    let (repo, calc) = replaying();
    assert_eq!(calc.add(2, 3), 5);
    std::panic::catch_unwind(|| calc.add(9, 9)).unwrap_err();
    let e = repo.verify(&calc).unwrap_err();
    assert!(e.to_string().contains("unexpected call to Calculator::add(9, 9)"),
            "{e}");
}

#[test]
fn verify_reports_missing_calls() {
    let (repo, calc) = replaying();
    let e = repo.verify(&calc).unwrap_err();
    assert!(matches!(e, MockError::Unverified{..}), "{e}");
    assert!(e.to_string()
        .contains("missing call: Calculator::add(2, 3) [called 0 of 1]"),
        "{e}");
}

#[test]
fn recording_returns_default() {
    let mut repo = MockRepository::new();
    let calc = repo.create_strict::<MockCalculator>(args![]).unwrap();
    assert_eq!(calc.add(2, 3), 0);
    assert_eq!(calc.binding().phase(), Phase::Recording);
}

#[test]
fn generated_starts_replaying() {
    let mut repo = MockRepository::new();
    let calc = repo.generate_strict_mock::<MockCalculator>(args![]).unwrap();
    assert_eq!(calc.binding().phase(), Phase::Replaying);
    assert_eq!(calc.binding().strategy(), Strategy::Strict);
    calc.expect_add(1, 2).returns(3);
    assert_eq!(calc.add(1, 2), 3);
    repo.verify_all().unwrap();
}

#[test]
fn instances_do_not_share_expectations() {
    let mut repo = MockRepository::new();
    let a = repo.create_strict::<MockCalculator>(args![]).unwrap();
    let b = repo.create_strict::<MockCalculator>(args![]).unwrap();
    a.add(2, 3);
    repo.last_call(&a).unwrap().returns(5);
    repo.replay_all().unwrap();
    assert!(std::panic::catch_unwind(|| b.add(2, 3)).is_err());
    assert_eq!(a.add(2, 3), 5);
    assert_ne!(a.binding().id(), b.binding().id());
}

#[test]
fn verify_reports_caught_return_once_failure() {
    let mut repo = MockRepository::new();
    let store = repo.generate_strict_mock::<MockStore>(args![]).unwrap();
    store.expect_take().return_once(vec![1u8]).times(2);
    assert_eq!(store.take(), vec![1]);
    std::panic::catch_unwind(|| store.take()).unwrap_err();
    let e = repo.verify_all().unwrap_err();
    assert!(e.to_string().contains(
            "Store::take() was configured with return_once but called again"),
        "{e}");
}

#[test]
fn verify_reports_caught_missing_return_value() {
    let mut repo = MockRepository::new();
    let dispenser = repo.generate_strict_mock::<MockDispenser>(args![])
        .unwrap();
    dispenser.expect_dispense();
    std::panic::catch_unwind(|| dispenser.dispense()).unwrap_err();
    let e = repo.verify_all().unwrap_err();
    assert!(e.to_string().contains("has no return value configured"), "{e}");
}
