// tests/promise.rs

use std::sync::{Arc, Mutex};

use jobdag::engine::{join_named, Promise, Resolver};
use jobdag::BuildError;

/// A promise whose resolver is parked for the test to settle later.
fn deferred() -> (Promise, Arc<Mutex<Option<Resolver>>>) {
    let slot: Arc<Mutex<Option<Resolver>>> = Arc::new(Mutex::new(None));
    let stored = Arc::clone(&slot);
    let promise = Promise::new(move |resolver| {
        *stored.lock().unwrap() = Some(resolver);
    });
    (promise, slot)
}

fn outcome_probe() -> (
    Arc<Mutex<Option<Result<(), BuildError>>>>,
    impl FnOnce() + Send + 'static,
    impl FnOnce(BuildError) + Send + 'static,
) {
    let outcome: Arc<Mutex<Option<Result<(), BuildError>>>> = Arc::new(Mutex::new(None));
    let ok_slot = Arc::clone(&outcome);
    let fail_slot = Arc::clone(&outcome);
    (
        outcome,
        move || *ok_slot.lock().unwrap() = Some(Ok(())),
        move |err| *fail_slot.lock().unwrap() = Some(Err(err)),
    )
}

#[test]
fn producer_success_reaches_the_subscriber() {
    let (outcome, ok, fail) = outcome_probe();
    Promise::new(|r| r.finish()).then(ok, fail);
    assert!(matches!(*outcome.lock().unwrap(), Some(Ok(()))));
}

#[test]
fn producer_failure_reaches_the_subscriber() {
    let (outcome, ok, fail) = outcome_probe();
    Promise::new(|r| r.fail(BuildError::Canceled)).then(ok, fail);
    assert!(matches!(
        *outcome.lock().unwrap(),
        Some(Err(BuildError::Canceled))
    ));
}

#[test]
fn late_subscribers_get_the_memoized_outcome() {
    let promise = Promise::new(|r| r.fail(BuildError::JobNotFound("x".into())));

    let (first, ok1, fail1) = outcome_probe();
    promise.then(ok1, fail1);
    let (second, ok2, fail2) = outcome_probe();
    promise.then(ok2, fail2);

    assert!(matches!(*first.lock().unwrap(), Some(Err(_))));
    assert!(matches!(*second.lock().unwrap(), Some(Err(_))));
}

#[test]
fn producer_runs_exactly_once() {
    let runs = Arc::new(Mutex::new(0));
    let counted = Arc::clone(&runs);
    let promise = Promise::new(move |r| {
        *counted.lock().unwrap() += 1;
        r.finish();
    });

    promise.then(|| {}, |_| {});
    promise.then(|| {}, |_| {});

    assert_eq!(*runs.lock().unwrap(), 1);
}

#[test]
fn second_signal_is_ignored() {
    let (promise, slot) = deferred();
    let (outcome, ok, fail) = outcome_probe();
    promise.then(ok, fail);

    let resolver = slot.lock().unwrap().take().unwrap();
    resolver.finish();
    resolver.fail(BuildError::Canceled);

    assert!(matches!(*outcome.lock().unwrap(), Some(Ok(()))));
}

#[test]
fn callbacks_fire_in_registration_order() {
    let (promise, slot) = deferred();
    let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = Arc::clone(&order);
        promise.then(move || order.lock().unwrap().push(i), |_| {});
    }

    slot.lock().unwrap().take().unwrap().finish();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn composite_succeeds_when_all_inputs_succeed() {
    let (outcome, ok, fail) = outcome_probe();
    join_named(vec![
        ("a".to_string(), Promise::fulfilled()),
        ("b".to_string(), Promise::fulfilled()),
    ])
    .then(ok, fail);
    assert!(matches!(*outcome.lock().unwrap(), Some(Ok(()))));
}

#[test]
fn composite_reports_sorted_failed_names() {
    let fail_b = Promise::new(|r| r.fail(BuildError::Canceled));
    let fail_a = Promise::new(|r| r.fail(BuildError::Canceled));

    let (outcome, ok, fail) = outcome_probe();
    join_named(vec![
        ("b".to_string(), fail_b),
        ("ok".to_string(), Promise::fulfilled()),
        ("a".to_string(), fail_a),
    ])
    .then(ok, fail);

    let outcome_value = outcome.lock().unwrap().clone();
    match outcome_value {
        Some(Err(BuildError::BuildDependency(names))) => {
            assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected BuildDependency failure, got {other:?}"),
    }
}

#[test]
fn composite_waits_for_every_input_before_failing() {
    let (pending, slot) = deferred();
    let failed = Promise::new(|r| r.fail(BuildError::Canceled));

    let (outcome, ok, fail) = outcome_probe();
    join_named(vec![
        ("failed".to_string(), failed),
        ("pending".to_string(), pending),
    ])
    .then(ok, fail);

    // One input already failed, but the composite must hold off until the
    // other one settles.
    assert!(outcome.lock().unwrap().is_none());

    slot.lock().unwrap().take().unwrap().finish();
    let outcome_value = outcome.lock().unwrap().clone();
    match outcome_value {
        Some(Err(BuildError::BuildDependency(names))) => {
            assert_eq!(names, vec!["failed".to_string()]);
        }
        other => panic!("expected BuildDependency failure, got {other:?}"),
    }
}
