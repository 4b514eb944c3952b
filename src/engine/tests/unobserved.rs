use std::sync::Mutex;
use monocle::{block_on, launch, o0, run_until_idle, set_unobserved_hook, Error, Unit, Value};

static REPORTED: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn install_hook() {
    set_unobserved_hook(|err| REPORTED.lock().unwrap().push(err.message()));
}

fn reported(message: &str) -> usize {
    REPORTED.lock().unwrap().iter().filter(|reported| *reported == message).count()
}

#[test]
fn test_failed_launch_is_reported() {
    install_hook();
    let failing = o0(|_co, _| async move { Err(Error::raise("launch failure")) });
    launch(&failing, ());
    run_until_idle();
    assert_eq!(reported("launch failure"), 1);
}

#[test]
fn test_dropped_failed_unit_is_reported() {
    install_hook();
    drop(Unit::failed("dropped failure"));
    assert_eq!(reported("dropped failure"), 1);
}

#[test]
fn test_observed_failure_is_not_reported() {
    install_hook();
    assert_eq!(block_on(Unit::failed("observed failure")), Err(Error::raise("observed failure")));

    let succeeding = o0(|_co, _| async move { Ok(Value::from(1)) });
    launch(&succeeding, ());
    run_until_idle();
    assert_eq!(reported("observed failure"), 0);
}
