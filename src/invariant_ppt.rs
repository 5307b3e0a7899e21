//! Invariant checks that tests can hold the crate to.
//!
//! Lifecycle code states its invariants through [`assert_invariant!`]. Every
//! evaluation is counted per thread under the invariant's name, so a test
//! can drive a component and then require with [`contract_test`] that the
//! invariants it cares about were evaluated at least once.
//!
//! Invariants currently stated:
//!
//! - `"Message log never exceeds capacity"` (channel message log)
//! - `"Selected camera is listed or empty"` (device enumeration)
//! - `"Live pusher iff streaming"` (session start and stop)
//! - `"Compressed template fits max dimension"` (template compression)

use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static EVALUATIONS: RefCell<HashMap<&'static str, u32>> = RefCell::new(HashMap::new());
}

/// Evaluate an invariant, count it, and panic with the call site when it fails.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $name:expr) => {
        $crate::invariant_ppt::evaluate($condition, $name, module_path!())
    };
    ($condition:expr, $name:expr, $site:expr) => {
        $crate::invariant_ppt::evaluate($condition, $name, $site)
    };
}

#[doc(hidden)]
pub fn evaluate(holds: bool, name: &'static str, site: &str) {
    EVALUATIONS.with(|evaluations| {
        *evaluations.borrow_mut().entry(name).or_insert(0) += 1;
    });

    if !holds {
        panic!("invariant `{}` broken in {}", name, site);
    }
}

/// How often `name` was evaluated on this thread since the last clear.
pub fn evaluations(name: &str) -> u32 {
    EVALUATIONS.with(|evaluations| evaluations.borrow().get(name).copied().unwrap_or(0))
}

/// Panics unless every listed invariant was evaluated on this thread.
pub fn contract_test(test_name: &str, required: &[&str]) {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| evaluations(name) == 0)
        .collect();

    if !missing.is_empty() {
        panic!(
            "contract `{}` left invariants unevaluated: {}",
            test_name,
            missing.join(", ")
        );
    }
}

/// Forget every evaluation recorded on this thread.
pub fn clear_invariant_log() {
    EVALUATIONS.with(|evaluations| evaluations.borrow_mut().clear());
}
