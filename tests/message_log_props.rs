//! Property-based tests for the message log and template scaling
//!
//! Run with: cargo test --test message_log_props

use crabpush::channel::MessageLog;
use crabpush::invariant_ppt::{clear_invariant_log, contract_test};
use crabpush::upload::scaled_dimensions;
use proptest::prelude::*;

proptest! {
    /// The log holds the newest `min(n, capacity)` messages, newest first
    #[test]
    fn log_keeps_newest_first(
        capacity in 1usize..32,
        messages in prop::collection::vec("[a-z0-9]{0,12}", 0..64),
    ) {
        let mut log = MessageLog::new(capacity);
        for message in &messages {
            log.push(message.clone());
            prop_assert!(log.len() <= capacity);
        }

        let expected: Vec<String> = messages.iter().rev().take(capacity).cloned().collect();
        prop_assert_eq!(log.entries(), expected);
    }

    /// Scaling never upscales and keeps the longer edge within bounds
    #[test]
    fn scaling_fits_and_never_upscales(
        width in 1u32..8000,
        height in 1u32..8000,
        max_dimension in 16u32..4096,
    ) {
        let (w, h) = scaled_dimensions(width, height, max_dimension);

        prop_assert!(w <= width && h <= height);
        prop_assert!(w >= 1 && h >= 1);

        if width.max(height) <= max_dimension {
            prop_assert_eq!((w, h), (width, height));
        } else {
            prop_assert_eq!(w.max(h), max_dimension);
        }
    }

    /// Aspect ratio survives scaling to within one pixel of rounding
    #[test]
    fn scaling_preserves_aspect(
        width in 100u32..8000,
        height in 100u32..8000,
    ) {
        let (w, h) = scaled_dimensions(width, height, 1280);
        let expected_h = w as f64 * height as f64 / width as f64;
        prop_assert!((h as f64 - expected_h).abs() <= 1.0 + height as f64 / width as f64);
    }
}

#[test]
fn wide_template_scales_to_1280x640() {
    assert_eq!(scaled_dimensions(4000, 2000, 1280), (1280, 640));
}

#[test]
fn contract_message_log_bound() {
    clear_invariant_log();
    let mut log = MessageLog::new(10);
    for i in 1..=12 {
        log.push(format!("M{}", i));
    }
    assert_eq!(log.latest(), Some("M12"));
    contract_test("message log", &["Message log never exceeds capacity"]);
}
