//! Property-based tests for argument sets, port allocation, and correlation ids

use proptest::prelude::*;
use sdm_invoke::correlation::{listener_port, CorrelationIdGenerator, CorrelationOptions};
use sdm_invoke::invocation::ArgumentSet;
use sdm_invoke::port::PortAllocator;
use std::sync::Arc;

/// Later values win and first-seen order is kept.
#[test]
fn test_argument_set_last_write_wins() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec(("[a-d]", "[a-z]{0,4}"), 0..12),
            |pairs| {
                let set: ArgumentSet = pairs.iter().cloned().collect();

                let mut expected_order: Vec<&String> = Vec::new();
                for (name, _) in &pairs {
                    if !expected_order.contains(&name) {
                        expected_order.push(name);
                    }
                }
                let names: Vec<&str> = set.iter().map(|a| a.name.as_str()).collect();
                prop_assert_eq!(names.len(), expected_order.len());
                for (got, want) in names.iter().zip(&expected_order) {
                    prop_assert_eq!(*got, want.as_str());
                }

                for name in &expected_order {
                    let last = pairs.iter().rev().find(|(n, _)| n == *name).map(|(_, v)| v.as_str());
                    prop_assert_eq!(set.get(name), last);
                }
                Ok(())
            },
        )
        .unwrap();
}

/// Correlation ids always split into tag, port, channel, and timestamp.
#[test]
fn test_correlation_id_shape() {
    let ports = Arc::new(PortAllocator::with_range("127.0.0.1", 37000, 37500));
    let generator = CorrelationIdGenerator::new("cli", std::process::id(), Arc::clone(&ports));
    let port = ports.port_for(std::process::id()).unwrap();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&"[a-z][a-z0-9_.]{0,12}", |channel| {
            let id = generator
                .new_correlation_id(&CorrelationOptions::channel(channel.clone()).with_listener_port())
                .unwrap();
            let parts: Vec<&str> = id.split('-').collect();
            prop_assert_eq!(parts.len(), 4);
            prop_assert_eq!(parts[0], "cli");
            prop_assert_eq!(parts[2], channel.as_str());
            prop_assert!(parts[3].parse::<i64>().is_ok());
            prop_assert_eq!(listener_port(&id), Some(port));
            Ok(())
        })
        .unwrap();
}

/// Asking twice for the same pid never moves its port.
#[test]
fn test_port_assignment_is_stable() {
    let ports = PortAllocator::with_range("127.0.0.1", 37600, 38100);
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1u32..64), |pid| {
            let first = ports.port_for(pid).unwrap();
            prop_assert!((37600..=38100).contains(&first));
            prop_assert_eq!(ports.port_for(pid).unwrap(), first);
            prop_assert_eq!(ports.assigned(pid), Some(first));
            Ok(())
        })
        .unwrap();
}
