//! Concurrent lifecycle transitions, calls and broadcasts.

mod common;

use std::thread;

use plexus_test::test_id;
use serde_json::json;

use common::host;

#[test]
fn test_concurrent_activation_runs_hook_once() {
    let host = host();
    let editor = test_id("editor");

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| host.manager.activate(&editor).unwrap());
        }
    });

    assert_eq!(host.editor.activation_count(), 1);
    assert_eq!(host.manager.subscriptions(&editor).len(), 2);

    host.fs.emit("changed", json!(1));
    assert_eq!(host.editor.received().len(), 1);
}

#[test]
fn test_transitions_and_traffic_interleave_safely() {
    let host = host();
    let editor = test_id("editor");
    let linter = test_id("linter");
    let fs = test_id("fs");

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..50 {
                host.manager.activate(&editor).unwrap();
                host.manager.deactivate(&editor).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..50 {
                host.manager.activate(&linter).unwrap();
                host.manager.deactivate(&linter).unwrap();
            }
        });
        s.spawn(|| {
            for i in 0..200 {
                host.fs.emit("changed", json!(i));
                host.manager.broadcast(&fs, "changed", &json!(i));
            }
        });
        s.spawn(|| {
            for i in 0..200 {
                assert_eq!(host.manager.call(&fs, "read", json!(i)).unwrap(), json!(i));
                // Either live or not; never a half-wired error.
                if let Ok(value) = host.manager.call(&editor, "open", json!(i)) {
                    assert_eq!(value, json!(i));
                }
            }
        });
    });

    assert!(!host.manager.is_active(&editor));
    assert!(!host.manager.is_active(&linter));
    assert!(host.manager.router().is_empty());
    assert_eq!(host.editor.activation_count(), 50);
    assert_eq!(host.linter.deactivation_count(), 50);
    assert!(host.editor.received().len() <= 400);
}

#[test]
fn test_bootstrap_signals_from_many_threads() {
    let host = host();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| host.shell.emit("activate", json!("linter")));
        }
    });

    assert!(host.manager.is_active(&test_id("linter")));
    assert_eq!(host.linter.activation_count(), 1);
}
