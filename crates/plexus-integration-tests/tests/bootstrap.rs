//! Plugin transitions driven by the bootstrap module's events.

mod common;

use std::sync::Arc;

use plexus_manager::{AppManager, ManagerError};
use plexus_test::{MockModule, MockPlugin, init_test_logging, test_id};
use serde_json::json;

use common::host;

#[test]
fn test_bootstrap_events_drive_plugins() {
    let host = host();
    assert_eq!(host.manager.bootstrap(), Some(&test_id("shell")));

    host.shell.emit("activate", json!("editor"));
    assert!(host.manager.is_active(&test_id("editor")));
    assert!(!host.manager.is_active(&test_id("linter")));

    host.fs.emit("changed", json!("a.rs"));
    assert_eq!(host.editor.received().len(), 1);

    host.shell.emit("deactivate", json!("editor"));
    assert!(!host.manager.is_active(&test_id("editor")));
    assert_eq!(host.editor.deactivation_count(), 1);
}

#[test]
fn test_bootstrap_can_cycle_modules() {
    let host = host();

    host.shell.emit("deactivate", json!("theme"));
    assert!(!host.manager.is_active(&test_id("theme")));
    assert!(host.manager.methods(&test_id("theme")).unwrap().is_empty());

    host.shell.emit("activate", json!("theme"));
    assert!(host.manager.is_active(&test_id("theme")));
    assert_eq!(host.theme.activation_count(), 1);
}

#[test]
fn test_bad_bootstrap_payloads_are_ignored() {
    let host = host();

    host.shell.emit("activate", json!(7));
    host.shell.emit("activate", json!({ "type": "editor" }));
    host.shell.emit("activate", json!("ghost"));
    host.shell.emit("activate", json!("not a valid id!"));

    for id in host.manager.plugins() {
        assert!(!host.manager.is_active(id));
    }
}

#[test]
fn test_bootstrap_failure_does_not_reach_emitter() {
    let host = common::host_with(
        common::editor_plugin().failing_activation(),
        common::linter_plugin(),
    );

    // The hook error is logged; the emit itself completes.
    host.shell.emit("activate", json!("editor"));
    assert!(host.manager.is_active(&test_id("editor")));
    assert_eq!(host.editor.activation_count(), 1);
}

#[test]
fn test_misconfigured_bootstrap_is_rejected() {
    init_test_logging();
    let fs = Arc::new(MockModule::new("fs").with_events(["changed"]));
    let half = Arc::new(MockModule::new("half").with_events(["activate"]));
    let plugin = Arc::new(MockPlugin::new("shell").with_events(["activate", "deactivate"]));

    let build = |name: &str| {
        AppManager::builder()
            .module(fs.descriptor(), fs.clone())
            .module(half.descriptor(), half.clone())
            .plugin(plugin.descriptor(), plugin.clone())
            .bootstrap(name)
            .build()
    };

    for name in ["fs", "half", "shell", "ghost", "Not Valid"] {
        assert!(
            matches!(build(name), Err(ManagerError::Configuration(_))),
            "bootstrap {name} should be rejected"
        );
    }
}

#[test]
fn test_no_bootstrap_means_no_listener() {
    init_test_logging();
    let shell = Arc::new(MockModule::new("shell").with_events(["activate", "deactivate"]));
    let plugin = Arc::new(MockPlugin::new("editor"));
    let manager = AppManager::builder()
        .module(shell.descriptor(), shell.clone())
        .plugin(plugin.descriptor(), plugin.clone())
        .build()
        .unwrap();

    assert!(manager.bootstrap().is_none());
    shell.emit("activate", json!("editor"));
    assert!(!manager.is_active(&test_id("editor")));
}
