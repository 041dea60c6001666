//! Plugin-originated requests through the request slot.

mod common;

use std::sync::Arc;

use plexus_core::{CapabilityError, CapabilityId};
use plexus_manager::{AppManager, Capability, PluginCapability};
use plexus_test::{MockModule, MockPlugin, init_test_logging, test_id};
use serde_json::json;

use common::{editor_plugin, fs_module, host, host_with, linter_plugin};

#[test]
fn test_request_reaches_module_method() {
    let host = host();
    host.manager.activate(&test_id("editor")).unwrap();

    let value = host.editor.request("fs", "read", json!("todo.md")).unwrap();

    assert_eq!(value, json!("todo.md"));
    assert_eq!(host.fs.calls(), vec![("read".to_string(), json!("todo.md"))]);
}

#[test]
fn test_request_is_available_inside_activate_hook() {
    let editor = editor_plugin().with_on_activate(|slot| {
        let theme = slot.request(&CapabilityId::from_static("theme"), "current", json!("light"))?;
        assert_eq!(theme, json!("light"));
        Ok(())
    });
    let host = host_with(editor, linter_plugin());

    host.manager.activate(&test_id("editor")).unwrap();

    assert_eq!(host.theme.calls().len(), 1);
}

#[test]
fn test_request_to_inactive_plugin_is_a_dispatch_error() {
    let host = host();
    host.manager.activate(&test_id("editor")).unwrap();

    let err = host.editor.request("linter", "lint", json!("a.rs")).unwrap_err();
    assert!(matches!(
        err,
        CapabilityError::Dispatch { ref target, ref method, .. }
            if *target == test_id("linter") && method == "lint"
    ));

    host.manager.activate(&test_id("linter")).unwrap();
    assert_eq!(
        host.editor.request("linter", "lint", json!("a.rs")).unwrap(),
        json!("a.rs")
    );
}

#[test]
fn test_request_to_unknown_target_is_a_dispatch_error() {
    let host = host();
    host.manager.activate(&test_id("editor")).unwrap();

    assert!(matches!(
        host.editor.request("ghost", "read", json!(null)),
        Err(CapabilityError::Dispatch { .. })
    ));
    assert!(matches!(
        host.editor.request("fs", "delete", json!(null)),
        Err(CapabilityError::Dispatch { .. })
    ));
}

#[test]
fn test_method_errors_pass_through_unchanged() {
    init_test_logging();
    let fs = Arc::new(
        fs_module().with_method("lock", |_| Err(CapabilityError::method("lock", "already locked"))),
    );
    let editor = Arc::new(editor_plugin());
    let manager = AppManager::builder()
        .module(fs.descriptor(), Arc::clone(&fs) as Arc<dyn Capability>)
        .plugin(editor.descriptor(), Arc::clone(&editor) as Arc<dyn PluginCapability>)
        .build()
        .unwrap();
    manager.activate(&test_id("editor")).unwrap();

    let err = editor.request("fs", "lock", json!(null)).unwrap_err();
    assert!(matches!(
        err,
        CapabilityError::Method { ref method, ref message } if method == "lock" && message == "already locked"
    ));
}

#[test]
fn test_request_fails_after_deactivation() {
    let host = host();
    host.manager.activate(&test_id("editor")).unwrap();
    host.manager.deactivate(&test_id("editor")).unwrap();

    assert!(!host.editor.has_request());
    assert!(matches!(
        host.editor.request("fs", "read", json!(1)),
        Err(CapabilityError::Dispatch { .. })
    ));
    assert!(host.fs.calls().is_empty());
}

#[test]
fn test_request_fails_once_manager_is_gone() {
    init_test_logging();
    let fs = Arc::new(MockModule::new("fs").with_echo_method("read"));
    let plugin = Arc::new(MockPlugin::new("editor"));
    let manager = AppManager::builder()
        .module(fs.descriptor(), fs.clone())
        .plugin(plugin.descriptor(), plugin.clone())
        .build()
        .unwrap();
    manager.activate(&test_id("editor")).unwrap();
    drop(manager);

    assert!(matches!(
        plugin.request("fs", "read", json!(1)),
        Err(CapabilityError::Dispatch { .. })
    ));
}
