//! Shared setup for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use plexus_manager::AppManager;
use plexus_test::{MockModule, MockPlugin, init_test_logging};

/// A small host: an `fs` module, a `theme` module, a `shell` bootstrap
/// module, and two plugins.
///
/// - `editor` exposes `open`, listens to `fs.changed` and `theme.themeChanged`
/// - `linter` exposes `lint`, listens to `fs.changed`, emits `diagnostics`
pub struct Host {
    pub manager: Arc<AppManager>,
    pub fs: Arc<MockModule>,
    pub theme: Arc<MockModule>,
    pub shell: Arc<MockModule>,
    pub editor: Arc<MockPlugin>,
    pub linter: Arc<MockPlugin>,
}

pub fn fs_module() -> MockModule {
    MockModule::new("fs")
        .with_echo_method("read")
        .with_method("write", |_| Ok(serde_json::Value::Bool(true)))
        .with_events(["changed", "saved"])
}

pub fn host_with(editor: MockPlugin, linter: MockPlugin) -> Host {
    init_test_logging();

    let fs = Arc::new(fs_module());
    let theme = Arc::new(
        MockModule::new("theme")
            .with_echo_method("current")
            .with_events(["themeChanged"]),
    );
    let shell = Arc::new(MockModule::new("shell").with_events(["activate", "deactivate"]));
    let editor = Arc::new(editor);
    let linter = Arc::new(linter);

    let manager = AppManager::builder()
        .module(fs.descriptor(), fs.clone())
        .module(theme.descriptor(), theme.clone())
        .module(shell.descriptor(), shell.clone())
        .plugin(editor.descriptor(), editor.clone())
        .plugin(linter.descriptor(), linter.clone())
        .bootstrap("shell")
        .build()
        .expect("host should build");

    Host {
        manager,
        fs,
        theme,
        shell,
        editor,
        linter,
    }
}

pub fn editor_plugin() -> MockPlugin {
    MockPlugin::new("editor")
        .with_echo_method("open")
        .with_notification("fs", "changed")
        .with_notification("theme", "themeChanged")
}

pub fn linter_plugin() -> MockPlugin {
    MockPlugin::new("linter")
        .with_echo_method("lint")
        .with_events(["diagnostics"])
        .with_notification("fs", "changed")
}

pub fn host() -> Host {
    host_with(editor_plugin(), linter_plugin())
}
