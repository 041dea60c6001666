//! Prelude module - commonly used test utilities.
//!
//! Use `use plexus_test::prelude::*;` to import all essential types.

pub use crate::{MockModule, MockPlugin, ReceivedNotification};

pub use crate::{
    init_test_logging, test_bootstrap_descriptor, test_id, test_module_descriptor,
    test_plugin_descriptor, write_manifest,
};
