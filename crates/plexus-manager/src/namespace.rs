//! Exposed-API namespace.

use crate::handle::MethodFn;

/// Live call surface of one capability, in declaration order.
#[derive(Clone, Default)]
pub(crate) struct MethodTable {
    methods: Vec<(String, MethodFn)>,
}

impl MethodTable {
    pub(crate) fn insert(&mut self, name: &str, method: MethodFn) {
        match self.methods.iter_mut().find(|(existing, _)| existing.as_str() == name) {
            Some(entry) => entry.1 = method,
            None => self.methods.push((name.to_string(), method)),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<MethodFn> {
        self.methods
            .iter()
            .find(|(existing, _)| existing.as_str() == name)
            .map(|(_, method)| MethodFn::clone(method))
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.methods.iter().map(|(name, _)| name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plexus_core::{CapabilityResult, Value};

    use super::*;

    fn constant(v: i64) -> MethodFn {
        Arc::new(move |_: Value| -> CapabilityResult<Value> { Ok(Value::from(v)) })
    }

    #[test]
    fn test_insert_keeps_declaration_order() {
        let mut table = MethodTable::default();
        assert!(table.names().is_empty());
        table.insert("read", constant(1));
        table.insert("write", constant(2));
        table.insert("read", constant(3));

        assert_eq!(table.names(), vec!["read", "write"]);
        assert_eq!((table.get("read").unwrap())(Value::Null).unwrap(), Value::from(3));
        assert!(table.get("delete").is_none());
    }
}
