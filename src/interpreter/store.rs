//! The variable store shared by the runner and the evaluator.
//!
//! Every write goes through [`VariableStore::write`]. When the store was
//! built with a watch target, a write to that name prints a [`WatchEvent`]
//! to the store's sink before the value is stored.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use crate::interpreter::value::Value;

/// Fixed label standing in for source positions, which the evaluator does
/// not carry down to the store.
pub const WATCH_CONTEXT: &str = "Runtime Assignment";

/// Notification for one write to the watched identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    pub name: String,
    pub value: Value,
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "[WATCH] Identifier '{}' modified.", self.name)?;
        writeln!(f, "        New Value: {}", self.value)?;
        writeln!(f, "        Context: {WATCH_CONTEXT}")?;
        writeln!(f)
    }
}

pub struct VariableStore {
    values: HashMap<String, Value>,
    watch: Option<String>,
    sink: Box<dyn Write>,
}

impl fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableStore")
            .field("values", &self.values)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl VariableStore {
    /// Empty store printing watch notifications to stdout.
    pub fn new(watch: Option<String>) -> Self {
        Self::with_sink(watch, Box::new(io::stdout()))
    }

    pub fn with_sink(watch: Option<String>, sink: Box<dyn Write>) -> Self {
        Self {
            values: HashMap::new(),
            watch,
            sink,
        }
    }

    /// Pre-seed bindings. Seeding is not a write and never notifies.
    pub fn seeded<K, I>(mut self, bindings: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.values
            .extend(bindings.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn watch_target(&self) -> Option<&str> {
        self.watch.as_deref()
    }

    /// Current value of `name`, or `Nil` when it was never written.
    pub fn read(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Nil)
    }

    /// Store `value` under `name`, notifying first if `name` is watched.
    pub fn write(&mut self, name: &str, value: Value) {
        if self.watch.as_deref() == Some(name) {
            let event = WatchEvent {
                name: name.to_string(),
                value,
            };
            tracing::info!(name, value = %event.value, "watched identifier modified");
            if let Err(e) = write!(self.sink, "{event}").and_then(|()| self.sink.flush()) {
                tracing::warn!("failed to write watch notification: {e}");
            }
            self.values.insert(event.name, event.value);
            return;
        }
        tracing::trace!(name, %value, "store write");
        self.values.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputBuffer;

    fn watched(name: &str) -> (VariableStore, OutputBuffer) {
        let buffer = OutputBuffer::default();
        let store = VariableStore::with_sink(Some(name.to_string()), Box::new(buffer.clone()));
        (store, buffer)
    }

    #[test]
    fn write_and_read() {
        let mut store = VariableStore::default();
        store.write("x", Value::Int(42));
        assert_eq!(store.read("x"), Value::Int(42));
    }

    #[test]
    fn read_unknown_is_nil() {
        let store = VariableStore::default();
        assert_eq!(store.read("x"), Value::Nil);
        assert!(!store.contains("x"));
    }

    #[test]
    fn write_overwrites() {
        let mut store = VariableStore::default();
        store.write("x", Value::Int(1));
        store.write("x", Value::from("two"));
        assert_eq!(store.read("x"), Value::from("two"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn watched_write_emits_notification() {
        let (mut store, buffer) = watched("x");
        assert_eq!(store.watch_target(), Some("x"));
        store.write("x", Value::Int(5));
        assert_eq!(
            buffer.contents(),
            "\n[WATCH] Identifier 'x' modified.\n        New Value: 5\n        Context: Runtime Assignment\n\n"
        );
        assert_eq!(store.read("x"), Value::Int(5));
    }

    #[test]
    fn unwatched_keys_do_not_notify() {
        let (mut store, buffer) = watched("x");
        store.write("y", Value::Int(5));
        store.write("xx", Value::Int(6));
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn no_target_never_notifies() {
        let buffer = OutputBuffer::default();
        let mut store = VariableStore::with_sink(None, Box::new(buffer.clone()));
        for name in ["x", "watch", ""] {
            store.write(name, Value::Bool(true));
        }
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn every_write_notifies_even_when_unchanged() {
        let (mut store, buffer) = watched("x");
        store.write("x", Value::Int(1));
        store.write("x", Value::Int(1));
        store.write("x", Value::Int(2));
        assert_eq!(buffer.contents().matches("[WATCH]").count(), 3);
        assert_eq!(buffer.contents().matches("New Value: 1").count(), 2);
    }

    #[test]
    fn seeding_does_not_notify() {
        let (store, buffer) = watched("x");
        let store = store.seeded([("x", Value::Int(9)), ("y", Value::Nil)]);
        assert_eq!(store.read("x"), Value::Int(9));
        assert_eq!(store.len(), 2);
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn event_display_uses_value_display() {
        let event = WatchEvent {
            name: "greeting".to_string(),
            value: Value::from("hello"),
        };
        assert!(event.to_string().contains("New Value: hello\n"));
    }
}
