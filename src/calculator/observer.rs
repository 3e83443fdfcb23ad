//! Change notifications for the engine's observable properties.
//!
//! Hosts either register callbacks per property or take a [`flume`] receiver
//! that gets every [`EngineEvent`]. Every set raises a notification, even when
//! the new value equals the old one, so a bound view always re-renders.

use std::sync::Arc;

use serde::Serialize;

use super::engine::EngineState;
use super::expression::ParsedExpression;

/// Callback invoked with the new value of a property.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A value plus the callbacks bound to it.
pub struct Property<T> {
    value: T,
    callbacks: Vec<Callback<T>>,
}

impl<T> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            callbacks: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Store `value` and notify every bound callback.
    pub fn set(&mut self, value: T) {
        self.value = value;
        for callback in &self.callbacks {
            callback(&self.value);
        }
    }

    /// Bind a callback. It is not invoked for the current value.
    pub fn bind(&mut self, callback: impl Fn(&T) + Send + Sync + 'static) {
        self.callbacks.push(Arc::new(callback));
    }

    pub fn unbind_all(&mut self) {
        self.callbacks.clear();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.value)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// A change of one of the engine's observable properties.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum EngineEvent {
    State(EngineState),
    Display(Option<ParsedExpression>),
    Result(Option<f64>),
}

/// Fan-out of [`EngineEvent`]s to channel subscribers.
///
/// Subscribers whose receiver was dropped are forgotten on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Vec<flume::Sender<EngineEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> flume::Receiver<EngineEvent> {
        let (tx, rx) = flume::unbounded();
        self.senders.push(tx);
        rx
    }

    pub fn publish(&mut self, event: EngineEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_property_notifies_on_every_set() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut property = Property::new(0);

        let sink = seen.clone();
        property.bind(move |value: &i32| sink.lock().unwrap().push(*value));

        property.set(1);
        property.set(1);
        property.set(2);

        assert_eq!(*property.get(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 1, 2]);
    }

    #[test]
    fn test_unbind_all() {
        let seen = Arc::new(Mutex::new(0));
        let mut property = Property::new("a");
        let sink = seen.clone();
        property.bind(move |_| *sink.lock().unwrap() += 1);

        property.unbind_all();
        property.set("b");
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_event_bus_drops_closed_receivers() {
        let mut bus = EventBus::default();
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.publish(EngineEvent::Result(Some(3.0)));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap(), EngineEvent::Result(Some(3.0)));
    }
}
