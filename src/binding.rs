use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::live_value::{LiveValue, Subscription};
use crate::template::Template;

/// Text cell shared between a binding and the widget that draws it.
#[derive(Debug, Clone, Default)]
pub struct Label {
    text: Arc<Mutex<String>>,
}

impl Label {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: Arc::new(Mutex::new(initial.into())),
        }
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_text(&self, text: String) {
        *self.text.lock().unwrap_or_else(|e| e.into_inner()) = text;
    }
}

/// Writes every elapsed-seconds value into a label through a template.
///
/// The binding owns its subscription: when the binding is dropped the label
/// stops receiving updates.
#[derive(Debug)]
pub struct ValueObserverBinding {
    label: Label,
    updates: Arc<AtomicU64>,
    _subscription: Subscription,
}

impl ValueObserverBinding {
    pub fn bind(source: &LiveValue<u64>, template: Template, label: Label) -> Self {
        let updates = Arc::new(AtomicU64::new(0));
        let subscription = {
            let label = label.clone();
            let updates = updates.clone();
            source.observe(move |secs: &u64| {
                label.set_text(template.render(*secs));
                updates.fetch_add(1, Ordering::Relaxed);
            })
        };
        Self {
            label,
            updates,
            _subscription: subscription,
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Number of values written to the label so far.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::MainThread;
    use crate::live_value::MutableLiveValue;

    #[test]
    fn formats_value_into_label() {
        let (_main, handle) = MainThread::new();
        let live = MutableLiveValue::new(handle);
        let label = Label::new("");
        let binding =
            ValueObserverBinding::bind(&live.reader(), Template::default(), label.clone());

        live.set_value(5);
        assert_eq!(label.text(), "5 seconds");
        assert_eq!(binding.updates(), 1);
    }

    #[test]
    fn label_keeps_placeholder_until_first_value() {
        let (_main, handle) = MainThread::new();
        let live = MutableLiveValue::<u64>::new(handle);
        let binding =
            ValueObserverBinding::bind(&live.reader(), Template::default(), Label::new("--"));
        assert_eq!(binding.label().text(), "--");
        assert_eq!(binding.updates(), 0);
    }

    #[test]
    fn dropping_binding_detaches() {
        let (_main, handle) = MainThread::new();
        let live = MutableLiveValue::new(handle);
        let label = Label::new("");
        let binding = ValueObserverBinding::bind(
            &live.reader(),
            Template::parse("t=%d").unwrap(),
            label.clone(),
        );
        live.set_value(1);
        drop(binding);
        live.set_value(2);

        assert_eq!(label.text(), "t=1");
        assert!(!live.reader().has_observers());
    }
}
