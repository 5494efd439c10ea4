//! Controlled/uncontrolled value holder shared by input widgets.

use std::fmt;
use std::sync::Arc;

/// Change notification.
pub type ChangeHandler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Value of an input that may be driven from outside.
///
/// An input is *controlled* when its owner passes the value in every cycle
/// through [`sync`](Self::sync); otherwise it keeps its own value, starting
/// from the default. Either way edits go through [`set`](Self::set) and are
/// reported to the change handler.
pub struct Controlled<T> {
    value: Option<T>,
    inner: T,
    default: T,
    on_change: Option<ChangeHandler<T>>,
}

impl<T: Clone + fmt::Debug> fmt::Debug for Controlled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controlled")
            .field("value", &self.value)
            .field("inner", &self.inner)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Default> Default for Controlled<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> Clone for Controlled<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            inner: self.inner.clone(),
            default: self.default.clone(),
            on_change: self.on_change.clone(),
        }
    }
}

impl<T: Clone> Controlled<T> {
    /// Uncontrolled holder starting at `default`.
    pub fn new(default: T) -> Self {
        Self {
            value: None,
            inner: default.clone(),
            default,
            on_change: None,
        }
    }

    /// Call `f` after every edit and reset.
    pub fn on_change(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(f));
        self
    }

    /// The owner's value when controlled, else the local one.
    pub fn value(&self) -> &T {
        self.value.as_ref().unwrap_or(&self.inner)
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn is_controlled(&self) -> bool {
        self.value.is_some()
    }

    /// Take the owner's latest value. Call once per cycle before reading.
    pub fn sync(&mut self, value: Option<T>) {
        if let Some(value) = &value {
            self.inner = value.clone();
        }
        self.value = value;
    }

    /// Record an edit and notify.
    pub fn set(&mut self, value: T) {
        if self.value.is_some() {
            self.value = Some(value.clone());
        }
        self.inner = value;
        self.notify();
    }

    /// Apply `f` to a copy of the current value and record the result.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        let mut value = self.value().clone();
        f(&mut value);
        self.set(value);
    }

    /// Restore the default and notify.
    pub fn reset(&mut self) {
        let default = self.default.clone();
        self.set(default);
    }

    fn notify(&self) {
        if let Some(on_change) = &self.on_change {
            on_change(self.value());
        }
    }
}
