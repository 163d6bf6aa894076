//! Toolbar, buttons and disposables.

use std::sync::{
    Arc, Mutex, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;

use crate::config::ButtonConfig;

/// Something with an explicit teardown.
pub trait Disposable: Send + Sync {
    /// Tear down. Calls after the first are no-ops.
    fn dispose(&self);

    /// Whether `dispose` has run.
    fn is_disposed(&self) -> bool;
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Disposable that runs a callback exactly once.
pub struct DisposableDelegate {
    callback: Mutex<Option<Teardown>>,
}

impl DisposableDelegate {
    /// Wrap a teardown callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }
}

impl Disposable for DisposableDelegate {
    fn dispose(&self) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn is_disposed(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Click callback.
pub type ClickHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// A labelled toolbar button.
pub struct ToolbarButton {
    config: ButtonConfig,
    on_click: ClickHandler,
    disposed: AtomicBool,
}

impl ToolbarButton {
    /// Create a button.
    #[must_use]
    pub fn new(config: ButtonConfig, on_click: ClickHandler) -> Self {
        Self {
            config,
            on_click,
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.config.label
    }

    #[must_use]
    pub fn tooltip(&self) -> &str {
        &self.config.tooltip
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.config.class_name
    }

    /// Run the click callback. Disposed buttons do nothing.
    pub async fn click(&self) {
        if self.is_disposed() {
            return;
        }
        (self.on_click)().await;
    }

    /// Mark the button as disposed.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct ToolbarItem {
    name: String,
    button: Arc<ToolbarButton>,
}

/// Ordered list of named toolbar items.
#[derive(Default)]
pub struct Toolbar {
    items: RwLock<Vec<ToolbarItem>>,
}

impl Toolbar {
    /// Create an empty toolbar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a button at `index`, clamped to the current length.
    ///
    /// Returns `false` if an item with this name already exists.
    pub fn insert_item(&self, index: usize, name: impl Into<String>, button: Arc<ToolbarButton>) -> bool {
        let name = name.into();
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.iter().any(|item| item.name == name) {
            return false;
        }
        let index = index.min(items.len());
        items.insert(index, ToolbarItem { name, button });
        true
    }

    /// Remove an item by name.
    pub fn remove_item(&self, name: &str) -> Option<Arc<ToolbarButton>> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let index = items.iter().position(|item| item.name == name)?;
        Some(items.remove(index).button)
    }

    /// Get an item by name.
    #[must_use]
    pub fn item(&self, name: &str) -> Option<Arc<ToolbarButton>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|item| item.name == name)
            .map(|item| Arc::clone(&item.button))
    }

    /// Item names in display order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|item| item.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use futures::FutureExt;

    use super::*;

    fn counting_button(clicks: &Arc<AtomicUsize>) -> Arc<ToolbarButton> {
        let clicks = Arc::clone(clicks);
        Arc::new(ToolbarButton::new(
            ButtonConfig::default(),
            Arc::new(move || {
                let clicks = Arc::clone(&clicks);
                async move {
                    clicks.fetch_add(1, Ordering::SeqCst);
                }
                .boxed()
            }),
        ))
    }

    #[test]
    fn test_insert_clamps_index() {
        let toolbar = Toolbar::new();
        let clicks = Arc::new(AtomicUsize::new(0));
        assert!(toolbar.insert_item(0, "save", counting_button(&clicks)));
        assert!(toolbar.insert_item(0, "cut", counting_button(&clicks)));
        assert!(toolbar.insert_item(10, "exportButton", counting_button(&clicks)));
        assert!(!toolbar.insert_item(1, "cut", counting_button(&clicks)));

        assert_eq!(toolbar.names(), vec!["cut", "save", "exportButton"]);
    }

    #[test]
    fn test_disposed_button_ignores_clicks() {
        let clicks = Arc::new(AtomicUsize::new(0));
        let button = counting_button(&clicks);

        tokio_test::block_on(button.click());
        button.dispose();
        tokio_test::block_on(button.click());

        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delegate_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let delegate = {
            let runs = Arc::clone(&runs);
            DisposableDelegate::new(move || {
                runs.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(!delegate.is_disposed());
        delegate.dispose();
        delegate.dispose();

        assert!(delegate.is_disposed());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
