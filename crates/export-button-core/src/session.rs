//! Session context of a notebook panel.

use std::sync::{Arc, PoisonError, RwLock};

use crate::KernelConnection;

/// Holds the kernel currently attached to a panel, if any.
///
/// The kernel can change over the panel's lifetime (restart, switch,
/// shutdown), so callers should look it up at the moment of use.
#[derive(Default)]
pub struct SessionContext {
    name: String,
    kernel: RwLock<Option<Arc<dyn KernelConnection>>>,
}

impl SessionContext {
    /// Create a context with no kernel attached.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kernel: RwLock::new(None),
        }
    }

    /// Create a context with a kernel attached.
    #[must_use]
    pub fn with_kernel(name: impl Into<String>, kernel: Arc<dyn KernelConnection>) -> Self {
        Self {
            name: name.into(),
            kernel: RwLock::new(Some(kernel)),
        }
    }

    /// Session name, usually the notebook path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attached kernel.
    #[must_use]
    pub fn kernel(&self) -> Option<Arc<dyn KernelConnection>> {
        self.kernel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attach a kernel, returning the previous one.
    pub fn set_kernel(&self, kernel: Arc<dyn KernelConnection>) -> Option<Arc<dyn KernelConnection>> {
        self.kernel
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(kernel)
    }

    /// Detach the kernel, returning it.
    pub fn clear_kernel(&self) -> Option<Arc<dyn KernelConnection>> {
        self.kernel
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
