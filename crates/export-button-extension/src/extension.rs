//! Widget extension that adds the export button to notebook panels.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

use export_button_core::SessionContext;
use futures::FutureExt;

use crate::{
    config::{ButtonConfig, ExporterConfig},
    exporter::EnvironmentExporter,
    toolbar::{ClickHandler, Disposable, DisposableDelegate, Toolbar, ToolbarButton},
};

/// Widget factory the extension attaches to.
pub const NOTEBOOK_FACTORY: &str = "Notebook";

/// A notebook panel: toolbar plus session.
pub struct NotebookPanel {
    pub toolbar: Arc<Toolbar>,
    pub session_context: Arc<SessionContext>,
}

impl NotebookPanel {
    /// Create a panel with an empty toolbar.
    #[must_use]
    pub fn new(session_context: Arc<SessionContext>) -> Self {
        Self {
            toolbar: Arc::new(Toolbar::new()),
            session_context,
        }
    }
}

/// Document opened in a panel.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub path: PathBuf,
}

/// Extension invoked for every new widget of a factory.
pub trait WidgetExtension: Send + Sync {
    /// Attach to `panel`; disposing the result undoes the attachment.
    fn create_new(&self, panel: &NotebookPanel, context: &DocumentContext) -> Box<dyn Disposable>;
}

/// Adds the "Export Environment" button to notebook toolbars.
#[derive(Default)]
pub struct ButtonExtension {
    button: ButtonConfig,
    exporter: Arc<EnvironmentExporter>,
}

impl ButtonExtension {
    /// Create an extension.
    #[must_use]
    pub fn new(button: ButtonConfig, exporter: ExporterConfig) -> Self {
        Self {
            button,
            exporter: Arc::new(EnvironmentExporter::new(exporter)),
        }
    }

    /// Shared exporter behind every button.
    #[must_use]
    pub const fn exporter(&self) -> &Arc<EnvironmentExporter> {
        &self.exporter
    }

    fn click_handler(&self, session: Arc<SessionContext>) -> ClickHandler {
        let exporter = Arc::clone(&self.exporter);
        Arc::new(move || {
            let (exporter, session) = (Arc::clone(&exporter), Arc::clone(&session));
            async move {
                match exporter.export(&session).await {
                    Ok(outcome) => tracing::debug!(?outcome, "Export finished"),
                    Err(e) => tracing::error!("Environment export failed: {e}"),
                }
            }
            .boxed()
        })
    }
}

impl WidgetExtension for ButtonExtension {
    fn create_new(&self, panel: &NotebookPanel, context: &DocumentContext) -> Box<dyn Disposable> {
        let button = Arc::new(ToolbarButton::new(
            self.button.clone(),
            self.click_handler(Arc::clone(&panel.session_context)),
        ));

        if !panel
            .toolbar
            .insert_item(self.button.position, self.button.name.clone(), Arc::clone(&button))
        {
            tracing::warn!(name = %self.button.name, "Toolbar already has an item with this name");
        }
        tracing::debug!(path = %context.path.display(), "Export button added");

        let toolbar = Arc::clone(&panel.toolbar);
        let name = self.button.name.clone();
        Box::new(DisposableDelegate::new(move || {
            button.dispose();
            // Only remove the item if it is still ours.
            if toolbar.item(&name).is_some_and(|item| Arc::ptr_eq(&item, &button)) {
                toolbar.remove_item(&name);
            }
        }))
    }
}

/// Registry of widget extensions by factory name.
#[derive(Default)]
pub struct DocumentRegistry {
    extensions: RwLock<HashMap<String, Vec<Arc<dyn WidgetExtension>>>>,
}

impl DocumentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension for widgets made by `factory`.
    pub fn add_widget_extension(&self, factory: impl Into<String>, extension: Arc<dyn WidgetExtension>) {
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(factory.into())
            .or_default()
            .push(extension);
    }

    /// Run the extensions of `factory` against a new panel.
    #[must_use]
    pub fn open(
        &self,
        factory: &str,
        panel: &NotebookPanel,
        context: &DocumentContext,
    ) -> Vec<Box<dyn Disposable>> {
        let extensions = self
            .extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(factory)
            .cloned()
            .unwrap_or_default();

        extensions
            .iter()
            .map(|ext| ext.create_new(panel, context))
            .collect()
    }
}

/// Plugin descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub id: &'static str,
    pub auto_start: bool,
}

impl Plugin {
    /// The Export Environment plugin.
    pub const EXPORT_BUTTON: Self = Self {
        id: "toolbar-button",
        auto_start: true,
    };

    /// Register the button extension for notebooks.
    pub fn activate(&self, registry: &DocumentRegistry, extension: ButtonExtension) {
        tracing::info!(plugin = self.id, "Activating");
        registry.add_widget_extension(NOTEBOOK_FACTORY, Arc::new(extension));
    }
}

#[cfg(test)]
mod tests {
    use export_button_core::{KernelConnection, MemoryKernel, ScriptedReply};

    use super::*;

    fn context() -> DocumentContext {
        DocumentContext {
            path: PathBuf::from("analysis.ipynb"),
        }
    }

    fn activated_registry() -> DocumentRegistry {
        let registry = DocumentRegistry::new();
        Plugin::EXPORT_BUTTON.activate(&registry, ButtonExtension::default());
        registry
    }

    #[test]
    fn test_button_added_at_position_with_labels() {
        let registry = activated_registry();
        let panel = NotebookPanel::new(Arc::new(SessionContext::new("analysis.ipynb")));

        let disposables = registry.open(NOTEBOOK_FACTORY, &panel, &context());

        assert_eq!(disposables.len(), 1);
        let button = panel.toolbar.item("exportButton").unwrap();
        assert_eq!(button.label(), "Export Environment");
        assert_eq!(button.tooltip(), "Export Environment");
        assert_eq!(button.class_name(), "export-button");
    }

    #[test]
    fn test_other_factories_untouched() {
        let registry = activated_registry();
        let panel = NotebookPanel::new(Arc::new(SessionContext::new("notes.md")));

        assert!(registry.open("Editor", &panel, &context()).is_empty());
        assert!(panel.toolbar.names().is_empty());
    }

    #[test]
    fn test_dispose_removes_button() {
        let registry = activated_registry();
        let panel = NotebookPanel::new(Arc::new(SessionContext::new("analysis.ipynb")));
        let disposables = registry.open(NOTEBOOK_FACTORY, &panel, &context());
        let button = panel.toolbar.item("exportButton").unwrap();

        for d in &disposables {
            d.dispose();
        }

        assert!(panel.toolbar.item("exportButton").is_none());
        assert!(button.is_disposed());
        assert!(disposables[0].is_disposed());
    }

    #[tokio::test]
    async fn test_click_exports_through_session_kernel() {
        let kernel = MemoryKernel::spawn(|req| {
            if req.code.starts_with("import sys") {
                ScriptedReply::Value("'/opt/conda/envs/lab'".into())
            } else {
                ScriptedReply::Stream(String::new())
            }
        });
        let session = Arc::new(SessionContext::with_kernel(
            "analysis.ipynb",
            Arc::clone(&kernel) as Arc<dyn KernelConnection>,
        ));
        let panel = NotebookPanel::new(session);
        let registry = activated_registry();
        let _disposables = registry.open(NOTEBOOK_FACTORY, &panel, &context());

        panel.toolbar.item("exportButton").unwrap().click().await;

        assert_eq!(
            kernel.codes(),
            vec![
                "import sys; sys.prefix".to_string(),
                "!source $EXTENSIONS_DIR/toolbar-button/button_script.sh /opt/conda/envs/lab"
                    .to_string(),
            ]
        );
    }
}
