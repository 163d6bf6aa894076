//! Export Environment toolbar button for notebook panels.
//!
//! Provides:
//! - `EnvironmentExporter` - Ask the kernel for its prefix and launch the export script
//! - Toolbar, button and disposable plumbing
//! - `ButtonExtension` and plugin activation against a `DocumentRegistry`

pub mod config;
pub mod exporter;
pub mod extension;
pub mod toolbar;

pub use config::{ButtonConfig, ExporterConfig, ResultMatching};
pub use exporter::{EnvironmentExporter, ExportError, ExportOutcome, ExportState, strip_quotes};
pub use extension::{
    ButtonExtension, DocumentContext, DocumentRegistry, NotebookPanel, Plugin, WidgetExtension,
};
pub use toolbar::{Disposable, DisposableDelegate, Toolbar, ToolbarButton};
