//! voxgrid-core: dashboard state (registry, grid layout, persistence) and the
//! remote snippet pipeline that feeds it.
//!
//! Re-exports the snippet compiler types from `voxgrid-synth` so the UI only needs
//! this crate.

mod config;
mod dashboard;
mod layout;
mod notify;
mod persistence;
mod registry;
mod remote;

pub use config::{CoreConfig, GridConfig, RemoteConfig, StoreConfig, VoiceConfig, WidgetConfig};

pub use dashboard::{Dashboard, PipelineError, PipelineResult, ProcessingGate};
pub use layout::{GridLayoutEngine, LayoutCell, PixelRect, MAX_GRID_ROWS};
pub use registry::{RegistryError, RegistryEvent, RegistryResult, WidgetDefinition, WidgetRegistry};

// Persistence (sled slot + hot cache)
pub use persistence::{
    MemorySlotStore, PersistenceBridge, PersistenceError, PersistenceResult, SledSlotStore, SlotStore,
};

pub use notify::{Notifier, Toast, ToastQueue, ToastVariant, TracingNotifier};
pub use remote::{extract_output, FetchError, FetchResult, SnippetRequest, SnippetSource, WebhookSnippetSource};

pub use voxgrid_synth::{
    CompileError, CompiledWidget, CompilerOptions, PropertyBag, RenderNode, SnippetCompiler, WidgetId,
};
