//! Dashboard controller: sequences fetch, compile, register, place and persist.

use crate::config::CoreConfig;
use crate::layout::{GridLayoutEngine, LayoutCell};
use crate::notify::{Notifier, Toast};
use crate::persistence::{PersistenceBridge, SlotStore};
use crate::registry::{RegistryError, WidgetDefinition, WidgetRegistry};
use crate::remote::{FetchError, FetchResult, SnippetRequest, SnippetSource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use voxgrid_synth::{CompileError, SnippetCompiler, WidgetId};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("a request is already being processed")]
    Busy,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("the dashboard has been torn down")]
    Destroyed,
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Advisory flag set while a remote fetch is in flight.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessingGate {
    busy: bool,
}

impl ProcessingGate {
    /// Returns false when already busy.
    pub fn try_begin(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    pub fn finish(&mut self) {
        self.busy = false;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

pub struct Dashboard {
    config: CoreConfig,
    compiler: SnippetCompiler,
    registry: WidgetRegistry,
    layout: GridLayoutEngine,
    persistence: PersistenceBridge,
    notifier: Arc<dyn Notifier>,
    gate: ProcessingGate,
}

impl Dashboard {
    pub fn new(config: CoreConfig, store: Arc<dyn SlotStore>, notifier: Arc<dyn Notifier>) -> Self {
        let compiler = SnippetCompiler::new(config.synth.clone());
        let layout = GridLayoutEngine::create(config.grid.clone());
        let persistence = PersistenceBridge::new(store, config.store.slot.clone());
        Self {
            config,
            compiler,
            registry: WidgetRegistry::new(),
            layout,
            persistence,
            notifier,
            gate: ProcessingGate::default(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &GridLayoutEngine {
        &self.layout
    }

    pub fn is_processing(&self) -> bool {
        self.gate.is_busy()
    }

    /// Rebuild widgets from the durable slot. Entries that fail to compile are
    /// skipped. Returns how many were restored.
    pub fn rehydrate(&mut self) -> usize {
        if !self.layout.is_alive() {
            return 0;
        }
        let definitions = self.persistence.load();
        let total = definitions.len();
        let mut restored = 0;
        for stored in definitions {
            let compiled = match self.compiler.compile_with_id(stored.id.clone(), &stored.source_text) {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        target: "voxgrid::dashboard",
                        widget_id = %stored.id,
                        error = %e,
                        "skipping stored widget"
                    );
                    continue;
                }
            };
            let definition = WidgetDefinition::new(
                stored.id,
                stored.source_text,
                self.config.widget.default_properties.clone(),
            );
            match self.registry.insert(definition, compiled) {
                Ok(()) => restored += 1,
                Err(e) => warn!(target: "voxgrid::dashboard", error = %e, "skipping stored widget"),
            }
        }
        self.layout.sync(&mut self.registry);
        info!(target: "voxgrid::dashboard", restored, total, "dashboard rehydrated");
        restored
    }

    // -------------------------------------------------------------------------
    // Remote pipeline
    // -------------------------------------------------------------------------

    /// Close the gate and build the outgoing request, or refuse when busy.
    pub fn begin_request(&mut self, transcription: &str, confidence: f32) -> Option<SnippetRequest> {
        if !self.layout.is_alive() {
            return None;
        }
        if !self.gate.try_begin() {
            self.notifier.notify(Toast::info(
                "Processing Previous Request",
                "Please wait while processing your previous request.",
            ));
            return None;
        }
        self.notifier.notify(Toast::info(
            "Processing Your Request",
            format!("\"{}\" is being processed...", transcription),
        ));
        Some(SnippetRequest::new(transcription, confidence))
    }

    /// Apply a fetch outcome. The gate is reopened whatever happens.
    pub fn complete_request(&mut self, result: FetchResult<String>) -> PipelineResult<WidgetId> {
        self.gate.finish();
        self.ensure_alive()?;
        let source = match result {
            Ok(source) => source,
            Err(e) => {
                warn!(target: "voxgrid::dashboard", error = %e, "snippet fetch failed");
                let description = match &e {
                    FetchError::MissingOutputField => {
                        "No widget code was returned from the workflow.".to_string()
                    }
                    other => format!("Failed to process: {}", other),
                };
                self.notifier
                    .notify(Toast::destructive("Processing Failed", description));
                return Err(e.into());
            }
        };
        self.notifier.notify(Toast::info(
            "Widget Code Received",
            "Creating widget from received code",
        ));
        self.add_snippet(&source)
    }

    pub async fn process_transcription(
        &mut self,
        source: &dyn SnippetSource,
        transcription: &str,
        confidence: f32,
    ) -> PipelineResult<WidgetId> {
        self.ensure_alive()?;
        let Some(request) = self.begin_request(transcription, confidence) else {
            return Err(PipelineError::Busy);
        };
        let result = source.fetch(&request).await;
        self.complete_request(result)
    }

    /// The "Display Widget" trigger: same pipeline with the configured prompt.
    pub async fn manual_fetch(&mut self, source: &dyn SnippetSource) -> PipelineResult<WidgetId> {
        let prompt = self.config.remote.manual_prompt.clone();
        self.process_transcription(source, &prompt, 1.0).await
    }

    // -------------------------------------------------------------------------
    // Widget operations
    // -------------------------------------------------------------------------

    /// Compile and install a snippet under a fresh id.
    pub fn add_snippet(&mut self, source_text: &str) -> PipelineResult<WidgetId> {
        self.ensure_alive()?;
        match self.install(WidgetId::generate(), source_text) {
            Ok(id) => {
                self.notifier.notify(Toast::info(
                    "Widget Created",
                    "New widget has been added to your dashboard.",
                ));
                Ok(id)
            }
            Err(e) => {
                self.notifier.notify(Toast::destructive(
                    "Widget Creation Failed",
                    format!("Could not create widget: {}", e),
                ));
                Err(e)
            }
        }
    }

    /// Compile under a caller-chosen id. Nothing changes unless compilation
    /// and insertion both succeed.
    pub fn install(&mut self, id: WidgetId, source_text: &str) -> PipelineResult<WidgetId> {
        self.ensure_alive()?;
        let compiled = self
            .compiler
            .compile_with_id(id.clone(), source_text)
            .inspect_err(|e| {
                warn!(target: "voxgrid::dashboard", widget_id = %id, error = %e, "snippet rejected");
            })?;
        let definition = WidgetDefinition::new(
            id.clone(),
            source_text,
            self.config.widget.default_properties.clone(),
        );
        self.registry.insert(definition, compiled)?;
        self.layout.sync(&mut self.registry);
        self.persist();
        Ok(id)
    }

    pub fn remove_widget(&mut self, id: &WidgetId) -> bool {
        if !self.layout.is_alive() || !self.registry.remove(id) {
            return false;
        }
        self.layout.sync(&mut self.registry);
        self.persist();
        self.notifier.notify(Toast::info(
            "Widget Removed",
            "The widget has been removed from your dashboard.",
        ));
        true
    }

    pub fn reposition(&mut self, id: &WidgetId, x: i64, y: i64, width: i64, height: i64) -> Option<LayoutCell> {
        self.layout.on_user_reposition(id, x, y, width, height)
    }

    /// Tear down the grid. The registry and durable slot are left alone, and
    /// every later mutation is refused so no widget ends up without a cell.
    pub fn destroy(&mut self) {
        self.layout.destroy();
    }

    fn ensure_alive(&self) -> PipelineResult<()> {
        if self.layout.is_alive() {
            Ok(())
        } else {
            Err(PipelineError::Destroyed)
        }
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.registry.definitions()) {
            warn!(target: "voxgrid::dashboard", error = %e, "failed to persist widgets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastQueue;
    use crate::persistence::MemorySlotStore;

    fn dashboard() -> (Dashboard, ToastQueue) {
        let toasts = ToastQueue::new();
        let dash = Dashboard::new(
            CoreConfig::default(),
            Arc::new(MemorySlotStore::new()),
            Arc::new(toasts.clone()),
        );
        (dash, toasts)
    }

    #[test]
    fn gate_refuses_second_request() {
        let (mut dash, toasts) = dashboard();
        assert!(dash.begin_request("weather", 0.9).is_some());
        assert!(dash.is_processing());
        assert!(dash.begin_request("again", 0.9).is_none());
        let titles: Vec<_> = toasts.drain().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Processing Your Request", "Processing Previous Request"]);
    }

    #[test]
    fn failed_fetch_reopens_gate_and_leaves_state() {
        let (mut dash, toasts) = dashboard();
        dash.begin_request("weather", 0.9);
        let err = dash
            .complete_request(Err(FetchError::NonSuccessStatus(500)))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(FetchError::NonSuccessStatus(500))));
        assert!(!dash.is_processing());
        assert!(dash.registry().is_empty());
        assert!(dash.layout().is_empty());
        assert!(toasts.drain().last().unwrap().is_destructive());
    }

    #[test]
    fn missing_output_has_its_own_message() {
        let (mut dash, toasts) = dashboard();
        dash.begin_request("x", 0.9);
        let _ = dash.complete_request(Err(FetchError::MissingOutputField));
        let last = toasts.drain().pop().unwrap();
        assert_eq!(last.description, "No widget code was returned from the workflow.");
    }

    #[test]
    fn compile_failure_is_atomic() {
        let (mut dash, toasts) = dashboard();
        dash.begin_request("x", 0.9);
        let err = dash
            .complete_request(Ok("const nothing = 1".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Compile(CompileError::NoEntryPointFound { .. })
        ));
        assert!(dash.registry().is_empty());
        assert!(dash.layout().is_empty());
        assert_eq!(toasts.drain().pop().unwrap().title, "Widget Creation Failed");
    }

    #[test]
    fn new_widgets_get_default_properties() {
        let (mut dash, _) = dashboard();
        let id = dash
            .add_snippet("const CityWidget = ({ city }) => render(city)")
            .unwrap();
        let (_, props) = dash.registry().get(&id).unwrap();
        assert_eq!(props["city"], "San Francisco");
        assert_eq!(
            dash.layout().render_content(&id).unwrap().text_content(),
            "San Francisco"
        );
    }

    #[test]
    fn destroyed_dashboard_refuses_mutations() {
        let (mut dash, toasts) = dashboard();
        let kept = dash.add_snippet("const KeptWidget = () => 'kept'").unwrap();
        dash.destroy();
        toasts.drain();

        let err = dash.add_snippet("const LateWidget = () => 'late'").unwrap_err();
        assert!(matches!(err, PipelineError::Destroyed));
        let err = dash.install("w9".into(), "const LateWidget = () => 'late'").unwrap_err();
        assert!(matches!(err, PipelineError::Destroyed));
        assert!(dash.begin_request("weather", 0.9).is_none());
        let err = dash
            .complete_request(Ok("const LateWidget = () => 'late'".to_string()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Destroyed));
        assert!(!dash.is_processing());
        assert!(!dash.remove_widget(&kept));
        assert_eq!(dash.rehydrate(), 0);

        assert_eq!(dash.registry().len(), 1);
        assert!(toasts.is_empty());
    }

    #[test]
    fn reposition_to_extreme_rows_keeps_layout_arithmetic_sound() {
        let (mut dash, _) = dashboard();
        let id = dash.add_snippet("const FarWidget = () => 'far'").unwrap();
        let cell = dash.reposition(&id, 0, i64::MAX, 4, 4).unwrap();
        assert!(cell.bottom() <= crate::layout::MAX_GRID_ROWS);
        assert_eq!(dash.layout().row_count(), cell.bottom());
    }

    #[test]
    fn remove_unknown_is_quiet() {
        let (mut dash, toasts) = dashboard();
        assert!(!dash.remove_widget(&"nope".into()));
        assert!(toasts.is_empty());
    }
}
