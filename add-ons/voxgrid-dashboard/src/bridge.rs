//! Fetch bridge: the UI thread hands snippet requests to a background tokio
//! runtime and picks the outcomes up with `try_recv` (non-blocking).

use tokio::sync::mpsc;
use voxgrid_core::{FetchResult, RemoteConfig, SnippetRequest, SnippetSource, WebhookSnippetSource};

pub type FetchOutcome = FetchResult<String>;

pub struct FetchBridge {
    jobs: mpsc::Sender<SnippetRequest>,
    outcomes: mpsc::Receiver<FetchOutcome>,
}

impl FetchBridge {
    /// Start the worker thread. `repaint` wakes the UI once an outcome is ready.
    pub fn spawn(remote: &RemoteConfig, repaint: egui::Context) -> std::io::Result<Self> {
        let (job_tx, mut job_rx) = mpsc::channel::<SnippetRequest>(4);
        let (out_tx, out_rx) = mpsc::channel::<FetchOutcome>(4);
        let source = WebhookSnippetSource::new(remote);
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        std::thread::Builder::new()
            .name("voxgrid-fetch".into())
            .spawn(move || {
                rt.block_on(async move {
                    tracing::info!(target: "voxgrid::bridge", endpoint = %source.endpoint(), "fetch worker started");
                    while let Some(request) = job_rx.recv().await {
                        let outcome = source.fetch(&request).await;
                        if out_tx.send(outcome).await.is_err() {
                            break;
                        }
                        repaint.request_repaint();
                    }
                    tracing::info!(target: "voxgrid::bridge", "fetch worker stopped");
                });
            })?;

        Ok(Self {
            jobs: job_tx,
            outcomes: out_rx,
        })
    }

    /// Queue a request. False when the worker is gone or saturated.
    pub fn submit(&self, request: SnippetRequest) -> bool {
        self.jobs.try_send(request).is_ok()
    }

    pub fn try_recv(&mut self) -> Option<FetchOutcome> {
        self.outcomes.try_recv().ok()
    }
}
