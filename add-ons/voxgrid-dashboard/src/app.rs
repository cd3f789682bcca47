//! The eframe app: header, voice panel, grid canvas and toast stack.

use crate::bridge::FetchBridge;
use crate::grid_view::{GridAction, GridView};
use eframe::egui;
use egui::{Align2, Color32, RichText};
use std::sync::Arc;
use std::time::{Duration, Instant};
use voxgrid_core::{
    CoreConfig, Dashboard, FetchError, Notifier, SlotStore, SnippetRequest, Toast, ToastQueue,
};
use voxgrid_voice::{CaptureSession, ConfidenceGate, Feedback, ManualSpeech, SessionOutput};

const TOAST_TTL: Duration = Duration::from_secs(4);

pub struct DashboardApp {
    dashboard: Dashboard,
    toasts: ToastQueue,
    visible_toasts: Vec<(Toast, Instant)>,
    bridge: FetchBridge,
    session: CaptureSession<ManualSpeech>,
    /// Text box standing in for the microphone.
    spoken: String,
    spoken_confidence: f32,
    grid: GridView,
}

impl DashboardApp {
    pub fn new(config: CoreConfig, store: Arc<dyn SlotStore>, egui_ctx: egui::Context) -> std::io::Result<Self> {
        let toasts = ToastQueue::new();
        let bridge = FetchBridge::spawn(&config.remote, egui_ctx)?;
        let session = CaptureSession::new(
            ManualSpeech::new(),
            ConfidenceGate::new(config.voice.confidence_threshold),
        );
        if let Some(feedback) = session.availability_feedback() {
            toasts.notify(toast_from(feedback));
        }

        let mut dashboard = Dashboard::new(config, store, Arc::new(toasts.clone()));
        dashboard.rehydrate();

        Ok(Self {
            dashboard,
            toasts,
            visible_toasts: Vec::new(),
            bridge,
            session,
            spoken: String::new(),
            spoken_confidence: 0.9,
            grid: GridView::default(),
        })
    }

    fn start_fetch(&mut self, transcription: &str, confidence: f32) {
        let Some(request) = self.dashboard.begin_request(transcription, confidence) else {
            return;
        };
        self.dispatch(request);
    }

    fn dispatch(&mut self, request: SnippetRequest) {
        if !self.bridge.submit(request) {
            let _ = self.dashboard.complete_request(Err(FetchError::NetworkFailure(
                "fetch worker unavailable".to_string(),
            )));
        }
    }

    fn pump(&mut self) {
        while let Some(outcome) = self.bridge.try_recv() {
            if let Err(e) = self.dashboard.complete_request(outcome) {
                tracing::debug!(target: "voxgrid::dashboard", error = %e, "request finished with error");
            }
        }
        if let Some(output) = self.session.poll() {
            match output {
                SessionOutput::Transcript(t) => self.start_fetch(&t.text, t.confidence),
                SessionOutput::Feedback(f) => self.toasts.notify(toast_from(f)),
            }
        }
        let now = Instant::now();
        self.visible_toasts
            .extend(self.toasts.drain().into_iter().map(|t| (t, now)));
        self.visible_toasts
            .retain(|(_, shown)| now.duration_since(*shown) < TOAST_TTL);
    }

    fn header(&mut self, ctx: &egui::Context) {
        let processing = self.dashboard.is_processing();
        egui::TopBottomPanel::top("voxgrid_header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading(self.dashboard.config().app_name.as_str());
                ui.label(RichText::new("Beta").small().color(Color32::from_rgb(100, 180, 255)));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let button = egui::Button::new("+ Display Widget").rounding(12.0);
                    if ui.add_enabled(!processing, button).clicked() {
                        let prompt = self.dashboard.config().remote.manual_prompt.clone();
                        self.start_fetch(&prompt, 1.0);
                    }
                    if processing {
                        ui.spinner();
                    }
                });
            });
            ui.add_space(6.0);
        });
    }

    fn voice_panel(&mut self, ui: &mut egui::Ui) {
        let processing = self.dashboard.is_processing();
        ui.group(|ui| {
            ui.vertical_centered(|ui| {
                let listening = self.session.is_listening();
                let label = if listening { "■ Stop listening" } else { "🎤 Start listening" };
                let enabled = self.session.is_available() && !processing;
                if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                    match self.session.toggle(processing) {
                        Ok(Some(feedback)) => self.toasts.notify(toast_from(feedback)),
                        Ok(None) => {}
                        Err(e) => {
                            if let Some(feedback) = e.feedback() {
                                self.toasts.notify(toast_from(feedback));
                            }
                        }
                    }
                }
                ui.label(RichText::new(self.session.status_label(processing)).weak());

                if self.session.is_listening() {
                    ui.horizontal(|ui| {
                        let said = ui.add(
                            egui::TextEdit::singleline(&mut self.spoken)
                                .hint_text("Say something, e.g. \"weather\"")
                                .desired_width(320.0),
                        );
                        ui.add(
                            egui::Slider::new(&mut self.spoken_confidence, 0.0..=1.0).text("confidence"),
                        );
                        let submit = ui.button("Done").clicked()
                            || (said.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)));
                        if submit && !self.spoken.trim().is_empty() {
                            let text = std::mem::take(&mut self.spoken);
                            if self
                                .session
                                .capability_mut()
                                .submit(text.trim(), self.spoken_confidence)
                                .is_err()
                            {
                                self.session.stop();
                            }
                        }
                    });
                }
            });
        });
    }

    fn toast_stack(&self, ctx: &egui::Context) {
        if self.visible_toasts.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("voxgrid_toasts"))
            .anchor(Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .show(ctx, |ui| {
                for (toast, _) in &self.visible_toasts {
                    let fill = if toast.is_destructive() {
                        Color32::from_rgb(120, 30, 30)
                    } else {
                        ui.visuals().window_fill
                    };
                    egui::Frame::popup(ui.style()).fill(fill).show(ui, |ui| {
                        ui.set_max_width(320.0);
                        ui.label(RichText::new(&toast.title).strong());
                        ui.label(RichText::new(&toast.description).small());
                    });
                    ui.add_space(6.0);
                }
            });
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

fn toast_from(feedback: Feedback) -> Toast {
    if feedback.destructive {
        Toast::destructive(feedback.title, feedback.description)
    } else {
        Toast::info(feedback.title, feedback.description)
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump();
        self.header(ctx);

        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.voice_panel(ui);
            ui.add_space(12.0);
            egui::ScrollArea::vertical().show(ui, |ui| {
                actions = self.grid.show(ui, &self.dashboard);
            });
        });
        for action in actions {
            match action {
                GridAction::Remove(id) => {
                    self.dashboard.remove_widget(&id);
                }
                GridAction::Reposition { id, x, y, width, height } => {
                    self.dashboard.reposition(&id, x, y, width, height);
                }
            }
        }

        self.toast_stack(ctx);
        if self.session.is_listening() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.stop();
        self.dashboard.destroy();
    }
}
