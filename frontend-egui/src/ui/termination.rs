//! Selection input, Terminate button and the report of the last batch.

use eframe::egui;
use psk_backend::{parse_selection, RankedEntry, TerminationEngine, TerminationResult, TerminationSettings};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Default)]
pub struct TerminationPanel {
    pub selection_text: String,
    error: Option<String>,
    report: Arc<Mutex<Vec<ReportLine>>>,
    killing: Arc<Mutex<HashSet<i32>>>,
    refresh_requested: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
struct ReportLine {
    command: String,
    result: TerminationResult,
}

impl TerminationPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, entries: &[RankedEntry], settings: TerminationSettings) {
        let busy = !self.killing_pids().is_empty();

        ui.horizontal(|ui| {
            ui.label("Select:");
            ui.add(
                egui::TextEdit::singleline(&mut self.selection_text)
                    .hint_text("e.g. 1,3,5-7")
                    .desired_width(200.0),
            );

            let button = egui::Button::new("Terminate")
                .fill(egui::Color32::from_rgb(200, 40, 40))
                .min_size(egui::vec2(120.0, 25.0));
            if ui
                .add_enabled(!busy && !entries.is_empty(), button)
                .on_hover_text("SIGTERM first, SIGKILL if the process outlives the grace period")
                .clicked()
            {
                self.submit(ui.ctx(), entries, settings);
            }

            if busy {
                ui.spinner();
                ui.label("Terminating...");
            }
        });

        if let Some(error) = &self.error {
            ui.colored_label(egui::Color32::from_rgb(230, 160, 40), error);
        }

        let report = self
            .report
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default();
        if !report.is_empty() {
            egui::ScrollArea::vertical()
                .max_height(120.0)
                .show(ui, |ui| {
                    for line in &report {
                        let (mark, color) = if line.result.outcome.is_success() {
                            ("✓", egui::Color32::from_rgb(90, 200, 90))
                        } else {
                            ("✗", egui::Color32::from_rgb(230, 80, 80))
                        };
                        ui.colored_label(
                            color,
                            format!(
                                "{mark} {} (PID: {}) {}",
                                line.command, line.result.pid, line.result.outcome
                            ),
                        );
                    }
                });
        }
    }

    pub fn add_to_selection(&mut self, index: usize) {
        let text = self.selection_text.trim_end_matches([',', ' ']);
        self.selection_text = if text.is_empty() {
            index.to_string()
        } else {
            format!("{text},{index}")
        };
        self.error = None;
    }

    pub fn clear_selection(&mut self) {
        self.selection_text.clear();
    }

    pub fn killing_pids(&self) -> HashSet<i32> {
        self.killing
            .lock()
            .map(|pids| pids.clone())
            .unwrap_or_default()
    }

    /// True once after a batch finishes.
    pub fn take_refresh_request(&self) -> bool {
        self.refresh_requested.swap(false, Ordering::AcqRel)
    }

    fn submit(&mut self, ctx: &egui::Context, entries: &[RankedEntry], settings: TerminationSettings) {
        let selection = match parse_selection(&self.selection_text, entries.len()) {
            Ok(selection) => selection,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };
        if selection.is_empty() {
            self.error = Some("No processes selected.".to_string());
            return;
        }
        self.error = None;

        let targets: Vec<(i32, String)> = selection
            .pick(entries)
            .into_iter()
            .map(|entry| (entry.record.pid, entry.record.command.clone()))
            .collect();
        let pids: Vec<i32> = targets.iter().map(|(pid, _)| *pid).collect();
        if let Ok(mut killing) = self.killing.lock() {
            killing.extend(pids.iter().copied());
        }

        let killing = self.killing.clone();
        let report = self.report.clone();
        let refresh_requested = self.refresh_requested.clone();
        let ctx = ctx.clone();

        tokio::task::spawn_blocking(move || {
            let engine = TerminationEngine::system(settings.poll_interval());
            let results = engine.terminate(&pids, settings.graceful_timeout(), settings.forced_timeout());
            info!(targets = pids.len(), "termination batch finished");

            let lines = results
                .into_iter()
                .map(|result| ReportLine {
                    command: targets
                        .iter()
                        .find(|(pid, _)| *pid == result.pid)
                        .map(|(_, command)| command.clone())
                        .unwrap_or_default(),
                    result,
                })
                .collect();
            if let Ok(mut report) = report.lock() {
                *report = lines;
            }
            if let Ok(mut killing) = killing.lock() {
                for pid in &pids {
                    killing.remove(pid);
                }
            }
            refresh_requested.store(true, Ordering::Release);
            ctx.request_repaint();
        });

        self.selection_text.clear();
    }
}
