//! Status bar component showing process counts and statistics.

use eframe::egui;
use psk_backend::{ProcessState, Snapshot};

pub struct StatusBar;

impl StatusBar {
    pub fn show(ui: &mut egui::Ui, snapshot: &Snapshot, shown: usize, error: Option<&str>) {
        ui.separator();
        ui.horizontal(|ui| {
            ui.label(format!("Total processes: {}", snapshot.len()));

            if shown != snapshot.len() {
                ui.separator();
                ui.label(format!("Shown: {shown}"));
            }

            ui.separator();
            ui.label(format!(
                "Total memory: {:.1} GB",
                snapshot.total_memory_bytes() as f64 / (1024.0 * 1024.0 * 1024.0)
            ));

            ui.separator();
            let running = snapshot
                .records
                .iter()
                .filter(|p| p.state == ProcessState::Running)
                .count();
            ui.label(format!("Running: {running}"));

            let zombies = snapshot
                .records
                .iter()
                .filter(|p| p.state == ProcessState::Zombie)
                .count();
            if zombies > 0 {
                ui.separator();
                ui.label(format!("Zombies: {zombies}"));
            }

            ui.separator();
            ui.label(format!("Captured {}", snapshot.captured_at.format("%H:%M:%S")));

            if let Some(error) = error {
                ui.separator();
                ui.colored_label(egui::Color32::from_rgb(230, 80, 80), format!("Refresh failed: {error}"));
            }
        });
    }
}
