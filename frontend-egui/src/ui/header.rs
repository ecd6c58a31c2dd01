//! Header component with title, sorting mode, search, and column menu.

use eframe::egui;
use psk_backend::{list_modes, SortMode};

pub struct Header {
    pub search_text: String,
    pub mode_index: usize,
    modes: Vec<SortMode>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            mode_index: 0,
            // search is driven by the text box
            modes: list_modes()
                .into_iter()
                .filter(|mode| !matches!(mode, SortMode::Search(_)))
                .collect(),
        }
    }
}

impl Header {
    /// A non-empty search box overrides the selected mode.
    pub fn current_mode(&self) -> SortMode {
        let query = self.search_text.trim();
        if !query.is_empty() {
            return SortMode::Search(query.to_string());
        }
        self.modes.get(self.mode_index).cloned().unwrap_or_default()
    }

    pub fn select_mode(&mut self, mode: &SortMode) {
        if let Some(index) = self.modes.iter().position(|m| m == mode) {
            self.mode_index = index;
            self.search_text.clear();
        }
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        process_table: &mut crate::ui::process_table::ProcessTable,
    ) -> (bool, bool) {
        // Returns (view_changed, refresh_requested)
        let mut view_changed = false;
        let mut refresh_requested = false;

        ui.horizontal(|ui| {
            ui.heading("psk");

            ui.add_space(20.0);
            let selected = self
                .modes
                .get(self.mode_index)
                .map(SortMode::description)
                .unwrap_or("General (CPU + Memory)");
            egui::ComboBox::from_label("Sort")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for (index, mode) in self.modes.iter().enumerate() {
                        if ui
                            .selectable_value(&mut self.mode_index, index, mode.description())
                            .changed()
                        {
                            view_changed = true;
                        }
                    }
                });

            ui.add_space(10.0);
            ui.label("Search:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.search_text)
                    .hint_text("Command or name...")
                    .desired_width(200.0),
            );
            if response.changed() {
                view_changed = true;
            }

            if !self.search_text.is_empty() && ui.button("Clear").clicked() {
                self.search_text.clear();
                view_changed = true;
            }

            ui.add_space(10.0);
            if ui
                .button("Refresh")
                .on_hover_text("Take a new process snapshot.\nRow numbers and any typed selection are reset.")
                .clicked()
            {
                refresh_requested = true;
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.menu_button("Menu", |ui| {
                    ui.set_min_width(120.0);

                    ui.label("Show columns:");
                    ui.checkbox(&mut process_table.show_user, "User");
                    ui.checkbox(&mut process_table.show_ppid, "PPID");
                });
            });
        });

        (view_changed, refresh_requested)
    }
}
