//! Ranked process table with numbered rows and a per-row context menu.

use eframe::egui;
use egui_extras::{Column, TableBuilder};
use psk_backend::{RankedEntry, SortMode};
use std::collections::HashSet;

/// What the user asked for while interacting with the table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableAction {
    AddToSelection(usize),
    SortBy(SortMode),
}

#[derive(Default)]
pub struct ProcessTable {
    pub show_user: bool,
    pub show_ppid: bool,
}

impl ProcessTable {
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        entries: &[RankedEntry],
        mode: &SortMode,
        killing: &HashSet<i32>,
    ) -> Option<TableAction> {
        let text_sz = 16.0;
        let row_height = 30.0;
        let mut action = None;

        let mut table_builder = TableBuilder::new(ui)
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(50.0)) // #
            .column(Column::remainder()) // Name
            .column(Column::exact(80.0)) // PID
            .column(Column::exact(80.0)) // CPU
            .column(Column::exact(130.0)) // Memory
            .column(Column::exact(90.0)); // State
        if self.show_user {
            table_builder = table_builder.column(Column::exact(110.0));
        }
        if self.show_ppid {
            table_builder = table_builder.column(Column::exact(80.0));
        }

        table_builder
            .header(row_height, |mut header| {
                header.col(|ui| sort_header(ui, "#", SortMode::General, mode, &mut action));
                header.col(|ui| {
                    ui.label(egui::RichText::new("Name").strong().size(15.0));
                });
                header.col(|ui| {
                    ui.label(egui::RichText::new("PID").strong().size(15.0));
                });
                header.col(|ui| sort_header(ui, "CPU %", SortMode::Cpu, mode, &mut action));
                header.col(|ui| sort_header(ui, "Memory", SortMode::Memory, mode, &mut action));
                header.col(|ui| sort_header(ui, "State", SortMode::Zombie, mode, &mut action));
                if self.show_user {
                    header.col(|ui| {
                        ui.label(egui::RichText::new("User").strong().size(15.0));
                    });
                }
                if self.show_ppid {
                    header.col(|ui| {
                        ui.label(egui::RichText::new("PPID").strong().size(15.0));
                    });
                }
            })
            .body(|body| {
                body.rows(row_height, entries.len(), |mut row| {
                    let entry = &entries[row.index()];
                    let p = &entry.record;
                    let is_killing = killing.contains(&p.pid);

                    row.col(|ui| {
                        ui.label(egui::RichText::new(entry.index.to_string()).size(text_sz).monospace());
                    });

                    // Name column carries the hover text and flag marks
                    row.col(|ui| {
                        let mut name = entry.display_name.clone();
                        if is_killing {
                            name.push_str("  (terminating...)");
                        }
                        let mut text = egui::RichText::new(name).size(text_sz);
                        if entry.flags.zombie {
                            text = text.color(egui::Color32::from_rgb(150, 150, 150));
                        } else if entry.flags.heavy {
                            text = text.color(egui::Color32::from_rgb(255, 140, 60));
                        }
                        let response = ui
                            .add(egui::Label::new(text).sense(egui::Sense::click()))
                            .on_hover_text(format!(
                                "{}\nPID: {}\nRight-click for options",
                                p.command, p.pid
                            ));
                        attach_menu(response, entry, &mut action);
                    });

                    let cells = [
                        p.pid.to_string(),
                        format!("{:.1}", p.cpu_percent),
                        format!(
                            "{:.1} MB ({:.1}%)",
                            p.memory_bytes as f64 / (1024.0 * 1024.0),
                            p.memory_percent
                        ),
                        p.state.to_string(),
                    ];
                    for cell in cells {
                        row.col(|ui| {
                            let response = ui.add(
                                egui::Label::new(egui::RichText::new(cell).size(text_sz).monospace())
                                    .sense(egui::Sense::click()),
                            );
                            attach_menu(response, entry, &mut action);
                        });
                    }

                    if self.show_user {
                        row.col(|ui| {
                            ui.label(egui::RichText::new(&p.user).size(text_sz));
                        });
                    }
                    if self.show_ppid {
                        row.col(|ui| {
                            ui.label(egui::RichText::new(p.ppid.to_string()).size(text_sz).monospace());
                        });
                    }
                });
            });

        action
    }
}

fn attach_menu(response: egui::Response, entry: &RankedEntry, action: &mut Option<TableAction>) {
    response.context_menu(|ui| {
        ui.set_min_width(200.0);

        let button = egui::Button::new(format!("Add #{} to selection", entry.index))
            .min_size(egui::vec2(180.0, 25.0));
        if ui.add(button).clicked() {
            *action = Some(TableAction::AddToSelection(entry.index));
            ui.close_menu();
        }

        let p = &entry.record;
        ui.separator();
        ui.label(format!("PID: {}", p.pid));
        ui.label(format!("Command: {}", p.command));
        ui.label(format!("User: {}", p.user));
        ui.label(format!("State: {}", p.state));
        ui.label(format!("Parent PID: {}", p.ppid));
        ui.label(format!("Started: {}", p.start_time.format("%Y-%m-%d %H:%M")));
    });
}

fn sort_header(
    ui: &mut egui::Ui,
    title: &str,
    target: SortMode,
    current: &SortMode,
    action: &mut Option<TableAction>,
) {
    let arrow = if *current == target { " ↓" } else { "" };
    let btn = egui::Button::new(
        egui::RichText::new(format!("{title}{arrow}"))
            .strong()
            .size(15.0),
    )
    .frame(false);

    if ui.add(btn).clicked() && *current != target {
        *action = Some(TableAction::SortBy(target));
    }
}
