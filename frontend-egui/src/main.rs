use eframe::{egui, App};
use psk_backend::{rank, Config, ProcError, ProcessSource, ProcfsSource, RankedEntry, Snapshot};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use ui::header::Header;
use ui::process_table::{ProcessTable, TableAction};
use ui::status_bar::StatusBar;
use ui::termination::TerminationPanel;

mod ui;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    // Fail before opening a window if processes cannot be listed at all
    let app = match ProcessManagerApp::new() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("psk: {e}");
            return ExitCode::from(1);
        }
    };

    let native_options = eframe::NativeOptions::default();
    let result = eframe::run_native(
        "psk",
        native_options,
        Box::new(|cc| {
            // Global black theme
            let mut visuals = egui::Visuals::dark();
            visuals.override_text_color = Some(egui::Color32::WHITE);
            visuals.panel_fill = egui::Color32::BLACK;
            visuals.window_fill = egui::Color32::BLACK;
            cc.egui_ctx.set_visuals(visuals);

            // Slightly larger default spacing
            let mut style = (*cc.egui_ctx.style()).clone();
            style.spacing.item_spacing = egui::vec2(10.0, 8.0);
            style.spacing.button_padding = egui::vec2(12.0, 8.0);
            cc.egui_ctx.set_style(style);

            Box::new(app)
        }),
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "ui terminated with an error");
            ExitCode::from(1)
        }
    }
}

struct ProcessManagerApp {
    config: Config,
    source: ProcfsSource,
    snapshot: Snapshot,
    ranked: Vec<RankedEntry>,
    refresh_error: Option<String>,
    process_table: ProcessTable,
    header: Header,
    termination: TerminationPanel,
}

impl ProcessManagerApp {
    fn new() -> Result<Self, ProcError> {
        let config = Config::load(None)?;
        let mut source = ProcfsSource::new()?;
        let snapshot = source.snapshot()?;

        let mut app = Self {
            config,
            source,
            snapshot,
            ranked: Vec::new(),
            refresh_error: None,
            process_table: ProcessTable::default(),
            header: Header::default(),
            termination: TerminationPanel::default(),
        };
        app.rerank();
        Ok(app)
    }

    fn refresh(&mut self) {
        match self.source.snapshot() {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.refresh_error = None;
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, keeping previous snapshot");
                self.refresh_error = Some(e.to_string());
            }
        }
        self.rerank();
    }

    /// Indices change with the list, so any typed selection is dropped.
    fn rerank(&mut self) {
        let filter = self.config.process_filter();
        self.ranked = rank(
            &self.snapshot,
            &self.header.current_mode(),
            &self.config.ranking,
            &filter,
        );
        self.termination.clear_selection();
    }
}

impl App for ProcessManagerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.termination.take_refresh_request() {
            self.refresh();
        }

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            self.termination
                .show(ui, &self.ranked, self.config.termination);
            StatusBar::show(
                ui,
                &self.snapshot,
                self.ranked.len(),
                self.refresh_error.as_deref(),
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            // Show header with mode, search and refresh
            let (view_changed, refresh_requested) = self.header.show(ui, &mut self.process_table);
            ui.add_space(6.0);

            if refresh_requested {
                self.refresh();
            } else if view_changed {
                self.rerank();
            }

            let killing = self.termination.killing_pids();
            let mode = self.header.current_mode();
            match self.process_table.show(ui, &self.ranked, &mode, &killing) {
                Some(TableAction::AddToSelection(index)) => self.termination.add_to_selection(index),
                Some(TableAction::SortBy(mode)) => {
                    self.header.select_mode(&mode);
                    self.rerank();
                }
                None => {}
            }
        });
    }
}
