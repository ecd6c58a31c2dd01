//! Interactive loop: pick a mode, pick rows, confirm, terminate, report.

use crate::cli::RunArgs;
use crate::render;
use anyhow::{Context, Result};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use psk_backend::{
    list_modes, parse_selection, rank, Config, NixProcessControl, ProcessFilter, ProcessSource,
    ProcfsSource, SelectionSet, SortMode, SystemClock, TerminationEngine,
};
use tracing::{debug, info};

pub fn run(args: RunArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;

    let mut filter = config
        .process_filter()
        .with_excludes(args.excludes.iter().cloned())
        .with_name_filter(args.name.clone());
    if args.show_system {
        filter.hide_system = false;
    }

    let source = ProcfsSource::new().context("cannot enumerate processes")?;
    let mut session = Session::new(config, filter, source);

    match args.by {
        Some(mode) => session.cycle(mode),
        None => session.menu_loop(),
    }
}

struct Session<S> {
    config: Config,
    filter: ProcessFilter,
    source: S,
    engine: TerminationEngine<NixProcessControl, SystemClock>,
    theme: ColorfulTheme,
}

impl<S: ProcessSource> Session<S> {
    fn new(config: Config, filter: ProcessFilter, source: S) -> Self {
        let engine = TerminationEngine::system(config.termination.poll_interval());
        Self {
            config,
            filter,
            source,
            engine,
            theme: ColorfulTheme::default(),
        }
    }

    fn menu_loop(&mut self) -> Result<()> {
        println!("{}", style("Process Killer").green().bold());
        while let Some(mode) = self.choose_mode()? {
            let mode = match mode {
                SortMode::Search(query) if query.is_empty() => match self.prompt_query()? {
                    Some(query) => SortMode::Search(query),
                    None => continue,
                },
                other => other,
            };
            self.cycle(mode)?;
        }
        println!("{}", style("Exiting.").green());
        Ok(())
    }

    fn choose_mode(&self) -> Result<Option<SortMode>> {
        let modes = list_modes();
        let mut items: Vec<&str> = modes.iter().map(SortMode::description).collect();
        items.push("Exit");

        let choice = Select::with_theme(&self.theme)
            .with_prompt("Select process sorting method")
            .items(&items)
            .default(0)
            .interact_opt()?;
        Ok(choice.and_then(|i| modes.get(i).cloned()))
    }

    fn prompt_query(&self) -> Result<Option<String>> {
        let query: String = Input::with_theme(&self.theme)
            .with_prompt("Search (empty to go back)")
            .allow_empty(true)
            .interact_text()?;
        let query = query.trim().to_string();
        Ok((!query.is_empty()).then_some(query))
    }

    /// One snapshot, one list, one selection, one termination batch.
    fn cycle(&mut self, mode: SortMode) -> Result<()> {
        let snapshot = self.source.snapshot().context("cannot enumerate processes")?;
        let ranked = rank(&snapshot, &mode, &self.config.ranking, &self.filter);
        debug!(mode = %mode, total = snapshot.len(), shown = ranked.len(), "ranked snapshot");

        if ranked.is_empty() {
            println!("{}", style("No processes match the criteria.").yellow());
            return Ok(());
        }
        render::print_table(&ranked, &mode, snapshot.captured_at);

        let selection = self.prompt_selection(ranked.len())?;
        if selection.is_empty() {
            println!("{}", style("No processes selected.").yellow());
            return Ok(());
        }

        let targets = selection.pick(&ranked);
        render::print_targets(&targets);
        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Continue?")
            .default(true)
            .interact_opt()?
            .unwrap_or(false);
        if !confirmed {
            println!("{}", style("Operation cancelled.").yellow());
            return Ok(());
        }

        println!("{}", style("Sending termination signals...").blue());
        let pids: Vec<i32> = targets.iter().map(|entry| entry.record.pid).collect();
        let timeouts = &self.config.termination;
        let results = self
            .engine
            .terminate(&pids, timeouts.graceful_timeout(), timeouts.forced_timeout());
        info!(targets = pids.len(), "termination batch finished");

        render::print_report(&results, &targets);
        Ok(())
    }

    /// Re-prompts until the input parses against the list.
    fn prompt_selection(&self, max_index: usize) -> Result<SelectionSet> {
        loop {
            let input: String = Input::with_theme(&self.theme)
                .with_prompt(format!("Select processes 1-{max_index} (e.g. 1,3,5-7; empty to go back)"))
                .allow_empty(true)
                .interact_text()?;

            match parse_selection(&input, max_index) {
                Ok(selection) => return Ok(selection),
                Err(err) => eprintln!("{}", style(err).yellow()),
            }
        }
    }
}
