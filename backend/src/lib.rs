//! UI-agnostic process management library for Linux.
//!
//! Provides functions for listing processes, turning command lines into short
//! display names, ranking and filtering them, parsing row selections, and
//! terminating the selected processes with SIGTERM escalating to SIGKILL.
//! Uses `nix` and `procfs` for system interaction.

mod config;
mod filter;
mod naming;
mod process_kill;
mod process_list;
mod rank;
mod selection;
mod types;

pub use config::{Config, FilterSettings, TerminationSettings};
pub use filter::ProcessFilter;
pub use naming::{format_name, resolve, DisplayName, PathRule, MAX_LABEL_LEN, RULES};
pub use process_kill::{
    Clock, NixProcessControl, ProcessControl, SendOutcome, SignalKind, SystemClock,
    TerminationEngine, TerminationOutcome, TerminationResult,
};
pub use process_list::{ProcessSource, ProcfsSource};
pub use rank::{list_modes, rank, EntryFlags, RankWeights, RankedEntry, SortMode};
pub use selection::{parse_selection, SelectionSet};
pub use types::{ProcError, ProcessInfo, ProcessState, Snapshot};
