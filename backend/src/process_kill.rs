//! Process killing functionality.
//!
//! Each target walks its own state machine:
//!
//! ```text
//! Pending --TERM--> WaitingGraceful --exited--> Terminated
//!                         |
//!                      deadline --KILL--> WaitingForced --exited--> Terminated (forced)
//!                                               |
//!                                            deadline --> TimedOut
//! ```
//!
//! All machines advance on the calling thread, one tick per poll interval, so a
//! batch takes about `graceful_timeout + forced_timeout` however many targets
//! it has. Targets are never our children, so exit is observed by polling
//! liveness rather than waiting.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Graceful,
    Forced,
}

impl SignalKind {
    pub fn signal(self) -> Signal {
        match self {
            SignalKind::Graceful => Signal::SIGTERM,
            SignalKind::Forced => Signal::SIGKILL,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signal().as_str())
    }
}

/// What the OS said when asked to deliver a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    NotFound,
    PermissionDenied,
}

/// Signal delivery and liveness checks.
pub trait ProcessControl {
    fn send_signal(&self, pid: i32, kind: SignalKind) -> SendOutcome;
    fn is_alive(&self, pid: i32) -> bool;
}

impl<T: ProcessControl + ?Sized> ProcessControl for &T {
    fn send_signal(&self, pid: i32, kind: SignalKind) -> SendOutcome {
        (**self).send_signal(pid, kind)
    }

    fn is_alive(&self, pid: i32) -> bool {
        (**self).is_alive(pid)
    }
}

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// Real signals via `kill(2)`.
///
/// Refuses pid 0, negative pids (process groups) and our own pid.
#[derive(Debug, Clone)]
pub struct NixProcessControl {
    own_pid: i32,
}

impl Default for NixProcessControl {
    fn default() -> Self {
        Self {
            own_pid: std::process::id() as i32,
        }
    }
}

impl ProcessControl for NixProcessControl {
    fn send_signal(&self, pid: i32, kind: SignalKind) -> SendOutcome {
        if pid <= 0 || pid == self.own_pid {
            warn!(pid, "refusing to signal pid");
            return SendOutcome::PermissionDenied;
        }

        match signal::kill(Pid::from_raw(pid), kind.signal()) {
            Ok(()) => SendOutcome::Delivered,
            Err(Errno::ESRCH) => SendOutcome::NotFound,
            Err(Errno::EPERM) => SendOutcome::PermissionDenied,
            Err(e) => {
                warn!(pid, signal = %kind, error = %e, "unexpected error sending signal");
                SendOutcome::PermissionDenied
            }
        }
    }

    fn is_alive(&self, pid: i32) -> bool {
        if pid <= 0 {
            return false;
        }
        // EPERM still means the pid exists
        match signal::kill(Pid::from_raw(pid), None) {
            Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
            Err(_) => false,
        }
    }
}

/// A zombie has already exited; it only waits for its parent to reap it.
fn is_zombie(pid: i32) -> bool {
    procfs::process::Process::new(pid)
        .and_then(|p| p.stat())
        .map(|stat| stat.state == 'Z')
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationOutcome {
    TerminatedGracefully,
    ForceKilled,
    NotFound,
    PermissionDenied,
    TimedOut,
}

impl TerminationOutcome {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            TerminationOutcome::TerminatedGracefully | TerminationOutcome::ForceKilled
        )
    }
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TerminationOutcome::TerminatedGracefully => "terminated",
            TerminationOutcome::ForceKilled => "force killed",
            TerminationOutcome::NotFound => "not found",
            TerminationOutcome::PermissionDenied => "permission denied",
            TerminationOutcome::TimedOut => "still running",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationResult {
    pub pid: i32,
    pub outcome: TerminationOutcome,
    /// Signals that were actually delivered, in order.
    pub signal_sequence: Vec<SignalKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillState {
    Pending,
    WaitingGraceful { deadline: Instant },
    WaitingForced { deadline: Instant },
    Done(TerminationOutcome),
}

struct KillMachine {
    pid: i32,
    state: KillState,
    sent: Vec<SignalKind>,
}

impl KillMachine {
    fn new(pid: i32) -> Self {
        Self {
            pid,
            state: KillState::Pending,
            sent: Vec::with_capacity(2),
        }
    }

    fn outcome(&self) -> Option<TerminationOutcome> {
        match self.state {
            KillState::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    fn step<P: ProcessControl>(&mut self, control: &P, now: Instant, graceful: Duration, forced: Duration) {
        let next = match self.state {
            KillState::Pending => match self.send(control, SignalKind::Graceful) {
                SendOutcome::Delivered => KillState::WaitingGraceful {
                    deadline: now + graceful,
                },
                SendOutcome::NotFound => KillState::Done(TerminationOutcome::NotFound),
                SendOutcome::PermissionDenied => KillState::Done(TerminationOutcome::PermissionDenied),
            },
            KillState::WaitingGraceful { deadline } => {
                if !control.is_alive(self.pid) {
                    KillState::Done(TerminationOutcome::TerminatedGracefully)
                } else if now >= deadline {
                    match self.send(control, SignalKind::Forced) {
                        SendOutcome::Delivered => KillState::WaitingForced {
                            deadline: now + forced,
                        },
                        // exited between the last poll and the kill
                        SendOutcome::NotFound => KillState::Done(TerminationOutcome::TerminatedGracefully),
                        SendOutcome::PermissionDenied => {
                            KillState::Done(TerminationOutcome::PermissionDenied)
                        }
                    }
                } else {
                    self.state
                }
            }
            KillState::WaitingForced { deadline } => {
                if !control.is_alive(self.pid) {
                    KillState::Done(TerminationOutcome::ForceKilled)
                } else if now >= deadline {
                    KillState::Done(TerminationOutcome::TimedOut)
                } else {
                    self.state
                }
            }
            done @ KillState::Done(_) => done,
        };

        if next != self.state {
            debug!(pid = self.pid, from = ?self.state, to = ?next, "kill state transition");
            self.state = next;
        }
    }

    fn send<P: ProcessControl>(&mut self, control: &P, kind: SignalKind) -> SendOutcome {
        let outcome = control.send_signal(self.pid, kind);
        if outcome == SendOutcome::Delivered {
            self.sent.push(kind);
        }
        outcome
    }
}

/// Drives batches of targets through graceful-then-forced termination.
pub struct TerminationEngine<P, C> {
    control: P,
    clock: C,
    poll_interval: Duration,
}

impl TerminationEngine<NixProcessControl, SystemClock> {
    /// Engine that signals real processes.
    pub fn system(poll_interval: Duration) -> Self {
        Self::new(NixProcessControl::default(), SystemClock, poll_interval)
    }
}

impl<P: ProcessControl, C: Clock> TerminationEngine<P, C> {
    pub fn new(control: P, clock: C, poll_interval: Duration) -> Self {
        Self {
            control,
            clock,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Terminate every target, returning one result per distinct pid in input order.
    ///
    /// A failure on one target never stops the others.
    pub fn terminate(
        &self,
        targets: &[i32],
        graceful_timeout: Duration,
        forced_timeout: Duration,
    ) -> Vec<TerminationResult> {
        let mut seen = HashSet::new();
        let mut machines: Vec<KillMachine> = targets
            .iter()
            .copied()
            .filter(|pid| seen.insert(*pid))
            .map(KillMachine::new)
            .collect();

        loop {
            let now = self.clock.now();
            for machine in machines.iter_mut().filter(|m| m.outcome().is_none()) {
                machine.step(&self.control, now, graceful_timeout, forced_timeout);
            }
            if machines.iter().all(|m| m.outcome().is_some()) {
                break;
            }
            self.clock.sleep(self.poll_interval);
        }

        machines
            .into_iter()
            .filter_map(|m| {
                let outcome = m.outcome()?;
                info!(pid = m.pid, %outcome, signals = ?m.sent, "termination finished");
                Some(TerminationResult {
                    pid: m.pid,
                    outcome,
                    signal_sequence: m.sent,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    const POLL: Duration = Duration::from_millis(100);
    const GRACEFUL: Duration = Duration::from_secs(2);
    const FORCED: Duration = Duration::from_secs(1);

    #[derive(Clone)]
    struct FakeClock {
        now: Rc<Cell<Instant>>,
        start: Instant,
    }

    impl FakeClock {
        fn new() -> Self {
            let start = Instant::now();
            Self {
                now: Rc::new(Cell::new(start)),
                start,
            }
        }

        fn elapsed(&self) -> Duration {
            self.now.get() - self.start
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.now.set(self.now.get() + duration);
        }
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Missing,
        Protected,
        ExitsAfterTerm(Duration),
        ExitsAfterKill(Duration),
        Unkillable,
        /// Ignores TERM, then disappears right before KILL lands.
        VanishesBeforeKill,
    }

    struct FakeControl {
        clock: FakeClock,
        procs: HashMap<i32, Behaviour>,
        delivered: RefCell<HashMap<(i32, SignalKind), Instant>>,
    }

    impl FakeControl {
        fn new(clock: &FakeClock, procs: &[(i32, Behaviour)]) -> Self {
            Self {
                clock: clock.clone(),
                procs: procs.iter().copied().collect(),
                delivered: RefCell::new(HashMap::new()),
            }
        }

        fn dead_after(&self, pid: i32, kind: SignalKind, delay: Duration) -> bool {
            self.delivered
                .borrow()
                .get(&(pid, kind))
                .is_some_and(|at| self.clock.now() >= *at + delay)
        }
    }

    impl ProcessControl for FakeControl {
        fn send_signal(&self, pid: i32, kind: SignalKind) -> SendOutcome {
            match self.procs.get(&pid) {
                None | Some(Behaviour::Missing) => return SendOutcome::NotFound,
                Some(Behaviour::Protected) => return SendOutcome::PermissionDenied,
                Some(Behaviour::VanishesBeforeKill) if kind == SignalKind::Forced => {
                    return SendOutcome::NotFound
                }
                _ => {}
            }
            if !self.is_alive(pid) {
                return SendOutcome::NotFound;
            }
            self.delivered.borrow_mut().insert((pid, kind), self.clock.now());
            SendOutcome::Delivered
        }

        fn is_alive(&self, pid: i32) -> bool {
            match self.procs.get(&pid) {
                None | Some(Behaviour::Missing) => false,
                Some(Behaviour::Protected | Behaviour::Unkillable | Behaviour::VanishesBeforeKill) => true,
                Some(Behaviour::ExitsAfterTerm(delay)) => {
                    !self.dead_after(pid, SignalKind::Graceful, *delay)
                }
                Some(Behaviour::ExitsAfterKill(delay)) => {
                    !self.dead_after(pid, SignalKind::Forced, *delay)
                }
            }
        }
    }

    fn run(procs: &[(i32, Behaviour)], targets: &[i32]) -> (Vec<TerminationResult>, FakeClock) {
        let clock = FakeClock::new();
        let control = FakeControl::new(&clock, procs);
        let engine = TerminationEngine::new(&control, clock.clone(), POLL);
        (engine.terminate(targets, GRACEFUL, FORCED), clock)
    }

    #[test]
    fn graceful_exit_never_receives_kill() {
        let (results, clock) = run(&[(10, Behaviour::ExitsAfterTerm(Duration::from_millis(350)))], &[10]);
        assert_eq!(
            results,
            vec![TerminationResult {
                pid: 10,
                outcome: TerminationOutcome::TerminatedGracefully,
                signal_sequence: vec![SignalKind::Graceful],
            }]
        );
        assert!(clock.elapsed() < GRACEFUL);
    }

    #[test]
    fn escalates_to_kill_after_graceful_timeout() {
        let (results, clock) = run(&[(11, Behaviour::ExitsAfterKill(Duration::from_millis(150)))], &[11]);
        assert_eq!(results[0].outcome, TerminationOutcome::ForceKilled);
        assert_eq!(results[0].signal_sequence, vec![SignalKind::Graceful, SignalKind::Forced]);
        assert!(clock.elapsed() >= GRACEFUL);
        assert!(clock.elapsed() < GRACEFUL + FORCED);
    }

    #[test]
    fn survivor_times_out_after_both_signals() {
        let (results, clock) = run(&[(12, Behaviour::Unkillable)], &[12]);
        assert_eq!(results[0].outcome, TerminationOutcome::TimedOut);
        assert_eq!(results[0].signal_sequence, vec![SignalKind::Graceful, SignalKind::Forced]);
        assert!(clock.elapsed() >= GRACEFUL + FORCED);
        assert!(clock.elapsed() <= GRACEFUL + FORCED + 2 * POLL);
    }

    #[test]
    fn missing_and_protected_targets_stop_immediately() {
        let (results, _) = run(&[(13, Behaviour::Missing), (14, Behaviour::Protected)], &[13, 14]);
        assert_eq!(results[0].outcome, TerminationOutcome::NotFound);
        assert_eq!(results[1].outcome, TerminationOutcome::PermissionDenied);
        assert!(results.iter().all(|r| r.signal_sequence.is_empty()));
    }

    #[test]
    fn exit_racing_the_kill_counts_as_graceful() {
        let (results, _) = run(&[(15, Behaviour::VanishesBeforeKill)], &[15]);
        assert_eq!(results[0].outcome, TerminationOutcome::TerminatedGracefully);
        assert_eq!(results[0].signal_sequence, vec![SignalKind::Graceful]);
    }

    #[test]
    fn one_denied_target_does_not_affect_the_rest() {
        let procs = [
            (1, Behaviour::ExitsAfterTerm(Duration::ZERO)),
            (2, Behaviour::Protected),
            (3, Behaviour::ExitsAfterKill(Duration::ZERO)),
            (4, Behaviour::Unkillable),
            (5, Behaviour::Missing),
        ];
        let (results, clock) = run(&procs, &[4, 2, 1, 5, 3]);

        let summary: Vec<(i32, TerminationOutcome)> = results.iter().map(|r| (r.pid, r.outcome)).collect();
        assert_eq!(
            summary,
            vec![
                (4, TerminationOutcome::TimedOut),
                (2, TerminationOutcome::PermissionDenied),
                (1, TerminationOutcome::TerminatedGracefully),
                (5, TerminationOutcome::NotFound),
                (3, TerminationOutcome::ForceKilled),
            ]
        );
        // targets advance together, so the batch is bounded by one target's timeouts
        assert!(clock.elapsed() <= GRACEFUL + FORCED + 2 * POLL);
    }

    #[test]
    fn duplicate_targets_are_processed_once() {
        let (results, _) = run(&[(7, Behaviour::ExitsAfterTerm(Duration::ZERO))], &[7, 7, 7]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].signal_sequence, vec![SignalKind::Graceful]);
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let (results, clock) = run(&[], &[]);
        assert!(results.is_empty());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn nix_control_refuses_dangerous_pids() {
        let control = NixProcessControl::default();
        assert_eq!(control.send_signal(0, SignalKind::Graceful), SendOutcome::PermissionDenied);
        assert_eq!(control.send_signal(-1, SignalKind::Forced), SendOutcome::PermissionDenied);
        assert_eq!(
            control.send_signal(std::process::id() as i32, SignalKind::Forced),
            SendOutcome::PermissionDenied
        );
        assert!(control.is_alive(std::process::id() as i32));
        assert!(!control.is_alive(0));
    }

    #[test]
    fn signal_kinds_name_their_signals() {
        assert_eq!(SignalKind::Graceful.to_string(), "SIGTERM");
        assert_eq!(SignalKind::Forced.to_string(), "SIGKILL");
    }
}
