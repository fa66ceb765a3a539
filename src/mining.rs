//! Mining progress coordination
//!
//! The ledger does the actual proof-of-work search; each `POST /mine/progress`
//! advances it by one step. [`MiningProgressCoordinator`] drives those steps
//! one at a time until the ledger reports a winning hash, the run is cancelled,
//! or a request fails.
//!
//! ```text
//! Idle ──start──▶ Polling ──found──▶ Found
//!                    │ ├──cancel──▶ Cancelled
//!                    │ └──error───▶ Failed
//! ```
//!
//! Rounds never overlap: round n+1 is only sent after round n's response has
//! been applied. A cancel that lands while a request is in flight cannot abort
//! it, but its response is thrown away.

use crate::api::{LedgerApi, MiningProgress, MiningProgressRequest};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Advisory check that `hash` starts with `difficulty` zero hex digits. The
/// ledger's `found` flag is what counts.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningState {
    Idle,
    Polling,
    Found,
    Cancelled,
    Failed,
}

impl MiningState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MiningState::Found | MiningState::Cancelled | MiningState::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Found { nonce: u64, hash: String },
    Cancelled,
    /// `start` was called while a run was already polling; nothing was sent.
    AlreadyRunning,
}

struct Shared {
    state: Mutex<MiningState>,
    cancel: watch::Sender<bool>,
}

/// Owns the `Polling` state for one run. Whatever ends the run, including the
/// `start` future being dropped mid-poll, leaves a terminal state behind.
struct RunGuard<'a> {
    shared: &'a Shared,
    terminal: Option<MiningState>,
}

impl<'a> RunGuard<'a> {
    fn new(shared: &'a Shared) -> Self {
        RunGuard {
            shared,
            terminal: None,
        }
    }

    fn finish(mut self, state: MiningState) {
        self.terminal = Some(state);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let terminal = self.terminal.unwrap_or_else(|| {
            debug!("mining run dropped while polling");
            MiningState::Cancelled
        });
        *self.shared.state.lock() = terminal;
    }
}

/// Cancels the coordinator it came from. Cheap to clone and `Send`, so it can
/// be handed to a signal handler or another task.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Requests cancellation. Returns `false` if no run was polling.
    pub fn cancel(&self) -> bool {
        let state = self.shared.state.lock();
        if *state != MiningState::Polling {
            return false;
        }
        self.shared.cancel.send_replace(true);
        true
    }
}

pub struct MiningProgressCoordinator {
    shared: Arc<Shared>,
    progress: watch::Sender<Option<MiningProgress>>,
    rounds: AtomicU64,
    poll_interval: Duration,
    difficulty: usize,
}

impl Default for MiningProgressCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_DIFFICULTY)
    }
}

impl MiningProgressCoordinator {
    pub fn new(poll_interval: Duration, difficulty: usize) -> Self {
        let (cancel, _) = watch::channel(false);
        let (progress, _) = watch::channel(None);
        MiningProgressCoordinator {
            shared: Arc::new(Shared {
                state: Mutex::new(MiningState::Idle),
                cancel,
            }),
            progress,
            rounds: AtomicU64::new(0),
            poll_interval,
            difficulty,
        }
    }

    pub fn from_config(config: &crate::config::MiningConfig) -> Self {
        Self::new(config.poll_interval(), config.difficulty)
    }

    pub fn state(&self) -> MiningState {
        *self.shared.state.lock()
    }

    /// Latest applied snapshot of the current (or last) run.
    pub fn progress(&self) -> Option<MiningProgress> {
        self.progress.borrow().clone()
    }

    /// Observes every applied snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<MiningProgress>> {
        self.progress.subscribe()
    }

    /// Rounds dispatched by the current (or last) run.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Acquire)
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn cancel(&self) -> bool {
        self.cancel_handle().cancel()
    }

    /// Polls the ledger until the block is found or the run stops.
    ///
    /// A finished run (found, cancelled or failed) may be started again; its
    /// progress is reset. Dropping the returned future ends the run as
    /// cancelled.
    pub async fn start(
        &self,
        api: &dyn LedgerApi,
        miner_address: &str,
        selected: &[Transaction],
    ) -> Result<MiningOutcome> {
        let miner_address = miner_address.trim();
        if miner_address.is_empty() {
            return Err(ChainError::Validation("miner address is empty".to_string()));
        }
        if selected.is_empty() {
            return Err(ChainError::Validation(
                "no transactions selected for mining".to_string(),
            ));
        }

        {
            let mut state = self.shared.state.lock();
            if *state == MiningState::Polling {
                debug!("mining already in progress, ignoring start");
                return Ok(MiningOutcome::AlreadyRunning);
            }
            *state = MiningState::Polling;
            self.shared.cancel.send_replace(false);
        }
        let run = RunGuard::new(&self.shared);
        self.progress.send_replace(None);
        self.rounds.store(0, Ordering::Release);

        info!(miner = miner_address, count = selected.len(), "mining started");
        let request = MiningProgressRequest {
            miner_address: miner_address.to_string(),
            selected_transactions: selected.to_vec(),
        };
        let mut cancelled = self.shared.cancel.subscribe();
        let result = self.poll(api, &request, &mut cancelled).await;

        let terminal = match &result {
            Ok(MiningOutcome::Found { nonce, hash }) => {
                info!(nonce, hash = %hash, rounds = self.rounds(), "winning hash found");
                MiningState::Found
            }
            Ok(_) => {
                info!(rounds = self.rounds(), "mining cancelled");
                MiningState::Cancelled
            }
            Err(e) => {
                warn!(rounds = self.rounds(), "mining stopped: {}", e);
                MiningState::Failed
            }
        };
        run.finish(terminal);
        result
    }

    async fn poll(
        &self,
        api: &dyn LedgerApi,
        request: &MiningProgressRequest,
        cancelled: &mut watch::Receiver<bool>,
    ) -> Result<MiningOutcome> {
        loop {
            if *cancelled.borrow_and_update() {
                return Ok(MiningOutcome::Cancelled);
            }

            let round = self.rounds.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(round, "requesting proof-of-work step");
            let snapshot = api.mine_progress(request).await?;

            if *cancelled.borrow_and_update() {
                debug!(round, "discarding response received after cancel");
                return Ok(MiningOutcome::Cancelled);
            }

            if snapshot.found != meets_difficulty(&snapshot.hash, self.difficulty) {
                warn!(
                    round,
                    found = snapshot.found,
                    hash = %snapshot.hash,
                    difficulty = self.difficulty,
                    "ledger found flag disagrees with local difficulty check"
                );
            }
            debug!(round, nonce = snapshot.nonce, hash = %snapshot.hash, "step applied");
            self.progress.send_replace(Some(snapshot.clone()));

            if snapshot.found {
                return Ok(MiningOutcome::Found {
                    nonce: snapshot.nonce,
                    hash: snapshot.hash,
                });
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                Ok(_) = cancelled.wait_for(|c| *c) => {
                    return Ok(MiningOutcome::Cancelled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("0000abcd", 4));
        assert!(meets_difficulty("00000", 4));
        assert!(!meets_difficulty("000abcd", 4));
        assert!(!meets_difficulty("000", 4));
        assert!(meets_difficulty("anything", 0));
        assert!(meets_difficulty("0a", 1));
    }

    #[test]
    fn test_new_coordinator_is_idle() {
        let coordinator = MiningProgressCoordinator::default();
        assert_eq!(coordinator.state(), MiningState::Idle);
        assert_eq!(coordinator.progress(), None);
        assert_eq!(coordinator.rounds(), 0);
        assert_eq!(coordinator.difficulty(), 4);
        // Nothing to cancel yet
        assert!(!coordinator.cancel());
        assert!(!MiningState::Polling.is_terminal());
        assert!(MiningState::Failed.is_terminal());
    }
}
