//! Per-room cancellable timers.
//!
//! Each timer lives in a named slot and carries a generation id. Scheduling
//! into an occupied slot replaces (and aborts) the previous timer, so a
//! fired message whose id no longer matches its slot is stale and dropped.
//!
//! In tokio mode a fired timer is posted back to the owning room actor over
//! an unbounded channel. Manual mode keeps a virtual clock instead, which is
//! what the synchronous engine tests drive.

use std::{collections::HashMap, fmt, time::Duration};
use tokio::{sync::mpsc, task::AbortHandle};

use super::entities::{CardId, PlayerId};
use crate::bot::{decision::DecisionAction, rules::BotEvent};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TimerSlot {
    /// Draw or play deadline for the current player
    Turn,
    SameRankWindow,
    SpecialWindow,
    /// Pause before the next player's turn opens
    Settle,
    /// A computer player's pending action
    Computer(PlayerId),
}

impl fmt::Display for TimerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Turn => write!(f, "turn"),
            Self::SameRankWindow => write!(f, "same_rank_window"),
            Self::SpecialWindow => write!(f, "special_window"),
            Self::Settle => write!(f, "settle"),
            Self::Computer(player_id) => write!(f, "computer:{player_id}"),
        }
    }
}

/// Work to run when a timer fires.
#[derive(Clone, Debug, PartialEq)]
pub enum TimerTask {
    DrawTimeout {
        player_id: PlayerId,
    },
    PlayTimeout {
        player_id: PlayerId,
    },
    SameRankExpired,
    SpecialCardExpired {
        card_id: CardId,
    },
    AdvanceTurn,
    ComputerAction {
        player_id: PlayerId,
        event: BotEvent,
        action: DecisionAction,
    },
}

/// Message a timer produces when its delay elapses.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FiredTimer {
    pub id: u64,
    pub slot: TimerSlot,
}

struct Pending {
    id: u64,
    task: TimerTask,
    due: Duration,
    abort: Option<AbortHandle>,
}

enum Mode {
    Tokio(mpsc::UnboundedSender<FiredTimer>),
    Manual,
}

pub struct Scheduler {
    mode: Mode,
    slots: HashMap<TimerSlot, Pending>,
    next_id: u64,
    /// Virtual clock, only advanced in manual mode
    now: Duration,
}

impl Scheduler {
    /// Timers backed by tokio tasks that post to `sender`.
    #[must_use]
    pub fn tokio(sender: mpsc::UnboundedSender<FiredTimer>) -> Self {
        Self::with_mode(Mode::Tokio(sender))
    }

    /// Timers that only fire when [`Scheduler::fire_next`] is called.
    #[must_use]
    pub fn manual() -> Self {
        Self::with_mode(Mode::Manual)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            slots: HashMap::new(),
            next_id: 1,
            now: Duration::ZERO,
        }
    }

    /// Arm `task` in `slot`, replacing whatever was there.
    pub fn schedule(&mut self, slot: TimerSlot, delay: Duration, task: TimerTask) -> u64 {
        self.cancel(&slot);

        let id = self.next_id;
        self.next_id += 1;

        let abort = match &self.mode {
            Mode::Tokio(sender) => {
                let sender = sender.clone();
                let fired = FiredTimer {
                    id,
                    slot: slot.clone(),
                };
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // The room may already be gone
                    let _ = sender.send(fired);
                });
                Some(handle.abort_handle())
            }
            Mode::Manual => None,
        };

        log::trace!("Timer {} armed in slot {} for {:?}", id, slot, delay);
        self.slots.insert(
            slot,
            Pending {
                id,
                task,
                due: self.now + delay,
                abort,
            },
        );
        id
    }

    pub fn cancel(&mut self, slot: &TimerSlot) -> bool {
        match self.slots.remove(slot) {
            Some(pending) => {
                if let Some(abort) = pending.abort {
                    abort.abort();
                }
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, pending) in self.slots.drain() {
            if let Some(abort) = pending.abort {
                abort.abort();
            }
        }
    }

    /// Claim the task of a fired timer. Stale timers yield `None`.
    pub fn take(&mut self, fired: &FiredTimer) -> Option<TimerTask> {
        match self.slots.get(&fired.slot) {
            Some(pending) if pending.id == fired.id => {
                self.slots.remove(&fired.slot).map(|p| p.task)
            }
            _ => {
                log::trace!("Dropping stale timer {} for slot {}", fired.id, fired.slot);
                None
            }
        }
    }

    #[must_use]
    pub fn is_scheduled(&self, slot: &TimerSlot) -> bool {
        self.slots.contains_key(slot)
    }

    #[must_use]
    pub fn task(&self, slot: &TimerSlot) -> Option<&TimerTask> {
        self.slots.get(slot).map(|p| &p.task)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }

    /// Earliest pending timer on the virtual clock.
    #[must_use]
    pub fn next_due(&self) -> Option<(Duration, FiredTimer)> {
        self.slots
            .iter()
            .min_by_key(|(_, p)| (p.due, p.id))
            .map(|(slot, p)| {
                (
                    p.due,
                    FiredTimer {
                        id: p.id,
                        slot: slot.clone(),
                    },
                )
            })
    }

    /// Advance the virtual clock to the earliest timer and report it.
    pub fn fire_next(&mut self) -> Option<FiredTimer> {
        let (due, fired) = self.next_due()?;
        self.now = self.now.max(due);
        Some(fired)
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
