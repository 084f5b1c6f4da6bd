//! State response reassembly
//!
//! A `GetState` request is answered by a stream of frames:
//!
//! ```text
//! switch frame     (flag at byte 7)
//! timer frame *    (one per timer, see decode_timer_frame)
//! 0x00             (terminator)
//! ```
//!
//! The accumulator consumes those frames one by one and yields the snapshot
//! once the terminator is seen.

use crate::constants::SWITCH_FLAG_OFFSET;
use crate::response::{decode_timer_frame, is_terminator};
use btaps_core::{BtapsError, BtapsResult, StateSnapshot, TimerRegistry};

/// Position of the accumulator within a state response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccumulatorPhase {
    /// Nothing received yet; the next frame carries the switch flag
    #[default]
    AwaitingSwitchFrame,
    /// Switch flag known; timer frames until the terminator
    AwaitingTimerOrTerminator,
    /// Terminator seen; further frames are ignored
    Done,
}

/// Collects the frames of one state response
#[derive(Debug, Default)]
pub struct StateAccumulator {
    phase: AccumulatorPhase,
    enabled: bool,
    timers: TimerRegistry,
}

impl StateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AccumulatorPhase {
        self.phase
    }

    /// Feed the next inbound frame
    ///
    /// # Returns
    /// `Some(snapshot)` when the frame was the terminator, `None` while more
    /// frames are expected or after the exchange already finished
    ///
    /// # Errors
    /// Returns `BtapsError::Decoding` for a malformed switch or timer frame.
    /// The caller should abort the exchange.
    pub fn push(&mut self, frame: &[u8]) -> BtapsResult<Option<StateSnapshot>> {
        if self.phase == AccumulatorPhase::Done {
            return Ok(None);
        }

        if is_terminator(frame) {
            self.phase = AccumulatorPhase::Done;
            return Ok(Some(StateSnapshot {
                enabled: self.enabled,
                timers: std::mem::take(&mut self.timers),
            }));
        }

        match self.phase {
            AccumulatorPhase::AwaitingSwitchFrame => {
                let flag = frame.get(SWITCH_FLAG_OFFSET).ok_or_else(|| {
                    BtapsError::Decoding(format!(
                        "Switch frame too short: expected at least {} bytes, got {}",
                        SWITCH_FLAG_OFFSET + 1,
                        frame.len()
                    ))
                })?;
                self.enabled = *flag != 0;
                self.phase = AccumulatorPhase::AwaitingTimerOrTerminator;
            }
            AccumulatorPhase::AwaitingTimerOrTerminator => {
                let timer = decode_timer_frame(frame)?;
                if self.timers.insert(timer.id, timer).is_some() {
                    log::warn!("State response repeated a timer id; keeping the last entry");
                }
            }
            AccumulatorPhase::Done => {}
        }
        Ok(None)
    }

    /// Error to report when the channel closes before the terminator
    pub fn incomplete(&self) -> BtapsError {
        BtapsError::IncompleteState
    }
}
