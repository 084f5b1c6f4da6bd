//! Inbound frame routing
//!
//! At most one exchange is pending at a time. Each registration gets a
//! fresh correlation token; inbound frames go to the pending exchange and
//! the registration is removed as soon as it resolves, so a late frame can
//! never reach a later exchange's listener through a stale registration.

use btaps_core::{BtapsError, BtapsResult, StateSnapshot};
use btaps_protocol::StateAccumulator;
use bytes::Bytes;
use tokio::sync::oneshot;

pub(crate) type Token = u64;

/// How a pending exchange consumes inbound frames
#[derive(Debug)]
pub(crate) enum Collector {
    /// Resolved by the next frame
    Single,
    /// Resolved by the state response terminator
    State(StateAccumulator),
}

/// Result of a completed exchange
#[derive(Debug)]
pub(crate) enum ExchangeOutput {
    Frame(Bytes),
    State(StateSnapshot),
}

type Reply = oneshot::Sender<BtapsResult<ExchangeOutput>>;

#[derive(Debug)]
struct PendingExchange {
    token: Token,
    command: &'static str,
    collector: Collector,
    reply: Reply,
}

/// Routes inbound frames to the pending exchange
#[derive(Debug, Default)]
pub(crate) struct Dispatcher {
    pending: Option<PendingExchange>,
    next_token: Token,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register the listener for a new exchange
    ///
    /// An exchange still registered at this point is failed with
    /// `ConnectionLost`.
    pub(crate) fn register(
        &mut self,
        command: &'static str,
        collector: Collector,
    ) -> (Token, oneshot::Receiver<BtapsResult<ExchangeOutput>>) {
        if let Some(stale) = self.pending.take() {
            log::warn!("Replacing unresolved {} exchange", stale.command);
            let _ = stale.reply.send(Err(BtapsError::ConnectionLost));
        }

        self.next_token = self.next_token.wrapping_add(1);
        let token = self.next_token;
        let (reply, rx) = oneshot::channel();
        self.pending = Some(PendingExchange {
            token,
            command,
            collector,
            reply,
        });
        (token, rx)
    }

    /// Remove the registration for `token`, if it is still pending
    pub(crate) fn cancel(&mut self, token: Token) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.token == token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Route one inbound frame
    pub(crate) fn on_frame(&mut self, frame: Bytes) {
        let Some(mut pending) = self.pending.take() else {
            log::warn!("Dropping unsolicited frame ({} bytes)", frame.len());
            return;
        };

        log::debug!("{} exchange received {:02X?}", pending.command, frame.as_ref());
        let outcome = match &mut pending.collector {
            Collector::Single => Some(Ok(ExchangeOutput::Frame(frame))),
            Collector::State(acc) => match acc.push(&frame) {
                Ok(Some(snapshot)) => Some(Ok(ExchangeOutput::State(snapshot))),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            },
        };

        match outcome {
            Some(result) => {
                // receiver gone means the exchange already timed out
                let _ = pending.reply.send(result);
            }
            None => self.pending = Some(pending),
        }
    }

    /// Fail the pending exchange because the channel closed
    ///
    /// A state fetch fails with `IncompleteState`, anything else with
    /// `ConnectionLost`.
    pub(crate) fn on_closed(&mut self) {
        if let Some(pending) = self.pending.take() {
            let err = match &pending.collector {
                Collector::State(acc) => acc.incomplete(),
                Collector::Single => BtapsError::ConnectionLost,
            };
            let _ = pending.reply.send(Err(err));
        }
    }

    /// Fail the pending exchange with `err`
    pub(crate) fn fail_pending(&mut self, err: BtapsError) {
        if let Some(pending) = self.pending.take() {
            let _ = pending.reply.send(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame_resolves_once() {
        let mut dispatcher = Dispatcher::new();
        let (_, mut rx) = dispatcher.register("SetSwitch", Collector::Single);
        dispatcher.on_frame(Bytes::from_static(&[0x01]));
        assert!(!dispatcher.has_pending());

        match rx.try_recv().unwrap() {
            Ok(ExchangeOutput::Frame(frame)) => assert_eq!(frame.as_ref(), &[0x01]),
            other => panic!("unexpected outcome: {:?}", other),
        }

        // second frame has nowhere to go
        dispatcher.on_frame(Bytes::from_static(&[0x02]));
        assert!(!dispatcher.has_pending());
    }

    #[test]
    fn test_state_collects_until_terminator() {
        let mut dispatcher = Dispatcher::new();
        let (_, mut rx) = dispatcher.register("GetState", Collector::State(StateAccumulator::new()));
        dispatcher.on_frame(Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0, 1]));
        dispatcher.on_frame(Bytes::from_static(&[1, 5, 16, 1, 17, 2, 1, b't']));
        assert!(dispatcher.has_pending());
        assert!(rx.try_recv().is_err());

        dispatcher.on_frame(Bytes::from_static(&[0]));
        assert!(!dispatcher.has_pending());
        match rx.try_recv().unwrap() {
            Ok(ExchangeOutput::State(snapshot)) => {
                assert!(snapshot.enabled);
                assert_eq!(snapshot.timers[&1].name, "t");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_aborts_exchange() {
        let mut dispatcher = Dispatcher::new();
        let (_, mut rx) = dispatcher.register("GetState", Collector::State(StateAccumulator::new()));
        dispatcher.on_frame(Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0, 1]));
        dispatcher.on_frame(Bytes::from_static(&[1, 2]));
        assert!(!dispatcher.has_pending());
        assert!(matches!(rx.try_recv().unwrap(), Err(BtapsError::Decoding(_))));
    }

    #[test]
    fn test_cancel_matches_token() {
        let mut dispatcher = Dispatcher::new();
        let (first, _rx) = dispatcher.register("SetSwitch", Collector::Single);
        assert!(!dispatcher.cancel(first + 1));
        assert!(dispatcher.has_pending());
        assert!(dispatcher.cancel(first));
        assert!(!dispatcher.has_pending());
        assert!(!dispatcher.cancel(first));
    }

    #[test]
    fn test_closed_errors() {
        let mut dispatcher = Dispatcher::new();
        let (_, mut rx) = dispatcher.register("GetState", Collector::State(StateAccumulator::new()));
        dispatcher.on_closed();
        assert!(matches!(rx.try_recv().unwrap(), Err(BtapsError::IncompleteState)));

        let (_, mut rx) = dispatcher.register("DeleteTimer", Collector::Single);
        dispatcher.on_closed();
        assert!(matches!(rx.try_recv().unwrap(), Err(BtapsError::ConnectionLost)));
    }

    #[test]
    fn test_register_replaces_stale() {
        let mut dispatcher = Dispatcher::new();
        let (first, mut stale_rx) = dispatcher.register("SetSwitch", Collector::Single);
        let (second, _rx) = dispatcher.register("SetSwitch", Collector::Single);
        assert_ne!(first, second);
        assert!(matches!(stale_rx.try_recv().unwrap(), Err(BtapsError::ConnectionLost)));
    }
}
