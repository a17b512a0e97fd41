use crate::bar::Bar;
use crate::error::DataError;
use crate::feed::{new_ohlcv_series, write_bar, DataFeed, LoadResult};
use crate::line::{LineSeries, Mode};
use cerebro_instrument::Market;
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::warn;

/// A message from a live feed's producer thread.
#[derive(Debug, Clone, Copy)]
pub enum LiveMessage {
    Bar(Bar),
    /// The producer has nothing new right now but is still connected.
    Idle,
    /// The producer has shut down; no further bars will arrive.
    Disconnected,
}

/// A [`DataFeed`] driven by a channel rather than a pre-loaded `Vec` — the engine's
/// single-threaded core stays synchronous; a producer (a socket reader, a poller) runs on its
/// own thread and sends [`LiveMessage`]s back over a `std::sync::mpsc` channel, which `load()`
/// drains without blocking.
#[derive(Debug)]
pub struct LiveFeed {
    lines: LineSeries,
    market: Market,
    receiver: Receiver<LiveMessage>,
    timeframe_minutes: u32,
    disconnected: bool,
}

impl LiveFeed {
    pub fn new(market: Market, receiver: Receiver<LiveMessage>, timeframe_minutes: u32) -> Self {
        Self {
            lines: new_ohlcv_series(Mode::Full, 1),
            market,
            receiver,
            timeframe_minutes,
            disconnected: false,
        }
    }
}

impl DataFeed for LiveFeed {
    fn lines(&self) -> &LineSeries {
        &self.lines
    }

    fn lines_mut(&mut self) -> &mut LineSeries {
        &mut self.lines
    }

    fn market(&self) -> &Market {
        &self.market
    }

    fn load(&mut self) -> Result<LoadResult, DataError> {
        if self.disconnected {
            return Ok(LoadResult::End);
        }
        match self.receiver.try_recv() {
            Ok(LiveMessage::Bar(bar)) => {
                self.lines.forward(1);
                write_bar(&mut self.lines, 0, &bar);
                Ok(LoadResult::Bar)
            }
            Ok(LiveMessage::Idle) => Ok(LoadResult::NoneNow),
            Ok(LiveMessage::Disconnected) => {
                self.disconnected = true;
                Ok(LoadResult::End)
            }
            Err(TryRecvError::Empty) => Ok(LoadResult::NoneNow),
            Err(TryRecvError::Disconnected) => {
                warn!("live feed producer thread dropped its sender without signalling Disconnected");
                self.disconnected = true;
                Ok(LoadResult::End)
            }
        }
    }

    fn timeframe_minutes(&self) -> u32 {
        self.timeframe_minutes
    }

    fn islive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn market() -> Market {
        Market::new("SIM", "TEST")
    }

    #[test]
    fn empty_channel_reports_none_now() {
        let (_tx, rx) = channel();
        let mut feed = LiveFeed::new(market(), rx, 1);
        assert_eq!(feed.load().unwrap(), LoadResult::NoneNow);
    }

    #[test]
    fn bar_message_appends_and_disconnect_ends_the_feed() {
        let (tx, rx) = channel();
        let mut feed = LiveFeed::new(market(), rx, 1);

        tx.send(LiveMessage::Bar(Bar::new(1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0)))
            .unwrap();
        assert_eq!(feed.load().unwrap(), LoadResult::Bar);
        assert_eq!(feed.close(0), 1.0);

        tx.send(LiveMessage::Disconnected).unwrap();
        assert_eq!(feed.load().unwrap(), LoadResult::End);
        assert_eq!(feed.load().unwrap(), LoadResult::End, "stays ended");
    }

    #[test]
    fn dropped_sender_ends_the_feed() {
        let (tx, rx) = channel::<LiveMessage>();
        let mut feed = LiveFeed::new(market(), rx, 1);
        drop(tx);
        assert_eq!(feed.load().unwrap(), LoadResult::End);
    }
}
