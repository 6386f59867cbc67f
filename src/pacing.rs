//! Fixed-interval pacing for the attempt loop.
//!
//! The loop asks a [`Clock`] for a [`Ticker`] with the retry interval as
//! its period and awaits one tick before every attempt. Tests swap in a
//! clock that records the requested waits instead of sleeping.

use std::{future::Future, time::Duration};

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Source of periodic tickers.
pub trait Clock: Send + Sync {
    type Ticker: Ticker;

    /// Creates a ticker whose first tick completes one `period` from now.
    fn ticker(&self, period: Duration) -> Self::Ticker;
}

/// Periodic timer handed out by a [`Clock`].
pub trait Ticker: Send {
    /// Waits for the next tick boundary.
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Wall-clock pacing on the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Ticker = IntervalTicker;

    fn ticker(&self, period: Duration) -> IntervalTicker {
        let mut interval = time::interval_at(Instant::now() + period, period);
        // An attempt that overruns the period resumes on the next boundary.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        IntervalTicker { interval }
    }
}

/// Ticker returned by [`TokioClock`], backed by a `tokio::time::Interval`.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
