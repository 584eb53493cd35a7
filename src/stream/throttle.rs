//! Latest-wins stream throttling

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait adding [`throttle`](ThrottleExt::throttle) to any stream
pub trait ThrottleExt: Stream {
    /// Emit at most once per `period`.
    ///
    /// Items arriving faster than that replace each other; only the most recent
    /// one is emitted when the period elapses. After a quiet spell the next item
    /// goes out immediately.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Stream returned by [`ThrottleExt::throttle`]
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        latest: Option<S::Item>,
        exhausted: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, latest: None, exhausted: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.latest = Some(item),
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if this.latest.is_some() {
            // A finished source flushes its last item without waiting
            if *this.exhausted || this.interval.poll_tick(cx).is_ready() {
                return Poll::Ready(this.latest.take());
            }
            return Poll::Pending;
        }

        if *this.exhausted { Poll::Ready(None) } else { Poll::Pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::watch;
    use tokio_stream::wrappers::WatchStream;

    #[tokio::test]
    async fn burst_collapses_to_latest() {
        let values = futures::stream::iter(1..=100);
        let emitted: Vec<_> = values.throttle(Duration::from_millis(50)).collect().await;

        // The whole burst is available on the first poll
        assert_eq!(emitted, vec![100]);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_at_most_once_per_period() {
        let (tx, rx) = watch::channel(0u32);
        let mut throttled = WatchStream::new(rx).throttle(Duration::from_millis(100));

        assert_eq!(throttled.next().await, Some(0));

        for value in 1..=5 {
            tx.send_replace(value);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let started = tokio::time::Instant::now();
        assert_eq!(throttled.next().await, Some(5));
        assert!(started.elapsed() <= Duration::from_millis(100));

        drop(tx);
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_source_stays_open() {
        let (tx, rx) = watch::channel(1u32);
        let mut throttled = WatchStream::new(rx).throttle(Duration::from_millis(10));
        assert_eq!(throttled.next().await, Some(1));

        let waited = tokio::time::timeout(Duration::from_millis(200), throttled.next()).await;
        assert!(waited.is_err(), "no value should be emitted while the source is quiet");

        tx.send_replace(2);
        assert_eq!(throttled.next().await, Some(2));
    }
}
