use parking_lot::Mutex;
use tokio::time::{self, Duration, Instant};

/// Smallest permitted gap between two lines written to the server
pub const MIN_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Hands out transmission slots at least [`MIN_SEND_INTERVAL`] apart.
///
/// Slots are reserved under a short-lived lock, but the wait for a slot happens
/// outside it, so concurrent senders queue up behind each other without
/// serialising on one another's sleeps.
#[derive(Debug)]
pub struct RateLimiter
{
    interval: Duration,
    last_slot: Mutex<Option<Instant>>,
}

impl Default for RateLimiter
{
    fn default() -> Self
    {
        Self::new(MIN_SEND_INTERVAL)
    }
}

impl RateLimiter
{
    pub fn new(interval: Duration) -> Self
    {
        Self {
            interval,
            last_slot: Mutex::new(None),
        }
    }

    /// Reserve the next free slot and return the instant at which it opens.
    ///
    /// If the previous slot is at least one interval in the past, the new slot
    /// is now; otherwise it is one interval after the previous slot.
    pub fn reserve(&self) -> Instant
    {
        let mut last_slot = self.last_slot.lock();
        let now = Instant::now();

        let slot = match *last_slot {
            Some(previous) if now.saturating_duration_since(previous) < self.interval => {
                previous + self.interval
            }
            _ => now,
        };

        *last_slot = Some(slot);
        slot
    }

    /// Reserve a slot and wait until it opens.
    pub async fn wait_turn(&self)
    {
        let slot = self.reserve();
        time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_slot_is_immediate()
    {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.reserve(), Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_slots_are_spaced()
    {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        let slots: Vec<_> = (0..5).map(|_| limiter.reserve()).collect();

        for (i, slot) in slots.iter().enumerate()
        {
            assert_eq!(*slot, start + MIN_SEND_INTERVAL * i as u32);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_limiter_resets_to_now()
    {
        let limiter = RateLimiter::default();
        limiter.reserve();
        limiter.reserve();

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(limiter.reserve(), Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn partial_gap_waits_out_the_remainder()
    {
        let limiter = RateLimiter::default();
        let first = limiter.reserve();

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(limiter.reserve(), first + MIN_SEND_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_all_get_distinct_spaced_slots()
    {
        let limiter = Arc::new(RateLimiter::default());
        let start = Instant::now();

        let waiters: Vec<_> = (0..6)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait_turn().await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for w in waiters
        {
            finished.push(w.await.unwrap());
        }
        finished.sort();

        assert_eq!(finished.len(), 6);
        assert!(finished[0] - start < MIN_SEND_INTERVAL);
        for pair in finished.windows(2)
        {
            assert!(pair[1] - pair[0] >= MIN_SEND_INTERVAL);
        }
    }
}
