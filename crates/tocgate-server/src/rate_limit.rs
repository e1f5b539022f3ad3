//! Per-IP sign-on rate limiting.
//!
//! A token bucket per client address: `rate` tokens per second up to
//! `burst`. The limiter only gates new sign-on attempts, after the first
//! FLAP handshake; once a connection is signed on it is never consulted
//! again. Entries expire a TTL after their last touch and the table is
//! swept lazily every two TTLs to bound churn.
//!
//! Time comes from `tokio::time::Instant` so tests run on the paused
//! clock.

use std::{collections::HashMap, net::IpAddr, sync::Mutex, time::Duration};

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    touched: Instant,
}

#[derive(Debug)]
struct Buckets {
    entries: HashMap<IpAddr, Bucket>,
    last_sweep: Instant,
}

/// Token-bucket limiter keyed by client address.
#[derive(Debug)]
pub struct SignonLimiter {
    rate: f64,
    burst: f64,
    ttl: Duration,
    inner: Mutex<Buckets>,
}

impl SignonLimiter {
    /// Limiter refilling `rate` tokens per second up to `burst`, expiring
    /// idle entries after `ttl`.
    pub fn new(rate: f64, burst: u32, ttl: Duration) -> Self {
        Self {
            rate,
            burst: f64::from(burst),
            ttl,
            inner: Mutex::new(Buckets { entries: HashMap::new(), last_sweep: Instant::now() }),
        }
    }

    /// Take one token for `addr`, creating its bucket on first sight.
    pub fn allow(&self, addr: IpAddr) -> bool {
        self.allow_at(addr, Instant::now())
    }

    fn allow_at(&self, addr: IpAddr, now: Instant) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if now.duration_since(inner.last_sweep) >= self.ttl * 2 {
            let ttl = self.ttl;
            inner.entries.retain(|_, bucket| now.duration_since(bucket.touched) < ttl);
            inner.last_sweep = now;
        }

        let bucket = inner
            .entries
            .entry(addr)
            .or_insert(Bucket { tokens: self.burst, touched: now });
        let elapsed = now.duration_since(bucket.touched).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.touched = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Number of tracked addresses.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_A: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, 1));
    const IP_B: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, 2));

    #[tokio::test(start_paused = true)]
    async fn burst_of_one_allows_exactly_one() {
        let limiter = SignonLimiter::new(0.5, 1, Duration::from_secs(60));
        assert!(limiter.allow(IP_A));
        assert!(!limiter.allow(IP_A));
        // A different address gets its own bucket.
        assert!(limiter.allow(IP_B));
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_refill_over_time() {
        let limiter = SignonLimiter::new(1.0, 1, Duration::from_secs(60));
        assert!(limiter.allow(IP_A));
        assert!(!limiter.allow(IP_A));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(limiter.allow(IP_A));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_collected_after_ttl() {
        let ttl = Duration::from_secs(10);
        let limiter = SignonLimiter::new(1.0, 1, ttl);
        assert!(limiter.allow(IP_A));
        assert_eq!(limiter.tracked(), 1);

        // Past the TTL the entry is expired; the table sweeps at 2×TTL on
        // the next touch.
        tokio::time::advance(ttl * 2 + Duration::from_secs(1)).await;
        assert!(limiter.allow(IP_B));
        assert_eq!(limiter.tracked(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recently_touched_entries_survive_the_sweep() {
        let ttl = Duration::from_secs(10);
        let limiter = SignonLimiter::new(1.0, 5, ttl);
        assert!(limiter.allow(IP_A));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(limiter.allow(IP_A)); // re-touch at t=15

        tokio::time::advance(Duration::from_secs(6)).await;
        // Sweep runs (21s > 2×TTL) but the t=15 touch is inside the TTL.
        assert!(limiter.allow(IP_B));
        assert_eq!(limiter.tracked(), 2);
    }
}
