use crate::{Error, Result};
use std::collections::VecDeque;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Parsed `<count>/<duration><unit>` limit, e.g. `100/1h`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
    /// The limit string as configured; echoed in rate-limit errors.
    pub display: String,
}

impl RateLimitConfig {
    pub fn window_ms(&self) -> u128 {
        self.window.as_millis()
    }
}

impl FromStr for RateLimitConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let bad = || {
            Error::Config(format!(
                "invalid rate limit {raw:?}; expected <count>/<duration><unit> with unit s, m or h (e.g. 100/1h)"
            ))
        };
        let (count, span) = raw.split_once('/').ok_or_else(bad)?;
        if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let limit: u32 = count.parse().map_err(|_| bad())?;

        let unit = span.chars().last().ok_or_else(bad)?;
        let secs_per_unit: u64 = match unit {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            _ => return Err(bad()),
        };
        let amount = &span[..span.len() - 1];
        if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let amount: u64 = amount.parse().map_err(|_| bad())?;
        if limit == 0 || amount == 0 {
            return Err(bad());
        }
        let secs = amount.checked_mul(secs_per_unit).ok_or_else(bad)?;

        Ok(Self {
            limit,
            window: Duration::from_secs(secs),
            display: raw.to_string(),
        })
    }
}

/// Call instants inside the trailing window, oldest first.
#[derive(Debug, Default)]
pub struct SlidingWindow {
    timestamps: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every instant at or before `now - window`.
    pub fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(oldest) = self.timestamps.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Prune, then either record `now` or reject. Check and record happen in
    /// one `&mut self` call, so callers only need to hold one lock around it.
    pub fn admit(&mut self, cfg: &RateLimitConfig, now: Instant) -> Result<()> {
        self.prune(cfg.window, now);
        if self.timestamps.len() >= cfg.limit as usize {
            return Err(Error::RateLimited {
                display: cfg.display.clone(),
            });
        }
        self.timestamps.push_back(now);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_each_unit() {
        let c: RateLimitConfig = "100/1h".parse().unwrap();
        assert_eq!(c.limit, 100);
        assert_eq!(c.window, Duration::from_secs(3_600));
        assert_eq!(c.display, "100/1h");

        let c: RateLimitConfig = "5/30s".parse().unwrap();
        assert_eq!(c.window_ms(), 30_000);

        let c: RateLimitConfig = "10/15m".parse().unwrap();
        assert_eq!(c.window, Duration::from_secs(900));
    }

    #[test]
    fn rejects_malformed_specs() {
        for bad in [
            "", "100", "100/", "/1h", "100/h", "100/1d", "abc/1h", "100/1x", "-1/1h", "0/1h",
            "10/0s", "1.5/1h", "100 / 1h", "100/1hh",
        ] {
            let r = bad.parse::<RateLimitConfig>();
            assert!(matches!(r, Err(Error::Config(_))), "{bad:?} => {r:?}");
        }
    }

    #[test]
    fn rejection_carries_display_string() {
        let cfg: RateLimitConfig = "1/1m".parse().unwrap();
        let mut w = SlidingWindow::new();
        let t0 = Instant::now();
        w.admit(&cfg, t0).unwrap();
        let e = w.admit(&cfg, t0).unwrap_err();
        assert_eq!(e.to_string(), "rate limit exceeded: 1/1m");
    }

    #[test]
    fn prune_keeps_only_the_trailing_window() {
        let cfg: RateLimitConfig = "10/10s".parse().unwrap();
        let mut w = SlidingWindow::new();
        let t0 = Instant::now();
        for i in 0..5 {
            w.admit(&cfg, t0 + Duration::from_secs(i * 3)).unwrap();
        }
        // instants: 0, 3, 6, 9, 12 -> at t=15 only 6, 9, 12 are newer than 15-10.
        w.prune(cfg.window, t0 + Duration::from_secs(15));
        assert_eq!(w.len(), 3);
    }

    proptest! {
        #[test]
        fn n_calls_fill_the_window_and_expire_with_it(
            limit in 1u32..50,
            window_ms in 1u64..100_000,
            spread in 0u64..1_000,
        ) {
            let cfg = RateLimitConfig {
                limit,
                window: Duration::from_millis(window_ms),
                display: format!("{limit}/{window_ms}ms"),
            };
            let mut w = SlidingWindow::new();
            let t0 = Instant::now();
            // All N calls land inside the window.
            let step = spread.min(window_ms.saturating_sub(1) / u64::from(limit));
            let mut last = t0;
            for i in 0..limit {
                last = t0 + Duration::from_millis(step * u64::from(i));
                prop_assert!(w.admit(&cfg, last).is_ok());
            }
            let over = w.admit(&cfg, last);
            prop_assert!(matches!(over, Err(Error::RateLimited { .. })), "{:?}", over);
            // Once the earliest retained call has aged out, there is room again.
            let after = t0 + Duration::from_millis(window_ms);
            prop_assert!(w.admit(&cfg, after).is_ok());
        }

        #[test]
        fn count_slash_seconds_round_trips(limit in 1u32..100_000, secs in 1u64..100_000) {
            let c: RateLimitConfig = format!("{limit}/{secs}s").parse().unwrap();
            prop_assert_eq!(c.limit, limit);
            prop_assert_eq!(c.window, Duration::from_secs(secs));
        }
    }
}
