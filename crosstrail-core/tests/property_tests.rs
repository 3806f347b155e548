//! Property tests for decision-loop invariants.
//!
//! 1. A fast average that stays below the slow one never produces an entry
//! 2. At most one entry/exit order is outstanding at any bar boundary
//! 3. The trailing high-water mark only rises while a position is open
//! 4. Fresh strategies replay identical bar sequences identically

mod common;

use common::{make_bars, run, CloseFillVenue};
use crosstrail_core::signal::detect;
use crosstrail_core::{CrossoverStrategy, RiskConfig, Signal};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_periods() -> impl Strategy<Value = (usize, usize)> {
    (2usize..8).prop_flat_map(|fast| (Just(fast), (fast + 1)..(fast + 20)))
}

fn arb_random_walk() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-3.0..3.0_f64, 60..400).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|s| {
                price = (price + s).max(1.0);
                price
            })
            .collect()
    })
}

fn arb_falling() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01..2.0_f64, 40..300).prop_map(|drops| {
        let mut price = 10_000.0;
        drops
            .into_iter()
            .map(|d| {
                price -= d;
                price
            })
            .collect()
    })
}

fn config((fast_period, slow_period): (usize, usize)) -> RiskConfig {
    RiskConfig {
        fast_period,
        slow_period,
        ..Default::default()
    }
}

proptest! {
    /// Fast strictly below slow on both bars never yields an entry.
    #[test]
    fn detector_never_enters_below(
        slow in 10.0..1000.0_f64,
        gap in 0.001..50.0_f64,
        prev_gap in 0.001..50.0_f64,
    ) {
        let signal = detect(Some(slow - gap), Some(slow), Some(slow - prev_gap), Some(slow));
        prop_assert_ne!(signal, Signal::EnterLong);
    }

    /// On a strictly falling series the fast average stays under the slow one.
    #[test]
    fn falling_series_never_enters(closes in arb_falling(), periods in arb_periods()) {
        let bars = make_bars(&closes);
        let mut strategy = CrossoverStrategy::new(config(periods)).unwrap();
        let mut venue = CloseFillVenue::new(100_000.0);
        let (reports, _) = run(&mut strategy, &mut venue, &bars);
        prop_assert!(reports.iter().all(|r| r.signal != Signal::EnterLong));
        prop_assert!(venue.submitted.is_empty());
    }

    /// Never more than one working entry/exit order.
    #[test]
    fn at_most_one_pending(closes in arb_random_walk(), periods in arb_periods(), reject in any::<bool>()) {
        let bars = make_bars(&closes);
        let mut strategy = CrossoverStrategy::new(config(periods)).unwrap();
        let mut venue = CloseFillVenue::new(100_000.0);
        venue.reject_entries = reject;
        for bar in &bars {
            strategy.on_bar(bar, &mut venue).unwrap();
            prop_assert!(venue.max_outstanding <= 1);
            venue.settle(&mut strategy, bar.close);
            prop_assert!(strategy.pending_order().is_none());
        }
    }

    /// High-water mark is monotone within a position and cleared outside one.
    #[test]
    fn high_water_mark_monotone(closes in arb_random_walk(), periods in arb_periods()) {
        let bars = make_bars(&closes);
        let mut strategy = CrossoverStrategy::new(config(periods)).unwrap();
        let mut venue = CloseFillVenue::new(100_000.0);
        let mut last_mark: Option<f64> = None;
        for bar in &bars {
            strategy.on_bar(bar, &mut venue).unwrap();
            if let (Some(prev), Some(now)) = (last_mark, strategy.trailing().high_water_mark()) {
                prop_assert!(now >= prev);
            }
            venue.settle(&mut strategy, bar.close);
            last_mark = strategy.trailing().high_water_mark();
            if !strategy.position().is_open() {
                prop_assert!(last_mark.is_none());
            }
        }
    }

    /// Same bars, fresh strategy, same decisions.
    #[test]
    fn replay_is_deterministic(closes in arb_random_walk(), periods in arb_periods()) {
        let bars = make_bars(&closes);
        let replay = || {
            let mut strategy = CrossoverStrategy::new(config(periods)).unwrap();
            let mut venue = CloseFillVenue::new(100_000.0);
            let (reports, events) = run(&mut strategy, &mut venue, &bars);
            (reports, events)
        };
        prop_assert_eq!(replay(), replay());
    }
}
