//! End-to-end engine scenarios: segmenter + state machine + ledger with
//! hand-constructed indicator series.

use bandlab_core::components::{BandProvider, ChannelBands, ChannelSeries, VolatilityReading};
use bandlab_core::data::{IndicatorRow, SessionSegmenter, SessionWindow};
use bandlab_core::domain::{Bar, Direction, TradeLedger};
use bandlab_core::engine::{EngineConfig, TradeStateMachine};
use bandlab_core::indicators::Bollinger;
use chrono::{Duration, NaiveDate, NaiveDateTime};

// ── Helpers ──────────────────────────────────────────────────────────

/// Constant 95/100/105 channel with no warm-up.
struct ConstantChannel;

impl BandProvider for ConstantChannel {
    fn name(&self) -> &str {
        "constant_channel"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute_bands(&self, closes: &[f64]) -> ChannelSeries {
        ChannelSeries {
            upper: vec![105.0; closes.len()],
            middle: vec![100.0; closes.len()],
            lower: vec![95.0; closes.len()],
        }
    }
}

fn session_start(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn bar(ts: NaiveDateTime, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: ts,
        open: close,
        high,
        low,
        close,
        volume: 100.0,
    }
}

fn flat_bars(day: u32, count: usize, price: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            bar(
                session_start(day) + Duration::minutes(i as i64),
                price,
                price,
                price,
            )
        })
        .collect()
}

fn machine() -> TradeStateMachine {
    TradeStateMachine::new(EngineConfig::default()).unwrap()
}

fn run_all(segmenter: &SessionSegmenter, bars: &[Bar]) -> TradeLedger {
    let engine = machine();
    let mut ledger = TradeLedger::new();
    for session in segmenter.sessions(bars) {
        ledger.extend(engine.run_session(&session.rows).unwrap());
    }
    ledger
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn constant_price_session_produces_no_trades() {
    let segmenter = SessionSegmenter::new(
        SessionWindow::default(),
        479,
        Box::new(Bollinger::new(26, 2.2)),
    );
    let bars = flat_bars(4, 480, 17_250.0);

    let sessions: Vec<_> = segmenter.sessions(&bars).collect();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].rows.len(), 480 - 25);

    let ledger = run_all(&segmenter, &bars);
    assert!(ledger.is_empty());
}

#[test]
fn mid_cross_then_upper_touch_yields_one_long_trade() {
    // Gate closed on rows 0..5 so the 99 closes cannot open a short.
    let engine = TradeStateMachine::new(EngineConfig {
        volatility_gate: true,
        ..EngineConfig::default()
    })
    .unwrap();

    let t0 = session_start(4);
    let rows: Vec<IndicatorRow> = (0..25)
        .map(|i| {
            let ts = t0 + Duration::minutes(i);
            let b = match i {
                0..=4 => bar(ts, 99.5, 98.5, 99.0),
                5 => bar(ts, 101.2, 99.0, 101.0),
                20 => bar(ts, 105.0, 103.0, 104.5),
                _ => bar(ts, 102.0, 100.0, 101.5),
            };
            IndicatorRow {
                bar: b,
                bands: ChannelBands {
                    upper: 105.0,
                    middle: 100.0,
                    lower: 95.0,
                },
                volatility: Some(VolatilityReading {
                    value: if i < 5 { 0.5 } else { 2.0 },
                    threshold: 1.0,
                }),
            }
        })
        .collect();

    let trades = engine.run_session(&rows).unwrap();
    // Row 21 re-enters long and never exits: discarded.
    assert_eq!(trades.len(), 1);
    let trade = &trades[0];
    assert_eq!(trade.direction, Direction::Long);
    assert_eq!(trade.entry_price, 101.0);
    assert_eq!(trade.entry_time, t0 + Duration::minutes(5));
    assert_eq!(trade.exit_price, 105.0);
    assert_eq!(trade.exit_time, t0 + Duration::minutes(20));
    assert_eq!(trade.duration_minutes, 15);
    assert_eq!(trade.adverse_price, Some(100.0));
}

#[test]
fn mid_cross_without_gate_yields_one_long_trade() {
    // Closes sit on the mid for rows 0..5, so nothing opens before the cross.
    let segmenter = SessionSegmenter::new(SessionWindow::default(), 25, Box::new(ConstantChannel));
    let t0 = session_start(4);
    let bars: Vec<Bar> = (0..25)
        .map(|i| {
            let ts = t0 + Duration::minutes(i);
            match i {
                0..=4 => bar(ts, 100.5, 99.5, 100.0),
                5 => bar(ts, 101.2, 100.2, 101.0),
                20 => bar(ts, 105.0, 103.0, 104.5),
                _ => bar(ts, 102.0, 100.0, 101.5),
            }
        })
        .collect();

    // Row 21 re-enters long and never exits: discarded.
    let ledger = run_all(&segmenter, &bars);
    assert_eq!(ledger.len(), 1);
    let trade = &ledger.as_slice()[0];
    assert_eq!(trade.direction, Direction::Long);
    assert_eq!(trade.entry_price, 101.0);
    assert_eq!(trade.entry_time, t0 + Duration::minutes(5));
    assert_eq!(trade.exit_price, 105.0);
    assert_eq!(trade.exit_time, t0 + Duration::minutes(20));
    assert_eq!(trade.duration_minutes, 15);
    assert_eq!(trade.adverse_price, Some(100.0));
    assert!((trade.pnl - (4.0 * 10_000.0 / 101.0 - 3.0)).abs() < 1e-9);
}

#[test]
fn position_open_at_day_end_never_reaches_ledger() {
    let segmenter = SessionSegmenter::new(SessionWindow::default(), 3, Box::new(ConstantChannel));

    // Day 1: flat at the mid, then the last eligible bar closes above it.
    let mut bars = flat_bars(4, 5, 100.0);
    bars.push(bar(session_start(4) + Duration::minutes(5), 101.5, 100.5, 101.0));
    // Day 2 would close a carried long immediately (high through upper).
    bars.push(bar(session_start(5), 110.0, 100.0, 100.0));
    bars.push(bar(session_start(5) + Duration::minutes(1), 100.0, 100.0, 100.0));
    bars.push(bar(session_start(5) + Duration::minutes(2), 100.0, 100.0, 100.0));

    let ledger = run_all(&segmenter, &bars);
    assert!(ledger.is_empty(), "got {:?}", ledger.as_slice());
}

#[test]
fn sessions_are_independent_and_ledger_is_chronological() {
    let segmenter = SessionSegmenter::new(SessionWindow::default(), 3, Box::new(ConstantChannel));

    let mut bars = Vec::new();
    for day in [4, 5] {
        let t0 = session_start(day);
        bars.push(bar(t0, 99.5, 98.5, 99.0)); // short entry
        bars.push(bar(t0 + Duration::minutes(1), 101.0, 97.0, 98.0));
        bars.push(bar(t0 + Duration::minutes(2), 96.0, 95.0, 95.5)); // exit at 95
        bars.push(bar(t0 + Duration::minutes(3), 100.0, 100.0, 100.0));
    }

    let ledger = run_all(&segmenter, &bars);
    assert_eq!(ledger.len(), 2);
    let days: Vec<_> = ledger.iter().map(|t| t.session).collect();
    assert_eq!(
        days,
        vec![
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        ]
    );
    for trade in &ledger {
        assert_eq!(trade.direction, Direction::Short);
        assert_eq!(trade.exit_price, 95.0);
        assert_eq!(trade.duration_minutes, 2);
        assert_eq!(trade.adverse_price, Some(101.0));
    }
}

#[test]
fn bars_outside_window_never_trade() {
    let segmenter = SessionSegmenter::new(SessionWindow::default(), 1, Box::new(ConstantChannel));
    let t0 = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap();
    let bars = vec![
        bar(t0, 101.5, 100.5, 101.0),
        bar(t0 + Duration::minutes(1), 110.0, 100.0, 101.0),
    ];
    assert_eq!(segmenter.sessions(&bars).count(), 0);
    assert!(run_all(&segmenter, &bars).is_empty());
}
