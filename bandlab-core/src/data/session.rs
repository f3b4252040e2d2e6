//! Session segmenter.
//!
//! Splits a chronological bar series into independent calendar-day sessions
//! restricted to a time-of-day window. Each surviving session gets its own
//! indicator pass (rolling windows restart every day) and is inner-joined
//! with the indicator output: only rows where every required value is defined
//! reach the state machine.
//!
//! Input bars must be sorted ascending by timestamp.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::components::indicator::{
    BandProvider, ChannelBands, VolatilityProvider, VolatilityReading,
};
use crate::domain::Bar;
use crate::indicators::rolling_mean;

/// Inclusive time-of-day window, e.g. 08:00–15:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time <= self.end
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(15, 59, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// A bar joined with the indicator values for the same timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub bar: Bar,
    pub bands: ChannelBands,
    /// Present only when the volatility filter is configured.
    pub volatility: Option<VolatilityReading>,
}

impl IndicatorRow {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.bar.timestamp
    }
}

/// One calendar day's rows, ready for simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub date: NaiveDate,
    pub rows: Vec<IndicatorRow>,
}

/// Window-eligible bars of a single calendar day, before indicator alignment.
#[derive(Debug, Clone)]
pub struct DayBars {
    pub date: NaiveDate,
    pub bars: Vec<Bar>,
}

impl DayBars {
    /// Bars with every price field defined.
    pub fn complete_bars(&self) -> usize {
        self.bars.iter().filter(|b| !b.is_void()).count()
    }
}

/// Volatility measure plus the rolling window of its own threshold.
pub struct VolatilityFilter {
    provider: Box<dyn VolatilityProvider>,
    threshold_window: usize,
}

impl VolatilityFilter {
    pub fn new(provider: Box<dyn VolatilityProvider>, threshold_window: usize) -> Self {
        assert!(threshold_window >= 1, "threshold window must be >= 1");
        Self {
            provider,
            threshold_window,
        }
    }

    /// Measure and threshold series over the given bars.
    fn readings(&self, bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let values = self.provider.compute_volatility(&highs, &lows, &closes);
        let thresholds = rolling_mean(&values, self.threshold_window);
        (values, thresholds)
    }
}

impl std::fmt::Debug for VolatilityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolatilityFilter")
            .field("provider", &self.provider.name())
            .field("threshold_window", &self.threshold_window)
            .finish()
    }
}

/// Turns a bar series into per-day sessions of aligned indicator rows.
pub struct SessionSegmenter {
    window: SessionWindow,
    min_bars: usize,
    bands: Box<dyn BandProvider>,
    volatility: Option<VolatilityFilter>,
}

impl SessionSegmenter {
    pub fn new(window: SessionWindow, min_bars: usize, bands: Box<dyn BandProvider>) -> Self {
        Self {
            window,
            min_bars,
            bands,
            volatility: None,
        }
    }

    pub fn with_volatility(mut self, filter: VolatilityFilter) -> Self {
        self.volatility = Some(filter);
        self
    }

    /// Leading rows of a session that can never carry a full indicator set.
    fn warmup(&self) -> usize {
        let vol = self
            .volatility
            .as_ref()
            .map_or(0, |f| f.provider.lookback() + f.threshold_window - 1);
        self.bands.lookback().max(vol)
    }

    /// Group window-eligible bars by calendar date, in input order.
    ///
    /// Days with no eligible bar at all are not listed.
    pub fn split_days(&self, bars: &[Bar]) -> Vec<DayBars> {
        let mut days: Vec<DayBars> = Vec::new();
        for bar in bars.iter().filter(|b| self.window.contains(b.time())) {
            match days.last_mut() {
                Some(day) if day.date == bar.date() => day.bars.push(bar.clone()),
                _ => days.push(DayBars {
                    date: bar.date(),
                    bars: vec![bar.clone()],
                }),
            }
        }
        days
    }

    /// Build a session from one day's bars.
    ///
    /// Returns `None` when the day has fewer complete bars than the threshold.
    pub fn build(&self, day: &DayBars) -> Option<Session> {
        let complete = day.complete_bars();
        if complete < self.min_bars {
            log::debug!(
                "skipping session {}: {complete} bars < minimum {}",
                day.date,
                self.min_bars
            );
            return None;
        }

        let warmup = self.warmup();
        if day.bars.len() <= warmup {
            log::debug!(
                "session {}: {} bars never clear the {warmup}-bar indicator warm-up",
                day.date,
                day.bars.len()
            );
            return Some(Session {
                date: day.date,
                rows: Vec::new(),
            });
        }

        let closes: Vec<f64> = day.bars.iter().map(|b| b.close).collect();
        let channel = self.bands.compute_bands(&closes);
        let vol = self.volatility.as_ref().map(|f| f.readings(&day.bars));

        let rows: Vec<IndicatorRow> = day
            .bars
            .iter()
            .enumerate()
            .filter(|(_, bar)| !bar.is_void())
            .filter_map(|(i, bar)| {
                let bands = channel.at(i)?;
                let volatility = match &vol {
                    Some((values, thresholds)) => {
                        let reading = VolatilityReading {
                            value: values[i],
                            threshold: thresholds[i],
                        };
                        if !reading.is_defined() {
                            return None;
                        }
                        Some(reading)
                    }
                    None => None,
                };
                Some(IndicatorRow {
                    bar: bar.clone(),
                    bands,
                    volatility,
                })
            })
            .collect();

        Some(Session {
            date: day.date,
            rows,
        })
    }

    /// Lazily yield sessions in date order.
    pub fn sessions<'s, 'b>(&'s self, bars: &'b [Bar]) -> Sessions<'s, 'b> {
        Sessions {
            segmenter: self,
            bars,
            cursor: 0,
            skipped: 0,
        }
    }
}

impl std::fmt::Debug for SessionSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSegmenter")
            .field("window", &self.window)
            .field("min_bars", &self.min_bars)
            .field("bands", &self.bands.name())
            .field("volatility", &self.volatility)
            .finish()
    }
}

/// Lazy session iterator returned by [`SessionSegmenter::sessions`].
pub struct Sessions<'s, 'b> {
    segmenter: &'s SessionSegmenter,
    bars: &'b [Bar],
    cursor: usize,
    skipped: usize,
}

impl Sessions<'_, '_> {
    /// Days dropped so far for falling below the bar threshold.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Next contiguous run of bars sharing a calendar date.
    fn next_day(&mut self) -> Option<DayBars> {
        while self.cursor < self.bars.len() {
            let date = self.bars[self.cursor].date();
            let len = self.bars[self.cursor..]
                .iter()
                .take_while(|b| b.date() == date)
                .count();
            let chunk = &self.bars[self.cursor..self.cursor + len];
            self.cursor += len;

            let window = self.segmenter.window;
            let bars: Vec<Bar> = chunk
                .iter()
                .filter(|b| window.contains(b.time()))
                .cloned()
                .collect();
            if !bars.is_empty() {
                return Some(DayBars { date, bars });
            }
        }
        None
    }
}

impl Iterator for Sessions<'_, '_> {
    type Item = Session;

    fn next(&mut self) -> Option<Session> {
        while let Some(day) = self.next_day() {
            match self.segmenter.build(&day) {
                Some(session) => return Some(session),
                None => self.skipped += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::indicator::ChannelSeries;
    use crate::indicators::{Atr, Bollinger};
    use chrono::Duration;

    /// Flat channel at fixed levels, undefined for the first `warmup` entries.
    struct FixedBands {
        warmup: usize,
    }

    impl BandProvider for FixedBands {
        fn name(&self) -> &str {
            "fixed"
        }

        fn lookback(&self) -> usize {
            self.warmup
        }

        fn compute_bands(&self, closes: &[f64]) -> ChannelSeries {
            let level = |v: f64| -> Vec<f64> {
                (0..closes.len())
                    .map(|i| if i < self.warmup { f64::NAN } else { v })
                    .collect()
            };
            ChannelSeries {
                upper: level(105.0),
                middle: level(100.0),
                lower: level(95.0),
            }
        }
    }

    fn minute_bars(date: NaiveDate, start: NaiveTime, count: usize) -> Vec<Bar> {
        let t0 = date.and_time(start);
        (0..count)
            .map(|i| Bar {
                timestamp: t0 + Duration::minutes(i as i64),
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
                volume: 10.0,
            })
            .collect()
    }

    fn fixed_segmenter(min_bars: usize, warmup: usize) -> SessionSegmenter {
        SessionSegmenter::new(
            SessionWindow::default(),
            min_bars,
            Box::new(FixedBands { warmup }),
        )
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn window_is_inclusive() {
        let window = SessionWindow::default();
        assert!(window.contains(hm(8, 0)));
        assert!(window.contains(hm(15, 59)));
        assert!(!window.contains(hm(7, 59)));
        assert!(!window.contains(hm(16, 0)));
    }

    #[test]
    fn bars_outside_window_are_ignored() {
        let seg = fixed_segmenter(1, 0);
        // 07:00 .. 16:59 = 600 bars, 480 inside 08:00..15:59
        let bars = minute_bars(day(4), hm(7, 0), 600);
        let days = seg.split_days(&bars);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].bars.len(), 480);
        assert_eq!(days[0].bars[0].time(), hm(8, 0));
        assert_eq!(days[0].bars[479].time(), hm(15, 59));
    }

    #[test]
    fn short_sessions_are_dropped() {
        let seg = fixed_segmenter(479, 0);
        let mut bars = minute_bars(day(4), hm(8, 0), 480);
        bars.extend(minute_bars(day(5), hm(8, 0), 300));
        bars.extend(minute_bars(day(6), hm(8, 0), 479));

        let mut sessions = seg.sessions(&bars);
        let first = sessions.next().unwrap();
        assert_eq!(first.date, day(4));
        let second = sessions.next().unwrap();
        assert_eq!(second.date, day(6));
        assert!(sessions.next().is_none());
        assert_eq!(sessions.skipped(), 1);
    }

    #[test]
    fn void_bars_do_not_count_toward_threshold() {
        let seg = fixed_segmenter(10, 0);
        let mut bars = minute_bars(day(4), hm(9, 0), 10);
        bars[3].close = f64::NAN;
        assert_eq!(seg.sessions(&bars).count(), 0);
    }

    #[test]
    fn warmup_rows_are_excluded() {
        let seg = fixed_segmenter(1, 5);
        let bars = minute_bars(day(4), hm(9, 0), 20);
        let session = seg.sessions(&bars).next().unwrap();
        assert_eq!(session.rows.len(), 15);
        assert_eq!(session.rows[0].timestamp(), bars[5].timestamp);
        assert!(session.rows.iter().all(|r| r.volatility.is_none()));
    }

    #[test]
    fn indicators_restart_each_session() {
        let seg = SessionSegmenter::new(
            SessionWindow::default(),
            1,
            Box::new(Bollinger::new(20, 2.0)),
        );
        let mut bars = minute_bars(day(4), hm(9, 0), 30);
        bars.extend(minute_bars(day(5), hm(9, 0), 30));
        let sessions: Vec<Session> = seg.sessions(&bars).collect();
        assert_eq!(sessions.len(), 2);
        // Each day loses its own 19-bar warm-up.
        assert_eq!(sessions[0].rows.len(), 11);
        assert_eq!(sessions[1].rows.len(), 11);
        assert_eq!(sessions[1].rows[0].timestamp(), bars[30 + 19].timestamp);
    }

    #[test]
    fn volatility_rows_need_defined_threshold() {
        let seg = fixed_segmenter(1, 0)
            .with_volatility(VolatilityFilter::new(Box::new(Atr::new(3)), 4));
        let bars = minute_bars(day(4), hm(9, 0), 12);
        let session = seg.sessions(&bars).next().unwrap();
        // ATR(3) first defined at 3, its 4-wide mean at 6.
        assert_eq!(session.rows.len(), 6);
        assert!(session.rows.iter().all(|r| r.volatility.is_some()));
    }

    #[test]
    fn volatility_recovers_after_void_bar() {
        let seg = fixed_segmenter(1, 0)
            .with_volatility(VolatilityFilter::new(Box::new(Atr::new(3)), 4));
        let mut bars = minute_bars(day(4), hm(9, 0), 40);
        bars[20].close = f64::NAN;
        let session = seg.sessions(&bars).next().unwrap();

        // Rows 6..=39, minus the void bar and the four threshold windows
        // holding the NaN true range of row 21.
        assert_eq!(session.rows.len(), 29);
        assert!(session.rows.iter().any(|r| r.timestamp() == bars[25].timestamp));
        assert_eq!(session.rows.last().unwrap().timestamp(), bars[39].timestamp);
        assert!(session
            .rows
            .iter()
            .all(|r| !(20..25).contains(&(r.timestamp() - bars[0].timestamp).num_minutes())));
    }

    #[test]
    fn session_shorter_than_warmup_has_no_rows() {
        let seg = SessionSegmenter::new(
            SessionWindow::default(),
            1,
            Box::new(Bollinger::new(20, 2.0)),
        );
        let bars = minute_bars(day(4), hm(9, 0), 19);
        let session = seg.sessions(&bars).next().unwrap();
        assert_eq!(session.date, day(4));
        assert!(session.rows.is_empty());

        // One more bar clears the warm-up and yields a row.
        let bars = minute_bars(day(4), hm(9, 0), 20);
        assert_eq!(seg.sessions(&bars).next().unwrap().rows.len(), 1);
    }

    #[test]
    fn empty_input_yields_no_sessions() {
        let seg = fixed_segmenter(0, 0);
        assert_eq!(seg.sessions(&[]).count(), 0);
        assert!(seg.split_days(&[]).is_empty());
    }
}
