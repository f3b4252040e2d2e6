//! Simple rolling mean.
//!
//! Lookback: period - 1 (first valid value at index period-1).
//! A NaN anywhere in the window makes that output NaN.

/// Rolling arithmetic mean of `values` over `period` entries.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    // Running sum over finite values, with a count of NaNs in the window.
    let mut sum = 0.0;
    let mut nan_in_window = 0usize;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            nan_in_window += 1;
        } else {
            sum += v;
        }
    }
    if nan_in_window == 0 {
        result[period - 1] = sum / period as f64;
    }

    for i in period..n {
        let leaving = values[i - period];
        let entering = values[i];
        if leaving.is_nan() {
            nan_in_window -= 1;
        } else {
            sum -= leaving;
        }
        if entering.is_nan() {
            nan_in_window += 1;
        } else {
            sum += entering;
        }

        if nan_in_window == 0 {
            // Re-sum when the window just became clean to shed drift.
            if leaving.is_nan() {
                sum = values[(i + 1 - period)..=i].iter().sum();
            }
            result[i] = sum / period as f64;
        }
    }

    result
}
