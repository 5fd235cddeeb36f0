//! Daily close price models

use chrono::{Duration, NaiveDate};

/// Length of the trailing window ending at the run date
pub const TRAILING_WINDOW_DAYS: i64 = 365;

/// A single daily close
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Inclusive calendar date range, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Create a window, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("Invalid date window: {} is after {}", start, end));
        }
        Ok(Self { start, end })
    }

    /// The 365-day window ending at `end`
    pub fn trailing_year(end: NaiveDate) -> Result<Self, String> {
        let start = end
            .checked_sub_signed(Duration::days(TRAILING_WINDOW_DAYS))
            .ok_or_else(|| format!("No trailing year before {}", end))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Closing prices for one symbol, ascending by date
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from provider output in any order.
    ///
    /// Points are sorted ascending and everything outside `window` is dropped.
    pub fn from_history(symbol: &str, mut history: Vec<PricePoint>, window: &DateWindow) -> Self {
        history.retain(|p| window.contains(p.date));
        history.sort_by_key(|p| p.date);

        Self {
            symbol: symbol.to_string(),
            points: history,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Most recent point, if any
    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}
