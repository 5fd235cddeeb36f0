//! Symbol-keyed price table

use super::price::PriceSeries;

/// Insertion-ordered map of symbol to its price series.
///
/// Only non-empty series are accepted and each symbol can be inserted once.
/// Iteration order is insertion order, which the chart uses for marker and
/// colour assignment.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    series: Vec<PriceSeries>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a series under its symbol
    pub fn insert(&mut self, series: PriceSeries) -> Result<(), String> {
        if series.is_empty() {
            return Err(format!("Refusing to insert empty series for {}", series.symbol));
        }
        if self.contains(&series.symbol) {
            return Err(format!("Series for {} already present", series.symbol));
        }
        self.series.push(series);
        Ok(())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.iter().any(|s| s.symbol == symbol)
    }

    #[cfg(test)]
    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.iter().find(|s| s.symbol == symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.symbol.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.iter()
    }
}
