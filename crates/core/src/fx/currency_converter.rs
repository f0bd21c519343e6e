use crate::fx::fx_errors::FxError;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};

/// Point-in-time currency conversion over a graph of pair rates.
///
/// Each inserted rate also registers its inverse, so a table holding
/// BTC/USD and EUR/USD can convert BTC to EUR through USD.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    /// Graph adjacency list: Currency -> Set of connected currencies.
    adj: HashMap<String, HashSet<String>>,

    /// Key: (From_Currency, To_Currency)
    rates: HashMap<(String, String), Decimal>,
}

impl RateTable {
    /// Adds or replaces a rate. Zero rates are stored one-way only.
    pub fn insert(&mut self, from: &str, to: &str, rate: Decimal) {
        if from == to {
            return;
        }

        self.rates.insert((from.to_string(), to.to_string()), rate);
        self.adj
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());

        if !rate.is_zero() {
            self.rates
                .insert((to.to_string(), from.to_string()), Decimal::ONE / rate);
            self.adj
                .entry(to.to_string())
                .or_default()
                .insert(from.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Units of `to` per unit of `from`, following the shortest path (BFS).
    pub fn rate(&self, from: &str, to: &str) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(direct) = self.rates.get(&(from.to_string(), to.to_string())) {
            return Ok(*direct);
        }

        // BFS State: (Current Currency, Accumulated Rate)
        let mut queue: VecDeque<(String, Decimal)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        queue.push_back((from.to_string(), Decimal::ONE));
        visited.insert(from.to_string());

        while let Some((current, accumulated)) = queue.pop_front() {
            if current == to {
                return Ok(accumulated);
            }

            if let Some(neighbors) = self.adj.get(&current) {
                for neighbor in neighbors {
                    if visited.contains(neighbor) {
                        continue;
                    }
                    if let Some(rate) = self.rates.get(&(current.clone(), neighbor.clone())) {
                        visited.insert(neighbor.clone());
                        queue.push_back((neighbor.clone(), accumulated * *rate));
                    }
                }
            }
        }

        Err(FxError::RateNotFound(format!(
            "No conversion path found for {} -> {}",
            from, to
        )))
    }

    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, FxError> {
        Ok(amount * self.rate(from, to)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direct_and_inverse() {
        let mut table = RateTable::default();
        table.insert("USD", "EUR", dec!(0.8));

        assert_eq!(table.rate("USD", "EUR").unwrap(), dec!(0.8));
        assert_eq!(table.rate("EUR", "USD").unwrap(), dec!(1.25));
        assert_eq!(table.rate("EUR", "EUR").unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_multi_hop_through_common_currency() {
        let mut table = RateTable::default();
        table.insert("BTC", "USD", dec!(50000));
        table.insert("EUR", "USD", dec!(1.25));

        // BTC -> USD -> EUR
        assert_eq!(table.convert(dec!(0.5), "BTC", "EUR").unwrap(), dec!(20000));
    }

    #[test]
    fn test_no_path_is_an_error() {
        let mut table = RateTable::default();
        table.insert("USD", "EUR", dec!(0.9));
        assert!(matches!(
            table.rate("USD", "JPY"),
            Err(FxError::RateNotFound(_))
        ));
    }

    #[test]
    fn test_reinsert_replaces_rate() {
        let mut table = RateTable::default();
        table.insert("GBP", "USD", dec!(1.2));
        table.insert("GBP", "USD", dec!(1.3));
        assert_eq!(table.rate("GBP", "USD").unwrap(), dec!(1.3));
    }
}
