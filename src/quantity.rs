//! Resource quantities with exact ordering.
//!
//! Kubernetes quantities mix decimal (`m`, `k`, `G`), binary (`Ki`, `Gi`) and
//! exponent (`1e3`) notations. Comparing them through floats loses precision
//! for large binary values, so every quantity is reduced to an exact
//! `coefficient * 10^exponent` before ordering.

use std::cmp::Ordering;
use std::fmt;

use crate::parsing::parse_quantity;

/// Exact signed decimal `coefficient * 10^exponent`, normalized so that the
/// coefficient carries no trailing zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    negative: bool,
    coefficient: u128,
    exponent: i32,
}

impl Decimal {
    pub fn new(negative: bool, mut coefficient: u128, mut exponent: i32) -> Self {
        if coefficient == 0 {
            return Self { negative: false, coefficient: 0, exponent: 0 };
        }
        while coefficient % 10 == 0 {
            coefficient /= 10;
            exponent = exponent.saturating_add(1);
        }
        Self { negative, coefficient, exponent }
    }

    fn signum(&self) -> i8 {
        match (self.coefficient, self.negative) {
            (0, _) => 0,
            (_, true) => -1,
            (_, false) => 1,
        }
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        let order_of = |d: &Decimal| i64::from(digits(d.coefficient)) + i64::from(d.exponent);
        match order_of(self).cmp(&order_of(other)) {
            Ordering::Equal => {}
            ord => return ord,
        }
        // Same order of magnitude: the exponent gap is bounded by the digit count.
        if self.exponent >= other.exponent {
            let gap = (self.exponent - other.exponent) as u32;
            match 10u128.checked_pow(gap).and_then(|p| self.coefficient.checked_mul(p)) {
                Some(scaled) => scaled.cmp(&other.coefficient),
                None => Ordering::Greater,
            }
        } else {
            other.cmp_magnitude(self).reverse()
        }
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.signum().cmp(&other.signum()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.signum() {
            0 => Ordering::Equal,
            1 => self.cmp_magnitude(other),
            _ => self.cmp_magnitude(other).reverse(),
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn digits(n: u128) -> u32 {
    n.checked_ilog10().map_or(1, |d| d + 1)
}

/// A declared resource amount. Renders as written in the manifest.
#[derive(Debug, Clone)]
pub struct Quantity {
    raw: String,
    value: Option<Decimal>,
}

impl Quantity {
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let value = parse_quantity(&raw);
        Self { raw, value }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for Quantity {
    // Unparsable quantities fall back to text ordering so comparison stays total.
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => a.cmp(b),
            _ => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Quantity {}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
