//! Display formatting hook for node values
//!
//! Locale and currency rules belong to the embedding application; the
//! engine only calls the formatter it was given.

use rust_decimal::{Decimal, RoundingStrategy};

/// Turns a node value into display text
pub trait ValueFormatter: Send + Sync {
    fn format_value(&self, value: Decimal) -> String;

    fn format_count(&self, count: u64) -> String {
        count.to_string()
    }
}

/// Fixed decimals, comma-grouped thousands, optional prefix (e.g. "₹ ")
#[derive(Debug, Clone)]
pub struct PlainFormatter {
    pub decimals: u32,
    pub prefix: String,
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self {
            decimals: 2,
            prefix: String::new(),
        }
    }
}

impl PlainFormatter {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }
}

impl ValueFormatter for PlainFormatter {
    fn format_value(&self, value: Decimal) -> String {
        let rounded =
            value.round_dp_with_strategy(self.decimals, RoundingStrategy::MidpointAwayFromZero);
        let text = format!("{:.*}", self.decimals as usize, rounded.abs());
        let (int_part, frac_part) = match text.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (text.as_str(), None),
        };

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        match frac_part {
            Some(frac) => format!("{}{}{}.{}", sign, self.prefix, grouped, frac),
            None => format!("{}{}{}", sign, self.prefix, grouped),
        }
    }
}
