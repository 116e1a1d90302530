//! Number rendering for table cells

use serde::{Deserialize, Serialize};

use crate::table::Value;

const INTEGER_TOLERANCE: f64 = 1e-9;

/// How numbers are written into cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
}

fn default_decimal_separator() -> char {
    ','
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_separator: default_decimal_separator(),
        }
    }
}

impl NumberFormat {
    pub fn with_separator(decimal_separator: char) -> Self {
        Self { decimal_separator }
    }

    /// Whole numbers without decimals, everything else with two
    ///
    /// ```
    /// use matchdoc::reconcile::NumberFormat;
    ///
    /// let fmt = NumberFormat::default();
    /// assert_eq!(fmt.format_number(3.0), "3");
    /// assert_eq!(fmt.format_number(0.47), "0,47");
    /// ```
    pub fn format_number(&self, value: f64) -> String {
        if !value.is_finite() {
            return String::new();
        }
        let rounded = value.round();
        if (value - rounded).abs() < INTEGER_TOLERANCE {
            // Avoid "-0"
            return format!("{}", rounded as i64);
        }
        let fixed = format!("{:.2}", value);
        if self.decimal_separator == '.' {
            fixed
        } else {
            fixed.replace('.', &self.decimal_separator.to_string())
        }
    }

    /// Render a cell value; text passes through and nulls are blank
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Number(n) => self.format_number(*n),
            Value::Text(s) => s.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_drop_decimals() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format_number(4.0), "4");
        assert_eq!(fmt.format_number(4.0000000001), "4");
        assert_eq!(fmt.format_number(-0.0), "0");
        assert_eq!(fmt.format_number(-2.0), "-2");
    }

    #[test]
    fn test_fractions_use_separator() {
        assert_eq!(NumberFormat::default().format_number(6.75), "6,75");
        assert_eq!(NumberFormat::with_separator('.').format_number(6.75), "6.75");
        assert_eq!(NumberFormat::default().format_number(0.333), "0,33");
    }

    #[test]
    fn test_format_value() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format_value(&Value::Null), "");
        assert_eq!(fmt.format_value(&Value::text("Alpha")), "Alpha");
        assert_eq!(fmt.format_value(&Value::Number(1.5)), "1,50");
        assert_eq!(fmt.format_number(f64::NAN), "");
    }
}
