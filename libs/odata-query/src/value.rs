//! Literal values and their `OData` text form.
//!
//! Every comparison value passes through [`Literal`] so rendering is a single
//! exhaustive match instead of a runtime type switch. Callers rarely build a
//! `Literal` by hand: anything implementing [`IntoLiteral`] can be passed
//! straight to the filter builder.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// A typed literal as it appears on the right-hand side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Rendered single-quoted. Embedded `'` characters are emitted as-is,
    /// so a value containing a quote yields an invalid protocol literal;
    /// double the quote before passing such values in.
    Text(String),
    /// Integers and arbitrary precision decimals, rendered as plain digits.
    Number(BigDecimal),
    /// Binary floating point, rendered in shortest round-trip form.
    Float(f64),
    /// Rendered as the bare word `true` or `false`.
    Bool(bool),
    /// Rendered as UTC ISO-8601 with millisecond precision, e.g.
    /// `2018-01-31T21:00:00.000Z`.
    DateTime(DateTime<Utc>),
    /// Anything else; rendered through its string form, single-quoted.
    Other(String),
}

impl Literal {
    /// Short name of the literal kind, as logged per comparison.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Text(_) => "text",
            Literal::Number(_) | Literal::Float(_) => "number",
            Literal::Bool(_) => "bool",
            Literal::DateTime(_) => "datetime",
            Literal::Other(_) => "other",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(s) | Literal::Other(s) => write!(f, "'{s}'"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::Bool(true) => f.write_str("true"),
            Literal::Bool(false) => f.write_str("false"),
            Literal::DateTime(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

/// Trait for types that can be used as comparison values.
pub trait IntoLiteral {
    /// Convert this value into a [`Literal`].
    fn into_literal(self) -> Literal;
}

impl IntoLiteral for Literal {
    fn into_literal(self) -> Literal {
        self
    }
}

impl IntoLiteral for bool {
    fn into_literal(self) -> Literal {
        Literal::Bool(self)
    }
}

impl IntoLiteral for String {
    fn into_literal(self) -> Literal {
        Literal::Text(self)
    }
}

impl IntoLiteral for &str {
    fn into_literal(self) -> Literal {
        Literal::Text(self.to_owned())
    }
}

impl IntoLiteral for &String {
    fn into_literal(self) -> Literal {
        Literal::Text(self.clone())
    }
}

macro_rules! impl_integer_literal {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoLiteral for $t {
                fn into_literal(self) -> Literal {
                    Literal::Number(BigDecimal::from(self))
                }
            }
        )*
    };
}

impl_integer_literal!(i8, i16, i32, i64, u8, u16, u32, u64);

impl IntoLiteral for f64 {
    fn into_literal(self) -> Literal {
        Literal::Float(self)
    }
}

impl IntoLiteral for BigDecimal {
    fn into_literal(self) -> Literal {
        Literal::Number(self)
    }
}

impl IntoLiteral for uuid::Uuid {
    fn into_literal(self) -> Literal {
        Literal::Other(self.to_string())
    }
}

impl<Tz: TimeZone> IntoLiteral for DateTime<Tz> {
    fn into_literal(self) -> Literal {
        Literal::DateTime(self.with_timezone(&Utc))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use std::str::FromStr;

    fn render<V: IntoLiteral>(v: V) -> String {
        v.into_literal().to_string()
    }

    #[test]
    fn test_text_is_single_quoted() {
        assert_eq!(render("test"), "'test'");
        assert_eq!(render(String::from("a b")), "'a b'");
    }

    #[test]
    fn test_text_quotes_are_not_escaped() {
        assert_eq!(render("O'Brien"), "'O'Brien'");
    }

    #[test]
    fn test_integers_render_bare() {
        assert_eq!(render(1), "1");
        assert_eq!(render(-42i64), "-42");
        assert_eq!(render(7u8), "7");
        assert_eq!(render(u64::MAX), "18446744073709551615");
    }

    #[test]
    fn test_floats_render_shortest_form() {
        assert_eq!(render(1.5), "1.5");
        assert_eq!(render(2.0), "2");
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let d = BigDecimal::from_str("19.90").unwrap();
        assert_eq!(render(d), "19.90");
    }

    #[test]
    fn test_bool_renders_lowercase_word() {
        assert_eq!(render(true), "true");
        assert_eq!(render(false), "false");
    }

    #[test]
    fn test_datetime_normalized_to_utc_millis() {
        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        let local = plus3.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(render(local), "2018-01-31T21:00:00.000Z");
    }

    #[test]
    fn test_datetime_keeps_milliseconds() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(render(dt), "2024-05-06T07:08:09.123Z");
    }

    #[test]
    fn test_uuid_falls_back_to_quoted_string() {
        let id = uuid::Uuid::nil();
        assert_eq!(render(id), "'00000000-0000-0000-0000-000000000000'");
        assert_eq!(id.into_literal().kind(), "other");
    }
}
