//! Tagged value model for Tinct
//!
//! A [`Value`] is one of seven dynamically-typed variants. Numeric variants
//! form a widening lattice (BYTE < NUMBER < BIGNUM < DECIMAL) used by the
//! operation kernel when the two sides of a binary operator carry different
//! tags.
//!
//! Values arriving as source text (literals pushed by the code generator,
//! lines typed into the REPL) are classified by [`Value::from_text`].

use std::fmt;

/// A dynamically-typed Tinct value.
///
/// `Clone` is a deep copy: the STRING payload owns its bytes, so cloning a
/// string value duplicates them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null singleton
    Nil,
    /// true / false
    Bool(bool),
    /// Unsigned 8-bit integer
    Byte(u8),
    /// Signed 32-bit integer
    Number(i32),
    /// Signed 64-bit integer
    BigNum(i64),
    /// IEEE-754 binary64
    Decimal(f64),
    /// Owned byte string (length excludes any terminator)
    String(String),
}

/// Discriminant-only view of a [`Value`], used for promotion and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Nil,
    Bool,
    Byte,
    Number,
    BigNum,
    Decimal,
    String,
}

impl Tag {
    /// Human-readable type name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Nil => "null",
            Tag::Bool => "boolean",
            Tag::Byte => "byte",
            Tag::Number => "number",
            Tag::BigNum => "big number",
            Tag::Decimal => "decimal",
            Tag::String => "string",
        }
    }
}

impl Value {
    /// Classify source text into a value.
    ///
    /// `null`, `true` and `false` match case-insensitively. An integer
    /// literal that fits a signed 32-bit becomes NUMBER; a wider one becomes
    /// BIGNUM; a float-parseable token becomes DECIMAL; anything else is a
    /// STRING.
    pub fn from_text(text: &str) -> Value {
        if text.eq_ignore_ascii_case("null") {
            return Value::Nil;
        }
        if text.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Ok(num) = text.parse::<i32>() {
            return Value::Number(num);
        }
        if let Ok(big) = text.parse::<i64>() {
            return Value::BigNum(big);
        }
        if let Ok(dec) = text.parse::<f64>() {
            return Value::Decimal(dec);
        }
        Value::String(text.to_string())
    }

    pub fn tag(&self) -> Tag {
        match self {
            Value::Nil => Tag::Nil,
            Value::Bool(_) => Tag::Bool,
            Value::Byte(_) => Tag::Byte,
            Value::Number(_) => Tag::Number,
            Value::BigNum(_) => Tag::BigNum,
            Value::Decimal(_) => Tag::Decimal,
            Value::String(_) => Tag::String,
        }
    }

    /// Human-readable type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.tag().name()
    }

    /// True for BYTE, NUMBER, BIGNUM and DECIMAL.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Number(_) | Value::BigNum(_) | Value::Decimal(_)
        )
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Canonical base-10 rendering.
    ///
    /// NIL prints `null`, BOOL prints `true`/`false`, BYTE is unsigned,
    /// NUMBER and BIGNUM are signed, DECIMAL uses six fractional digits
    /// (`%f` semantics), STRING returns a copy of its bytes.
    pub fn stringify(&self) -> String {
        match self {
            Value::Nil => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Byte(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::BigNum(n) => n.to_string(),
            Value::Decimal(d) => format!("{d:.6}"),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_null_and_booleans_case_insensitively() {
        assert_eq!(Value::from_text("null"), Value::Nil);
        assert_eq!(Value::from_text("NULL"), Value::Nil);
        assert_eq!(Value::from_text("true"), Value::Bool(true));
        assert_eq!(Value::from_text("False"), Value::Bool(false));
    }

    #[test]
    fn coerces_integers_by_width() {
        assert_eq!(Value::from_text("42"), Value::Number(42));
        assert_eq!(Value::from_text("-7"), Value::Number(-7));
        assert_eq!(Value::from_text("2147483647"), Value::Number(i32::MAX));
        assert_eq!(Value::from_text("2147483648"), Value::BigNum(2_147_483_648));
        assert_eq!(
            Value::from_text("-9223372036854775808"),
            Value::BigNum(i64::MIN)
        );
    }

    #[test]
    fn coerces_floats_and_falls_back_to_string() {
        assert_eq!(Value::from_text("3.14"), Value::Decimal(3.14));
        assert_eq!(Value::from_text("1e3"), Value::Decimal(1000.0));
        assert_eq!(
            Value::from_text("greetings"),
            Value::String("greetings".to_string())
        );
        assert_eq!(Value::from_text(""), Value::String(String::new()));
    }

    #[test]
    fn stringify_round_trips_scalars() {
        for text in ["null", "true", "false", "42", "9223372036854775807"] {
            let value = Value::from_text(text);
            assert_eq!(Value::from_text(&value.stringify()), value);
        }
    }

    #[test]
    fn stringify_uses_six_fractional_digits() {
        assert_eq!(Value::Decimal(5.0).stringify(), "5.000000");
        assert_eq!(Value::Decimal(-0.25).stringify(), "-0.250000");
    }

    #[test]
    fn clone_deep_copies_string_payloads() {
        let original = Value::String("payload".to_string());
        let copy = original.clone();
        assert_eq!(original, copy);
        if let (Value::String(a), Value::String(b)) = (&original, &copy) {
            assert_ne!(a.as_ptr(), b.as_ptr());
        }
    }

    #[test]
    fn type_names_match_diagnostic_vocabulary() {
        assert_eq!(Value::Nil.type_name(), "null");
        assert_eq!(Value::Byte(0).type_name(), "byte");
        assert_eq!(Value::BigNum(0).type_name(), "big number");
        assert_eq!(Value::String(String::new()).type_name(), "string");
    }
}
