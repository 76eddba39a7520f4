//! Placeholder type hints and the regex fragments they expand to.

/// Shape of the text a placeholder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderType {
    /// Any non-empty text, matched lazily.
    Any,
    /// Unsigned decimal integer.
    Unsigned,
    /// Optionally signed decimal integer.
    Signed,
    /// Decimal or scientific float, plus `nan`/`inf`.
    Float,
    /// A run of non-whitespace characters.
    Word,
    /// Double- or single-quoted text; the quotes are not part of the capture.
    QuotedString,
}

impl PlaceholderType {
    /// Map a hint such as `u32`, `int` or `string` to its type.
    ///
    /// Unknown hints accept any text, so `{name:Email}` still compiles.
    ///
    /// # Examples
    /// ```
    /// use weft_patterns::PlaceholderType;
    /// assert_eq!(PlaceholderType::from_hint(Some("i64")), PlaceholderType::Signed);
    /// assert_eq!(PlaceholderType::from_hint(Some("Email")), PlaceholderType::Any);
    /// assert_eq!(PlaceholderType::from_hint(None), PlaceholderType::Any);
    /// ```
    #[must_use]
    pub fn from_hint(hint: Option<&str>) -> Self {
        hint.and_then(Self::known).unwrap_or(Self::Any)
    }

    /// Return the type for a recognised hint, or `None`.
    ///
    /// Bare placeholders such as `{int}` use this to decide whether their
    /// name doubles as a hint.
    #[must_use]
    pub fn known(hint: &str) -> Option<Self> {
        match hint {
            "u8" | "u16" | "u32" | "u64" | "u128" | "usize" => Some(Self::Unsigned),
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "int" => Some(Self::Signed),
            "f32" | "f64" | "float" => Some(Self::Float),
            "word" => Some(Self::Word),
            "string" => Some(Self::QuotedString),
            _ => None,
        }
    }

    /// Regex fragment, including exactly one capture group, for this type.
    #[must_use]
    pub fn capture_fragment(self) -> &'static str {
        match self {
            Self::Any => r"(.+?)",
            Self::Unsigned => r"(\d+)",
            Self::Signed => r"([+-]?\d+)",
            Self::Float => {
                r"((?i:[+-]?(?:\d+\.\d*|\.\d+|\d+)(?:e[+-]?\d+)?|nan|inf|infinity))"
            }
            Self::Word => r"(\S+)",
            Self::QuotedString => r#"("[^"]*"|'[^']*')"#,
        }
    }
}
