//! C and C++ keywords recognized by the tokenizer.

use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};

/// Keywords whose spelling is fixed by the language.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and
/// `Into<&'static str>` implementations; the string form is the lowercase
/// variant name unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Alignof,
    Auto,
    Bool,
    Break,
    Case,
    Catch,
    Char,
    Class,
    Const,
    Constexpr,
    Continue,
    Default,
    Delete,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    False,
    Float,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Namespace,
    New,
    Operator,
    Private,
    Protected,
    Public,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Template,
    This,
    #[strum(serialize = "thread_local")]
    ThreadLocal,
    Throw,
    True,
    Try,
    Typedef,
    Typename,
    Union,
    Unsigned,
    Using,
    Virtual,
    Void,
    Volatile,
    #[strum(serialize = "wchar_t")]
    WcharT,
    While,
}

impl Keyword {
    /// Recognizes a spelling as a keyword.
    #[must_use]
    pub fn recognize(s: &str) -> Option<Self> {
        Self::from_str(s).ok()
    }

    /// True for keywords that can start or extend a builtin type
    /// (`unsigned long long`, `const char`, ...).
    #[must_use]
    pub fn is_type_specifier(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Char
                | Self::Short
                | Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::Void
                | Self::Signed
                | Self::Unsigned
                | Self::WcharT
        )
    }

    /// True for storage and qualifier keywords that may precede a declarator.
    #[must_use]
    pub fn is_decl_qualifier(self) -> bool {
        matches!(
            self,
            Self::Const
                | Self::Volatile
                | Self::Static
                | Self::Extern
                | Self::ThreadLocal
                | Self::Constexpr
                | Self::Inline
                | Self::Auto
        )
    }

    /// True for keywords that open a control-flow construct with a
    /// parenthesized head (`if (...)`, `while (...)`, ...).
    #[must_use]
    pub fn is_control_with_condition(self) -> bool {
        matches!(self, Self::If | Self::While | Self::For | Self::Switch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognize_spellings() {
        assert_eq!(Keyword::recognize("if"), Some(Keyword::If));
        assert_eq!(Keyword::recognize("thread_local"), Some(Keyword::ThreadLocal));
        assert_eq!(Keyword::recognize("wchar_t"), Some(Keyword::WcharT));
        assert_eq!(Keyword::recognize("identifier"), None);
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Keyword::ThreadLocal.to_string(), "thread_local");
        assert_eq!(Keyword::Unsigned.to_string(), "unsigned");
    }
}
