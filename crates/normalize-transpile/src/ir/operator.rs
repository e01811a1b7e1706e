//! Operator-overload kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The operator a function overloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Negate,
    UnaryPlus,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Spaceship,
    Index,
    Call,
    BoolConversion,
    Conversion,
    Assign,
    CompoundAssign,
    Increment,
    Decrement,
    Not,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    ShiftLeft,
    ShiftRight,
    LogicalAnd,
    LogicalOr,
    Arrow,
    Deref,
    AddressOf,
    Comma,
    New,
    Delete,
}

impl OperatorKind {
    /// Classify a function name such as `operator+` or `operator bool`.
    ///
    /// `arity` is the number of operands besides the receiver; it separates
    /// unary from binary forms of `-`, `+`, `*` and `&`.
    pub fn from_name(name: &str, arity: usize) -> Option<OperatorKind> {
        let rest = name.strip_prefix("operator")?;
        let word_follows = rest.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_');
        if word_follows {
            // `operatorFoo` is an ordinary identifier
            return None;
        }
        let symbol = rest.trim();
        let unary = arity == 0;
        let kind = match symbol {
            "+" if unary => OperatorKind::UnaryPlus,
            "+" => OperatorKind::Add,
            "-" if unary => OperatorKind::Negate,
            "-" => OperatorKind::Sub,
            "*" if unary => OperatorKind::Deref,
            "*" => OperatorKind::Mul,
            "&" if unary => OperatorKind::AddressOf,
            "&" => OperatorKind::BitAnd,
            "/" => OperatorKind::Div,
            "%" => OperatorKind::Mod,
            "==" => OperatorKind::Equal,
            "!=" => OperatorKind::NotEqual,
            "<" => OperatorKind::Less,
            ">" => OperatorKind::Greater,
            "<=" => OperatorKind::LessEqual,
            ">=" => OperatorKind::GreaterEqual,
            "<=>" => OperatorKind::Spaceship,
            "[]" => OperatorKind::Index,
            "()" => OperatorKind::Call,
            "=" => OperatorKind::Assign,
            "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => {
                OperatorKind::CompoundAssign
            }
            "++" => OperatorKind::Increment,
            "--" => OperatorKind::Decrement,
            "!" => OperatorKind::Not,
            "|" => OperatorKind::BitOr,
            "^" => OperatorKind::BitXor,
            "~" => OperatorKind::BitNot,
            "<<" => OperatorKind::ShiftLeft,
            ">>" => OperatorKind::ShiftRight,
            "&&" => OperatorKind::LogicalAnd,
            "||" => OperatorKind::LogicalOr,
            "->" | "->*" => OperatorKind::Arrow,
            "," => OperatorKind::Comma,
            "new" | "new[]" | "new []" => OperatorKind::New,
            "delete" | "delete[]" | "delete []" => OperatorKind::Delete,
            "bool" => OperatorKind::BoolConversion,
            "" => return None,
            other if other.starts_with(|c: char| c.is_alphabetic() || c == '_' || c == ':') => {
                OperatorKind::Conversion
            }
            _ => return None,
        };
        Some(kind)
    }

    /// Source spelling, for messages.
    pub fn spelling(&self) -> &'static str {
        match self {
            OperatorKind::Add | OperatorKind::UnaryPlus => "operator+",
            OperatorKind::Sub | OperatorKind::Negate => "operator-",
            OperatorKind::Mul | OperatorKind::Deref => "operator*",
            OperatorKind::Div => "operator/",
            OperatorKind::Mod => "operator%",
            OperatorKind::Equal => "operator==",
            OperatorKind::NotEqual => "operator!=",
            OperatorKind::Less => "operator<",
            OperatorKind::Greater => "operator>",
            OperatorKind::LessEqual => "operator<=",
            OperatorKind::GreaterEqual => "operator>=",
            OperatorKind::Spaceship => "operator<=>",
            OperatorKind::Index => "operator[]",
            OperatorKind::Call => "operator()",
            OperatorKind::BoolConversion => "operator bool",
            OperatorKind::Conversion => "conversion operator",
            OperatorKind::Assign => "operator=",
            OperatorKind::CompoundAssign => "compound assignment operator",
            OperatorKind::Increment => "operator++",
            OperatorKind::Decrement => "operator--",
            OperatorKind::Not => "operator!",
            OperatorKind::BitAnd | OperatorKind::AddressOf => "operator&",
            OperatorKind::BitOr => "operator|",
            OperatorKind::BitXor => "operator^",
            OperatorKind::BitNot => "operator~",
            OperatorKind::ShiftLeft => "operator<<",
            OperatorKind::ShiftRight => "operator>>",
            OperatorKind::LogicalAnd => "operator&&",
            OperatorKind::LogicalOr => "operator||",
            OperatorKind::Arrow => "operator->",
            OperatorKind::Comma => "operator,",
            OperatorKind::New => "operator new",
            OperatorKind::Delete => "operator delete",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_disambiguates_unary_forms() {
        assert_eq!(OperatorKind::from_name("operator-", 0), Some(OperatorKind::Negate));
        assert_eq!(OperatorKind::from_name("operator-", 1), Some(OperatorKind::Sub));
        assert_eq!(OperatorKind::from_name("operator*", 0), Some(OperatorKind::Deref));
        assert_eq!(OperatorKind::from_name("operator*", 1), Some(OperatorKind::Mul));
    }

    #[test]
    fn conversions() {
        assert_eq!(
            OperatorKind::from_name("operator bool", 0),
            Some(OperatorKind::BoolConversion)
        );
        assert_eq!(
            OperatorKind::from_name("operator std::string", 0),
            Some(OperatorKind::Conversion)
        );
    }

    #[test]
    fn ordinary_names_are_not_operators() {
        assert_eq!(OperatorKind::from_name("operatorCount", 0), None);
        assert_eq!(OperatorKind::from_name("area", 0), None);
        assert_eq!(OperatorKind::from_name("operator", 0), None);
    }

    #[test]
    fn index_and_compound() {
        assert_eq!(OperatorKind::from_name("operator[]", 1), Some(OperatorKind::Index));
        assert_eq!(
            OperatorKind::from_name("operator+=", 1),
            Some(OperatorKind::CompoundAssign)
        );
        assert_eq!(OperatorKind::from_name("operator <<", 1), Some(OperatorKind::ShiftLeft));
    }
}
