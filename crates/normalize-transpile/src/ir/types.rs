//! Resolved source-language types.
//!
//! The front end hands types over as spellings (`const std::vector<int>&`);
//! [`TypeRef`] parses them into a structure the type mapper can walk.
//! Serialization goes through the spelling, so JSON stays readable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A resolved source-language type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Void,
    /// Builtin arithmetic type, canonical spelling (`int`, `unsigned long`, `long long`)
    Primitive(String),
    /// Class, enum, alias or template parameter, by qualified name
    Named { name: String, args: Vec<TypeRef> },
    Pointer(Box<TypeRef>),
    Reference(Box<TypeRef>),
    Const(Box<TypeRef>),
    Array(Box<TypeRef>, Option<u64>),
}

/// Error parsing a type spelling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse type '{spelling}': {reason}")]
pub struct TypeParseError {
    pub spelling: String,
    pub reason: String,
}

const PRIMITIVE_WORDS: &[&str] = &[
    "unsigned", "signed", "short", "long", "int", "char", "bool", "float", "double", "void",
    "wchar_t", "char16_t", "char32_t",
];

const QUALIFIERS: &[&str] = &["const", "volatile", "struct", "class", "typename", "enum"];

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        TypeRef::Primitive(name.into())
    }

    /// Strip `const` and reference layers: the type a value actually has.
    pub fn value_type(&self) -> &TypeRef {
        match self {
            TypeRef::Const(inner) | TypeRef::Reference(inner) => inner.value_type(),
            other => other,
        }
    }

    /// Qualified name and arguments, if the value type is a named type.
    pub fn as_named(&self) -> Option<(&str, &[TypeRef])> {
        match self.value_type() {
            TypeRef::Named { name, args } => Some((name.as_str(), args.as_slice())),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.value_type(), TypeRef::Pointer(_))
    }

    pub fn is_reference(&self) -> bool {
        match self {
            TypeRef::Reference(_) => true,
            TypeRef::Const(inner) => inner.is_reference(),
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.value_type(), TypeRef::Void)
    }

    /// True if `name` appears anywhere in this type, including template arguments.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            TypeRef::Void | TypeRef::Primitive(_) => false,
            TypeRef::Named { name: n, args } => n == name || args.iter().any(|a| a.mentions(name)),
            TypeRef::Pointer(inner)
            | TypeRef::Reference(inner)
            | TypeRef::Const(inner)
            | TypeRef::Array(inner, _) => inner.mentions(name),
        }
    }

    /// True if a pointer to (or array of) `name` appears in this type.
    pub fn points_to(&self, name: &str) -> bool {
        match self {
            TypeRef::Pointer(inner) | TypeRef::Array(inner, _) => {
                inner.value_type().as_named().is_some_and(|(n, _)| n == name) || inner.points_to(name)
            }
            TypeRef::Reference(inner) | TypeRef::Const(inner) => inner.points_to(name),
            TypeRef::Named { args, .. } => args.iter().any(|a| a.points_to(name)),
            TypeRef::Void | TypeRef::Primitive(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(name) => f.write_str(name),
            TypeRef::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Pointer(inner) => write!(f, "{}*", inner),
            TypeRef::Reference(inner) => write!(f, "{}&", inner),
            TypeRef::Const(inner) => write!(f, "const {}", inner),
            TypeRef::Array(inner, Some(len)) => write!(f, "{}[{}]", inner, len),
            TypeRef::Array(inner, None) => write!(f, "{}[]", inner),
        }
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for TypeRef {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s);
        let mut parser = Parser {
            spelling: s,
            tokens,
            pos: 0,
        };
        let ty = parser.parse_type()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("trailing tokens"));
        }
        Ok(ty)
    }
}

fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphanumeric() || c == '_' || c == ':' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == ':' {
                    word.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(word);
        } else if c == '&' {
            chars.next();
            if chars.peek() == Some(&'&') {
                chars.next();
            }
            tokens.push("&".to_string());
        } else {
            tokens.push(c.to_string());
            chars.next();
        }
    }
    tokens
}

struct Parser<'a> {
    spelling: &'a str,
    tokens: Vec<String>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<String> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn error(&self, reason: &str) -> TypeParseError {
        TypeParseError {
            spelling: self.spelling.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeParseError> {
        let mut is_const = false;
        while let Some(tok) = self.peek() {
            if QUALIFIERS.contains(&tok) {
                is_const |= tok == "const";
                self.pos += 1;
            } else {
                break;
            }
        }

        let mut ty = self.parse_base()?;

        // East const: `int const`
        while self.peek() == Some("const") || self.peek() == Some("volatile") {
            is_const |= self.bump().as_deref() == Some("const");
        }
        if is_const {
            ty = TypeRef::Const(Box::new(ty));
        }

        loop {
            match self.peek() {
                Some("*") => {
                    self.pos += 1;
                    ty = TypeRef::Pointer(Box::new(ty));
                    // `T* const` only constrains the pointer variable
                    while self.peek() == Some("const") || self.peek() == Some("volatile") {
                        self.pos += 1;
                    }
                }
                Some("&") => {
                    self.pos += 1;
                    ty = TypeRef::Reference(Box::new(ty));
                }
                Some("[") => {
                    self.pos += 1;
                    let len = match self.peek() {
                        Some("]") => None,
                        Some(n) => Some(n.parse::<u64>().map_err(|_| self.error("bad array length"))?),
                        None => return Err(self.error("unterminated array")),
                    };
                    if len.is_some() {
                        self.pos += 1;
                    }
                    if self.bump().as_deref() != Some("]") {
                        return Err(self.error("expected ']'"));
                    }
                    ty = TypeRef::Array(Box::new(ty), len);
                }
                _ => break,
            }
        }
        Ok(ty)
    }

    fn parse_base(&mut self) -> Result<TypeRef, TypeParseError> {
        let Some(first) = self.peek() else {
            return Err(self.error("empty type"));
        };

        if PRIMITIVE_WORDS.contains(&first) {
            let mut words = Vec::new();
            while let Some(tok) = self.peek() {
                if PRIMITIVE_WORDS.contains(&tok) {
                    words.push(tok.to_string());
                    self.pos += 1;
                } else {
                    break;
                }
            }
            return Ok(canonical_primitive(&words));
        }

        let name = self.bump().unwrap_or_default();
        if !name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':') {
            return Err(self.error("expected a type name"));
        }
        let name = name.trim_start_matches("::").to_string();

        let mut args = Vec::new();
        if self.peek() == Some("<") {
            self.pos += 1;
            if self.peek() != Some(">") {
                loop {
                    args.push(self.parse_template_arg()?);
                    match self.bump().as_deref() {
                        Some(",") => continue,
                        Some(">") => break,
                        _ => return Err(self.error("expected ',' or '>'")),
                    }
                }
            } else {
                self.pos += 1;
            }
        }
        Ok(TypeRef::Named { name, args })
    }

    /// Template arguments may be integral constants (`std::array<int, 4>`).
    fn parse_template_arg(&mut self) -> Result<TypeRef, TypeParseError> {
        if let Some(tok) = self.peek() {
            if tok.chars().all(|c| c.is_ascii_digit()) {
                let value = self.bump().unwrap_or_default();
                return Ok(TypeRef::named(value));
            }
        }
        self.parse_type()
    }
}

fn canonical_primitive(words: &[String]) -> TypeRef {
    let has = |w: &str| words.iter().any(|x| x == w);
    let longs = words.iter().filter(|w| *w == "long").count();
    let unsigned = has("unsigned");

    let base = if has("void") {
        return TypeRef::Void;
    } else if has("bool") {
        "bool"
    } else if has("wchar_t") {
        "wchar_t"
    } else if has("char16_t") {
        "char16_t"
    } else if has("char32_t") {
        "char32_t"
    } else if has("char") {
        "char"
    } else if has("float") {
        "float"
    } else if has("double") {
        if longs > 0 { "long double" } else { "double" }
    } else if has("short") {
        "short"
    } else if longs >= 2 {
        "long long"
    } else if longs == 1 {
        "long"
    } else {
        "int"
    };

    if unsigned && !matches!(base, "bool" | "float" | "double" | "long double") {
        TypeRef::Primitive(format!("unsigned {}", base))
    } else if has("signed") && base == "char" {
        TypeRef::Primitive("signed char".to_string())
    } else {
        TypeRef::Primitive(base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> TypeRef {
        s.parse().expect("type should parse")
    }

    #[test]
    fn primitives_are_canonicalized() {
        assert_eq!(parse("unsigned"), TypeRef::primitive("unsigned int"));
        assert_eq!(parse("long int"), TypeRef::primitive("long"));
        assert_eq!(parse("unsigned long long int"), TypeRef::primitive("unsigned long long"));
        assert_eq!(parse("short int"), TypeRef::primitive("short"));
        assert_eq!(parse("void"), TypeRef::Void);
    }

    #[test]
    fn const_reference_to_template() {
        let ty = parse("const std::vector<int>&");
        assert!(ty.is_reference());
        let (name, args) = ty.as_named().unwrap();
        assert_eq!(name, "std::vector");
        assert_eq!(args, &[TypeRef::primitive("int")]);
    }

    #[test]
    fn nested_template_arguments() {
        let ty = parse("std::map<std::string, std::vector<Shape*>>");
        let (_, args) = ty.as_named().unwrap();
        assert_eq!(args.len(), 2);
        assert!(args[1].points_to("Shape"));
    }

    #[test]
    fn pointers_and_arrays() {
        assert_eq!(
            parse("char*"),
            TypeRef::Pointer(Box::new(TypeRef::primitive("char")))
        );
        assert_eq!(
            parse("int[4]"),
            TypeRef::Array(Box::new(TypeRef::primitive("int")), Some(4))
        );
        assert_eq!(
            parse("const char* const"),
            TypeRef::Pointer(Box::new(TypeRef::Const(Box::new(TypeRef::primitive("char")))))
        );
    }

    #[test]
    fn east_const_and_elaborated_names() {
        assert_eq!(
            parse("int const"),
            TypeRef::Const(Box::new(TypeRef::primitive("int")))
        );
        assert_eq!(parse("struct Point"), TypeRef::named("Point"));
        assert_eq!(parse("::Geo::Point"), TypeRef::named("Geo::Point"));
    }

    #[test]
    fn display_reparses_to_same_type() {
        for s in ["std::map<K, V>", "Shape*", "int[3]", "const Vector2D&", "unsigned char"] {
            let ty = parse(s);
            assert_eq!(parse(&ty.to_string()), ty, "spelling {s}");
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<TypeRef>().is_err());
        assert!("std::vector<int".parse::<TypeRef>().is_err());
        assert!("int )".parse::<TypeRef>().is_err());
    }

    #[test]
    fn mentions_template_parameter() {
        let ty = parse("const std::vector<T>&");
        assert!(ty.mentions("T"));
        assert!(!ty.mentions("U"));
        assert!(parse("T*").points_to("T"));
    }
}
