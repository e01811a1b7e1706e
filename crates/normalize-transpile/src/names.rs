//! Identifier conversion between source and target naming conventions.

use crate::ir::{TemplateParam, TypeRef};

/// Target-language reserved words and literals.
const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "var", "record", "yield", "sealed", "permits", "true", "false",
    "null",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Prefix reserved words with `_` (`native` => `_native`).
pub fn escape_identifier(name: &str) -> String {
    if is_reserved(name) {
        format!("_{}", name)
    } else {
        name.to_string()
    }
}

/// Last segment of a qualified name.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit("::").next().unwrap_or(qualified)
}

/// Everything before the last segment of a qualified name.
pub fn scope_of(qualified: &str) -> &str {
    match qualified.rfind("::") {
        Some(idx) => &qualified[..idx],
        None => "",
    }
}

/// Join a scope and a name into a qualified name.
pub fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", scope, name)
    }
}

/// Map a namespace chain (`Geo::Shapes`) to a package path (`geo.shapes`).
pub fn package_name(chain: &str, root: &str) -> String {
    let mut segments: Vec<String> = root
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    segments.extend(
        chain
            .split("::")
            .filter(|s| !s.is_empty())
            .map(|s| escape_identifier(&s.to_lowercase())),
    );
    segments.join(".")
}

/// `maxSize` => `MAX_SIZE`; names already in upper snake case are kept.
pub fn upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }
    out
}

/// `Drawable` => `drawable`.
pub fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Concrete class name for a template specialization: base name followed by
/// one token per argument (`Box<int>` => `BoxInt`, `Box<T*>` => `BoxPtr`).
///
/// Parameters still open in a partial specialization contribute nothing.
pub fn specialization_name(base: &str, args: &[TypeRef], open: &[TemplateParam]) -> String {
    let mut name = simple_name(base).to_string();
    for arg in args {
        name.push_str(&type_token(arg, open));
    }
    if name == simple_name(base) {
        name.push_str("Specialized");
    }
    name
}

fn type_token(ty: &TypeRef, open: &[TemplateParam]) -> String {
    match ty {
        TypeRef::Void => "Void".to_string(),
        TypeRef::Primitive(name) => name.split(' ').map(upper_first).collect(),
        TypeRef::Named { name, args } => {
            if open.iter().any(|p| &p.name == name) {
                return String::new();
            }
            let base = match name.as_str() {
                "std::string" | "string" => "String".to_string(),
                other => upper_first(simple_name(other)),
            };
            let mut token = base;
            for arg in args {
                token.push_str(&type_token(arg, open));
            }
            token
        }
        TypeRef::Pointer(inner) => format!("{}Ptr", type_token(inner, open)),
        TypeRef::Reference(inner) => format!("{}Ref", type_token(inner, open)),
        TypeRef::Const(inner) => format!("Const{}", type_token(inner, open)),
        TypeRef::Array(inner, _) => format!("{}Array", type_token(inner, open)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_words_are_prefixed() {
        assert_eq!(escape_identifier("native"), "_native");
        assert_eq!(escape_identifier("record"), "_record");
        assert_eq!(escape_identifier("radius"), "radius");
    }

    #[test]
    fn packages_are_lowercase_and_rooted() {
        assert_eq!(package_name("Geo::Shapes", ""), "geo.shapes");
        assert_eq!(package_name("Geo::Shapes", "com.acme"), "com.acme.geo.shapes");
        assert_eq!(package_name("", "com.acme"), "com.acme");
        assert_eq!(package_name("", ""), "");
    }

    #[test]
    fn upper_snake_case() {
        assert_eq!(upper_snake("maxSize"), "MAX_SIZE");
        assert_eq!(upper_snake("PI"), "PI");
        assert_eq!(upper_snake("MAX_SIZE"), "MAX_SIZE");
        assert_eq!(upper_snake("httpServerURL"), "HTTP_SERVER_URL");
        assert_eq!(upper_snake("HTTPServer"), "HTTP_SERVER");
        assert_eq!(upper_snake("buffer2Size"), "BUFFER2_SIZE");
    }

    #[test]
    fn qualified_name_parts() {
        assert_eq!(simple_name("Geo::Shapes::Circle"), "Circle");
        assert_eq!(scope_of("Geo::Shapes::Circle"), "Geo::Shapes");
        assert_eq!(scope_of("Circle"), "");
        assert_eq!(qualify("", "Circle"), "Circle");
        assert_eq!(qualify("Geo", "Circle"), "Geo::Circle");
    }

    #[test]
    fn specialization_names() {
        let int = TypeRef::primitive("int");
        assert_eq!(specialization_name("Box", &[int.clone()], &[]), "BoxInt");
        assert_eq!(
            specialization_name("Geo::Pair", &[int, TypeRef::named("std::string")], &[]),
            "PairIntString"
        );
        let t = TemplateParam::type_param("T");
        let ptr = TypeRef::Pointer(Box::new(TypeRef::named("T")));
        assert_eq!(specialization_name("Box", &[ptr], &[t.clone()]), "BoxPtr");
        assert_eq!(
            specialization_name("Box", &[TypeRef::named("T")], &[t]),
            "BoxSpecialized"
        );
        assert_eq!(
            specialization_name("Box", &[TypeRef::primitive("unsigned long")], &[]),
            "BoxUnsignedLong"
        );
    }
}
