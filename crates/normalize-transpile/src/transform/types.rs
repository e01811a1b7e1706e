//! Source type to target type mapping.

use super::Scope;
use crate::ir::{DeclKind, TypeRef};
use crate::names;
use crate::symbols::SymbolTable;
use crate::target::JavaType;
use std::collections::BTreeMap;

const MAX_ALIAS_DEPTH: usize = 16;

/// Builtin arithmetic type to target primitive.
pub(crate) fn map_primitive(name: &str) -> JavaType {
    let target = match name {
        "bool" => "boolean",
        "char" | "signed char" | "unsigned char" => "byte",
        "wchar_t" | "char16_t" => "char",
        "char32_t" => "int",
        "short" | "unsigned short" => "short",
        "long" | "unsigned long" | "long long" | "unsigned long long" => "long",
        "float" => "float",
        "double" | "long double" => "double",
        _ => "int",
    };
    JavaType::primitive(target)
}

/// Map a source type as seen from `scope`.
pub(crate) fn map_type(ty: &TypeRef, scope: &Scope, symbols: &SymbolTable) -> JavaType {
    map_with_depth(ty, scope, symbols, 0)
}

fn map_with_depth(ty: &TypeRef, scope: &Scope, symbols: &SymbolTable, depth: usize) -> JavaType {
    match ty {
        TypeRef::Void => JavaType::Void,
        TypeRef::Primitive(name) => map_primitive(name),
        TypeRef::Const(inner) | TypeRef::Reference(inner) => {
            map_with_depth(inner, scope, symbols, depth)
        }
        TypeRef::Pointer(inner) => match inner.as_ref() {
            TypeRef::Const(c) if **c == TypeRef::primitive("char") => JavaType::string(),
            TypeRef::Void => JavaType::object(),
            other => match other.value_type() {
                TypeRef::Primitive(_) => {
                    JavaType::Array(Box::new(map_with_depth(other, scope, symbols, depth)))
                }
                _ => map_with_depth(other, scope, symbols, depth),
            },
        },
        TypeRef::Array(inner, _) => {
            JavaType::Array(Box::new(map_with_depth(inner, scope, symbols, depth)))
        }
        TypeRef::Named { name, args } => map_named(name, args, scope, symbols, depth),
    }
}

fn map_args(args: &[TypeRef], scope: &Scope, symbols: &SymbolTable, depth: usize) -> Vec<JavaType> {
    args.iter()
        .filter(|a| !is_value_argument(a))
        .map(|a| map_with_depth(a, scope, symbols, depth).boxed())
        .collect()
}

/// Integral template arguments (`std::array<int, 4>`) have no generic counterpart.
pub(crate) fn is_value_argument(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Named { name, args } if args.is_empty() && name.chars().all(|c| c.is_ascii_digit() || c == '-'))
}

fn map_named(
    name: &str,
    args: &[TypeRef],
    scope: &Scope,
    symbols: &SymbolTable,
    depth: usize,
) -> JavaType {
    if scope.is_type_param(name) {
        return JavaType::simple(name);
    }
    if let Some(mapped) = map_library(name, args, scope, symbols, depth) {
        return mapped;
    }

    if let Some(symbol) = symbols.resolve(name, scope.lookup_scope()) {
        match &symbol.decl.kind {
            DeclKind::Alias(alias) if depth < MAX_ALIAS_DEPTH => {
                return map_with_depth(&alias.target, scope, symbols, depth + 1);
            }
            DeclKind::Template(_) => {
                if let Some(concrete) =
                    symbols.full_specialization(&symbol.decl.qualified_name, args)
                {
                    return JavaType::class(&symbol.package, &concrete);
                }
                return JavaType::class(&symbol.package, &symbol.target_name)
                    .with_args(map_args(args, scope, symbols, depth));
            }
            DeclKind::ClassLike(_) | DeclKind::Enum(_) => {
                return JavaType::class(&symbol.package, &symbol.target_name)
                    .with_args(map_args(args, scope, symbols, depth));
            }
            _ => {}
        }
    }

    JavaType::simple(&names::escape_identifier(names::simple_name(name)))
        .with_args(map_args(args, scope, symbols, depth))
}

/// Standard library types with a direct target counterpart.
fn map_library(
    name: &str,
    args: &[TypeRef],
    scope: &Scope,
    symbols: &SymbolTable,
    depth: usize,
) -> Option<JavaType> {
    let first = || {
        args.first()
            .map(|a| map_with_depth(a, scope, symbols, depth))
            .unwrap_or_else(JavaType::object)
    };
    let mapped = match name {
        "std::string" | "std::wstring" | "string" | "std::string_view" => JavaType::string(),
        "size_t" | "std::size_t" | "ptrdiff_t" | "std::ptrdiff_t" | "int64_t" | "std::int64_t"
        | "uint64_t" | "std::uint64_t" => JavaType::primitive("long"),
        "int32_t" | "std::int32_t" | "uint32_t" | "std::uint32_t" => JavaType::primitive("int"),
        "int16_t" | "std::int16_t" | "uint16_t" | "std::uint16_t" => JavaType::primitive("short"),
        "int8_t" | "std::int8_t" | "uint8_t" | "std::uint8_t" => JavaType::primitive("byte"),
        "std::vector" | "std::list" | "std::deque" => {
            JavaType::class("java.util", "List").with_args(map_args(args, scope, symbols, depth))
        }
        "std::map" | "std::unordered_map" | "std::multimap" => {
            JavaType::class("java.util", "Map").with_args(map_args(args, scope, symbols, depth))
        }
        "std::set" | "std::unordered_set" => {
            JavaType::class("java.util", "Set").with_args(map_args(args, scope, symbols, depth))
        }
        "std::pair" => JavaType::class("java.util", "Map.Entry")
            .with_args(map_args(args, scope, symbols, depth)),
        "std::array" => JavaType::Array(Box::new(first())),
        "std::unique_ptr" | "std::shared_ptr" | "std::weak_ptr" => first(),
        "std::optional" => first().boxed(),
        "std::exception" | "std::runtime_error" => JavaType::simple("RuntimeException"),
        "std::logic_error" | "std::invalid_argument" | "std::domain_error" => {
            JavaType::simple("IllegalArgumentException")
        }
        "std::out_of_range" => JavaType::simple("IndexOutOfBoundsException"),
        _ => return None,
    };
    Some(mapped)
}

/// Replace template parameters by their arguments.
pub(crate) fn substitute(ty: &TypeRef, bindings: &BTreeMap<String, TypeRef>) -> TypeRef {
    if bindings.is_empty() {
        return ty.clone();
    }
    match ty {
        TypeRef::Named { name, args } if args.is_empty() => {
            bindings.get(name).cloned().unwrap_or_else(|| ty.clone())
        }
        TypeRef::Named { name, args } => TypeRef::Named {
            name: name.clone(),
            args: args.iter().map(|a| substitute(a, bindings)).collect(),
        },
        TypeRef::Pointer(inner) => TypeRef::Pointer(Box::new(substitute(inner, bindings))),
        TypeRef::Reference(inner) => TypeRef::Reference(Box::new(substitute(inner, bindings))),
        TypeRef::Const(inner) => TypeRef::Const(Box::new(substitute(inner, bindings))),
        TypeRef::Array(inner, len) => TypeRef::Array(Box::new(substitute(inner, bindings)), *len),
        TypeRef::Void | TypeRef::Primitive(_) => ty.clone(),
    }
}

/// True for named types that behave as values with content equality.
pub(crate) fn is_value_object(ty: &TypeRef, scope: &Scope, symbols: &SymbolTable) -> bool {
    if ty.is_pointer() {
        return false;
    }
    match ty.value_type() {
        TypeRef::Named { name, .. } => {
            if scope.is_type_param(name) {
                return true;
            }
            match symbols.resolve(name, scope.lookup_scope()) {
                Some(symbol) => !matches!(symbol.decl.kind, DeclKind::Enum(_)),
                None => !map_type(ty, scope, symbols).is_primitive(),
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ClassLike, DeclId, Declaration, TranslationUnit};
    use crate::transform::test_support::symbols_for;

    fn parse(s: &str) -> TypeRef {
        s.parse().unwrap()
    }

    fn map(s: &str) -> String {
        let symbols = symbols_for(&[]);
        map_type(&parse(s), &Scope::default(), &symbols).spelling()
    }

    #[test]
    fn primitives() {
        assert_eq!(map("bool"), "boolean");
        assert_eq!(map("unsigned char"), "byte");
        assert_eq!(map("unsigned int"), "int");
        assert_eq!(map("long long"), "long");
        assert_eq!(map("size_t"), "long");
        assert_eq!(map("wchar_t"), "char");
    }

    #[test]
    fn references_and_pointers() {
        assert_eq!(map("const std::string&"), "String");
        assert_eq!(map("const char*"), "String");
        assert_eq!(map("char*"), "byte[]");
        assert_eq!(map("int[4]"), "int[]");
        assert_eq!(map("void*"), "Object");
    }

    #[test]
    fn containers_box_their_arguments() {
        assert_eq!(map("std::vector<int>"), "List<Integer>");
        assert_eq!(map("std::map<std::string, double>"), "Map<String, Double>");
        assert_eq!(map("std::unique_ptr<Widget>"), "Widget");
        assert_eq!(map("std::array<int, 4>"), "int[]");
    }

    #[test]
    fn classes_resolve_through_symbols() {
        let point = Declaration::new(DeclId(1), "Point", DeclKind::ClassLike(ClassLike::default()))
            .qualified("Geo::Point");
        let geo = Declaration::new(DeclId(0), "Geo", DeclKind::Namespace)
            .qualified("Geo")
            .with_children(vec![point]);
        let symbols = symbols_for(&[TranslationUnit::new("geo.cpp", vec![geo])]);
        let scope = Scope::namespace("Geo", "geo".into());
        assert_eq!(
            map_type(&parse("const Point&"), &scope, &symbols),
            JavaType::class("geo", "Point")
        );
        assert!(is_value_object(&parse("Point"), &scope, &symbols));
        assert!(!is_value_object(&parse("Point*"), &scope, &symbols));
        assert!(!is_value_object(&parse("int"), &scope, &symbols));
    }

    #[test]
    fn type_parameters_stay_generic() {
        let symbols = symbols_for(&[]);
        let scope = Scope::default().with_type_params(["T".to_string()]);
        assert_eq!(map_type(&parse("const T&"), &scope, &symbols), JavaType::simple("T"));
        assert_eq!(
            map_type(&parse("std::vector<T>"), &scope, &symbols).spelling(),
            "List<T>"
        );
    }

    #[test]
    fn substitution() {
        let bindings = BTreeMap::from([("T".to_string(), TypeRef::primitive("int"))]);
        assert_eq!(
            substitute(&parse("const std::vector<T>&"), &bindings),
            parse("const std::vector<int>&")
        );
    }
}
