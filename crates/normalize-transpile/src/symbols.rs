//! Cross-unit symbol table.
//!
//! Built sequentially over every translation unit before any unit is
//! transformed, then shared read-only across the parallel phase. Maps
//! qualified names to declarations and records which namespace chains map
//! to which target package.

use crate::config::{NamingConfig, PackageConfig};
use crate::ir::{
    Declaration, DeclKind, FunctionRole, Specialization, TemplateParam, TranslationUnit, TypeRef,
};
use crate::names;
use std::collections::{BTreeMap, BTreeSet};

/// A registered declaration.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Unit that declared it first
    pub unit: String,
    /// Namespace chain the declaration lives in (`Geo::Shapes`)
    pub namespace: String,
    /// Target package
    pub package: String,
    /// Target name relative to the package (`Outer.Inner` for nested types)
    pub target_name: String,
    pub decl: Declaration,
}

impl Symbol {
    pub fn is_type(&self) -> bool {
        matches!(
            self.decl.kind,
            DeclKind::ClassLike(_) | DeclKind::Template(_) | DeclKind::Enum(_) | DeclKind::Alias(_)
        )
    }
}

/// Qualified name to declaration mapping for one conversion run.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    naming: NamingConfig,
    packages: PackageConfig,
    symbols: BTreeMap<String, Symbol>,
    /// Target package to the distinct namespace chains that map onto it
    package_sources: BTreeMap<String, BTreeSet<String>>,
    /// Every specialization per template, in-unit and external alike
    specializations: BTreeMap<String, Vec<Specialization>>,
}

impl SymbolTable {
    pub fn new(naming: NamingConfig, packages: PackageConfig) -> Self {
        Self {
            naming,
            packages,
            ..Default::default()
        }
    }

    /// Register every unit, in order.
    pub fn build(units: &[TranslationUnit], naming: &NamingConfig, packages: &PackageConfig) -> Self {
        let mut table = Self::new(naming.clone(), packages.clone());
        for unit in units {
            table.register_unit(unit);
        }
        tracing::debug!(
            symbols = table.symbols.len(),
            packages = table.package_sources.len(),
            "symbol table built"
        );
        table
    }

    pub fn register_unit(&mut self, unit: &TranslationUnit) {
        for decl in &unit.declarations {
            self.register(decl, &unit.id, "", &[]);
        }
        for external in &unit.external_specializations {
            self.specializations
                .entry(external.template.clone())
                .or_default()
                .push(external.specialization.clone());
        }
    }

    fn register(&mut self, decl: &Declaration, unit: &str, namespace: &str, class_path: &[String]) {
        match &decl.kind {
            DeclKind::Namespace => {
                let chain = if decl.name.is_empty() {
                    namespace.to_string()
                } else {
                    decl.qualified_name.clone()
                };
                if !decl.name.is_empty() {
                    let package = self.package_for_namespace(&chain);
                    self.package_sources
                        .entry(package)
                        .or_default()
                        .insert(chain.clone());
                }
                for child in &decl.children {
                    self.register(child, unit, &chain, &[]);
                }
            }
            DeclKind::ClassLike(_) | DeclKind::Enum(_) => {
                let mut path = class_path.to_vec();
                path.push(decl.name.clone());
                self.insert(decl, unit, namespace, path.join("."));
                if matches!(decl.kind, DeclKind::ClassLike(_)) {
                    for child in &decl.children {
                        if matches!(
                            child.kind,
                            DeclKind::ClassLike(_)
                                | DeclKind::Enum(_)
                                | DeclKind::Template(_)
                                | DeclKind::Alias(_)
                                | DeclKind::Constant(_)
                        ) {
                            self.register(child, unit, namespace, &path);
                        }
                    }
                }
            }
            DeclKind::Template(template) => {
                let mut path = class_path.to_vec();
                path.push(decl.name.clone());
                self.insert(decl, unit, namespace, path.join("."));
                if !template.specializations.is_empty() {
                    self.specializations
                        .entry(decl.qualified_name.clone())
                        .or_default()
                        .extend(template.specializations.iter().cloned());
                }
            }
            DeclKind::Alias(_) | DeclKind::Constant(_) | DeclKind::Field(_) => {
                let target = if class_path.is_empty() {
                    decl.name.clone()
                } else {
                    format!("{}.{}", class_path.join("."), decl.name)
                };
                self.insert(decl, unit, namespace, target);
            }
            DeclKind::Function(function) => {
                if class_path.is_empty() && function.role == FunctionRole::Free {
                    self.insert(decl, unit, namespace, decl.name.clone());
                }
            }
            DeclKind::Unsupported(_) => {}
        }
    }

    fn insert(&mut self, decl: &Declaration, unit: &str, namespace: &str, target_name: String) {
        let package = self.package_for_namespace(namespace);
        let key = decl.qualified_name.clone();
        if let Some(existing) = self.symbols.get(&key) {
            // A definition replaces an earlier forward declaration
            let forward = existing.decl.children.is_empty() && !decl.children.is_empty();
            if !forward {
                tracing::debug!(name = %key, unit, "duplicate declaration ignored");
                return;
            }
        }
        self.symbols.insert(
            key,
            Symbol {
                unit: unit.to_string(),
                namespace: namespace.to_string(),
                package,
                target_name,
                decl: decl.clone(),
            },
        );
    }

    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Exact lookup by qualified name.
    pub fn get(&self, qualified: &str) -> Option<&Symbol> {
        self.symbols.get(qualified.trim_start_matches("::"))
    }

    /// Look `name` up from inside `scope`, innermost scope first.
    pub fn resolve(&self, name: &str, scope: &str) -> Option<&Symbol> {
        if name.starts_with("::") {
            return self.get(name);
        }
        let mut scope = scope;
        loop {
            if let Some(symbol) = self.get(&names::qualify(scope, name)) {
                return Some(symbol);
            }
            if scope.is_empty() {
                return None;
            }
            scope = names::scope_of(scope);
        }
    }

    /// The class declaration behind a name; template names yield their pattern.
    pub fn class(&self, qualified: &str) -> Option<&Declaration> {
        let symbol = self.get(qualified)?;
        match &symbol.decl.kind {
            DeclKind::ClassLike(_) => Some(&symbol.decl),
            DeclKind::Template(template) => match template.pattern.kind {
                DeclKind::ClassLike(_) => Some(template.pattern.as_ref()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn package_for_namespace(&self, chain: &str) -> String {
        if chain.is_empty() {
            self.packages.default.clone()
        } else {
            names::package_name(chain, &self.packages.root)
        }
    }

    /// Namespace chains sharing `package`, when more than one does.
    pub fn package_collision(&self, package: &str) -> Option<Vec<&str>> {
        let chains = self.package_sources.get(package)?;
        if chains.len() < 2 {
            return None;
        }
        Some(chains.iter().map(String::as_str).collect())
    }

    pub fn specializations(&self, template: &str) -> &[Specialization] {
        self.specializations
            .get(template.trim_start_matches("::"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Concrete class name of the full specialization matching `args`.
    pub fn full_specialization(&self, template: &str, args: &[TypeRef]) -> Option<String> {
        self.specializations(template)
            .iter()
            .find(|spec| !spec.partial && spec.args == args)
            .map(|spec| names::specialization_name(template, &spec.args, &[]))
    }

    /// Template parameters of a class template.
    pub fn template_params(&self, qualified: &str) -> Option<&[TemplateParam]> {
        match &self.get(qualified)?.decl.kind {
            DeclKind::Template(template) => Some(&template.params),
            _ => None,
        }
    }

    /// True if instances of the class own a resource released on scope exit:
    /// the class or one of its primary bases declares a destructor.
    pub fn is_resource(&self, qualified: &str) -> bool {
        let mut current = qualified.to_string();
        for _ in 0..32 {
            let Some(decl) = self.class(&current) else {
                return false;
            };
            if declares_destructor(decl) {
                return true;
            }
            match decl.as_class().and_then(|c| c.primary_base()) {
                Some(base) => current = base.name.clone(),
                None => return false,
            }
        }
        false
    }

    /// True if any base of `class`, transitively, declares a method with `key`.
    pub fn inherits_method(&self, class: &str, key: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut queue: Vec<String> = self
            .class(class)
            .and_then(Declaration::as_class)
            .map(|c| c.bases.iter().map(|b| b.name.clone()).collect())
            .unwrap_or_default();
        while let Some(name) = queue.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(decl) = self.class(&name) else {
                continue;
            };
            if decl
                .methods()
                .any(|(d, f)| f.role == FunctionRole::Method && f.signature_key(&d.name) == key)
            {
                return true;
            }
            if let Some(class) = decl.as_class() {
                queue.extend(class.bases.iter().map(|b| b.name.clone()));
            }
        }
        false
    }
}

/// Explicit destructor presence, from the front end flag or a destructor member.
pub fn declares_destructor(decl: &Declaration) -> bool {
    decl.as_class().is_some_and(|c| c.has_user_destructor)
        || decl.methods().any(|(_, f)| f.role == FunctionRole::Destructor)
}
