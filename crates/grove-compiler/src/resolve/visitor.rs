use rustc_hash::{FxHashMap, FxHashSet};

use grove_parser::ast::utils::declared_names;
use grove_parser::ast::visitor::walk_expression_mut;
use grove_parser::ast::{ClassExpression, Expression, ModuleNode, VisitorMut};
use grove_parser::Span;

use super::ClassNodeResolver;
use crate::error::SyntaxException;

/// Packages every script sees without importing them
pub const DEFAULT_PACKAGES: &[&str] = &[
    "java.lang.",
    "java.util.",
    "java.io.",
    "groovy.lang.",
    "groovy.util.",
];

/// `a.b.C.D` and its nested-class readings, innermost first:
/// `a.b.C.D`, `a.b.C$D`, `a.b$C$D`, `a$b$C$D`.
pub fn nested_forms(name: &str) -> Vec<String> {
    let mut forms = vec![name.to_string()];
    let mut current = name.to_string();
    while let Some(dot) = current.rfind('.') {
        current.replace_range(dot..dot + 1, "$");
        forms.push(current.clone());
    }
    forms
}

/// Every binary name `name` could refer to, in probing order: explicit
/// imports, the name as written, star imports, then the default packages.
pub fn candidate_names(
    name: &str,
    imports: &FxHashMap<String, String>,
    star_packages: &[String],
) -> Vec<String> {
    let mut candidates = Vec::new();

    let (first, rest) = match name.split_once('.') {
        Some((first, rest)) => (first, Some(rest)),
        None => (name, None),
    };
    if let Some(imported) = imports.get(first) {
        match rest {
            Some(rest) => {
                let qualified = format!("{}.{}", imported, rest);
                // the import itself is already resolved; only the tail may nest
                let outer_dots = imported.matches('.').count();
                candidates.extend(
                    nested_forms(&qualified)
                        .into_iter()
                        .filter(|form| form.matches('.').count() >= outer_dots),
                );
            }
            None => candidates.push(imported.clone()),
        }
    }

    candidates.extend(nested_forms(name));

    let packages = star_packages
        .iter()
        .map(String::as_str)
        .chain(DEFAULT_PACKAGES.iter().copied());
    for package in packages {
        candidates.extend(nested_forms(&format!("{}{}", package, name)));
    }

    let mut seen = FxHashSet::default();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

fn is_class_like(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Rewrites class references in a module into [`Expression::Class`] nodes.
///
/// Capitalised names that resolve to nothing are left alone; at run time
/// they are ordinary binding variables.
pub struct ResolveVisitor<'r> {
    resolver: &'r mut dyn ClassNodeResolver,
    imports: FxHashMap<String, String>,
    star_packages: Vec<String>,
    locals: FxHashSet<String>,
    resolved: FxHashMap<String, Option<String>>,
    errors: Vec<SyntaxException>,
}

impl<'r> ResolveVisitor<'r> {
    pub fn new(resolver: &'r mut dyn ClassNodeResolver) -> Self {
        Self {
            resolver,
            imports: FxHashMap::default(),
            star_packages: Vec::new(),
            locals: FxHashSet::default(),
            resolved: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    /// Resolve imports and class references of `module`. Returns the
    /// unresolvable imports as errors.
    pub fn resolve_module(mut self, module: &mut ModuleNode) -> Vec<SyntaxException> {
        self.star_packages = module
            .star_imports
            .iter()
            .map(|i| i.package_name.clone())
            .collect();

        for import in &module.imports {
            let found = nested_forms(&import.class_name)
                .into_iter()
                .find(|form| self.resolver.find_class_node(form).is_some());
            match found {
                Some(binary) => {
                    self.imports.insert(import.alias.clone(), binary);
                }
                None => self.error(format!("unable to resolve class {}", import.class_name), import.span),
            }
        }

        self.locals = declared_names(&module.statements).into_iter().collect();
        for stmt in &mut module.statements {
            self.visit_statement_mut(stmt);
        }

        for method in &mut module.methods {
            self.locals = declared_names(&method.body).into_iter().collect();
            self.locals
                .extend(method.parameters.iter().map(|p| p.name.clone()));
            for stmt in &mut method.body {
                self.visit_statement_mut(stmt);
            }
        }

        self.errors
    }

    /// The binary name `name` refers to, if any
    pub fn resolve_name(&mut self, name: &str) -> Option<String> {
        if let Some(known) = self.resolved.get(name) {
            return known.clone();
        }
        let found = candidate_names(name, &self.imports, &self.star_packages)
            .into_iter()
            .find(|candidate| self.resolver.find_class_node(candidate).is_some());
        if let Some(binary) = &found {
            tracing::trace!(name, class = binary.as_str(), "resolved class reference");
        }
        self.resolved.insert(name.to_string(), found.clone());
        found
    }

    fn error(&mut self, message: String, span: Span) {
        self.errors.push(SyntaxException {
            message,
            line: span.line,
            column: span.column,
            start: span.start,
            end: span.end,
        });
    }

    fn class_candidate(&self, expr: &Expression) -> Option<(String, Span)> {
        match expr {
            Expression::Variable(v) if is_class_like(&v.name) && !self.locals.contains(&v.name) => {
                Some((v.name.clone(), v.span))
            }
            Expression::Property(p) if is_class_like(&p.property) => {
                let name = expr.dotted_name()?;
                let root = name.split('.').next()?;
                (!self.locals.contains(root)).then_some((name, p.span))
            }
            _ => None,
        }
    }
}

impl VisitorMut for ResolveVisitor<'_> {
    fn visit_expression_mut(&mut self, expr: &mut Expression) {
        if let Some((name, span)) = self.class_candidate(expr) {
            if let Some(binary) = self.resolve_name(&name) {
                *expr = Expression::Class(ClassExpression { name: binary, span });
                return;
            }
        }
        walk_expression_mut(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::LookupResult;
    use grove_parser::ast::Statement;
    use grove_parser::parse;

    /// Knows a fixed set of names and records every probe
    struct Known {
        names: Vec<&'static str>,
        probes: Vec<String>,
    }

    impl ClassNodeResolver for Known {
        fn find_class_node(&mut self, name: &str) -> Option<LookupResult> {
            self.probes.push(name.to_string());
            self.names
                .iter()
                .any(|known| *known == name)
                .then(|| LookupResult::Source(name.into()))
        }
    }

    fn known(names: &[&'static str]) -> Known {
        Known {
            names: names.to_vec(),
            probes: Vec::new(),
        }
    }

    fn first_expression(module: &ModuleNode) -> &Expression {
        match &module.statements[0] {
            Statement::Expression(s) => &s.expression,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_forms() {
        assert_eq!(
            nested_forms("java.util.Map.Entry"),
            vec![
                "java.util.Map.Entry",
                "java.util.Map$Entry",
                "java.util$Map$Entry",
                "java$util$Map$Entry"
            ]
        );
        assert_eq!(nested_forms("Foo"), vec!["Foo"]);
    }

    #[test]
    fn test_candidates_order() {
        let candidates = candidate_names("Foo", &FxHashMap::default(), &["org.acme.".to_string()]);
        assert_eq!(
            &candidates[..4],
            &["Foo", "org.acme.Foo", "org.acme$Foo", "org$acme$Foo"]
        );
        assert!(candidates.contains(&"java.lang.Foo".to_string()));
        assert!(candidates.contains(&"groovy.util.Foo".to_string()));
    }

    #[test]
    fn test_resolves_default_package_and_nested() {
        let mut resolver = known(&["java.util.Map", "java.util.Map$Entry"]);
        let mut module = parse("Map\nMap.Entry").unwrap();
        let errors = ResolveVisitor::new(&mut resolver).resolve_module(&mut module);

        assert!(errors.is_empty());
        assert!(matches!(first_expression(&module), Expression::Class(c) if c.name == "java.util.Map"));
        let Statement::Expression(second) = &module.statements[1] else {
            panic!("expected expression");
        };
        assert!(matches!(&second.expression, Expression::Class(c) if c.name == "java.util.Map$Entry"));
    }

    #[test]
    fn test_import_alias() {
        let mut resolver = known(&["org.acme.Thing"]);
        let mut module = parse("import org.acme.Thing as T\nT").unwrap();
        let errors = ResolveVisitor::new(&mut resolver).resolve_module(&mut module);

        assert!(errors.is_empty());
        assert!(matches!(first_expression(&module), Expression::Class(c) if c.name == "org.acme.Thing"));
    }

    #[test]
    fn test_unresolved_import_is_an_error() {
        let mut resolver = known(&[]);
        let mut module = parse("\nimport org.acme.Missing").unwrap();
        let errors = ResolveVisitor::new(&mut resolver).resolve_module(&mut module);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert!(errors[0].message.contains("org.acme.Missing"));
    }

    #[test]
    fn test_locals_shadow_classes() {
        let mut resolver = known(&["java.lang.String"]);
        let mut module = parse("def String = 1\nString").unwrap();
        ResolveVisitor::new(&mut resolver).resolve_module(&mut module);

        let Statement::Expression(stmt) = &module.statements[1] else {
            panic!("expected expression");
        };
        assert!(matches!(&stmt.expression, Expression::Variable(_)));
        assert!(resolver.probes.is_empty());
    }

    #[test]
    fn test_unresolved_names_stay_variables() {
        let mut resolver = known(&[]);
        let mut module = parse("Version").unwrap();
        ResolveVisitor::new(&mut resolver).resolve_module(&mut module);

        assert!(matches!(first_expression(&module), Expression::Variable(_)));
        assert!(resolver.probes.contains(&"groovy.lang.Version".to_string()));
    }
}
