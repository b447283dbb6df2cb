use crate::error::{GenError, Result};
use crate::parser::{AstParser, SourceFile};
use crate::type_graph::{
    Keyword, LiteralType, Lowerer, Member, ModuleId, ObjectType, TypeNode, TypeParam, TypeRef,
};
use log::{debug, warn};
use oxc_ast::ast::{
    Declaration as AstDeclaration, Expression, ImportDeclarationSpecifier, ModuleDeclaration,
    Program, TSTypeParameterDeclaration,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of alias hops followed by [`TypeResolver::resolve`].
const MAX_RESOLVE_DEPTH: usize = 32;

/// Extensions tried, in order, when resolving a module specifier to a file.
const MODULE_SUFFIXES: &[&str] = &[".d.ts", ".ts", ".tsx", "/index.d.ts", "/index.ts"];

/// Type resolver - the analysis session shared by every stage of one generation run.
///
/// Source files are added one at a time and cached by path, so modules shared between route
/// groups are parsed once. Each file's top-level declarations are lowered into owned
/// [`TypeNode`]s; references are resolved lazily, following imports into other local files
/// as needed.
pub struct TypeResolver {
    /// Import path aliases from the TypeScript project configuration
    aliases: PathAliases,
    /// All loaded modules, indexed by [`ModuleId`]
    modules: Vec<ModuleDecls>,
    /// Canonical path -> module index
    by_path: HashMap<PathBuf, ModuleId>,
    /// Interfaces currently being expanded, to detect circular `extends`
    resolving_stack: Vec<String>,
}

/// `compilerOptions.baseUrl` / `compilerOptions.paths` from a tsconfig.
#[derive(Debug, Clone, Default)]
pub struct PathAliases {
    pub base_url: PathBuf,
    pub paths: Vec<(String, Vec<String>)>,
}

/// Declarations of one loaded module.
#[derive(Debug, Default)]
pub struct ModuleDecls {
    /// Path of the source file
    pub path: PathBuf,
    declarations: HashMap<String, Declaration>,
    imports: HashMap<String, ImportBinding>,
    /// `export { local as exported }` renames
    export_renames: HashMap<String, String>,
    /// Exported type alias names, in declaration order
    exported_aliases: Vec<String>,
}

/// A top-level declaration, lowered.
#[derive(Debug, Clone)]
pub enum Declaration {
    Alias {
        params: Vec<TypeParam>,
        ty: TypeNode,
    },
    Interface {
        params: Vec<TypeParam>,
        extends: Vec<TypeNode>,
        body: ObjectType,
    },
    Class,
    Enum(Vec<LiteralType>),
    Variable {
        annotation: Option<TypeNode>,
        /// Callee name when the initializer is `new Callee(...)`
        constructed: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct ImportBinding {
    specifier: String,
    /// Imported name; `None` for namespace imports
    imported: Option<String>,
}

impl PathAliases {
    /// Expand a bare specifier through the configured `paths` patterns.
    fn expand(&self, specifier: &str) -> Vec<PathBuf> {
        let mut bases = Vec::new();
        for (pattern, targets) in &self.paths {
            let captured = match pattern.split_once('*') {
                Some((prefix, suffix)) => specifier
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(suffix)),
                None if pattern == specifier => Some(""),
                None => None,
            };
            if let Some(captured) = captured {
                for target in targets {
                    bases.push(self.base_url.join(target.replacen('*', captured, 1)));
                }
            }
        }
        bases
    }
}

impl TypeResolver {
    /// Create an empty analysis session
    pub fn new(aliases: PathAliases) -> Self {
        debug!("Initializing TypeResolver with {} path aliases", aliases.paths.len());
        Self {
            aliases,
            modules: Vec::new(),
            by_path: HashMap::new(),
            resolving_stack: Vec::new(),
        }
    }

    /// Add a source file to the session, returning its module id.
    ///
    /// Files already in the session are not parsed again.
    pub fn add_source_file(&mut self, path: &Path) -> Result<ModuleId> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(&id) = self.by_path.get(&key) {
            debug!("Module {} already loaded", path.display());
            return Ok(id);
        }

        let file = AstParser::read_file(path)?;
        let id = self.modules.len();
        let decls = AstParser::with_program(&file, |program| lower_module(program, &file, id))?;

        debug!(
            "Loaded module {} with {} declarations and {} imports",
            path.display(),
            decls.declarations.len(),
            decls.imports.len()
        );
        self.modules.push(decls);
        self.by_path.insert(key, id);
        Ok(id)
    }

    /// Number of modules loaded so far
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Find the application's exported route-table type alias.
    ///
    /// Without an explicit name, `AppType` is preferred and otherwise the first exported type
    /// alias of the module is used.
    pub fn app_type(&self, module: ModuleId, name: Option<&str>) -> Result<TypeNode> {
        let decls = &self.modules[module];
        let missing = |name: &str| GenError::MissingAppType {
            file: decls.path.clone(),
            name: name.to_string(),
        };

        let name = match name {
            Some(name) => name.to_string(),
            None => decls
                .exported_aliases
                .iter()
                .find(|n| n.as_str() == "AppType")
                .or_else(|| decls.exported_aliases.first())
                .cloned()
                .ok_or_else(|| missing("<exported type alias>"))?,
        };
        let local = decls.export_renames.get(&name).unwrap_or(&name);

        match decls.declarations.get(local) {
            Some(Declaration::Alias { ty, .. }) => Ok(ty.clone()),
            _ => Err(missing(&name)),
        }
    }

    /// The declared name a reference ultimately points at, seen through import renames.
    ///
    /// Used to recognize framework constructs (`MergeSchemaPath`, `BlankSchema`, ...) that live
    /// in packages the session never loads.
    pub fn canonical_name(&self, node: &TypeNode) -> Option<String> {
        let full = match node {
            TypeNode::Reference(r) => {
                match self.modules.get(r.module).and_then(|m| m.imports.get(&r.name)) {
                    Some(ImportBinding {
                        imported: Some(imported),
                        ..
                    }) => imported.clone(),
                    _ => r.name.clone(),
                }
            }
            TypeNode::Import(i) => i.qualifier.clone()?,
            _ => return None,
        };
        full.rsplit('.').next().map(str::to_string)
    }

    /// Expand a named type by one step.
    ///
    /// Aliases yield their (substituted) body, interfaces an object literal including inherited
    /// members, enums a union of their member literals and `typeof x` the declared type of `x`.
    /// Returns `None` for anything that cannot be expanded further: structural types, classes,
    /// and references into packages outside the session.
    pub fn expand(&mut self, node: &TypeNode) -> Option<TypeNode> {
        match node {
            TypeNode::Reference(r) => {
                let (module, decl) = self.lookup(r.module, &r.name, 0)?;
                self.expand_declaration(module, &r.name, decl, &r.args)
            }
            TypeNode::Import(i) => {
                let qualifier = i.qualifier.as_ref()?;
                let target = self.load_specifier(i.module, &i.specifier)?;
                let (module, decl) = self.lookup(target, qualifier, 0)?;
                self.expand_declaration(module, qualifier, decl, &i.args)
            }
            TypeNode::Query(q) => match self.lookup(q.module, &q.name, 0)? {
                (_, Declaration::Variable {
                    annotation: Some(annotation),
                    ..
                }) => Some(annotation),
                (module, Declaration::Variable {
                    constructed: Some(callee),
                    ..
                }) => {
                    let callee_ref = TypeNode::Reference(TypeRef {
                        name: callee,
                        args: Vec::new(),
                        module,
                    });
                    match self.canonical_name(&callee_ref).as_deref() {
                        Some("Hono") => Some(placeholder_app_type(module)),
                        _ => None,
                    }
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Expand a type repeatedly until it is structural or cannot be expanded.
    pub fn resolve(&mut self, node: &TypeNode) -> TypeNode {
        let mut current = node.clone();
        for _ in 0..MAX_RESOLVE_DEPTH {
            match self.expand(&current) {
                Some(next) => current = next,
                None => return current,
            }
        }
        warn!("Gave up resolving {} after {} steps", node, MAX_RESOLVE_DEPTH);
        current
    }

    fn expand_declaration(
        &mut self,
        module: ModuleId,
        name: &str,
        decl: Declaration,
        args: &[TypeNode],
    ) -> Option<TypeNode> {
        match decl {
            Declaration::Alias { params, ty } => Some(ty.substitute(&bind_params(&params, args))),
            Declaration::Interface {
                params,
                extends,
                body,
            } => {
                let key = format!("{}:{}", module, name);
                if self.resolving_stack.contains(&key) {
                    warn!("Circular interface inheritance detected for: {}", name);
                    return None;
                }
                self.resolving_stack.push(key);

                let bindings = bind_params(&params, args);
                let mut members: Vec<Member> = Vec::new();
                for parent in &extends {
                    if let TypeNode::Object(inherited) = self.resolve(&parent.substitute(&bindings))
                    {
                        members.extend(inherited.members);
                    }
                }
                for own in body.members {
                    members.retain(|m| m.name != own.name);
                    members.push(own);
                }

                self.resolving_stack.pop();
                let object = TypeNode::Object(ObjectType { members });
                Some(object.substitute(&bindings))
            }
            Declaration::Enum(values) => Some(TypeNode::Union(
                values.into_iter().map(TypeNode::Literal).collect(),
            )),
            Declaration::Class | Declaration::Variable { .. } => None,
        }
    }

    /// Find the declaration behind `name` as seen from `module`.
    fn lookup(&mut self, module: ModuleId, name: &str, hops: usize) -> Option<(ModuleId, Declaration)> {
        if hops > MAX_RESOLVE_DEPTH {
            warn!("Import chain too deep while looking up {}", name);
            return None;
        }

        if let Some((namespace, rest)) = name.split_once('.') {
            let binding = self.modules[module].imports.get(namespace)?.clone();
            if binding.imported.is_some() {
                return None;
            }
            let target = self.load_specifier(module, &binding.specifier)?;
            return self.lookup(target, rest, hops + 1);
        }

        let decls = &self.modules[module];
        if let Some(decl) = decls.declarations.get(name) {
            return Some((module, decl.clone()));
        }
        if let Some(local) = decls.export_renames.get(name).cloned() {
            if local != name {
                return self.lookup(module, &local, hops + 1);
            }
        }
        let binding = decls.imports.get(name)?.clone();
        let imported = binding.imported?;
        let target = self.load_specifier(module, &binding.specifier)?;
        self.lookup(target, &imported, hops + 1)
    }

    /// Resolve a module specifier relative to `from` and load it into the session.
    fn load_specifier(&mut self, from: ModuleId, specifier: &str) -> Option<ModuleId> {
        let path = self.resolve_specifier(from, specifier)?;
        match self.add_source_file(&path) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                None
            }
        }
    }

    fn resolve_specifier(&self, from: ModuleId, specifier: &str) -> Option<PathBuf> {
        let bases = if specifier.starts_with('.') {
            let dir = self.modules[from].path.parent().unwrap_or_else(|| Path::new("."));
            vec![dir.join(specifier)]
        } else {
            self.aliases.expand(specifier)
        };

        for base in bases {
            let text = base.to_string_lossy();
            let stem = text
                .strip_suffix(".js")
                .or_else(|| text.strip_suffix(".mjs"))
                .unwrap_or(&text);
            if (text.ends_with(".ts") || text.ends_with(".tsx")) && base.is_file() {
                return Some(base.clone());
            }
            for suffix in MODULE_SUFFIXES {
                let candidate = PathBuf::from(format!("{}{}", stem, suffix));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        debug!("Specifier {} is not a local module", specifier);
        None
    }
}

/// The type of `new Hono()` without chained route registrations.
fn placeholder_app_type(module: ModuleId) -> TypeNode {
    let reference = |name: &str| {
        TypeNode::Reference(TypeRef {
            name: name.to_string(),
            args: Vec::new(),
            module,
        })
    };
    TypeNode::Reference(TypeRef {
        name: "Hono".to_string(),
        args: vec![
            reference("BlankEnv"),
            reference("BlankSchema"),
            TypeNode::Literal(LiteralType::String("/".to_string())),
        ],
        module,
    })
}

fn bind_params(params: &[TypeParam], args: &[TypeNode]) -> HashMap<String, TypeNode> {
    params
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let ty = args
                .get(i)
                .cloned()
                .or_else(|| param.default.clone())
                .unwrap_or(TypeNode::Keyword(Keyword::Unknown));
            (param.name.clone(), ty)
        })
        .collect()
}

fn lower_module(program: &Program<'_>, file: &SourceFile, id: ModuleId) -> ModuleDecls {
    let lowerer = Lowerer::new(&file.text, id);
    let mut decls = ModuleDecls {
        path: file.path.clone(),
        ..ModuleDecls::default()
    };

    for stmt in &program.body {
        if let Some(decl) = stmt.as_declaration() {
            declare(&mut decls, &lowerer, decl, false);
            continue;
        }
        match stmt.as_module_declaration() {
            Some(ModuleDeclaration::ImportDeclaration(import)) => {
                let specifier = import.source.value.to_string();
                for spec in import.specifiers.iter().flatten() {
                    let (local, imported) = match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            (s.local.name.to_string(), Some(s.imported.name().to_string()))
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            (s.local.name.to_string(), Some("default".to_string()))
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            (s.local.name.to_string(), None)
                        }
                    };
                    decls.imports.insert(
                        local,
                        ImportBinding {
                            specifier: specifier.clone(),
                            imported,
                        },
                    );
                }
            }
            Some(ModuleDeclaration::ExportNamedDeclaration(export)) => {
                if let Some(decl) = &export.declaration {
                    declare(&mut decls, &lowerer, decl, true);
                }
                for spec in &export.specifiers {
                    let local = spec.local.name().to_string();
                    let exported = spec.exported.name().to_string();
                    if let Some(source) = &export.source {
                        decls.imports.insert(
                            exported.clone(),
                            ImportBinding {
                                specifier: source.value.to_string(),
                                imported: Some(local.clone()),
                            },
                        );
                    } else if local != exported {
                        decls.export_renames.insert(exported.clone(), local.clone());
                    }
                    if matches!(decls.declarations.get(&local), Some(Declaration::Alias { .. })) {
                        decls.exported_aliases.push(exported);
                    }
                }
            }
            _ => {}
        }
    }

    decls
}

fn declare(decls: &mut ModuleDecls, lowerer: &Lowerer<'_>, decl: &AstDeclaration<'_>, exported: bool) {
    match decl {
        AstDeclaration::TSTypeAliasDeclaration(alias) => {
            let name = alias.id.name.to_string();
            if exported {
                decls.exported_aliases.push(name.clone());
            }
            decls.declarations.insert(
                name,
                Declaration::Alias {
                    params: lower_type_params(lowerer, alias.type_parameters.as_deref()),
                    ty: lowerer.lower(&alias.type_annotation),
                },
            );
        }
        AstDeclaration::TSInterfaceDeclaration(interface) => {
            let name = interface.id.name.to_string();
            let extends = interface
                .extends
                .iter()
                .filter_map(|heritage| {
                    let name = expression_name(&heritage.expression)?;
                    let args = heritage
                        .type_arguments
                        .as_ref()
                        .map(|a| a.params.iter().map(|t| lowerer.lower(t)).collect())
                        .unwrap_or_default();
                    Some(lowerer.reference(name, args))
                })
                .collect::<Vec<_>>();
            let body = lowerer.lower_signatures(&interface.body.body);

            // Repeated interface declarations merge.
            match decls.declarations.get_mut(&name) {
                Some(Declaration::Interface {
                    extends: existing_extends,
                    body: existing_body,
                    ..
                }) => {
                    existing_extends.extend(extends);
                    existing_body.members.extend(body.members);
                }
                _ => {
                    decls.declarations.insert(
                        name,
                        Declaration::Interface {
                            params: lower_type_params(lowerer, interface.type_parameters.as_deref()),
                            extends,
                            body,
                        },
                    );
                }
            }
        }
        AstDeclaration::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                decls.declarations.insert(id.name.to_string(), Declaration::Class);
            }
        }
        AstDeclaration::TSEnumDeclaration(enum_decl) => {
            let mut next_index = 0.0;
            let values = enum_decl
                .body
                .members
                .iter()
                .map(|member| match &member.initializer {
                    Some(Expression::StringLiteral(s)) => LiteralType::String(s.value.to_string()),
                    Some(Expression::NumericLiteral(n)) => {
                        next_index = n.value + 1.0;
                        LiteralType::Number(n.value)
                    }
                    _ => {
                        let value = next_index;
                        next_index += 1.0;
                        LiteralType::Number(value)
                    }
                })
                .collect();
            decls
                .declarations
                .insert(enum_decl.id.name.to_string(), Declaration::Enum(values));
        }
        AstDeclaration::VariableDeclaration(var) => {
            for declarator in &var.declarations {
                let Some(name) = declarator.id.get_identifier_name() else {
                    continue;
                };
                let annotation = declarator
                    .type_annotation
                    .as_ref()
                    .map(|a| lowerer.lower(&a.type_annotation));
                let constructed = match declarator.init.as_ref().map(|e| e.get_inner_expression()) {
                    Some(Expression::NewExpression(new_expr)) => {
                        expression_name(&new_expr.callee)
                    }
                    _ => None,
                };
                decls.declarations.insert(
                    name.to_string(),
                    Declaration::Variable {
                        annotation,
                        constructed,
                    },
                );
            }
        }
        _ => {}
    }
}

fn lower_type_params(
    lowerer: &Lowerer<'_>,
    params: Option<&TSTypeParameterDeclaration<'_>>,
) -> Vec<TypeParam> {
    params
        .map(|declaration| {
            declaration
                .params
                .iter()
                .map(|param| TypeParam {
                    name: param.name.name.to_string(),
                    default: param.default.as_ref().map(|d| lowerer.lower(d)),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Dotted name of an identifier or static member chain (`a`, `ns.A`).
fn expression_name(expr: &Expression<'_>) -> Option<String> {
    match expr.get_inner_expression() {
        Expression::Identifier(ident) => Some(ident.name.to_string()),
        Expression::StaticMemberExpression(member) => {
            Some(format!("{}.{}", expression_name(&member.object)?, member.property.name))
        }
        _ => None,
    }
}
