//! The scoped symbol context.
//!
//! Three symbol spaces nest together: a stack of variable scopes, a stack
//! of type scopes, and one flat routine table (routines only exist at the
//! program's top level). The context also tracks which routine is being
//! analyzed and whether the walk is inside a loop body.

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use routc_par::ast::TypeExpr;
use routc_util::{Span, Symbol};

/// Insertion-ordered map with the fast rustc hasher. Declaration order is
/// semantic here: unused-variable warnings and codegen iterate these.
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// A declared variable.
#[derive(Clone, Debug)]
pub struct VarEntry {
    /// Declared type, if the declaration had an annotation.
    pub ty: Option<TypeExpr>,
    /// Declaration site, for unused-variable warnings.
    pub span: Span,
    /// Set on first lookup.
    pub used: bool,
}

/// A routine signature, as recorded in pass 1 and consumed by callers and
/// by the code generator.
#[derive(Clone, Debug)]
pub struct RoutineSig {
    pub name: Symbol,
    pub params: Vec<ParamSig>,
    pub ret: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ParamSig {
    pub name: Symbol,
    pub ty: TypeExpr,
    pub by_ref: bool,
}

/// The read-only view published to the code generator after analysis.
#[derive(Clone, Debug, Default)]
pub struct Symbols {
    /// Top-level type aliases in declaration order.
    pub types: IndexMap<Symbol, TypeExpr>,
    /// Routine signatures in declaration order.
    pub routines: IndexMap<Symbol, RoutineSig>,
}

impl Symbols {
    /// Follows `Named` aliases until a structural type is reached.
    ///
    /// Alias cycles are impossible: a `type` declaration can only refer to
    /// names declared before it.
    pub fn resolve<'a>(&'a self, ty: &'a TypeExpr) -> &'a TypeExpr {
        let mut current = ty;
        while let TypeExpr::Named(name, _) = current {
            match self.types.get(name) {
                Some(aliased) => current = aliased,
                None => return current,
            }
        }
        current
    }
}

/// Mutable symbol state threaded through analysis.
pub struct SymbolContext {
    var_scopes: Vec<FxIndexMap<Symbol, VarEntry>>,
    type_scopes: Vec<FxIndexMap<Symbol, TypeExpr>>,
    routines: IndexMap<Symbol, RoutineSig>,
    current_routine: Option<Symbol>,
    loop_depth: u32,
}

impl SymbolContext {
    pub fn new() -> Self {
        Self {
            var_scopes: vec![FxIndexMap::default()],
            type_scopes: vec![FxIndexMap::default()],
            routines: IndexMap::new(),
            current_routine: None,
            loop_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Declares a variable in the innermost scope. Returns the previous
    /// entry if the name is already taken in that scope.
    pub fn declare_var(&mut self, name: Symbol, entry: VarEntry) -> Option<VarEntry> {
        self.var_scopes
            .last_mut()
            .expect("scope stack is empty")
            .insert(name, entry)
    }

    /// Looks a variable up inside-out and marks it used.
    pub fn lookup_var(&mut self, name: Symbol) -> Option<&VarEntry> {
        for scope in self.var_scopes.iter_mut().rev() {
            if let Some(entry) = scope.get_mut(&name) {
                entry.used = true;
                return Some(entry);
            }
        }
        None
    }

    /// Declared type of a variable, without touching its used flag.
    pub fn var_type(&self, name: Symbol) -> Option<&TypeExpr> {
        for scope in self.var_scopes.iter().rev() {
            if let Some(entry) = scope.get(&name) {
                return entry.ty.as_ref();
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Declares a type alias in the innermost type scope.
    pub fn declare_type(&mut self, name: Symbol, ty: TypeExpr) -> Option<TypeExpr> {
        let scope = self.type_scopes.last_mut().expect("type scope stack is empty");
        scope.insert(name, ty)
    }

    /// Resolves a type name through the scope stack.
    pub fn lookup_type(&self, name: Symbol) -> Option<&TypeExpr> {
        self.type_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name))
    }

    /// Follows aliases through the current scope stack until a structural
    /// type is reached. Returns `None` for an undeclared name.
    pub fn resolve_type<'a>(&'a self, ty: &'a TypeExpr) -> Option<&'a TypeExpr> {
        let mut current = ty;
        loop {
            match current {
                TypeExpr::Named(name, _) => current = self.lookup_type(*name)?,
                other => return Some(other),
            }
        }
    }

    // ------------------------------------------------------------------
    // Routines
    // ------------------------------------------------------------------

    pub fn declare_routine(&mut self, sig: RoutineSig) -> Option<RoutineSig> {
        self.routines.insert(sig.name, sig)
    }

    pub fn lookup_routine(&self, name: Symbol) -> Option<&RoutineSig> {
        self.routines.get(&name)
    }

    // ------------------------------------------------------------------
    // Scope and marker management
    // ------------------------------------------------------------------

    /// Pushes a fresh variable scope (no type scope).
    pub fn push_var_scope(&mut self) {
        self.var_scopes.push(FxIndexMap::default());
    }

    /// Pops the innermost variable scope, returning its entries in
    /// declaration order so the caller can warn about unused names.
    pub fn pop_var_scope(&mut self) -> Vec<(Symbol, VarEntry)> {
        debug_assert!(self.var_scopes.len() > 1, "cannot pop the global scope");
        self.var_scopes
            .pop()
            .map(|scope| scope.into_iter().collect())
            .unwrap_or_default()
    }

    /// Pushes paired variable and type scopes for a routine.
    pub fn push_routine_scope(&mut self, routine: Symbol) {
        self.var_scopes.push(FxIndexMap::default());
        self.type_scopes.push(FxIndexMap::default());
        self.current_routine = Some(routine);
    }

    /// Pops a routine's scopes and clears the current-routine marker.
    pub fn pop_routine_scope(&mut self) -> Vec<(Symbol, VarEntry)> {
        let entries = self.pop_var_scope();
        self.type_scopes.pop();
        self.current_routine = None;
        entries
    }

    /// Entries of the global scope, for end-of-analysis warnings.
    pub fn global_entries(&self) -> Vec<(Symbol, VarEntry)> {
        self.var_scopes[0]
            .iter()
            .map(|(name, entry)| (*name, entry.clone()))
            .collect()
    }

    pub fn current_routine(&self) -> Option<Symbol> {
        self.current_routine
    }

    pub fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn exit_loop(&mut self) {
        debug_assert!(self.loop_depth > 0);
        self.loop_depth -= 1;
    }

    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    /// Current variable scope depth; 1 when only the global scope is open.
    pub fn depth(&self) -> usize {
        self.var_scopes.len()
    }

    /// Consumes the context into the published read-only view.
    pub fn into_symbols(self) -> Symbols {
        let types = self.type_scopes.into_iter().next().unwrap_or_default();
        Symbols {
            types: types.into_iter().collect(),
            routines: self.routines,
        }
    }
}

impl Default for SymbolContext {
    fn default() -> Self {
        Self::new()
    }
}
