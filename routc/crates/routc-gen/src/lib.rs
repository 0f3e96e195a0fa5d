//! routc-gen - WebAssembly text-format code generator.
//!
//! Consumes the optimized tree plus the analyzer's symbol view and emits
//! one self-contained WAT module as a string. The module imports the five
//! `env` print functions, exports one 64 KiB page of linear memory, and
//! exports `main` when the program declares it.
//!
//! Aggregates live in linear memory behind a compile-time bump allocator:
//! string literals are deduplicated at the bottom of memory, and every
//! array or record literal gets a fixed address above them. An array is a
//! header word holding the element count followed by its elements, one i32
//! word each, subscripted 1-based. A record is one i32 word per field in
//! declaration order. Nothing is ever freed.

pub mod error;
pub mod types;
mod wat;

#[cfg(test)]
mod edge_cases;

use indexmap::IndexMap;

use routc_par::ast::*;
use routc_sem::Symbols;
use routc_util::Symbol;

pub use error::{GenError, GenResult};

use types::{kind_of_type, synthesize_type, wat_f64, Kind};

/// Lowest address the aggregate bump allocator may hand out, matching the
/// reserved string area when the string table is small.
const MIN_HEAP_BASE: u32 = 256;

/// Storage description of one variable.
#[derive(Clone, Debug)]
pub(crate) struct VarInfo {
    pub kind: Kind,
    /// Structural type when the declaration (or its initializer shape)
    /// provides one. `Named` references inside are resolved lazily.
    pub ty: Option<TypeExpr>,
    /// Global arrays carry a `$name_size` twin global.
    pub size_twin: bool,
}

/// WAT code generator. One instance is reusable; all per-run state is
/// reset at the start of [`Generator::generate`].
pub struct Generator<'a> {
    pub(crate) symbols: &'a Symbols,

    /// Deduplicated string literals, offset of each, in first-seen order.
    strings: IndexMap<Symbol, u32>,
    /// Total string bytes including NUL terminators.
    string_bytes: u32,
    /// Compile-time bump counter for aggregate allocations.
    heap: u32,

    globals: IndexMap<Symbol, VarInfo>,
    /// Static storage assigned to aggregate globals declared without an
    /// initializer: name → (address, element count; 0 for records).
    static_arrays: IndexMap<Symbol, (u32, u32)>,

    // Per-function state.
    pub(crate) locals: IndexMap<Symbol, VarInfo>,
    pub(crate) local_types: IndexMap<Symbol, TypeExpr>,
    pub(crate) helper_locals: Vec<String>,
    pub(crate) label_count: u32,
    pub(crate) foreach_count: u32,
    pub(crate) ret_kind: Option<Kind>,
    pub(crate) ret_ty: Option<TypeExpr>,
    pub(crate) needs_fscratch: bool,
    pub(crate) code: String,
}

impl<'a> Generator<'a> {
    pub fn new(symbols: &'a Symbols) -> Self {
        Self {
            symbols,
            strings: IndexMap::new(),
            string_bytes: 0,
            heap: 0,
            globals: IndexMap::new(),
            static_arrays: IndexMap::new(),
            locals: IndexMap::new(),
            local_types: IndexMap::new(),
            helper_locals: Vec::new(),
            label_count: 0,
            foreach_count: 0,
            ret_kind: None,
            ret_ty: None,
            needs_fscratch: false,
            code: String::new(),
        }
    }

    /// Generates the complete module.
    pub fn generate(&mut self, program: &Program) -> GenResult<String> {
        self.reset();

        self.collect_strings(program);
        // Aggregates start above the string table: at least 256, and
        // 16-byte aligned so the table can outgrow the historical floor.
        self.heap = align16(self.string_bytes).max(MIN_HEAP_BASE);

        self.register_globals(program);

        let globals_section = self.emit_globals_section(program);
        let init_function = self.emit_init_function(program)?;

        let mut functions = String::new();
        let mut has_main = false;
        for decl in &program.decls {
            if let Decl::Routine(routine) = decl {
                functions.push_str(&self.emit_routine(routine)?);
                if routine.name.as_str() == "main" {
                    has_main = true;
                }
            }
        }

        let mut module = String::new();
        module.push_str("(module\n");
        module.push_str("  (import \"env\" \"printInt\" (func $printInt (param i32)))\n");
        module.push_str("  (import \"env\" \"printFloat\" (func $printFloat (param f64)))\n");
        module.push_str("  (import \"env\" \"printString\" (func $printString (param i32)))\n");
        module.push_str("  (import \"env\" \"printBool\" (func $printBool (param i32)))\n");
        module.push_str("  (import \"env\" \"printNewline\" (func $printNewline))\n");
        module.push_str("  (memory (export \"memory\") 1)\n");

        for (value, offset) in &self.strings {
            module.push_str(&format!(
                "  (data (i32.const {offset}) \"{}\\00\")\n",
                escape_wat_string(value.as_str())
            ));
        }

        module.push_str(&globals_section);

        if let Some(init) = &init_function {
            module.push_str(init);
        }
        module.push_str(&functions);

        if has_main {
            module.push_str("  (export \"main\" (func $main))\n");
        }
        if init_function.is_some() {
            module.push_str("  (start $__init)\n");
        }

        module.push(')');
        module.push('\n');
        Ok(module)
    }

    fn reset(&mut self) {
        self.strings.clear();
        self.string_bytes = 0;
        self.heap = 0;
        self.globals.clear();
        self.static_arrays.clear();
    }

    /// Reserves `bytes` of linear memory, returning the address.
    pub(crate) fn alloc(&mut self, bytes: u32) -> u32 {
        let addr = self.heap;
        self.heap += bytes;
        addr
    }

    // ------------------------------------------------------------------
    // String table
    // ------------------------------------------------------------------

    fn intern_string(&mut self, value: Symbol) -> u32 {
        if let Some(offset) = self.strings.get(&value) {
            return *offset;
        }
        let offset = self.string_bytes;
        self.strings.insert(value, offset);
        self.string_bytes += value.as_str().len() as u32 + 1;
        offset
    }

    pub(crate) fn string_offset(&self, value: Symbol) -> u32 {
        self.strings
            .get(&value)
            .copied()
            .expect("string literal collected before emission")
    }

    fn collect_strings(&mut self, program: &Program) {
        for decl in &program.decls {
            self.collect_strings_decl(decl);
        }
    }

    fn collect_strings_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(var) => {
                if let Some(init) = &var.init {
                    self.collect_strings_expr(init);
                }
            },
            Decl::Type(_) => {},
            Decl::Routine(routine) => match &routine.body {
                RoutineBody::Block(body) => self.collect_strings_body(body),
                RoutineBody::Expr(expr) => self.collect_strings_expr(expr),
            },
        }
    }

    fn collect_strings_body(&mut self, body: &Body) {
        for item in body {
            match item {
                BodyItem::Decl(decl) => self.collect_strings_decl(decl),
                BodyItem::Stmt(stmt) => self.collect_strings_stmt(stmt),
            }
        }
    }

    fn collect_strings_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(assign) => {
                for access in &assign.target.accesses {
                    if let Access::Index(index, _) = access {
                        self.collect_strings_expr(index);
                    }
                }
                self.collect_strings_expr(&assign.value);
            },
            Stmt::Call(call) => {
                for arg in &call.args {
                    self.collect_strings_expr(arg);
                }
            },
            Stmt::Print(print) => {
                for arg in &print.args {
                    self.collect_strings_expr(arg);
                }
            },
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.collect_strings_expr(value);
                }
            },
            Stmt::If(if_stmt) => {
                self.collect_strings_expr(&if_stmt.cond);
                self.collect_strings_body(&if_stmt.then_body);
                if let Some(else_body) = &if_stmt.else_body {
                    self.collect_strings_body(else_body);
                }
            },
            Stmt::While(while_stmt) => {
                self.collect_strings_expr(&while_stmt.cond);
                self.collect_strings_body(&while_stmt.body);
            },
            Stmt::For(for_stmt) => {
                match &for_stmt.source {
                    ForSource::Range { start, end } => {
                        self.collect_strings_expr(start);
                        self.collect_strings_expr(end);
                    },
                    ForSource::Each(source) => self.collect_strings_expr(source),
                }
                self.collect_strings_body(&for_stmt.body);
            },
        }
    }

    fn collect_strings_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Str(value, _) => {
                self.intern_string(*value);
            },
            Expr::Binary(binary) => {
                self.collect_strings_expr(&binary.left);
                self.collect_strings_expr(&binary.right);
            },
            Expr::Unary(unary) => self.collect_strings_expr(&unary.operand),
            Expr::Call(call) => {
                for arg in &call.args {
                    self.collect_strings_expr(arg);
                }
            },
            Expr::Place(place) => {
                for access in &place.accesses {
                    if let Access::Index(index, _) = access {
                        self.collect_strings_expr(index);
                    }
                }
            },
            Expr::ArrayLit(lit) => {
                for element in &lit.elements {
                    self.collect_strings_expr(element);
                }
            },
            Expr::RecordLit(lit) => {
                for (_, value) in &lit.fields {
                    self.collect_strings_expr(value);
                }
            },
            _ => {},
        }
    }

    // ------------------------------------------------------------------
    // Globals
    // ------------------------------------------------------------------

    fn register_globals(&mut self, program: &Program) {
        for decl in &program.decls {
            let Decl::Var(var) = decl else { continue };

            let structural = var
                .ty
                .as_ref()
                .map(|ty| self.resolve_ty(ty))
                .or_else(|| var.init.as_ref().and_then(synthesize_type));
            let kind = structural.as_ref().map(kind_of_type).unwrap_or(Kind::Int);
            let size_twin = matches!(structural, Some(TypeExpr::Array { .. }));

            // A sized array with no initializer gets fixed storage now so
            // its pointer global can be initialized with a constant.
            if var.init.is_none() {
                if let Some(TypeExpr::Array { size, .. }) = &structural {
                    if let Some(Expr::Int(n, _)) = size.as_deref() {
                        let n = (*n).max(0) as u32;
                        let addr = self.alloc(4 + 4 * n);
                        self.static_arrays.insert(var.name, (addr, n));
                    }
                } else if let Some(TypeExpr::Record { fields, .. }) = &structural {
                    let addr = self.alloc(4 * fields.len() as u32);
                    self.static_arrays.insert(var.name, (addr, 0));
                }
            }

            self.globals.insert(
                var.name,
                VarInfo {
                    kind,
                    ty: structural,
                    size_twin,
                },
            );
        }
    }

    fn emit_globals_section(&mut self, program: &Program) -> String {
        let mut out = String::new();

        for decl in &program.decls {
            let Decl::Var(var) = decl else { continue };
            let info = self.globals[&var.name].clone();

            match info.kind {
                Kind::Real => {
                    let value = match &var.init {
                        Some(Expr::Real(v, _)) => *v,
                        Some(Expr::Int(v, _)) => *v as f64,
                        _ => 0.0,
                    };
                    out.push_str(&format!(
                        "  (global ${} (mut f64) (f64.const {}))\n",
                        var.name,
                        wat_f64(value)
                    ));
                },
                _ => {
                    let value = match &var.init {
                        Some(Expr::Int(v, _)) => *v,
                        Some(Expr::Bool(v, _)) => *v as i32,
                        Some(Expr::Str(s, _)) => self.string_offset(*s) as i32,
                        _ => self
                            .static_arrays
                            .get(&var.name)
                            .map(|(addr, _)| *addr as i32)
                            .unwrap_or(0),
                    };
                    out.push_str(&format!(
                        "  (global ${} (mut i32) (i32.const {value}))\n",
                        var.name
                    ));
                },
            }

            if info.size_twin {
                let size = self
                    .static_arrays
                    .get(&var.name)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                out.push_str(&format!(
                    "  (global ${}_size (mut i32) (i32.const {size}))\n",
                    var.name
                ));
            }
        }

        out
    }

    /// Builds `$__init`, which stores static array headers and evaluates
    /// the non-literal global initializers before any export runs.
    fn emit_init_function(&mut self, program: &Program) -> GenResult<Option<String>> {
        self.begin_function(None);

        let mut body = String::new();

        for (name, (addr, n)) in self.static_arrays.clone() {
            let is_array = self
                .globals
                .get(&name)
                .map(|info| info.size_twin)
                .unwrap_or(false);
            if is_array {
                body.push_str(&format!(
                    "    i32.const {addr}\n    i32.const {n}\n    i32.store\n"
                ));
            }
        }

        for decl in &program.decls {
            let Decl::Var(var) = decl else { continue };
            let Some(init) = &var.init else { continue };
            if init.is_literal() {
                continue; // inlined into the global's init expression
            }

            let info = self.globals[&var.name].clone();
            self.code.clear();
            let value_kind = self.emit_expr(init, info.ty.as_ref())?;
            self.emit_convert(value_kind, info.kind);
            self.push(&format!("global.set ${}", var.name));

            if info.size_twin {
                match init {
                    Expr::ArrayLit(lit) => {
                        self.push(&format!("i32.const {}", lit.elements.len()));
                        self.push(&format!("global.set ${}_size", var.name));
                    },
                    Expr::Ident(other, _) => {
                        if self.globals.get(other).map(|o| o.size_twin) == Some(true) {
                            self.push(&format!("global.get ${other}_size"));
                            self.push(&format!("global.set ${}_size", var.name));
                        }
                    },
                    _ => {
                        // Unknown producer: read the element count from the
                        // array header the pointer now refers to.
                        self.push(&format!("global.get ${}", var.name));
                        self.push("i32.load");
                        self.push(&format!("global.set ${}_size", var.name));
                    },
                }
            }

            body.push_str(&self.code.clone());
        }

        if body.is_empty() {
            return Ok(None);
        }

        let mut out = String::from("  (func $__init\n");
        if self.needs_fscratch {
            out.push_str("    (local $ftmp0 f64)\n    (local $ftmp1 f64)\n");
        }
        out.push_str(&body);
        out.push_str("  )\n");
        Ok(Some(out))
    }

    /// Resolves `Named` references through local aliases and the published
    /// top-level aliases until a structural type remains.
    pub(crate) fn resolve_ty(&self, ty: &TypeExpr) -> TypeExpr {
        let mut current = ty;
        loop {
            match current {
                TypeExpr::Named(name, _) => {
                    if let Some(aliased) = self.local_types.get(name) {
                        current = aliased;
                    } else if let Some(aliased) = self.symbols.types.get(name) {
                        current = aliased;
                    } else {
                        return current.clone();
                    }
                },
                other => return other.clone(),
            }
        }
    }

    /// Storage info for a name: locals shadow globals.
    pub(crate) fn var_info(&self, name: Symbol) -> Option<(&VarInfo, bool)> {
        if let Some(info) = self.locals.get(&name) {
            return Some((info, false));
        }
        self.globals.get(&name).map(|info| (info, true))
    }
}

/// Convenience entry point.
pub fn generate(program: &Program, symbols: &Symbols) -> GenResult<String> {
    Generator::new(symbols).generate(program)
}

fn align16(bytes: u32) -> u32 {
    (bytes + 15) & !15
}

/// Escapes a string literal for a WAT data segment. Printable ASCII passes
/// through; everything else (and the quote/backslash) becomes `\xx` hex
/// bytes, so UTF-8 survives byte for byte.
fn escape_wat_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(byte as char),
            other => out.push_str(&format!("\\{other:02x}")),
        }
    }
    out
}
