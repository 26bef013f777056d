//! AST node types for the yu language.
//!
//! The tree is a closed set of sum types matched by the evaluator. Nodes are
//! immutable once parsed, except for the inline resolution caches carried by
//! call sites ([`CallCache`], [`ModuleCache`]). Those caches are write-once
//! cells and never take part in structural equality.
//!
//! Nested blocks that can be handed to a native function (block attachment)
//! are stored behind [`Arc`] so a worker thread can own them.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed program: the top-level block plus its function definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub block: CodeBlock,
}

impl Scope {
    /// Function definitions declared at the top level.
    pub fn functions(&self) -> &FunctionTable {
        &self.block.functions
    }
}

/// An ordered statement sequence with the functions declared directly in it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeBlock {
    pub stmts: Vec<Stmt>,
    pub functions: FunctionTable,
    pub span: Span,
}

/// Function definitions visible from a block, looked up by `(name, arity)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionTable {
    defs: Arc<Vec<Arc<FunctionDef>>>,
}

impl FunctionTable {
    pub fn new(defs: Vec<Arc<FunctionDef>>) -> Self {
        Self {
            defs: Arc::new(defs),
        }
    }

    /// Find a definition by exact name and parameter count.
    pub fn lookup(&self, name: &str, arity: usize) -> Option<&Arc<FunctionDef>> {
        self.defs
            .iter()
            .find(|def| def.name == name && def.params.len() == arity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionDef>> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `{ ... }`: a nested block, also the unit of block attachment.
    Block(Arc<CodeBlock>),
    Assign(Assignment),
    If(IfTree),
    While(WhileTree),
    For(ForTree),
    Break(Span),
    /// `endcode` aborts the rest of the evaluation on this context.
    EndCode(Span),
    Call(FunctionCall),
    ModuleCall(ModuleFunctionCall),
}

/// `tier name = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: VarRef,
    pub value: Expression,
    pub span: Span,
}

/// `if(cond) { ... } [else ...]`
///
/// An `else if` chain is an else block holding a single nested `IfTree`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfTree {
    pub condition: ConditionalExpression,
    pub body: CodeBlock,
    pub else_body: Option<CodeBlock>,
    pub span: Span,
}

/// `while(cond) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct WhileTree {
    pub condition: ConditionalExpression,
    pub body: CodeBlock,
    pub span: Span,
}

/// `for(dest; src) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForTree {
    pub dest: Term,
    pub src: Term,
    pub body: CodeBlock,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Variables
// ══════════════════════════════════════════════════════════════════════════════

/// Variable scope tier, selected by the `s` / `ss` / `sss` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Local,
    Session,
    Global,
}

impl Tier {
    pub fn prefix(self) -> &'static str {
        match self {
            Tier::Local => "s",
            Tier::Session => "ss",
            Tier::Global => "sss",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A variable reference: tier plus a bare (dot-free) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub tier: Tier,
    pub name: String,
}

impl VarRef {
    pub fn new(tier: Tier, name: impl Into<String>) -> Self {
        Self {
            tier,
            name: name.into(),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new(Tier::Local, name)
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tier, self.name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// Arithmetic operator between two terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        })
    }
}

/// `term (op term)*`, folded left to right without precedence.
///
/// `operators.len() == terms.len() - 1` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub terms: Vec<Term>,
    pub operators: Vec<ArithOp>,
    pub span: Span,
}

impl Expression {
    /// Single-term expression.
    pub fn single(term: Term) -> Self {
        let span = term.span;
        Self {
            terms: vec![term],
            operators: Vec::new(),
            span,
        }
    }

    /// The variable this expression names, if it is nothing but a plain
    /// variable reference. Out-parameters copy back only into these.
    pub fn as_bare_variable(&self) -> Option<&VarRef> {
        match self.terms.as_slice() {
            [Term {
                kind: TermKind::Var(var),
                invert: false,
                negate: false,
                ..
            }] => Some(var),
            _ => None,
        }
    }
}

/// A single operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub kind: TermKind,
    /// Leading `!`: flip the operand's truthiness.
    pub invert: bool,
    /// Leading `-` before a variable. Negative literals are folded into
    /// [`TermKind::Number`] instead.
    pub negate: bool,
    pub span: Span,
}

impl Term {
    pub fn new(kind: TermKind, span: Span) -> Self {
        Self {
            kind,
            invert: false,
            negate: false,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    Number(i64),
    Str(String),
    Bool(bool),
    Null,
    Var(VarRef),
    /// `( expr )`
    Group(Box<Expression>),
}

// ══════════════════════════════════════════════════════════════════════════════
// Conditions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    StartsWith,
    Contains,
    EndsWith,
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelOp::Eq => "==",
            RelOp::NotEq => "!=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::LtEq => "<=",
            RelOp::GtEq => ">=",
            RelOp::StartsWith => "?*",
            RelOp::Contains => "?",
            RelOp::EndsWith => "*?",
        })
    }
}

/// `expr relop expr`, or a lone `expr` checked against the string `"true"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Expression,
    pub comparison: Option<(RelOp, Expression)>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Conditions joined by `&&` / `||`, applied in written order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub conditions: Vec<Condition>,
    pub operators: Vec<BoolOp>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

/// `fn name(a, *b) ... end fn`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    /// Positions of `*`-marked parameters, ascending.
    pub out_params: Vec<usize>,
    pub body: CodeBlock,
    pub span: Span,
}

/// `name(args)`. Arguments are handed to the callee unevaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub cache: CallCache,
    pub span: Span,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<Expression>, span: Span) -> Self {
        Self {
            name: name.into(),
            args,
            cache: CallCache::default(),
            span,
        }
    }
}

/// `module.name(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleFunctionCall {
    pub module: String,
    pub call: FunctionCall,
    pub module_cache: ModuleCache,
}

// ══════════════════════════════════════════════════════════════════════════════
// Inline caches
// ══════════════════════════════════════════════════════════════════════════════

/// The first successful resolution of a call site.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A function nested in an enclosing block. Held weakly: the definition
    /// owns the call sites in its own body.
    Nested(Weak<FunctionDef>),
    /// A slot in a function registry, valid only for that registry
    /// generation.
    Registry { generation: u64, slot: usize },
}

/// Write-once resolved-function cache on a call site.
#[derive(Debug, Clone, Default)]
pub struct CallCache(OnceLock<Resolution>);

impl CallCache {
    pub fn get(&self) -> Option<&Resolution> {
        self.0.get()
    }

    /// Record a resolution. A cache that is already filled keeps its value.
    pub fn fill(&self, resolution: Resolution) {
        let _ = self.0.set(resolution);
    }
}

impl PartialEq for CallCache {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

/// A module id resolved under a given registry generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSlot {
    pub generation: u64,
    pub module: usize,
}

/// Write-once module-id cache on a module call site.
#[derive(Debug, Clone, Default)]
pub struct ModuleCache(OnceLock<ModuleSlot>);

impl ModuleCache {
    pub fn get(&self) -> Option<ModuleSlot> {
        self.0.get().copied()
    }

    pub fn fill(&self, slot: ModuleSlot) {
        let _ = self.0.set(slot);
    }
}

impl PartialEq for ModuleCache {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}
