//! Combined scope resolution and type checking
//!
//! A single depth-first traversal resolves identifiers against the scope
//! stack and computes the static type of every expression bottom-up. The
//! two concerns interleave because `:=`-style declarations take their type
//! from the initializer. Errors are accumulated in the diagnostics sink and
//! the offending expression is downgraded to `Unknown`; the pass never
//! aborts early, so one run reports every independent error.

use crate::ast::*;
use crate::common::{DiagnosticKind, Diagnostics, Span};
use crate::types::{RuleViolation, Type, binary_result, unary_result};

use super::scope::{ScopeKind, ScopeStack, SymbolKind};

/// Variadic builtins of the runtime; calls bypass arity and argument
/// checks unless the name is shadowed by a user declaration.
const BUILTINS: &[&str] = &["println", "print"];

/// Semantic analyzer for a single compilation unit.
///
/// Holds no state across invocations: create one, run
/// [`analyze_program`](Self::analyze_program), consume the diagnostics.
pub struct Analyzer {
    scopes: ScopeStack,
    diags: Diagnostics,
    current_result: Option<Type>,
    loop_depth: u32,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            diags: Diagnostics::new(),
            current_result: None,
            loop_depth: 0,
        }
    }

    /// Diagnostics collected so far, ordered by source position.
    pub fn into_diagnostics(self) -> Diagnostics {
        self.diags
    }

    /// Analyze a complete compilation unit.
    pub fn analyze_program(&mut self, program: &mut Program) {
        // First pass: register every top-level name, so function bodies may
        // reference globals and call functions declared later in the file.
        // Untyped globals hold the sentinel until the second pass types
        // their initializer.
        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Var(var) => self.collect_global_var(var),
                DeclKind::Func(func) => self.collect_func(func, decl.span),
            }
        }

        // Second pass: analyze bodies and initializers in source order.
        for decl in &mut program.decls {
            match &mut decl.kind {
                DeclKind::Var(var) => self.analyze_global_var(var),
                DeclKind::Func(func) => self.analyze_func(func),
            }
        }
    }

    fn collect_global_var(&mut self, var: &VarDecl) {
        let ty = var.declared_ty.clone().unwrap_or(Type::Unknown);
        if let Err(msg) = self.scopes.declare(&var.name, ty, SymbolKind::Variable) {
            self.diags
                .report(DiagnosticKind::DuplicateDeclaration, msg, var.span);
        }
    }

    fn collect_func(&mut self, func: &FuncDecl, span: Span) {
        let ty = Type::func(
            func.params.iter().map(|p| p.ty.clone()).collect(),
            func.result.clone(),
        );
        if let Err(msg) = self.scopes.declare(&func.name, ty, SymbolKind::Function) {
            self.diags
                .report(DiagnosticKind::DuplicateDeclaration, msg, span);
        }
    }

    /// Type the initializer of an already-registered global and settle the
    /// binding's type.
    fn analyze_global_var(&mut self, var: &mut VarDecl) {
        let Some(init) = var.init.as_mut() else {
            return;
        };
        let init_ty = self.analyze_expr(init);

        match &var.declared_ty {
            Some(declared) => {
                if init_ty.is_unknown() {
                    self.scopes.set_ty(&var.name, Type::Unknown);
                } else if *declared != init_ty {
                    self.diags.report(
                        DiagnosticKind::AssignmentTypeMismatch,
                        format!(
                            "cannot initialize '{}' of type {declared} with value of type {init_ty}",
                            var.name
                        ),
                        var.span,
                    );
                    self.scopes.set_ty(&var.name, Type::Unknown);
                }
            }
            None => self.scopes.set_ty(&var.name, init_ty),
        }
    }

    fn analyze_func(&mut self, func: &mut FuncDecl) {
        self.scopes.enter(ScopeKind::Function);

        for param in &func.params {
            if let Err(msg) =
                self.scopes
                    .declare(&param.name, param.ty.clone(), SymbolKind::Parameter)
            {
                self.diags
                    .report(DiagnosticKind::DuplicateDeclaration, msg, param.span);
            }
        }

        let previous = self.current_result.replace(func.result.clone());
        self.analyze_stmts(&mut func.body);
        self.current_result = previous;

        self.scopes.exit();
    }

    fn analyze_var_decl(&mut self, var: &mut VarDecl) {
        let init_ty = var.init.as_mut().map(|init| self.analyze_expr(init));

        let ty = match (&var.declared_ty, init_ty) {
            (Some(declared), Some(init_ty)) => {
                if init_ty.is_unknown() {
                    // The initializer already failed; bind the name to the
                    // sentinel so later uses stay quiet.
                    Type::Unknown
                } else if *declared != init_ty {
                    self.diags.report(
                        DiagnosticKind::AssignmentTypeMismatch,
                        format!(
                            "cannot initialize '{}' of type {declared} with value of type {init_ty}",
                            var.name
                        ),
                        var.span,
                    );
                    Type::Unknown
                } else {
                    declared.clone()
                }
            }
            (Some(declared), None) => declared.clone(),
            // `x := e` / `var x = e`: the initializer's type is the
            // variable's type, Unknown included.
            (None, Some(init_ty)) => init_ty,
            // Parser contract: at least one of type and initializer exists.
            (None, None) => Type::Unknown,
        };

        if let Err(msg) = self.scopes.declare(&var.name, ty, SymbolKind::Variable) {
            self.diags
                .report(DiagnosticKind::DuplicateDeclaration, msg, var.span);
        }
    }

    /// Analyze the statements of `block` in the current scope.
    fn analyze_stmts(&mut self, block: &mut Block) {
        for stmt in &mut block.stmts {
            self.analyze_stmt(stmt);
        }
    }

    /// Analyze `block` inside a fresh block scope.
    fn analyze_block(&mut self, block: &mut Block) {
        self.scopes.enter(ScopeKind::Block);
        self.analyze_stmts(block);
        self.scopes.exit();
    }

    fn analyze_stmt(&mut self, stmt: &mut Stmt) {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Var(var) => self.analyze_var_decl(var),
            StmtKind::Assign { target, op, value } => {
                let target_ty = self.analyze_expr(target);
                let value_ty = self.analyze_expr(value);

                // Compound assignment types as the binary op first.
                let incoming = match op {
                    Some(op) => match binary_result(*op, &target_ty, &value_ty) {
                        Ok(ty) => ty,
                        Err(violation) => {
                            self.report_rule(
                                violation,
                                format!(
                                    "invalid operation: {target_ty} {} {value_ty}",
                                    op.symbol()
                                ),
                                span,
                            );
                            Type::Unknown
                        }
                    },
                    None => value_ty,
                };

                if !target_ty.is_unknown() && !incoming.is_unknown() && incoming != target_ty {
                    self.diags.report(
                        DiagnosticKind::AssignmentTypeMismatch,
                        format!("cannot assign {incoming} to {target_ty}"),
                        span,
                    );
                }
            }
            StmtKind::Expr(expr) => {
                self.analyze_expr(expr);
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.check_condition(cond, "if");
                self.analyze_block(then_block);
                if let Some(else_block) = else_block {
                    self.analyze_block(else_block);
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                // The loop clauses live inside the loop's own scope.
                self.scopes.enter(ScopeKind::Block);
                if let Some(init) = init {
                    self.analyze_stmt(init);
                }
                if let Some(cond) = cond {
                    self.check_condition(cond, "for");
                }
                if let Some(post) = post {
                    self.analyze_stmt(post);
                }
                self.loop_depth += 1;
                self.analyze_block(body);
                self.loop_depth -= 1;
                self.scopes.exit();
            }
            StmtKind::Return(value) => {
                let expected = self.current_result.clone();
                match (value, expected) {
                    (Some(value), Some(expected)) => {
                        let ty = self.analyze_expr(value);
                        if !ty.is_unknown() && !expected.is_unknown() && ty != expected {
                            self.diags.report(
                                DiagnosticKind::TypeMismatch,
                                format!("cannot return {ty} from function returning {expected}"),
                                span,
                            );
                        }
                    }
                    (None, Some(expected)) => {
                        if expected != Type::Unit && !expected.is_unknown() {
                            self.diags.report(
                                DiagnosticKind::TypeMismatch,
                                format!("missing return value for function returning {expected}"),
                                span,
                            );
                        }
                    }
                    // Return outside a function is a parser-contract
                    // violation; type the value and move on.
                    (Some(value), None) => {
                        self.analyze_expr(value);
                    }
                    (None, None) => {}
                }
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.diags.report(
                        DiagnosticKind::MisplacedControlFlow,
                        "break outside of loop",
                        span,
                    );
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.diags.report(
                        DiagnosticKind::MisplacedControlFlow,
                        "continue outside of loop",
                        span,
                    );
                }
            }
            StmtKind::Block(block) => self.analyze_block(block),
        }
    }

    fn check_condition(&mut self, cond: &mut Expr, construct: &str) {
        let ty = self.analyze_expr(cond);
        if !matches!(ty, Type::Bool | Type::Unknown) {
            self.diags.report(
                DiagnosticKind::NonBooleanCondition,
                format!("{construct} condition must be bool, got {ty}"),
                cond.span,
            );
        }
    }

    /// Compute, attach and return the type of `expr`.
    fn analyze_expr(&mut self, expr: &mut Expr) -> Type {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::IntLit(_) => Type::Int,
            ExprKind::FloatLit(_) => Type::Float64,
            ExprKind::StringLit(_) => Type::String,
            ExprKind::BoolLit(_) => Type::Bool,
            ExprKind::Ident(name) => match self.scopes.lookup(name) {
                Some(sym) => sym.ty.clone(),
                None => {
                    self.diags.report(
                        DiagnosticKind::UndeclaredIdentifier,
                        format!("variable '{name}' was not declared"),
                        span,
                    );
                    Type::Unknown
                }
            },
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                let left_ty = self.analyze_expr(left);
                let right_ty = self.analyze_expr(right);
                match binary_result(op, &left_ty, &right_ty) {
                    Ok(ty) => ty,
                    Err(violation) => {
                        self.report_rule(
                            violation,
                            format!("invalid operation: {left_ty} {} {right_ty}", op.symbol()),
                            span,
                        );
                        Type::Unknown
                    }
                }
            }
            ExprKind::Unary { op, operand } => {
                let op = *op;
                let operand_ty = self.analyze_expr(operand);
                match unary_result(op, &operand_ty) {
                    Ok(ty) => ty,
                    Err(violation) => {
                        let msg = match op {
                            UnaryOp::Deref => {
                                format!("cannot dereference value of type {operand_ty}")
                            }
                            _ => format!(
                                "operator {} cannot be applied to {operand_ty}",
                                op.symbol()
                            ),
                        };
                        self.report_rule(violation, msg, span);
                        Type::Unknown
                    }
                }
            }
            ExprKind::Call { callee, args } => self.analyze_call(callee, args, span),
            ExprKind::Index { base, index } => {
                let base_ty = self.analyze_expr(base);
                let index_ty = self.analyze_expr(index);
                if !matches!(index_ty, Type::Int | Type::Unknown) {
                    self.diags.report(
                        DiagnosticKind::InvalidIndexType,
                        format!("array index must be int, got {index_ty}"),
                        index.span,
                    );
                }
                match base_ty {
                    Type::Array(elem) => *elem,
                    Type::Unknown => Type::Unknown,
                    other => {
                        self.diags.report(
                            DiagnosticKind::NotIndexable,
                            format!("cannot index value of type {other}"),
                            span,
                        );
                        Type::Unknown
                    }
                }
            }
            ExprKind::Conversion { target, operand } => {
                let target = target.clone();
                let operand_ty = self.analyze_expr(operand);
                if operand_ty.is_unknown()
                    || operand_ty == target
                    || (operand_ty.is_numeric() && target.is_numeric())
                {
                    target
                } else {
                    self.diags.report(
                        DiagnosticKind::TypeMismatch,
                        format!("cannot convert {operand_ty} to {target}"),
                        span,
                    );
                    Type::Unknown
                }
            }
        };

        expr.ty = Some(ty.clone());
        ty
    }

    fn analyze_call(&mut self, callee: &mut Expr, args: &mut [Expr], span: Span) -> Type {
        if let ExprKind::Ident(name) = &callee.kind {
            if BUILTINS.contains(&name.as_str()) && self.scopes.lookup(name).is_none() {
                callee.ty = Some(Type::Unknown);
                for arg in args.iter_mut() {
                    self.analyze_expr(arg);
                }
                return Type::Unit;
            }
        }

        let callee_ty = self.analyze_expr(callee);
        let arg_tys: Vec<Type> = args.iter_mut().map(|arg| self.analyze_expr(arg)).collect();

        match callee_ty {
            Type::Func { params, result } => {
                if arg_tys.len() != params.len() {
                    self.diags.report(
                        DiagnosticKind::ArgumentCountMismatch,
                        format!(
                            "call expects {} argument(s), got {}",
                            params.len(),
                            arg_tys.len()
                        ),
                        span,
                    );
                }
                for ((param, arg_ty), arg) in params.iter().zip(&arg_tys).zip(args.iter()) {
                    if !arg_ty.is_unknown() && arg_ty != param {
                        self.diags.report(
                            DiagnosticKind::ArgumentTypeMismatch,
                            format!("argument has type {arg_ty}, expected {param}"),
                            arg.span,
                        );
                    }
                }
                *result
            }
            Type::Unknown => Type::Unknown,
            other => {
                self.diags.report(
                    DiagnosticKind::InvalidOperandType,
                    format!("cannot call non-function value of type {other}"),
                    span,
                );
                Type::Unknown
            }
        }
    }

    fn report_rule(&mut self, violation: RuleViolation, message: String, span: Span) {
        let kind = match violation {
            RuleViolation::Mismatch => DiagnosticKind::TypeMismatch,
            RuleViolation::InvalidOperand => DiagnosticKind::InvalidOperandType,
        };
        self.diags.report(kind, message, span);
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
