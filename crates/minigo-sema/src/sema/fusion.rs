//! Multiply-add fusion legality
//!
//! The source language lets an implementation contract `x*y + z` into a
//! single fused multiply-add, eliding the product's intermediate rounding,
//! but only when the program never observes that rounding: an explicit
//! conversion such as `float64(x*y)` is an observable rounding boundary,
//! and a product that crosses one before reaching the addition must not be
//! fused.
//!
//! This pass runs after type checking (it reads the attached types) and
//! classifies every floating-point addition that consumes a product:
//! directly, through exactly one intervening simple assignment, or through
//! one dereference of an alias. The classification is purely syntactic
//! data flow: products copied further than one hop, or carried across
//! control-flow joins, are conservatively dropped rather than guessed at.
//! Type-correctness verdicts do not gate the pass; it answers its own
//! binary question per addition site.

use std::collections::HashMap;

use crate::ast::{BinaryOp, Block, DeclKind, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::common::Span;
use crate::types::Type;

/// Classification of one addition site consuming a float product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionSite {
    /// Span of the addition consuming the product.
    pub add_span: Span,
    /// Span of the multiplication feeding it.
    pub product_span: Span,
    /// Whether contracting multiply and add into one operation is legal.
    pub fusible: bool,
}

/// What a storage location currently holds.
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// A float product; `rounded` records whether it crossed an explicit
    /// conversion on the way in.
    Product { span: Span, rounded: bool },
    Other,
}

/// A trackable storage location: a named variable or a dereference of one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Loc {
    Var(String),
    Deref(String),
}

/// Classify every multiply-feeding-addition site in the program, in
/// traversal order.
pub fn classify(program: &Program) -> Vec<FusionSite> {
    let mut pass = FusionPass::default();
    for decl in &program.decls {
        match &decl.kind {
            // Top-level var initializers form one straight-line sequence.
            DeclKind::Var(var) => {
                if let Some(init) = &var.init {
                    pass.scan_expr(init);
                    let origin = pass.origin_of(init);
                    pass.state.insert(Loc::Var(var.name.clone()), origin);
                }
            }
            DeclKind::Func(func) => {
                pass.state.clear();
                pass.scan_stmts(&func.body);
                pass.state.clear();
            }
        }
    }
    pass.sites
}

#[derive(Default)]
struct FusionPass {
    state: HashMap<Loc, Origin>,
    sites: Vec<FusionSite>,
}

impl FusionPass {
    fn scan_stmts(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.scan_stmt(stmt);
        }
    }

    /// Scan a conditionally-executed body: reads inside it see the current
    /// state (on that path the tracked assignments did happen), but its own
    /// writes are not visible afterwards.
    fn scan_branch(&mut self, block: &Block) {
        let saved = self.state.clone();
        self.scan_stmts(block);
        self.state = saved;
    }

    fn scan_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Var(var) => {
                // A declaration without an initializer still shadows any
                // tracked outer binding of the same name.
                let origin = match &var.init {
                    Some(init) => {
                        self.scan_expr(init);
                        self.origin_of(init)
                    }
                    None => Origin::Other,
                };
                self.state.insert(Loc::Var(var.name.clone()), origin);
            }
            StmtKind::Assign {
                target,
                op: None,
                value,
            } => {
                // Target subtrees (index expressions in particular) can
                // contain additions of their own.
                self.scan_expr(target);
                self.scan_expr(value);
                let origin = self.origin_of(value);
                if let Some(loc) = loc_of(target) {
                    self.state.insert(loc, origin);
                }
            }
            StmtKind::Assign {
                target,
                op: Some(BinaryOp::Add),
                value,
            } => {
                // `r += v` is an addition consuming both `v` and the value
                // stored in `r`.
                self.scan_expr(target);
                self.scan_expr(value);
                if let Some((product_span, rounded)) = self.classify_operand(value) {
                    self.record(stmt.span, product_span, rounded);
                }
                if let Some(loc) = loc_of(target) {
                    if let Some(Origin::Product { span, rounded }) = self.state.get(&loc).copied() {
                        self.record(stmt.span, span, rounded);
                    }
                    self.state.insert(loc, Origin::Other);
                }
            }
            StmtKind::Assign {
                target,
                op: Some(_),
                value,
            } => {
                self.scan_expr(target);
                self.scan_expr(value);
                if let Some(loc) = loc_of(target) {
                    self.state.insert(loc, Origin::Other);
                }
            }
            StmtKind::Expr(expr) => self.scan_expr(expr),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.scan_expr(cond);
                self.scan_branch(then_block);
                if let Some(else_block) = else_block {
                    self.scan_branch(else_block);
                }
                // Either branch may have overwritten a tracked location.
                self.state.clear();
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                if let Some(init) = init {
                    self.scan_stmt(init);
                }
                if let Some(cond) = cond {
                    self.scan_expr(cond);
                }
                if let Some(post) = post {
                    self.scan_stmt(post);
                }
                self.scan_branch(body);
                self.state.clear();
            }
            StmtKind::Block(block) => {
                self.scan_branch(block);
                self.state.clear();
            }
            StmtKind::Return(Some(value)) => self.scan_expr(value),
            StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => {}
        }
    }

    /// Walk an expression, recording a site for every addition consuming a
    /// float product.
    fn scan_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Binary { op, left, right } => {
                self.scan_expr(left);
                self.scan_expr(right);
                if *op == BinaryOp::Add {
                    for operand in [left.as_ref(), right.as_ref()] {
                        if let Some((product_span, rounded)) = self.classify_operand(operand) {
                            self.record(expr.span, product_span, rounded);
                        }
                    }
                }
            }
            ExprKind::Unary { operand, .. } => self.scan_expr(operand),
            ExprKind::Conversion { operand, .. } => self.scan_expr(operand),
            ExprKind::Call { callee, args } => {
                self.scan_expr(callee);
                for arg in args {
                    self.scan_expr(arg);
                }
            }
            ExprKind::Index { base, index } => {
                self.scan_expr(base);
                self.scan_expr(index);
            }
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::Ident(_) => {}
        }
    }

    /// Does this addition operand carry a float product, and was that
    /// product explicitly rounded on the way here?
    fn classify_operand(&self, expr: &Expr) -> Option<(Span, bool)> {
        match &expr.kind {
            ExprKind::Binary {
                op: BinaryOp::Mul, ..
            } if is_float(expr) => Some((expr.span, false)),
            ExprKind::Conversion { operand, .. } => match &operand.kind {
                ExprKind::Binary {
                    op: BinaryOp::Mul, ..
                } if is_float(operand) => Some((operand.span, true)),
                // Conversion of a location that holds an unrounded product
                // is the same boundary one hop later.
                _ => self.tracked(operand).map(|(span, _)| (span, true)),
            },
            _ => self.tracked(expr),
        }
    }

    /// Product state of a named location or a dereferenced alias.
    fn tracked(&self, expr: &Expr) -> Option<(Span, bool)> {
        let loc = loc_of(expr)?;
        match self.state.get(&loc)? {
            Origin::Product { span, rounded } => Some((*span, *rounded)),
            Origin::Other => None,
        }
    }

    /// What storing `expr` leaves in a location.
    fn origin_of(&self, expr: &Expr) -> Origin {
        match &expr.kind {
            ExprKind::Binary {
                op: BinaryOp::Mul, ..
            } if is_float(expr) => Origin::Product {
                span: expr.span,
                rounded: false,
            },
            ExprKind::Conversion { operand, .. } => match &operand.kind {
                ExprKind::Binary {
                    op: BinaryOp::Mul, ..
                } if is_float(operand) => Origin::Product {
                    span: operand.span,
                    rounded: true,
                },
                _ => match self.tracked(operand) {
                    Some((span, _)) => Origin::Product {
                        span,
                        rounded: true,
                    },
                    None => Origin::Other,
                },
            },
            // Copying an already-stored product would be a second
            // intervening assignment; beyond one hop nothing is tracked.
            _ => Origin::Other,
        }
    }

    fn record(&mut self, add_span: Span, product_span: Span, rounded: bool) {
        self.sites.push(FusionSite {
            add_span,
            product_span,
            fusible: !rounded,
        });
    }
}

fn loc_of(expr: &Expr) -> Option<Loc> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(Loc::Var(name.clone())),
        ExprKind::Unary {
            op: UnaryOp::Deref,
            operand,
        } => match &operand.kind {
            ExprKind::Ident(name) => Some(Loc::Deref(name.clone())),
            _ => None,
        },
        _ => None,
    }
}

fn is_float(expr: &Expr) -> bool {
    expr.ty.as_ref().is_some_and(Type::is_float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, FuncDecl, Param, VarDecl};
    use crate::sema::{Analysis, analyze};
    use pretty_assertions::assert_eq;

    fn sp(at: usize) -> Span {
        Span::new(at, at + 1)
    }

    fn ident(name: &str, at: usize) -> Expr {
        Expr::new(ExprKind::Ident(name.to_string()), sp(at))
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.to(right.span);
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn conv_f64(operand: Expr) -> Expr {
        let span = operand.span;
        Expr::new(
            ExprKind::Conversion {
                target: Type::Float64,
                operand: Box::new(operand),
            },
            span,
        )
    }

    fn conv_int(operand: Expr) -> Expr {
        let span = operand.span;
        Expr::new(
            ExprKind::Conversion {
                target: Type::Int,
                operand: Box::new(operand),
            },
            span,
        )
    }

    fn index(base: Expr, idx: Expr) -> Expr {
        let span = base.span.to(idx.span);
        Expr::new(
            ExprKind::Index {
                base: Box::new(base),
                index: Box::new(idx),
            },
            span,
        )
    }

    fn deref(name: &str, at: usize) -> Expr {
        let operand = ident(name, at);
        let span = operand.span;
        Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand: Box::new(operand),
            },
            span,
        )
    }

    fn addr_of(name: &str, at: usize) -> Expr {
        let operand = ident(name, at);
        let span = operand.span;
        Expr::new(
            ExprKind::Unary {
                op: UnaryOp::AddrOf,
                operand: Box::new(operand),
            },
            span,
        )
    }

    fn assign(target: Expr, value: Expr) -> Stmt {
        let span = target.span.to(value.span);
        Stmt::new(
            StmtKind::Assign {
                target,
                op: None,
                value,
            },
            span,
        )
    }

    fn add_assign(target: Expr, value: Expr) -> Stmt {
        let span = target.span.to(value.span);
        Stmt::new(
            StmtKind::Assign {
                target,
                op: Some(BinaryOp::Add),
                value,
            },
            span,
        )
    }

    fn short_decl(name: &str, value: Expr, at: usize) -> Stmt {
        let span = sp(at).to(value.span);
        Stmt::new(
            StmtKind::Var(VarDecl {
                name: name.to_string(),
                declared_ty: None,
                init: Some(value),
                span,
            }),
            span,
        )
    }

    /// `func f(x, y, z, r, t float64, p *float64, a []float64) { <stmts> }`.
    /// Every test runs the full analysis so expression types are attached
    /// first.
    fn run(stmts: Vec<Stmt>) -> Analysis {
        let float_params = ["x", "y", "z", "r", "t"]
            .iter()
            .enumerate()
            .map(|(i, name)| Param {
                name: name.to_string(),
                ty: Type::Float64,
                span: sp(i),
            })
            .collect::<Vec<_>>();
        let mut params = float_params;
        params.push(Param {
            name: "p".to_string(),
            ty: Type::pointer(Type::Float64),
            span: sp(5),
        });
        params.push(Param {
            name: "a".to_string(),
            ty: Type::array(Type::Float64),
            span: sp(6),
        });

        let body_span = sp(10).to(sp(500));
        let mut program = Program::new(vec![Decl::new(
            DeclKind::Func(FuncDecl {
                name: "f".to_string(),
                params,
                result: Type::Unit,
                body: Block::new(stmts, body_span),
                span: body_span,
            }),
            body_span,
        )]);

        let analysis = analyze(&mut program);
        assert!(
            analysis.is_valid(),
            "fusion fixtures must be semantically valid: {:?}",
            analysis.diagnostics
        );
        analysis
    }

    fn mul_xy(at: usize) -> Expr {
        binary(BinaryOp::Mul, ident("x", at), ident("y", at + 2))
    }

    #[test]
    fn direct_product_is_fusible() {
        // r = x*y + z
        let product = mul_xy(20);
        let product_span = product.span;
        let sum = binary(BinaryOp::Add, product, ident("z", 26));
        let add_span = sum.span;
        let analysis = run(vec![assign(ident("r", 16), sum)]);

        assert_eq!(
            analysis.fusion,
            vec![FusionSite {
                add_span,
                product_span,
                fusible: true
            }]
        );
    }

    #[test]
    fn converted_product_is_not_fusible() {
        // r = float64(x*y) + z
        let product = mul_xy(20);
        let product_span = product.span;
        let sum = binary(BinaryOp::Add, conv_f64(product), ident("z", 30));
        let analysis = run(vec![assign(ident("r", 16), sum)]);

        assert_eq!(analysis.fusion.len(), 1);
        let site = analysis.fusion[0];
        assert_eq!(site.product_span, product_span);
        assert!(!site.fusible);
    }

    #[test]
    fn conversion_of_the_addend_does_not_block_fusion() {
        // r = x*y + float64(z)
        let product = mul_xy(20);
        let sum = binary(BinaryOp::Add, product, conv_f64(ident("z", 34)));
        let analysis = run(vec![assign(ident("r", 16), sum)]);

        assert_eq!(analysis.fusion.len(), 1);
        assert!(analysis.fusion[0].fusible);
    }

    #[test]
    fn product_through_one_assignment_is_fusible() {
        // t = x*y; r = t + z
        let product = mul_xy(20);
        let product_span = product.span;
        let analysis = run(vec![
            assign(ident("t", 16), product),
            assign(
                ident("r", 30),
                binary(BinaryOp::Add, ident("t", 34), ident("z", 38)),
            ),
        ]);

        assert_eq!(analysis.fusion.len(), 1);
        let site = analysis.fusion[0];
        assert_eq!(site.product_span, product_span);
        assert!(site.fusible);
    }

    #[test]
    fn rounded_product_through_one_assignment_is_not_fusible() {
        // t = float64(x*y); r = t + z
        let analysis = run(vec![
            assign(ident("t", 16), conv_f64(mul_xy(28))),
            assign(
                ident("r", 40),
                binary(BinaryOp::Add, ident("t", 44), ident("z", 48)),
            ),
        ]);

        assert_eq!(analysis.fusion.len(), 1);
        assert!(!analysis.fusion[0].fusible);
    }

    #[test]
    fn product_through_pointer_alias_is_fusible() {
        // p = &t; *p = x*y; r = *p + z
        let analysis = run(vec![
            assign(ident("p", 12), addr_of("t", 16)),
            assign(deref("p", 20), mul_xy(26)),
            assign(
                ident("r", 40),
                binary(BinaryOp::Add, deref("p", 44), ident("z", 50)),
            ),
        ]);

        assert_eq!(analysis.fusion.len(), 1);
        assert!(analysis.fusion[0].fusible);
    }

    #[test]
    fn rounded_product_through_pointer_alias_is_not_fusible() {
        // *p = float64(x*y); r = *p + z
        let analysis = run(vec![
            assign(deref("p", 20), conv_f64(mul_xy(30))),
            assign(
                ident("r", 44),
                binary(BinaryOp::Add, deref("p", 48), ident("z", 54)),
            ),
        ]);

        assert_eq!(analysis.fusion.len(), 1);
        assert!(!analysis.fusion[0].fusible);
    }

    #[test]
    fn compound_assignment_consumes_the_product() {
        // r = z; r += x*y
        let product = mul_xy(28);
        let product_span = product.span;
        let analysis = run(vec![
            assign(ident("r", 16), ident("z", 20)),
            add_assign(ident("r", 24), product),
        ]);

        assert_eq!(analysis.fusion.len(), 1);
        let site = analysis.fusion[0];
        assert_eq!(site.product_span, product_span);
        assert!(site.fusible);
    }

    #[test]
    fn compound_assignment_of_converted_product_is_not_fusible() {
        // r = z; r += float64(x*y)
        let analysis = run(vec![
            assign(ident("r", 16), ident("z", 20)),
            add_assign(ident("r", 24), conv_f64(mul_xy(34))),
        ]);

        assert_eq!(analysis.fusion.len(), 1);
        assert!(!analysis.fusion[0].fusible);
    }

    #[test]
    fn additions_inside_assignment_targets_are_classified() {
        // a[int(x*y + z)] = x
        let product = mul_xy(20);
        let product_span = product.span;
        let sum = binary(BinaryOp::Add, product, ident("z", 26));
        let add_span = sum.span;
        let target = index(ident("a", 16), conv_int(sum));
        let analysis = run(vec![assign(target, ident("x", 40))]);

        assert_eq!(
            analysis.fusion,
            vec![FusionSite {
                add_span,
                product_span,
                fusible: true
            }]
        );
    }

    #[test]
    fn second_hand_copies_are_not_tracked() {
        // t = x*y; u := t; r = u + z (two intervening assignments)
        let analysis = run(vec![
            assign(ident("t", 16), mul_xy(20)),
            short_decl("u", ident("t", 30), 28),
            assign(
                ident("r", 40),
                binary(BinaryOp::Add, ident("u", 44), ident("z", 48)),
            ),
        ]);

        assert_eq!(analysis.fusion, vec![]);
    }

    #[test]
    fn overwritten_location_stops_tracking() {
        // t = x*y; t = z; r = t + z
        let analysis = run(vec![
            assign(ident("t", 16), mul_xy(20)),
            assign(ident("t", 28), ident("z", 32)),
            assign(
                ident("r", 40),
                binary(BinaryOp::Add, ident("t", 44), ident("z", 48)),
            ),
        ]);

        assert_eq!(analysis.fusion, vec![]);
    }

    #[test]
    fn integer_products_are_ignored() {
        // i := 1; j := 2; k := i*j + i is integer arithmetic, no FMA
        let analysis = run(vec![
            short_decl("i", Expr::new(ExprKind::IntLit(1), sp(20)), 16),
            short_decl("j", Expr::new(ExprKind::IntLit(2), sp(30)), 26),
            short_decl(
                "k",
                binary(
                    BinaryOp::Add,
                    binary(BinaryOp::Mul, ident("i", 40), ident("j", 44)),
                    ident("i", 48),
                ),
                36,
            ),
        ]);

        assert_eq!(analysis.fusion, vec![]);
    }
}
