//! Tree construction helpers
//!
//! `TreeBuilder` hands out fresh `NodeId`s so trees can be put together
//! in code, mostly in tests and tools that emit JSON for the checker.

use std::cell::Cell;

use crate::ast::*;

#[derive(Debug, Default)]
pub struct TreeBuilder {
    next: Cell<u32>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> NodeId {
        let id = self.next.get();
        self.next.set(id + 1);
        NodeId(id)
    }

    pub fn program(&self, statements: Vec<Statement>) -> Program {
        Program {
            id: self.next_id(),
            statements,
        }
    }

    pub fn ident(&self, name: &str) -> Identifier {
        Identifier {
            id: self.next_id(),
            name: name.to_string(),
        }
    }

    // ── Expressions ───────────────────────────────────────────────────

    pub fn expr(&self, kind: ExpressionKind) -> Expression {
        Expression {
            id: self.next_id(),
            kind,
        }
    }

    pub fn int(&self, value: i64) -> Expression {
        self.expr(ExpressionKind::Integer(value))
    }

    pub fn float(&self, value: f64) -> Expression {
        self.expr(ExpressionKind::Float(value))
    }

    pub fn string(&self, value: &str) -> Expression {
        self.expr(ExpressionKind::String(value.to_string()))
    }

    pub fn bytes(&self, value: &[u8]) -> Expression {
        self.expr(ExpressionKind::Bytes(value.to_vec()))
    }

    pub fn char(&self, value: char) -> Expression {
        self.expr(ExpressionKind::Char(value))
    }

    pub fn time(&self, micros: i64) -> Expression {
        self.expr(ExpressionKind::Time(micros))
    }

    pub fn var(&self, name: &str) -> Expression {
        self.expr(ExpressionKind::Identifier(name.to_string()))
    }

    pub fn paren(&self, inner: Expression) -> Expression {
        self.expr(ExpressionKind::Paren(Box::new(inner)))
    }

    pub fn or(&self, lhs: Expression, rhs: Vec<Expression>) -> Expression {
        self.expr(ExpressionKind::Disjunction {
            lhs: Box::new(lhs),
            rhs,
        })
    }

    pub fn and(&self, lhs: Expression, rhs: Vec<Expression>) -> Expression {
        self.expr(ExpressionKind::Conjunction {
            lhs: Box::new(lhs),
            rhs,
        })
    }

    pub fn cmp(&self, lhs: Expression, op: ComparisonOp, rhs: Expression) -> Expression {
        self.expr(ExpressionKind::Comparison {
            lhs: Box::new(lhs),
            rhs: Some((op, Box::new(rhs))),
        })
    }

    pub fn arith(&self, lhs: Expression, rest: Vec<(ArithmeticOp, Expression)>) -> Expression {
        self.expr(ExpressionKind::Arithmetic {
            lhs: Box::new(lhs),
            rest,
        })
    }

    pub fn binary(&self, lhs: Expression, op: ArithmeticOp, rhs: Expression) -> Expression {
        self.arith(lhs, vec![(op, rhs)])
    }

    pub fn add(&self, lhs: Expression, rhs: Expression) -> Expression {
        self.binary(lhs, ArithmeticOp::Add, rhs)
    }

    pub fn mul(&self, lhs: Expression, rhs: Expression) -> Expression {
        self.binary(lhs, ArithmeticOp::Mul, rhs)
    }

    pub fn unary(&self, operator: UnaryOp, operand: Expression) -> Expression {
        self.expr(ExpressionKind::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    pub fn factor(&self, operand: Expression, postfix: Vec<Postfix>) -> Expression {
        self.expr(ExpressionKind::Factor {
            operand: Box::new(operand),
            postfix,
        })
    }

    pub fn selector(&self, member: &str) -> Postfix {
        Postfix {
            id: self.next_id(),
            kind: PostfixKind::Selector(self.ident(member)),
        }
    }

    pub fn index_op(&self, start: Expression) -> Postfix {
        Postfix {
            id: self.next_id(),
            kind: PostfixKind::Index { start, end: None },
        }
    }

    pub fn slice_op(&self, start: Expression, end: Expression) -> Postfix {
        Postfix {
            id: self.next_id(),
            kind: PostfixKind::Index {
                start,
                end: Some(end),
            },
        }
    }

    pub fn call_op(&self, args: Vec<Expression>) -> Postfix {
        Postfix {
            id: self.next_id(),
            kind: PostfixKind::Call(args),
        }
    }

    /// `name(args...)`
    pub fn call(&self, name: &str, args: Vec<Expression>) -> Expression {
        let operand = self.var(name);
        let call = self.call_op(args);
        self.factor(operand, vec![call])
    }

    /// `operand.member`
    pub fn select(&self, operand: Expression, member: &str) -> Expression {
        let selector = self.selector(member);
        self.factor(operand, vec![selector])
    }

    /// `operand[index]`
    pub fn index(&self, operand: Expression, index: Expression) -> Expression {
        let op = self.index_op(index);
        self.factor(operand, vec![op])
    }

    /// `operand[start:end]`
    pub fn slice(&self, operand: Expression, start: Expression, end: Expression) -> Expression {
        let op = self.slice_op(start, end);
        self.factor(operand, vec![op])
    }

    pub fn empty_composite(&self) -> Expression {
        self.expr(ExpressionKind::Composite(Composite::Empty))
    }

    pub fn pairs(&self, pairs: Vec<(Expression, Expression)>) -> Expression {
        let pairs = pairs
            .into_iter()
            .map(|(key, value)| Pair {
                id: self.next_id(),
                key,
                value,
            })
            .collect();
        self.expr(ExpressionKind::Composite(Composite::Pairs(pairs)))
    }

    pub fn elements(&self, elements: Vec<Expression>) -> Expression {
        self.expr(ExpressionKind::Composite(Composite::Elements(elements)))
    }

    pub fn function(
        &self,
        params: Vec<Component>,
        return_type: Option<TypeExpr>,
        body: Vec<Statement>,
    ) -> Expression {
        let signature = FunctionTypeExpr {
            params,
            return_type: return_type.map(Box::new),
        };
        let body = self.block_node(body);
        self.expr(ExpressionKind::Function { signature, body })
    }

    pub fn visitor(&self, body: Vec<Statement>) -> Expression {
        let body = self.block_node(body);
        self.expr(ExpressionKind::Visitor { body })
    }

    // ── Types ─────────────────────────────────────────────────────────

    fn type_expr(&self, kind: TypeExprKind) -> TypeExpr {
        TypeExpr {
            id: self.next_id(),
            kind,
        }
    }

    pub fn ty(&self, name: &str) -> TypeExpr {
        self.type_expr(TypeExprKind::Named(name.to_string()))
    }

    pub fn array_of(&self, element: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Array(Box::new(element)))
    }

    pub fn map_of(&self, key: TypeExpr, value: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Map {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn stack_of(&self, element: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Stack(Box::new(element)))
    }

    pub fn tuple_of(&self, members: Vec<Component>) -> TypeExpr {
        self.type_expr(TypeExprKind::Tuple(members))
    }

    pub fn function_type(&self, params: Vec<Component>, return_type: Option<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Function(FunctionTypeExpr {
            params,
            return_type: return_type.map(Box::new),
        }))
    }

    pub fn visitor_type(&self) -> TypeExpr {
        self.type_expr(TypeExprKind::Visitor)
    }

    /// `output aggregator(arguments)[indices] of value weight weight`
    pub fn output(
        &self,
        aggregator: &str,
        arguments: Vec<Expression>,
        indices: Vec<TypeExpr>,
        value: TypeExpr,
        weight: Option<TypeExpr>,
    ) -> TypeExpr {
        let indices = indices.into_iter().map(|t| self.unnamed(t)).collect();
        let value = Box::new(self.unnamed(value));
        let weight = weight.map(|w| Box::new(self.unnamed(w)));
        self.type_expr(TypeExprKind::Output(OutputTypeExpr {
            aggregator: self.ident(aggregator),
            arguments,
            indices,
            value,
            weight,
        }))
    }

    pub fn named(&self, name: &str, type_expr: TypeExpr) -> Component {
        Component {
            id: self.next_id(),
            name: Some(self.ident(name)),
            type_expr,
        }
    }

    pub fn unnamed(&self, type_expr: TypeExpr) -> Component {
        Component {
            id: self.next_id(),
            name: None,
            type_expr,
        }
    }

    // ── Statements ────────────────────────────────────────────────────

    pub fn stmt(&self, kind: StatementKind) -> Statement {
        Statement {
            id: self.next_id(),
            kind,
        }
    }

    fn block_node(&self, statements: Vec<Statement>) -> Block {
        Block {
            id: self.next_id(),
            statements,
        }
    }

    pub fn decl(&self, name: &str, ty: Option<TypeExpr>, initializer: Option<Expression>) -> Statement {
        self.stmt(StatementKind::VarDecl {
            name: self.ident(name),
            type_annotation: ty,
            initializer,
        })
    }

    pub fn assign(&self, target: Expression, value: Expression) -> Statement {
        self.stmt(StatementKind::Assignment { target, value })
    }

    pub fn expr_stmt(&self, expr: Expression) -> Statement {
        self.stmt(StatementKind::Expression(expr))
    }

    pub fn block(&self, statements: Vec<Statement>) -> Statement {
        let block = self.block_node(statements);
        self.stmt(StatementKind::Block(block))
    }

    pub fn if_stmt(&self, condition: Expression, body: Statement, else_branch: Option<Statement>) -> Statement {
        self.stmt(StatementKind::If {
            condition,
            body: Box::new(body),
            else_branch: else_branch.map(Box::new),
        })
    }

    pub fn while_stmt(&self, condition: Expression, body: Statement) -> Statement {
        self.stmt(StatementKind::While {
            condition,
            body: Box::new(body),
        })
    }

    pub fn do_stmt(&self, body: Statement, condition: Expression) -> Statement {
        self.stmt(StatementKind::Do {
            condition,
            body: Box::new(body),
        })
    }

    pub fn for_stmt(
        &self,
        init: Option<Statement>,
        condition: Option<Expression>,
        update: Option<Statement>,
        body: Statement,
    ) -> Statement {
        self.stmt(StatementKind::For {
            init: init.map(Box::new),
            condition,
            update: update.map(Box::new),
            body: Box::new(body),
        })
    }

    pub fn foreach(&self, variable: Component, condition: Expression, body: Statement) -> Statement {
        self.stmt(StatementKind::Foreach {
            variable,
            condition,
            body: Box::new(body),
        })
    }

    pub fn exists(&self, variable: Component, condition: Expression, body: Statement) -> Statement {
        self.stmt(StatementKind::Exists {
            variable,
            condition,
            body: Box::new(body),
        })
    }

    pub fn ifall(&self, variable: Component, condition: Expression, body: Statement) -> Statement {
        self.stmt(StatementKind::IfAll {
            variable,
            condition,
            body: Box::new(body),
        })
    }

    pub fn case(&self, values: Vec<Expression>, statements: Vec<Statement>) -> SwitchCase {
        SwitchCase {
            id: self.next_id(),
            values,
            statements,
        }
    }

    pub fn switch(
        &self,
        scrutinee: Expression,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Statement>>,
    ) -> Statement {
        let default = default.map(|statements| self.case(Vec::new(), statements));
        self.stmt(StatementKind::Switch {
            scrutinee,
            cases,
            default,
        })
    }

    pub fn increment(&self, operand: Expression) -> Statement {
        self.stmt(StatementKind::Postfix {
            operand,
            operator: PostfixOp::Increment,
        })
    }

    pub fn decrement(&self, operand: Expression) -> Statement {
        self.stmt(StatementKind::Postfix {
            operand,
            operator: PostfixOp::Decrement,
        })
    }

    pub fn ret(&self, value: Option<Expression>) -> Statement {
        self.stmt(StatementKind::Return(value))
    }

    pub fn stop(&self) -> Statement {
        self.stmt(StatementKind::Stop)
    }

    pub fn brk(&self) -> Statement {
        self.stmt(StatementKind::Break)
    }

    pub fn cont(&self) -> Statement {
        self.stmt(StatementKind::Continue)
    }

    pub fn emit(
        &self,
        target: &str,
        indices: Vec<Expression>,
        value: Expression,
        weight: Option<Expression>,
    ) -> Statement {
        self.stmt(StatementKind::Emit {
            target: self.ident(target),
            indices,
            value,
            weight,
        })
    }

    pub fn visit(&self, phase: VisitPhase, target: VisitTarget, body: Vec<Statement>) -> Statement {
        let body = self.block_node(body);
        self.stmt(StatementKind::Visit {
            phase,
            target,
            body,
        })
    }

    /// `before name: ty -> body`
    pub fn before(&self, name: &str, ty: &str, body: Vec<Statement>) -> Statement {
        let target = VisitTarget::Component(self.named(name, self.ty(ty)));
        self.visit(VisitPhase::Before, target, body)
    }

    /// `after name: ty -> body`
    pub fn after(&self, name: &str, ty: &str, body: Vec<Statement>) -> Statement {
        let target = VisitTarget::Component(self.named(name, self.ty(ty)));
        self.visit(VisitPhase::After, target, body)
    }

    pub fn visit_types(&self, phase: VisitPhase, types: &[&str], body: Vec<Statement>) -> Statement {
        let target = VisitTarget::Types(types.iter().map(|t| self.ident(t)).collect());
        self.visit(phase, target, body)
    }
}
