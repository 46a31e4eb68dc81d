//! Type checker for Boa
//!
//! A single depth-first pass over a program. Every node visited gets a
//! scope snapshot and, where it has one, a resolved type. The pass stops
//! at the first violation and returns it.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::ast::*;
use crate::env::{Environment, ScopeId, VisitContext};
use crate::error::{CheckError, Result};
use crate::resolve::{find_function, is_function_declaration};
use crate::types::{TableType, Type};

/// What the pass attaches to a tree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotations {
    pub types: BTreeMap<NodeId, Type>,
    pub scopes: BTreeMap<NodeId, ScopeId>,
}

impl Annotations {
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scopes.get(&node).copied()
    }
}

/// Check `program` in the root scope of `env`.
///
/// Declarations made by the program stay in `env` afterwards, so the
/// scope ids in the returned annotations can be looked up there.
pub fn check_program(program: &Program, env: &mut Environment) -> Result<Annotations> {
    let mut checker = Checker::new(env);
    let root = checker.env.root();
    checker.scopes_only(program.id, root);
    for statement in &program.statements {
        checker.statement(statement, root)?;
    }
    Ok(checker.annotations)
}

struct Checker<'env> {
    env: &'env mut Environment,
    annotations: Annotations,
}

fn incompatible(node: NodeId, message: String) -> CheckError {
    CheckError::IncompatibleTypes { node, message }
}

impl<'env> Checker<'env> {
    fn new(env: &'env mut Environment) -> Self {
        Checker {
            env,
            annotations: Annotations::default(),
        }
    }

    fn annotate(&mut self, node: NodeId, scope: ScopeId, ty: Type) -> Type {
        self.annotations.scopes.insert(node, scope);
        self.annotations.types.insert(node, ty.clone());
        ty
    }

    fn scopes_only(&mut self, node: NodeId, scope: ScopeId) {
        self.annotations.scopes.insert(node, scope);
    }

    // ── Statements ────────────────────────────────────────────────────

    fn block(&mut self, block: &Block, scope: ScopeId) -> Result<()> {
        let inner = self.env.child(scope);
        self.scopes_only(block.id, inner);
        for statement in &block.statements {
            self.statement(statement, inner)?;
        }
        Ok(())
    }

    fn statement(&mut self, stmt: &Statement, scope: ScopeId) -> Result<()> {
        match &stmt.kind {
            StatementKind::Block(block) => {
                self.scopes_only(stmt.id, scope);
                self.block(block, scope)
            }

            StatementKind::Assignment { target, value } => {
                let lhs = self.expression(target, scope)?;
                let rhs = self.expression(value, scope)?;

                let unpacking = matches!(lhs.unnamed(), Type::Array(_))
                    && matches!(rhs.unnamed(), Type::Tuple(_));
                if !unpacking && !lhs.assigns(&rhs) {
                    return Err(incompatible(
                        value.id,
                        format!(
                            "incompatible types for assignment: required '{}', found '{}'",
                            lhs, rhs
                        ),
                    ));
                }
                self.annotate(stmt.id, scope, lhs);
                Ok(())
            }

            StatementKind::Break | StatementKind::Continue => {
                self.scopes_only(stmt.id, scope);
                Ok(())
            }

            StatementKind::Do { condition, body } | StatementKind::While { condition, body } => {
                let inner = self.env.child(scope);
                self.scopes_only(stmt.id, inner);
                self.expression(condition, inner)?;
                self.statement(body, inner)
            }

            StatementKind::Emit {
                target,
                indices,
                value,
                weight,
            } => self.emit(stmt, target, indices, value, weight.as_ref(), scope),

            StatementKind::Exists {
                variable,
                condition,
                body,
            } => self.quantifier("exists", stmt.id, variable, condition, body, scope),

            StatementKind::Foreach {
                variable,
                condition,
                body,
            } => self.quantifier("foreach", stmt.id, variable, condition, body, scope),

            StatementKind::IfAll {
                variable,
                condition,
                body,
            } => self.quantifier("ifall", stmt.id, variable, condition, body, scope),

            StatementKind::Expression(expr) => {
                let ty = self.expression(expr, scope)?;
                self.annotate(stmt.id, scope, ty);
                Ok(())
            }

            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let inner = self.env.child(scope);
                self.scopes_only(stmt.id, inner);
                if let Some(init) = init {
                    self.statement(init, inner)?;
                }
                if let Some(condition) = condition {
                    self.expression(condition, inner)?;
                }
                if let Some(update) = update {
                    self.statement(update, inner)?;
                }
                self.statement(body, inner)
            }

            StatementKind::If {
                condition,
                body,
                else_branch,
            } => {
                self.scopes_only(stmt.id, scope);
                let ty = self.expression(condition, scope)?;
                if !ty.is_bool() && !(ty.is_function() && ty.value_type().is_bool()) {
                    return Err(incompatible(
                        condition.id,
                        format!(
                            "incompatible types for if condition: required 'boolean', found '{}'",
                            ty
                        ),
                    ));
                }

                let then_scope = self.env.child(scope);
                self.statement(body, then_scope)?;
                if let Some(else_branch) = else_branch {
                    let else_scope = self.env.child(scope);
                    self.statement(else_branch, else_scope)?;
                }
                Ok(())
            }

            StatementKind::Postfix { operand, operator } => {
                let ty = self.expression(operand, scope)?;
                if !ty.is_int() {
                    let symbol = match operator {
                        PostfixOp::Increment => "++",
                        PostfixOp::Decrement => "--",
                    };
                    return Err(incompatible(
                        operand.id,
                        format!(
                            "incompatible types for operator '{}': required 'int', found '{}'",
                            symbol, ty
                        ),
                    ));
                }
                self.annotate(stmt.id, scope, ty);
                Ok(())
            }

            StatementKind::Return(value) => self.return_statement(stmt, value.as_ref(), scope),

            StatementKind::Stop => {
                if !self.env.is_before_visitor(scope) {
                    return Err(CheckError::IllegalContext {
                        node: stmt.id,
                        message: "stop statement only allowed inside 'before' visits".to_string(),
                    });
                }
                self.scopes_only(stmt.id, scope);
                Ok(())
            }

            StatementKind::Switch {
                scrutinee,
                cases,
                default,
            } => self.switch(stmt.id, scrutinee, cases, default.as_ref(), scope),

            StatementKind::VarDecl {
                name,
                type_annotation,
                initializer,
            } => self.declaration(stmt, name, type_annotation.as_ref(), initializer.as_ref(), scope),

            StatementKind::Visit {
                phase,
                target,
                body,
            } => self.visit(stmt.id, *phase, target, body, scope),
        }
    }

    fn quantifier(
        &mut self,
        keyword: &str,
        node: NodeId,
        variable: &Component,
        condition: &Expression,
        body: &Statement,
        scope: ScopeId,
    ) -> Result<()> {
        let inner = self.env.child(scope);
        self.scopes_only(node, inner);
        self.component(variable, inner, true)?;

        let ty = self.expression(condition, inner)?;
        if !ty.is_bool() {
            return Err(incompatible(
                condition.id,
                format!(
                    "incompatible types for {} condition: required 'boolean', found '{}'",
                    keyword, ty
                ),
            ));
        }
        self.statement(body, inner)
    }

    fn return_statement(
        &mut self,
        stmt: &Statement,
        value: Option<&Expression>,
        scope: ScopeId,
    ) -> Result<()> {
        if self.env.visit_context(scope) != VisitContext::Outside {
            return Err(CheckError::IllegalContext {
                node: stmt.id,
                message: "return statement not allowed inside visitors".to_string(),
            });
        }

        let ty = match value {
            Some(expr) => self.expression(expr, scope)?,
            None => Type::Any,
        };

        if let Some(expected) = self.env.return_type(scope).cloned() {
            if expected != Type::Any {
                match value {
                    None => {
                        return Err(incompatible(
                            stmt.id,
                            format!("missing return value: required '{}'", expected),
                        ))
                    }
                    Some(expr) if !expected.assigns(&ty) => {
                        return Err(incompatible(
                            expr.id,
                            format!(
                                "incompatible types for return: required '{}', found '{}'",
                                expected, ty
                            ),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        self.annotate(stmt.id, scope, ty);
        Ok(())
    }

    fn switch(
        &mut self,
        node: NodeId,
        scrutinee: &Expression,
        cases: &[SwitchCase],
        default: Option<&SwitchCase>,
        scope: ScopeId,
    ) -> Result<()> {
        let inner = self.env.child(scope);
        self.scopes_only(node, inner);

        let ty = self.expression(scrutinee, inner)?;
        if !matches!(ty.unnamed(), Type::Int | Type::Enum(_)) {
            return Err(CheckError::InvalidSwitch {
                node: scrutinee.id,
                message: format!(
                    "incompatible types for switch expression: required 'int' or 'enum', found '{}'",
                    ty
                ),
            });
        }

        for case in cases {
            self.scopes_only(case.id, inner);
            for value in &case.values {
                let case_ty = self.expression(value, inner)?;
                if !ty.assigns(&case_ty) {
                    return Err(CheckError::InvalidSwitch {
                        node: value.id,
                        message: format!(
                            "incompatible types for case expression: required '{}', found '{}'",
                            ty, case_ty
                        ),
                    });
                }
            }
            for statement in &case.statements {
                self.statement(statement, inner)?;
            }
        }

        if let Some(default) = default {
            self.scopes_only(default.id, inner);
            for statement in &default.statements {
                self.statement(statement, inner)?;
            }
        }
        Ok(())
    }

    fn declaration(
        &mut self,
        stmt: &Statement,
        name: &Identifier,
        annotation: Option<&TypeExpr>,
        initializer: Option<&Expression>,
        scope: ScopeId,
    ) -> Result<()> {
        let id = name.name.as_str();

        if self.env.has_global(id) {
            return Err(CheckError::NameConflict {
                node: name.id,
                message: format!("name conflict: constant '{}' already exists", id),
            });
        }
        if let Some(existing) = self.env.local_in(scope, id) {
            return Err(CheckError::NameConflict {
                node: name.id,
                message: format!("variable '{}' already declared as '{}'", id, existing),
            });
        }

        let mut rhs = None;
        if let Some(init) = initializer {
            let mut ty = self.expression(init, scope)?;
            // a call yields its return type; only a literal binds a function
            if ty.is_function() && !is_function_declaration(init) {
                ty = ty.value_type().clone();
            }
            rhs = Some(ty);
        }

        let lhs = match annotation {
            Some(type_expr) => {
                let lhs = self.type_expr(type_expr, scope)?;

                // a tuple initializer for an array keeps only its first member
                let peeled = match (lhs.unnamed(), rhs.as_ref().map(|t| t.unnamed())) {
                    (Type::Array(_), Some(Type::Tuple(members))) => {
                        members.first().map(|m| Type::array(m.unnamed().clone()))
                    }
                    _ => None,
                };
                if peeled.is_some() {
                    rhs = peeled;
                }

                if let (Some(rhs), Some(init)) = (&rhs, initializer) {
                    if !lhs.assigns(rhs) && !self.env.has_cast(rhs, &lhs) {
                        return Err(incompatible(
                            init.id,
                            format!("incorrect type '{}' for assignment to '{}: {}'", rhs, id, lhs),
                        ));
                    }
                }
                lhs
            }
            None => match rhs {
                Some(rhs) => rhs,
                None => {
                    return Err(CheckError::MalformedTree {
                        node: stmt.id,
                        message: format!(
                            "declaration of '{}' has neither a type nor an initializer",
                            id
                        ),
                    })
                }
            },
        };

        if lhs.is_function()
            && (self.env.has_function(id) || self.env.has_local_function(scope, id))
        {
            return Err(CheckError::NameConflict {
                node: name.id,
                message: format!("name conflict: a function '{}' already exists", id),
            });
        }

        self.env.define(scope, id, lhs.clone());
        self.annotate(name.id, scope, lhs.clone());
        self.annotate(stmt.id, scope, lhs);
        Ok(())
    }

    fn emit(
        &mut self,
        stmt: &Statement,
        target: &Identifier,
        indices: &[Expression],
        value: &Expression,
        weight: Option<&Expression>,
        scope: ScopeId,
    ) -> Result<()> {
        self.scopes_only(stmt.id, scope);
        let id = target.name.as_str();

        let ty = match self.env.lookup(scope, id) {
            Some(ty) => ty.clone(),
            None => {
                return Err(CheckError::UnknownIdentifier {
                    node: target.id,
                    message: format!("emitting to undeclared output variable '{}'", id),
                })
            }
        };
        let table = match ty.unnamed() {
            Type::Table(table) => table.as_ref().clone(),
            _ => {
                return Err(CheckError::TableContract {
                    node: target.id,
                    message: format!("emitting to non-output variable '{}'", id),
                })
            }
        };
        self.annotate(target.id, scope, ty);

        if indices.len() != table.index_count() {
            return Err(CheckError::TableContract {
                node: target.id,
                message: format!(
                    "output variable '{}': incorrect number of indices for '{}': required {}, found {}",
                    id,
                    id,
                    table.index_count(),
                    indices.len()
                ),
            });
        }

        for (i, (index, expected)) in indices.iter().zip(&table.indices).enumerate() {
            let found = self.expression(index, scope)?;
            if !expected.assigns(&found) {
                return Err(CheckError::TableContract {
                    node: index.id,
                    message: format!(
                        "output variable '{}': incompatible types for index '{}': required '{}', found '{}'",
                        id, i, expected, found
                    ),
                });
            }
        }

        let found = self.expression(value, scope)?;
        if !table.accepts(&found) {
            return Err(CheckError::TableContract {
                node: value.id,
                message: format!(
                    "output variable '{}': incompatible emit value types: required '{}', found '{}'",
                    id, table.value, found
                ),
            });
        }

        match (weight, &table.weight) {
            (Some(weight), None) => Err(CheckError::TableContract {
                node: weight.id,
                message: format!(
                    "output variable '{}': emit contains a weight, but variable not declared with a weight",
                    id
                ),
            }),
            (Some(weight), Some(expected)) => {
                let found = self.expression(weight, scope)?;
                if !table.accepts_weight(&found) {
                    return Err(CheckError::TableContract {
                        node: weight.id,
                        message: format!(
                            "output variable '{}': incompatible types for weight: required '{}', found '{}'",
                            id, expected, found
                        ),
                    });
                }
                Ok(())
            }
            (None, Some(_)) => Err(CheckError::TableContract {
                node: stmt.id,
                message: format!("output variable '{}': emit must specify a weight", id),
            }),
            (None, None) => Ok(()),
        }
    }

    fn visit(
        &mut self,
        node: NodeId,
        phase: VisitPhase,
        target: &VisitTarget,
        body: &Block,
        scope: ScopeId,
    ) -> Result<()> {
        let inner = self.env.visit_scope(scope, phase);
        self.scopes_only(node, inner);

        match target {
            VisitTarget::Component(component) => {
                self.component(component, inner, true)?;
            }
            VisitTarget::Types(names) => {
                for name in names {
                    let ty = match self.env.registry().lookup(&name.name) {
                        Some(ty) => ty.clone(),
                        None => {
                            return Err(CheckError::UnknownType {
                                node: name.id,
                                message: format!("invalid type '{}'", name.name),
                            })
                        }
                    };
                    self.annotate(name.id, inner, ty);
                }
            }
            VisitTarget::Wildcard => {}
        }

        self.block(body, inner)
    }

    // ── Expressions ───────────────────────────────────────────────────

    fn expression(&mut self, expr: &Expression, scope: ScopeId) -> Result<Type> {
        let ty = match &expr.kind {
            ExpressionKind::Disjunction { lhs, rhs } => {
                self.logical("disjunction", lhs, rhs, scope)?
            }
            ExpressionKind::Conjunction { lhs, rhs } => {
                self.logical("conjunction", lhs, rhs, scope)?
            }

            ExpressionKind::Comparison { lhs, rhs } => {
                let left = self.expression(lhs, scope)?;
                match rhs {
                    None => left,
                    Some((op, rhs)) => {
                        let right = self.expression(rhs, scope)?;
                        if !right.compares(&left) {
                            return Err(incompatible(
                                rhs.id,
                                format!(
                                    "incompatible types for comparison: required '{}', found '{}'",
                                    left, right
                                ),
                            ));
                        }
                        if matches!(left.unnamed(), Type::String | Type::Record(_))
                            && !op.is_equality()
                        {
                            return Err(CheckError::InvalidOperator {
                                node: lhs.id,
                                message: format!(
                                    "invalid comparison operator '{}' for type '{}'",
                                    op.symbol(),
                                    left
                                ),
                            });
                        }
                        Type::Bool
                    }
                }
            }

            ExpressionKind::Arithmetic { lhs, rest } => {
                let left = self.expression(lhs, scope)?;
                if rest.is_empty() {
                    left
                } else {
                    let mut acc = left.value_type().clone();
                    for (op, operand) in rest {
                        let right = self.expression(operand, scope)?;
                        acc = self.arithmetic(*op, &acc, &right, operand.id)?;
                    }
                    acc
                }
            }

            ExpressionKind::Unary { operator, operand } => {
                let ty = self.expression(operand, scope)?;
                let value = ty.value_type();
                let ok = match operator {
                    UnaryOp::Neg => value.is_numeric(),
                    UnaryOp::Not => value.is_bool(),
                    UnaryOp::BitNot => value.is_int(),
                };
                if !ok {
                    return Err(CheckError::InvalidOperator {
                        node: operand.id,
                        message: format!(
                            "invalid operand type '{}' for unary operator '{}'",
                            ty,
                            operator.symbol()
                        ),
                    });
                }
                ty
            }

            ExpressionKind::Factor { operand, postfix } => self.factor(operand, postfix, scope)?,

            ExpressionKind::Paren(inner) => self.expression(inner, scope)?,

            ExpressionKind::Identifier(name) => self.identifier(expr.id, name, scope)?,

            ExpressionKind::Integer(_) | ExpressionKind::Char(_) => Type::Int,
            ExpressionKind::Float(_) => Type::Float,
            ExpressionKind::String(_) => Type::String,
            ExpressionKind::Bytes(_) => Type::Bytes,
            ExpressionKind::Time(_) => Type::Time,

            ExpressionKind::Composite(composite) => self.composite(composite, scope)?,

            ExpressionKind::Function { signature, body } => {
                let inner = self.env.function_scope(scope);
                let ty = self.function_signature(signature, inner, true)?;
                if let Type::Function { return_type, .. } = &ty {
                    self.env.set_return_type(inner, return_type.as_ref().clone());
                }
                self.block(body, inner)?;
                ty
            }

            ExpressionKind::Visitor { body } => {
                let inner = self.env.child(scope);
                self.block(body, inner)?;
                Type::Visitor
            }
        };

        Ok(self.annotate(expr.id, scope, ty))
    }

    fn logical(
        &mut self,
        what: &str,
        lhs: &Expression,
        rhs: &[Expression],
        scope: ScopeId,
    ) -> Result<Type> {
        let left = self.expression(lhs, scope)?;
        if rhs.is_empty() {
            return Ok(left);
        }
        if !left.is_bool() {
            return Err(incompatible(
                lhs.id,
                format!("incompatible types for {}: required 'bool', found '{}'", what, left),
            ));
        }
        for operand in rhs {
            let ty = self.expression(operand, scope)?;
            if !ty.is_bool() {
                return Err(incompatible(
                    operand.id,
                    format!("incompatible types for {}: required 'bool', found '{}'", what, ty),
                ));
            }
        }
        Ok(Type::Bool)
    }

    fn arithmetic(&self, op: ArithmeticOp, left: &Type, right: &Type, node: NodeId) -> Result<Type> {
        if op.is_bitwise() {
            if left.value_type().is_int() && right.value_type().is_int() {
                return Ok(Type::Int);
            }
            let offending = if left.value_type().is_int() { right } else { left };
            return Err(CheckError::InvalidOperator {
                node,
                message: format!(
                    "invalid operand type '{}' for operator '{}': required 'int'",
                    offending,
                    op.symbol()
                ),
            });
        }

        left.arithmetics(right).ok_or_else(|| {
            incompatible(
                node,
                format!(
                    "incompatible types for operator '{}': '{}' and '{}'",
                    op.symbol(),
                    left,
                    right
                ),
            )
        })
    }

    fn identifier(&self, node: NodeId, name: &str, scope: ScopeId) -> Result<Type> {
        if let Some(ty) = self.env.registry().lookup(name) {
            return Ok(ty.clone());
        }
        match self.env.lookup(scope, name) {
            Some(ty) => Ok(ty.clone()),
            None => Err(CheckError::UnknownIdentifier {
                node,
                message: format!("invalid identifier '{}'", name),
            }),
        }
    }

    fn factor(&mut self, operand: &Expression, postfix: &[Postfix], scope: ScopeId) -> Result<Type> {
        if let Some(call_at) = postfix
            .iter()
            .position(|p| matches!(p.kind, PostfixKind::Call(_)))
        {
            if call_at + 1 != postfix.len() {
                return Err(CheckError::MalformedTree {
                    node: postfix[call_at + 1].id,
                    message: "a call must end its postfix chain".to_string(),
                });
            }
            let name = match (&operand.kind, call_at) {
                (ExpressionKind::Identifier(name), 0) => name,
                _ => {
                    return Err(CheckError::Overload {
                        node: postfix[call_at].id,
                        message: "expression is not callable".to_string(),
                    })
                }
            };
            if let PostfixKind::Call(args) = &postfix[call_at].kind {
                return self.call(operand, name, postfix[call_at].id, args, scope);
            }
        }

        let mut ty = self.expression(operand, scope)?;
        for op in postfix {
            ty = match &op.kind {
                PostfixKind::Selector(member) => self.selection(&ty, member, op.id, scope)?,
                PostfixKind::Index { start, end } => {
                    self.indexing(&ty, start, end.as_ref(), op.id, scope)?
                }
                // calls were handled above
                PostfixKind::Call(_) => ty,
            };
            self.annotate(op.id, scope, ty.clone());
        }
        Ok(ty)
    }

    fn call(
        &mut self,
        operand: &Expression,
        name: &str,
        node: NodeId,
        args: &[Expression],
        scope: ScopeId,
    ) -> Result<Type> {
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            let ty = self.expression(arg, scope)?;
            arg_types.push(ty.value_type().clone());
        }

        let resolution = find_function(&*self.env, scope, node, name, &arg_types)?;
        self.annotate(operand.id, scope, resolution.signature);
        Ok(self.annotate(node, scope, resolution.return_type))
    }

    /// Member selection on `operand`, the type reached so far in the chain
    fn selection(
        &mut self,
        operand: &Type,
        member: &Identifier,
        node: NodeId,
        scope: ScopeId,
    ) -> Result<Type> {
        let name = member.name.as_str();
        let ty = match operand.unnamed() {
            Type::Record(record) => {
                let attribute = self
                    .env
                    .registry()
                    .record(record)
                    .and_then(|r| r.attribute(name))
                    .map(|a| a.ty.clone());
                match attribute {
                    Some(ty) => ty,
                    None => {
                        return Err(CheckError::InvalidSelection {
                            node: member.id,
                            message: format!("'{}' has no member named '{}'", operand, name),
                        })
                    }
                }
            }
            Type::Enum(enumeration) => {
                let known = self
                    .env
                    .registry()
                    .enumeration(enumeration)
                    .map_or(false, |e| e.has_value(name));
                if !known {
                    return Err(CheckError::InvalidSelection {
                        node: member.id,
                        message: format!("'{}' has no member named '{}'", operand, name),
                    });
                }
                operand.unnamed().clone()
            }
            Type::Tuple(_) => match operand.member(name) {
                Some(ty) => ty.clone(),
                None => {
                    return Err(CheckError::InvalidSelection {
                        node: member.id,
                        message: format!("'{}' has no member named '{}'", operand, name),
                    })
                }
            },
            _ => {
                return Err(CheckError::InvalidSelection {
                    node,
                    message: format!("invalid operand type '{}' for member selection", operand),
                })
            }
        };
        Ok(self.annotate(member.id, scope, ty))
    }

    fn indexing(
        &mut self,
        operand: &Type,
        start: &Expression,
        end: Option<&Expression>,
        node: NodeId,
        scope: ScopeId,
    ) -> Result<Type> {
        let index = self.expression(start, scope)?;

        if let Some(end) = end {
            if !index.is_int() {
                return Err(CheckError::InvalidIndex {
                    node: start.id,
                    message: format!("invalid type '{}' for slice expression", index),
                });
            }
            let end_ty = self.expression(end, scope)?;
            if !end_ty.is_int() {
                return Err(CheckError::InvalidIndex {
                    node: end.id,
                    message: format!("invalid type '{}' for slice expression", end_ty),
                });
            }
            return match operand.unnamed() {
                Type::Array(_) | Type::ProtoList(_) => Ok(operand.unnamed().clone()),
                _ => Err(CheckError::InvalidIndex {
                    node,
                    message: format!("invalid operand type '{}' for slice expression", operand),
                }),
            };
        }

        match operand.unnamed() {
            Type::Array(element) | Type::ProtoList(element) => {
                if !index.is_int() {
                    return Err(CheckError::InvalidIndex {
                        node,
                        message: format!("invalid operand type '{}' for indexing into array", index),
                    });
                }
                Ok(element.as_ref().clone())
            }
            Type::Map { key, value } => {
                if !key.assigns(&index) {
                    return Err(CheckError::InvalidIndex {
                        node,
                        message: format!(
                            "invalid operand type '{}' for indexing into '{}'",
                            index, operand
                        ),
                    });
                }
                Ok(value.as_ref().clone())
            }
            _ => Err(CheckError::InvalidIndex {
                node,
                message: format!("invalid operand type '{}' for indexing expression", operand),
            }),
        }
    }

    fn composite(&mut self, composite: &Composite, scope: ScopeId) -> Result<Type> {
        match composite {
            // ambiguous: `{}` may also mean an empty array
            Composite::Empty => Ok(Type::map(Type::Any, Type::Any)),

            Composite::Pairs(pairs) => {
                let mut map: Option<Type> = None;
                for pair in pairs {
                    let key = self.expression(&pair.key, scope)?;
                    let value = self.expression(&pair.value, scope)?;
                    let ty = self.annotate(pair.id, scope, Type::map(key, value));
                    // the first pair fixes the key and value types
                    let expected = map.get_or_insert_with(|| ty.clone());
                    if !expected.assigns(&ty) {
                        return Err(incompatible(
                            pair.id,
                            format!("incompatible types: required '{}', found '{}'", expected, ty),
                        ));
                    }
                }
                Ok(map.unwrap_or_else(|| Type::map(Type::Any, Type::Any)))
            }

            Composite::Elements(elements) => {
                let mut first = None;
                for element in elements {
                    let ty = self.expression(element, scope)?;
                    first.get_or_insert(ty);
                }
                Ok(first.unwrap_or(Type::Any))
            }
        }
    }

    // ── Types ─────────────────────────────────────────────────────────

    fn type_expr(&mut self, te: &TypeExpr, scope: ScopeId) -> Result<Type> {
        let ty = match &te.kind {
            TypeExprKind::Named(name) => match self.env.registry().lookup(name) {
                Some(ty) => ty.clone(),
                None => {
                    return Err(CheckError::UnknownType {
                        node: te.id,
                        message: format!("invalid type '{}'", name),
                    })
                }
            },
            TypeExprKind::Array(element) => Type::array(self.type_expr(element, scope)?),
            TypeExprKind::Stack(element) => Type::stack(self.type_expr(element, scope)?),
            TypeExprKind::Map { key, value } => {
                let key = self.type_expr(key, scope)?;
                let value = self.type_expr(value, scope)?;
                Type::map(key, value)
            }
            TypeExprKind::Tuple(members) => {
                let mut types = Vec::with_capacity(members.len());
                for member in members {
                    types.push(self.component(member, scope, false)?);
                }
                Type::Tuple(types)
            }
            TypeExprKind::Function(signature) => self.function_signature(signature, scope, false)?,
            TypeExprKind::Output(output) => self.output_type(te.id, output, scope)?,
            TypeExprKind::Visitor => Type::Visitor,
        };
        Ok(self.annotate(te.id, scope, ty))
    }

    /// Resolve a component. Named components yield a `Name` type and,
    /// when `bind` is set, are declared in `scope`.
    fn component(&mut self, component: &Component, scope: ScopeId, bind: bool) -> Result<Type> {
        let ty = self.type_expr(&component.type_expr, scope)?;
        let ty = match &component.name {
            Some(name) => {
                if bind {
                    self.env.define(scope, &name.name, ty.clone());
                }
                self.annotate(name.id, scope, ty.clone());
                Type::named(name.name.clone(), ty)
            }
            None => ty,
        };
        Ok(self.annotate(component.id, scope, ty))
    }

    fn function_signature(
        &mut self,
        signature: &FunctionTypeExpr,
        scope: ScopeId,
        bind: bool,
    ) -> Result<Type> {
        let mut params = Vec::with_capacity(signature.params.len());
        for param in &signature.params {
            if param.name.is_none() {
                return Err(CheckError::MalformedTree {
                    node: param.id,
                    message: "function parameters must be named".to_string(),
                });
            }
            params.push(self.component(param, scope, bind)?);
        }

        let return_type = match &signature.return_type {
            Some(te) => self.type_expr(te, scope)?,
            None => Type::Any,
        };
        Ok(Type::function(params, return_type))
    }

    fn output_type(&mut self, node: NodeId, output: &OutputTypeExpr, scope: ScopeId) -> Result<Type> {
        let mut indices = Vec::with_capacity(output.indices.len());
        for index in &output.indices {
            let ty = self.component(index, scope, false)?;
            if !ty.is_scalar() {
                return Err(CheckError::TableContract {
                    node: index.id,
                    message: format!("incorrect type '{}' for index", ty),
                });
            }
            indices.push(ty.unnamed().clone());
        }

        let value = self.component(&output.value, scope, false)?.unnamed().clone();

        let aggregator = &output.aggregator;
        let spec = self
            .env
            .aggregators()
            .resolve(&aggregator.name, &value)
            .map_err(|failure| CheckError::Aggregator {
                node,
                message: failure.to_string(),
            })?
            .clone();

        let weight = match (&output.weight, &spec.weight_type) {
            (Some(component), None) => {
                return Err(CheckError::TableContract {
                    node: component.id,
                    message: "unexpected weight for table declaration".to_string(),
                })
            }
            (Some(component), Some(expected)) => {
                let ty = self.component(component, scope, false)?.unnamed().clone();
                if !expected.assigns(&ty) {
                    return Err(CheckError::TableContract {
                        node: component.id,
                        message: "incorrect weight type for table declaration".to_string(),
                    });
                }
                Some(ty)
            }
            (None, Some(_)) => {
                return Err(CheckError::TableContract {
                    node,
                    message: "missing weight for table declaration".to_string(),
                })
            }
            (None, None) => None,
        };

        let found = output.arguments.len();
        if found > 0 && spec.arity() == 0 {
            return Err(CheckError::Aggregator {
                node: aggregator.id,
                message: format!("table '{}' takes no arguments", aggregator.name),
            });
        }
        if found < spec.required_parameters() || found > spec.arity() {
            let expected = if spec.required_parameters() == spec.arity() {
                spec.arity().to_string()
            } else {
                format!("{} to {}", spec.required_parameters(), spec.arity())
            };
            return Err(CheckError::Aggregator {
                node: aggregator.id,
                message: format!(
                    "table '{}' takes {} argument(s), found {}",
                    aggregator.name, expected, found
                ),
            });
        }
        for (i, (arg, param)) in output.arguments.iter().zip(&spec.formal_parameters).enumerate() {
            let ty = self.expression(arg, scope)?;
            if !param.assigns(&ty) {
                return Err(CheckError::Aggregator {
                    node: arg.id,
                    message: format!(
                        "incompatible types for argument {} of '{}': required '{}', found '{}'",
                        i, aggregator.name, param, ty
                    ),
                });
            }
        }

        let table = TableType {
            value,
            indices,
            weight,
            aggregator: spec.binding(),
        };
        debug!("declared table {}", table.name());
        Ok(Type::Table(Box::new(table)))
    }
}
