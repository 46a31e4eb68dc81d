//! Symbol environment
//!
//! Scopes are insert-only frames in an arena, each pointing at its parent.
//! Opening a child scope pushes a frame; lookups walk outward to the root
//! and then into the global set. Frames are never removed, so a `ScopeId`
//! recorded against a node stays a valid snapshot after checking ends,
//! while a child's bindings stay invisible to its parent and siblings.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::aggregators::AggregatorRegistry;
use crate::ast::VisitPhase;
use crate::builtins;
use crate::error::SetupError;
use crate::registry::TypeRegistry;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub usize);

/// Which visit phase, if any, the code in a scope runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitContext {
    Outside,
    Before,
    After,
}

impl From<VisitPhase> for VisitContext {
    fn from(phase: VisitPhase) -> Self {
        match phase {
            VisitPhase::Before => VisitContext::Before,
            VisitPhase::After => VisitContext::After,
        }
    }
}

#[derive(Debug, Clone)]
struct Scope {
    parent: Option<ScopeId>,
    bindings: HashMap<String, Type>,
    visit: VisitContext,
    /// Declared return type of the enclosing function literal
    return_type: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct Environment {
    registry: Arc<TypeRegistry>,
    aggregators: AggregatorRegistry,
    /// Implicit conversions as (from, to) pairs
    casts: Vec<(Type, Type)>,
    globals: HashMap<String, Type>,
    /// Built-in function signatures, possibly overloaded
    functions: HashMap<String, Vec<Type>>,
    scopes: Vec<Scope>,
}

impl Environment {
    /// An environment with no globals, functions or casts
    pub fn new(registry: Arc<TypeRegistry>, aggregators: AggregatorRegistry) -> Self {
        Environment {
            registry,
            aggregators,
            casts: Vec::new(),
            globals: HashMap::new(),
            functions: HashMap::new(),
            scopes: vec![Scope {
                parent: None,
                bindings: HashMap::new(),
                visit: VisitContext::Outside,
                return_type: None,
            }],
        }
    }

    /// The standard environment: mining schema, standard aggregators,
    /// built-in constants, functions and casts
    pub fn standard() -> Self {
        let mut env = Environment::new(TypeRegistry::standard(), AggregatorRegistry::standard());
        builtins::install(&mut env);
        env
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn aggregators(&self) -> &AggregatorRegistry {
        &self.aggregators
    }

    pub fn aggregators_mut(&mut self) -> &mut AggregatorRegistry {
        &mut self.aggregators
    }

    // ── Scope management ──────────────────────────────────────────────

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    fn push(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }

    /// Open a child scope that inherits the parent's context
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        let (visit, return_type) = {
            let p = &self.scopes[parent.0];
            (p.visit, p.return_type.clone())
        };
        self.push(Scope {
            parent: Some(parent),
            bindings: HashMap::new(),
            visit,
            return_type,
        })
    }

    /// Open the scope of a visit body
    pub fn visit_scope(&mut self, parent: ScopeId, phase: VisitPhase) -> ScopeId {
        let scope = self.child(parent);
        self.scopes[scope.0].visit = phase.into();
        debug!("opened {:?} visit scope {:?}", phase, scope);
        scope
    }

    /// Open the scope of a function literal. Function bodies leave any
    /// enclosing visit context behind.
    pub fn function_scope(&mut self, parent: ScopeId) -> ScopeId {
        let scope = self.push(Scope {
            parent: Some(parent),
            bindings: HashMap::new(),
            visit: VisitContext::Outside,
            return_type: Some(Type::Any),
        });
        debug!("opened function scope {:?}", scope);
        scope
    }

    pub fn set_return_type(&mut self, scope: ScopeId, return_type: Type) {
        self.scopes[scope.0].return_type = Some(return_type);
    }

    pub fn return_type(&self, scope: ScopeId) -> Option<&Type> {
        self.scopes[scope.0].return_type.as_ref()
    }

    pub fn visit_context(&self, scope: ScopeId) -> VisitContext {
        self.scopes[scope.0].visit
    }

    pub fn is_before_visitor(&self, scope: ScopeId) -> bool {
        self.visit_context(scope) == VisitContext::Before
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    // ── Bindings ──────────────────────────────────────────────────────

    pub fn define(&mut self, scope: ScopeId, name: &str, ty: Type) {
        trace!("bind {} : {} in {:?}", name, ty, scope);
        self.scopes[scope.0].bindings.insert(name.to_string(), ty);
    }

    /// Resolve a name through the scope chain, then the globals
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = &self.scopes[id.0];
            if let Some(ty) = frame.bindings.get(name) {
                return Some(ty);
            }
            current = frame.parent;
        }
        self.globals.get(name)
    }

    /// A binding made directly in `scope`, ignoring enclosing scopes
    pub fn local_in(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        self.scopes[scope.0].bindings.get(name)
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    pub fn global(&self, name: &str) -> Option<&Type> {
        self.globals.get(name)
    }

    /// Globals are write-once
    pub fn define_global(&mut self, name: &str, ty: Type) -> Result<(), SetupError> {
        if self.globals.contains_key(name) {
            return Err(SetupError::DuplicateGlobal(name.to_string()));
        }
        self.globals.insert(name.to_string(), ty);
        Ok(())
    }

    // ── Functions ─────────────────────────────────────────────────────

    pub fn add_function(&mut self, name: &str, signature: Type) {
        self.functions
            .entry(name.to_string())
            .or_default()
            .push(signature);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Is `name` bound to a function-typed value visible from `scope`?
    pub fn has_local_function(&self, scope: ScopeId, name: &str) -> bool {
        self.lookup(scope, name).map_or(false, |t| t.is_function())
    }

    /// Every signature callable as `name` from `scope`: built-ins first,
    /// then a visible function-typed binding.
    pub fn functions(&self, scope: ScopeId, name: &str) -> Vec<Type> {
        let mut candidates = self.functions.get(name).cloned().unwrap_or_default();
        if let Some(ty) = self.lookup(scope, name) {
            if ty.is_function() {
                candidates.push(ty.unnamed().clone());
            }
        }
        candidates
    }

    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.functions.keys().map(|n| n.as_str()).collect();
        names.sort();
        names
    }

    // ── Casts ─────────────────────────────────────────────────────────

    pub fn add_cast(&mut self, from: Type, to: Type) {
        if !self.has_cast(&from, &to) {
            self.casts.push((from, to));
        }
    }

    pub fn has_cast(&self, from: &Type, to: &Type) -> bool {
        let (from, to) = (from.unnamed(), to.unnamed());
        self.casts.iter().any(|(f, t)| f == from && t == to)
    }
}
