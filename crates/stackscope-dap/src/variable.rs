// crates/stackscope-dap/src/variable.rs
// ============================================================================
// Module: Variable Entities
// Description: Variables and structured child values.
// Purpose: Track variable values across stops with name-based identity and
//          lazy child fetches.
// Dependencies: stackscope-graph, stackscope-reactive
// ============================================================================

//! ## Overview
//! A [`Variable`] belongs to a [`VariableScope`](crate::VariableScope) or,
//! for structured children, to a parent variable. When children of one
//! `variablesReference` are re-fetched, a child with a matching name keeps
//! its entity; replaced children are stale-marked, never disposed, so value
//! history stays queryable.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use serde_json::json;
use stackscope_graph::Collection;
use stackscope_graph::EdgeHandle;
use stackscope_graph::EdgeKind;
use stackscope_graph::EdgeSlot;
use stackscope_graph::EntityId;
use stackscope_graph::IndexKey;
use stackscope_graph::Lifecycle;
use stackscope_graph::Node;
use stackscope_graph::Store;
use stackscope_reactive::Scope as ReactiveScope;
use stackscope_reactive::Signal;

/// One variable or structured child value.
pub struct Variable {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Variable name.
    pub name: Signal<String>,
    /// Rendered value.
    pub value: Signal<String>,
    /// Type label, when the adapter reports one.
    pub variable_type: Signal<Option<String>>,
    /// Reference for fetching children; `0` means a leaf.
    pub variables_reference: Signal<i64>,
    /// Owning variable scope, for top-level variables. Reference edge.
    pub var_scope: EdgeSlot,
    /// Owning parent variable, for structured children. Reference edge.
    pub parent: EdgeSlot,
    /// Structured children. Owning edge.
    pub children: Collection,
    /// Whether children were fetched for the current reference already.
    pub(crate) children_fetched: Cell<bool>,
}

impl Variable {
    /// Creates a variable from one adapter report.
    pub(crate) fn create(
        store: &Store,
        name: String,
        value: String,
        variable_type: Option<String>,
        variables_reference: i64,
    ) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    name: Signal::new(name),
                    value: Signal::new(value),
                    variable_type: Signal::new(variable_type),
                    variables_reference: Signal::new(variables_reference),
                    var_scope: EdgeSlot::new(store, "scope", EdgeKind::Weak),
                    parent: EdgeSlot::new(store, "parent", EdgeKind::Weak),
                    children: Collection::new(store, "children", EdgeKind::Strong, Some(id))
                        .with_index("name", |node| {
                            let variable =
                                Rc::clone(node).as_any().downcast::<Variable>().ok()?;
                            Some(IndexKey::Str(variable.name.get()))
                        }),
                    children_fetched: Cell::new(false),
                })
            })
        })
    }

    /// Applies a re-fetched report to an existing variable.
    pub(crate) fn absorb(
        &self,
        value: String,
        variable_type: Option<String>,
        variables_reference: i64,
    ) {
        self.value.set(value);
        self.variable_type.set(variable_type);
        if self.variables_reference.get_untracked() != variables_reference {
            self.variables_reference.set(variables_reference);
            // Children belong to the old reference now.
            self.children_fetched.set(false);
        }
    }
}

impl Node for Variable {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "variable"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(json!(self.name.get_untracked())),
            "value" => Some(json!(self.value.get_untracked())),
            "type" => self
                .variable_type
                .get_untracked()
                .map(|label| json!(label)),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.var_scope.clone()),
            EdgeHandle::One(self.parent.clone()),
            EdgeHandle::Many(self.children.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// One historical observation of a named variable.
#[derive(Clone)]
pub struct VariableObservation {
    /// The observed variable entity.
    pub variable: Rc<Variable>,
    /// Whether this observation is the current one.
    pub is_current: bool,
}
