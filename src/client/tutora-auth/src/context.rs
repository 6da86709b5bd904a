//! Scoped access to the identity contexts.
//!
//! A [`Scope`] is an immutable chain of typed values. Providers attach a
//! context to a child scope; consumers look it up from wherever they sit in
//! the tree. Looking up a context outside any provider is a programming
//! error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{AdminAuthContext, AuthContext, AuthError};

const AUTH_PROVIDER: &str = "AuthProvider";
const ADMIN_AUTH_PROVIDER: &str = "AdminAuthProvider";

struct Node {
    parent: Option<Scope>,
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

/// A node in the provider tree.
#[derive(Clone)]
pub struct Scope {
    node: Arc<Node>,
}

impl Scope {
    /// Creates an empty root scope.
    pub fn root() -> Self {
        Self {
            node: Arc::new(Node {
                parent: None,
                values: HashMap::new(),
            }),
        }
    }

    /// Creates an empty child of this scope.
    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(Node {
                parent: Some(self.clone()),
                values: HashMap::new(),
            }),
        }
    }

    /// Returns a child scope holding `value`, shadowing any value of the
    /// same type further up.
    pub fn provide<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values: HashMap<TypeId, Box<dyn Any + Send + Sync>> = HashMap::new();
        values.insert(TypeId::of::<T>(), Box::new(value));
        Self {
            node: Arc::new(Node {
                parent: Some(self.clone()),
                values,
            }),
        }
    }

    /// Looks up the nearest value of type `T`.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope
                .node
                .values
                .get(&TypeId::of::<T>())
                .and_then(|boxed| boxed.downcast_ref::<T>())
            {
                return Some(value.clone());
            }
            current = scope.node.parent.as_ref();
        }
        None
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("values", &self.node.values.len())
            .field("has_parent", &self.node.parent.is_some())
            .finish()
    }
}

/// Attaches the end-user context below `scope`.
pub fn provide_auth(scope: &Scope, context: AuthContext) -> Scope {
    scope.provide(context)
}

/// Attaches the admin context below `scope`.
pub fn provide_admin_auth(scope: &Scope, context: AdminAuthContext) -> Scope {
    scope.provide(context)
}

/// Returns the end-user context, or [`AuthError::MissingProvider`].
pub fn try_use_auth(scope: &Scope) -> Result<AuthContext, AuthError> {
    scope
        .get::<AuthContext>()
        .ok_or(AuthError::MissingProvider(AUTH_PROVIDER))
}

/// Returns the admin context, or [`AuthError::MissingProvider`].
pub fn try_use_admin_auth(scope: &Scope) -> Result<AdminAuthContext, AuthError> {
    scope
        .get::<AdminAuthContext>()
        .ok_or(AuthError::MissingProvider(ADMIN_AUTH_PROVIDER))
}

/// Returns the end-user context.
///
/// # Panics
///
/// Panics if no end-user provider encloses `scope`.
#[track_caller]
pub fn use_auth(scope: &Scope) -> AuthContext {
    match scope.get::<AuthContext>() {
        Some(context) => context,
        None => panic!("use_auth must be used within an {AUTH_PROVIDER}"),
    }
}

/// Returns the admin context.
///
/// # Panics
///
/// Panics if no admin provider encloses `scope`.
#[track_caller]
pub fn use_admin_auth(scope: &Scope) -> AdminAuthContext {
    match scope.get::<AdminAuthContext>() {
        Some(context) => context,
        None => panic!("use_admin_auth must be used within an {ADMIN_AUTH_PROVIDER}"),
    }
}
