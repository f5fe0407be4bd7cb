/*
 * Responsibility
 * - The static gateway operation table: URL -> (service, pattern, access)
 * - Role requirements are derived from the same table at registration time
 * - Guards are attached per operation: authn, then authz (route_layer)
 */
use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{MethodFilter, on},
};

use crate::api::v1::extractors::MaybeIdentity;
use crate::api::v1::handlers::{fallback::method_not_allowed, gateway::forward};
use crate::middleware::auth::{access::authenticate, roles::authorize};
use crate::services::auth::{RoleRequirements, roles::ADMIN, roles::CUSTOMER};
use crate::state::AppState;

use self::Access::Public;
use self::Verb::{Delete, Get, Patch, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Delete,
}

impl Verb {
    fn filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }

    pub fn success_status(self) -> StatusCode {
        match self {
            Verb::Post => StatusCode::CREATED,
            _ => StatusCode::OK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No credential needed; neither guard runs.
    Public,
    /// Any of these roles; an empty list means any authenticated caller.
    Authenticated(&'static [&'static str]),
}

/// One public endpoint and the backend call it turns into.
#[derive(Debug)]
pub struct GatewayOperation {
    /// Operation id, also the message pattern sent to the backend.
    pub id: &'static str,
    pub verb: Verb,
    pub path: &'static str,
    pub service: &'static str,
    pub access: Access,
}

const fn op(
    verb: Verb,
    path: &'static str,
    service: &'static str,
    id: &'static str,
    access: Access,
) -> GatewayOperation {
    GatewayOperation {
        id,
        verb,
        path,
        service,
        access,
    }
}

const ANY: Access = Access::Authenticated(&[]);
const ADMIN_ONLY: Access = Access::Authenticated(&[ADMIN]);
const CUSTOMER_ONLY: Access = Access::Authenticated(&[CUSTOMER]);
const STAFF_OR_CUSTOMER: Access = Access::Authenticated(&[ADMIN, CUSTOMER]);

pub static OPERATIONS: &[GatewayOperation] = &[
    // auth
    op(Post, "/auth/register", "users", "auth.register", Public),
    op(Post, "/auth/login", "users", "auth.login", Public),
    op(Get, "/auth/me", "users", "auth.me", ANY),
    // users
    op(Get, "/users", "users", "users.findAll", ADMIN_ONLY),
    op(Get, "/users/{id}", "users", "users.findOne", ADMIN_ONLY),
    op(Patch, "/users/{id}", "users", "users.update", ADMIN_ONLY),
    op(Delete, "/users/{id}", "users", "users.remove", ADMIN_ONLY),
    // catalog: reads are public, writes are admin
    op(Get, "/products", "products", "products.findAll", Public),
    op(Get, "/products/{id}", "products", "products.findOne", Public),
    op(Post, "/products", "products", "products.create", ADMIN_ONLY),
    op(Patch, "/products/{id}", "products", "products.update", ADMIN_ONLY),
    op(Delete, "/products/{id}", "products", "products.remove", ADMIN_ONLY),
    op(Get, "/categories", "categories", "categories.findAll", Public),
    op(Get, "/categories/{id}", "categories", "categories.findOne", Public),
    op(Post, "/categories", "categories", "categories.create", ADMIN_ONLY),
    op(Patch, "/categories/{id}", "categories", "categories.update", ADMIN_ONLY),
    op(Delete, "/categories/{id}", "categories", "categories.remove", ADMIN_ONLY),
    // cart
    op(Get, "/cart", "cart", "cart.get", CUSTOMER_ONLY),
    op(Delete, "/cart", "cart", "cart.clear", CUSTOMER_ONLY),
    op(Post, "/cart/items", "cart", "cart.addItem", CUSTOMER_ONLY),
    op(Patch, "/cart/items/{itemId}", "cart", "cart.updateItem", CUSTOMER_ONLY),
    op(Delete, "/cart/items/{itemId}", "cart", "cart.removeItem", CUSTOMER_ONLY),
    // orders
    op(Post, "/orders", "orders", "orders.create", CUSTOMER_ONLY),
    op(Get, "/orders", "orders", "orders.findAll", STAFF_OR_CUSTOMER),
    op(Get, "/orders/{id}", "orders", "orders.findOne", ANY),
    op(Patch, "/orders/{id}/status", "orders", "orders.updateStatus", ADMIN_ONLY),
    op(Post, "/orders/{id}/cancel", "orders", "orders.cancel", CUSTOMER_ONLY),
    // payments
    op(Post, "/payments", "payments", "payments.create", CUSTOMER_ONLY),
    op(Get, "/payments/{id}", "payments", "payments.findOne", ANY),
    op(Post, "/payments/{id}/refund", "payments", "payments.refund", ADMIN_ONLY),
    // addresses
    op(Get, "/addresses", "addresses", "addresses.findAll", CUSTOMER_ONLY),
    op(Post, "/addresses", "addresses", "addresses.create", CUSTOMER_ONLY),
    op(Patch, "/addresses/{id}", "addresses", "addresses.update", CUSTOMER_ONLY),
    op(Delete, "/addresses/{id}", "addresses", "addresses.remove", CUSTOMER_ONLY),
];

pub fn operations() -> &'static [GatewayOperation] {
    OPERATIONS
}

/// Operation id -> required roles, for every authenticated operation.
pub fn role_requirements() -> RoleRequirements {
    OPERATIONS
        .iter()
        .fold(RoleRequirements::new(), |reqs, op| match op.access {
            Access::Public => reqs,
            Access::Authenticated(roles) => reqs.require(op.id, roles.iter().copied()),
        })
}

pub fn routes(state: AppState) -> Router<AppState> {
    OPERATIONS.iter().fold(Router::new(), |router, op| {
        let handler = move |state: State<AppState>, identity: MaybeIdentity, req: Request| {
            forward(op, state, identity, req)
        };
        let method_router = on(op.verb.filter(), handler);

        let method_router = match op.access {
            Access::Public => method_router,
            // Last added runs first: authentication, then authorization.
            Access::Authenticated(_) => method_router
                .route_layer(from_fn_with_state((state.clone(), op.id), authorize))
                .route_layer(from_fn_with_state(state.clone(), authenticate)),
        };

        router.route(op.path, method_router)
    })
    .method_not_allowed_fallback(method_not_allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn operation_ids_and_routes_are_unique() {
        let mut ids = HashSet::new();
        let mut routes = HashSet::new();
        for op in OPERATIONS {
            assert!(ids.insert(op.id), "duplicate id {}", op.id);
            assert!(routes.insert((op.verb, op.path)), "duplicate route {}", op.path);
        }
    }

    #[test]
    fn requirements_follow_access() {
        let reqs = role_requirements();

        assert!(reqs.get("products.findAll").is_none());
        assert!(reqs.get("auth.login").is_none());
        assert!(reqs.get("auth.me").is_some_and(|r| r.is_empty()));
        assert!(reqs.get("products.create").is_some_and(|r| r.contains(ADMIN)));

        let orders = reqs.get("orders.findAll").unwrap();
        assert!(orders.contains(ADMIN) && orders.contains(CUSTOMER));
    }
}
