// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::auth::{Actor, UserRole},
};

/// Uma linha da política de acesso: o papel pode executar a ação no recurso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub role: UserRole,
    pub resource: &'static str,
    pub action: &'static str,
}

const fn allow(role: UserRole, resource: &'static str, action: &'static str) -> Policy {
    Policy { role, resource, action }
}

use UserRole::{Admin, Customer, Provider};

// Tudo que não está aqui é negado
pub const POLICIES: &[Policy] = &[
    allow(Customer, "catalog", "read"),
    allow(Provider, "catalog", "read"),
    allow(Admin, "catalog", "read"),
    allow(Admin, "catalog", "manage"),
    // --- Reservas ---
    allow(Customer, "booking", "create"),
    allow(Customer, "booking", "own"),
    allow(Customer, "booking", "read"),
    allow(Provider, "booking", "read"),
    allow(Admin, "booking", "read"),
    allow(Provider, "booking", "work"),
    allow(Admin, "booking", "work"),
    allow(Admin, "booking", "manage"),
    // --- Faturas ---
    allow(Customer, "invoice", "read"),
    allow(Provider, "invoice", "read"),
    allow(Admin, "invoice", "read"),
    allow(Provider, "invoice", "products"),
    allow(Admin, "invoice", "products"),
    allow(Admin, "invoice", "payment"),
    // --- Ganhos e saques ---
    allow(Provider, "payment", "earnings"),
    allow(Admin, "payment", "manage"),
    // --- Reclamações ---
    allow(Customer, "complaint", "create"),
    allow(Customer, "complaint", "read"),
    allow(Provider, "complaint", "read"),
    allow(Admin, "complaint", "read"),
    allow(Admin, "complaint", "triage"),
    allow(Customer, "complaint", "reopen"),
    allow(Customer, "complaint", "close"),
    allow(Admin, "complaint", "close"),
    // --- Prestadores ---
    allow(Admin, "provider", "manage"),
];

pub fn is_allowed(role: UserRole, resource: &str, action: &str) -> bool {
    POLICIES
        .iter()
        .any(|p| p.role == role && p.resource == resource && p.action == action)
}

/// O trait que define o que é uma permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn resource() -> &'static str;
    fn action() -> &'static str;
}

/// Extrator (guardião): exige usuário autenticado com a permissão `T`.
pub struct RequirePermission<T>(pub Actor, PhantomData<T>);

impl<T> RequirePermission<T> {
    pub fn actor(&self) -> &Actor {
        &self.0
    }
}

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(actor) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !is_allowed(actor.role, T::resource(), T::action()) {
            return Err(AppError::Forbidden(format!(
                "O perfil '{}' não pode executar '{}:{}'.",
                actor.role,
                T::resource(),
                T::action()
            )));
        }

        Ok(RequirePermission(actor, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($name:ident, $resource:literal, $action:literal) => {
        pub struct $name;
        impl PermissionDef for $name {
            fn resource() -> &'static str {
                $resource
            }
            fn action() -> &'static str {
                $action
            }
        }
    };
}

permission!(PermCatalogRead, "catalog", "read");
permission!(PermCatalogManage, "catalog", "manage");

permission!(PermBookingCreate, "booking", "create");
permission!(PermBookingOwn, "booking", "own");
permission!(PermBookingRead, "booking", "read");
permission!(PermBookingWork, "booking", "work");
permission!(PermBookingManage, "booking", "manage");

permission!(PermInvoiceRead, "invoice", "read");
permission!(PermInvoiceProducts, "invoice", "products");
permission!(PermInvoicePayment, "invoice", "payment");

permission!(PermEarnings, "payment", "earnings");
permission!(PermWithdrawalManage, "payment", "manage");

permission!(PermComplaintCreate, "complaint", "create");
permission!(PermComplaintRead, "complaint", "read");
permission!(PermComplaintTriage, "complaint", "triage");
permission!(PermComplaintReopen, "complaint", "reopen");
permission!(PermComplaintClose, "complaint", "close");

permission!(PermProviderManage, "provider", "manage");

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed<T: PermissionDef>(role: UserRole) -> bool {
        is_allowed(role, T::resource(), T::action())
    }

    #[test]
    fn customers_cannot_work_bookings() {
        assert!(!allowed::<PermBookingWork>(Customer));
        assert!(allowed::<PermBookingWork>(Provider));
        assert!(allowed::<PermBookingWork>(Admin));
    }

    #[test]
    fn only_admin_manages_withdrawals_and_commissions() {
        for role in [Customer, Provider] {
            assert!(!allowed::<PermWithdrawalManage>(role));
            assert!(!allowed::<PermProviderManage>(role));
            assert!(!allowed::<PermInvoicePayment>(role));
        }
        assert!(allowed::<PermWithdrawalManage>(Admin));
    }

    #[test]
    fn only_providers_withdraw() {
        assert!(allowed::<PermEarnings>(Provider));
        assert!(!allowed::<PermEarnings>(Customer));
        assert!(!allowed::<PermEarnings>(Admin));
    }

    #[test]
    fn complaint_roles() {
        assert!(allowed::<PermComplaintCreate>(Customer));
        assert!(!allowed::<PermComplaintCreate>(Provider));
        assert!(allowed::<PermComplaintTriage>(Admin));
        assert!(!allowed::<PermComplaintTriage>(Customer));
        assert!(allowed::<PermComplaintClose>(Customer));
        assert!(!allowed::<PermComplaintClose>(Provider));
    }

    #[test]
    fn unknown_pairs_are_denied() {
        assert!(!is_allowed(Admin, "booking", "delete-everything"));
    }
}
