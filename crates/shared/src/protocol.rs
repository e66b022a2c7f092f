use serde::{Deserialize, Serialize};

use crate::domain::{CompanyId, Plan, Role, UserId};

/// Subdomain the backend expects for console logins.
pub const SUPER_ADMIN_SUBDOMAIN: &str = "superadminpage";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
    pub subdomain: String,
}

impl LoginRequest {
    pub fn super_admin(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            subdomain: SUPER_ADMIN_SUBDOMAIN.to_string(),
        }
    }
}

/// Profile of the authenticated account, persisted next to the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "empresaId", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "usuario")]
    pub user: SessionUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanChange {
    #[serde(rename = "plano")]
    pub plan: Plan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveChange {
    #[serde(rename = "ativo")]
    pub active: bool,
}
