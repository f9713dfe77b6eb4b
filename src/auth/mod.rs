pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{directory::UserType, error::AppError, state::AppState};

/// The authenticated caller, as resolved from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub company: Option<String>,
    pub verified: bool,
    pub is_approved: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    pub fn is_hr(&self) -> bool {
        self.user_type == UserType::Hr
    }

    pub fn is_manager(&self) -> bool {
        self.is_admin() || self.is_hr()
    }

    pub fn belongs_to(&self, company: &str) -> bool {
        self.company.as_deref() == Some(company)
    }

    /// Admins manage every company; HR only their own.
    pub fn manages(&self, company: &str) -> bool {
        self.is_admin() || (self.is_hr() && self.belongs_to(company))
    }
}

impl From<jwt::Claims> for Actor {
    fn from(claims: jwt::Claims) -> Self {
        Actor {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
            user_type: claims.user_type,
            company: claims.company,
            verified: claims.verified,
            is_approved: claims.is_approved,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(Actor::from(claims))
    }
}
