// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;

use crate::auth::Auth;
use crate::models::AccountResponse;

/// Get the current authenticated account.
///
/// This endpoint returns the identity and role behind the bearer token.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account information", body = AccountResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(actor): Auth) -> Json<AccountResponse> {
    Json(AccountResponse::from(&actor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Actor, Role};
    use crate::storage::AccountId;

    #[tokio::test]
    async fn returns_actor_identity() {
        let actor = Actor {
            account_id: AccountId(7),
            username: "alice".to_string(),
            role: Role::Client,
            session_id: Some("sess_abc".to_string()),
        };

        let Json(response) = get_current_user(Auth(actor)).await;
        assert_eq!(response.account_id, AccountId(7));
        assert_eq!(response.username, "alice");
        assert_eq!(response.role, Role::Client);
    }
}
