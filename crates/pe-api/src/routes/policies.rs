//! Password policy administration endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use pe_core::QueryOrder;
use uuid::Uuid;
use validator::Validate;

use crate::auth::RequireAdmin;
use crate::dto::{
    ConstraintResponse, CreateConstraintRequest, CreatePolicyRequest, DeleteResponse,
    PolicyListQuery, PolicyResponse, ResolveResponse, UpdatePolicyRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Creates policy routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_policies).post(create_policy))
        .route("/resolve", get(resolve_policy))
        .route(
            "/:id",
            get(get_policy).put(update_policy).delete(delete_policy),
        )
        .route(
            "/:id/constraints",
            get(list_constraints).post(add_constraint),
        )
        .route(
            "/:id/constraints/:constraint_id",
            delete(delete_constraint),
        )
}

/// Splits the `roles` query value. Absent means all roles; an empty value
/// means none.
fn parse_roles(roles: Option<&str>) -> Option<Vec<String>> {
    roles.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect()
    })
}

fn parse_order(order: Option<&str>) -> Result<QueryOrder, ApiError> {
    match order {
        Some(raw) => raw.parse().map_err(ApiError::BadRequest),
        None => Ok(QueryOrder::default()),
    }
}

/// Lists policies for the requested roles in ranked order.
async fn list_policies(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PolicyListQuery>,
) -> Result<Json<Vec<PolicyResponse>>, ApiError> {
    let roles = parse_roles(query.roles.as_deref());
    let order = parse_order(query.order.as_deref())?;

    let policies = state.resolver.resolve_all(roles.as_deref(), order).await?;
    Ok(Json(policies.into_iter().map(PolicyResponse::from).collect()))
}

/// Returns the single governing policy for the requested roles.
async fn resolve_policy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PolicyListQuery>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let roles = parse_roles(query.roles.as_deref());
    let order = parse_order(query.order.as_deref())?;

    let policy = state.resolver.resolve_one(roles.as_deref(), order).await?;
    Ok(Json(ResolveResponse {
        policy: policy.map(PolicyResponse::from),
    }))
}

async fn create_policy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<CreatePolicyRequest>,
) -> Result<(StatusCode, Json<PolicyResponse>), ApiError> {
    request.validate()?;

    let policy = state.policy_store.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(policy.into())))
}

async fn get_policy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<PolicyResponse>, ApiError> {
    let policy = state.policy_store.load(&id).await?;
    Ok(Json(policy.into()))
}

async fn update_policy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<UpdatePolicyRequest>,
) -> Result<Json<PolicyResponse>, ApiError> {
    let policy = state.policy_store.update(&id, request.into()).await?;
    Ok(Json(policy.into()))
}

/// Deletes a policy and its constraints. Deleting an absent policy succeeds.
async fn delete_policy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let report = state.policy_store.delete(&[id]).await?;
    Ok(Json(report.into()))
}

async fn list_constraints(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Vec<ConstraintResponse>>, ApiError> {
    // Distinguish "no constraints" from "no such policy".
    state.policy_store.load(&id).await?;

    let constraints = state.policy_store.constraints_for(&id).await?;
    Ok(Json(
        constraints.into_iter().map(ConstraintResponse::from).collect(),
    ))
}

async fn add_constraint(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<CreateConstraintRequest>,
) -> Result<(StatusCode, Json<ConstraintResponse>), ApiError> {
    request.validate()?;

    let constraint = state
        .policy_store
        .add_constraint(request.into_new_constraint(id))
        .await?;
    Ok((StatusCode::CREATED, Json(constraint.into())))
}

async fn delete_constraint(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((id, constraint_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .policy_store
        .delete_constraint(&id, constraint_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roles() {
        assert_eq!(parse_roles(None), None);
        assert_eq!(parse_roles(Some("")), Some(vec![]));
        assert_eq!(
            parse_roles(Some("editor, admin")),
            Some(vec!["editor".to_string(), "admin".to_string()])
        );
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order(None).unwrap(), QueryOrder::Desc);
        assert_eq!(parse_order(Some("asc")).unwrap(), QueryOrder::Asc);
        assert!(parse_order(Some("up")).is_err());
    }
}
