//! Static capability table
//!
//! Every handler names its [`Operation`] and calls [`authorize`] before
//! doing anything else. The table is plain data, so the whole access policy
//! reads in one place.

use crate::error::{ApiError, Result};

/// Message returned when an operation needs a caller and none was given.
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: u64,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// A verified access token accompanies the request
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListTrees,
    RetrieveTree,
    CreateTree,
    UpdateTree,
    PartialUpdateTree,
    DestroyTree,
    MyStats,
    GeoJson,
    Register,
    Login,
    RefreshToken,
    CurrentUser,
    Health,
}

const PUBLIC: &[Capability] = &[];
const AUTHENTICATED: &[Capability] = &[Capability::Authenticated];

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::ListTrees => "list_trees",
            Operation::RetrieveTree => "retrieve_tree",
            Operation::CreateTree => "create_tree",
            Operation::UpdateTree => "update_tree",
            Operation::PartialUpdateTree => "partial_update_tree",
            Operation::DestroyTree => "destroy_tree",
            Operation::MyStats => "my_stats",
            Operation::GeoJson => "geojson",
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::RefreshToken => "refresh_token",
            Operation::CurrentUser => "current_user",
            Operation::Health => "health",
        }
    }

    /// Capabilities a caller must hold to run this operation.
    pub fn required(self) -> &'static [Capability] {
        match self {
            Operation::ListTrees
            | Operation::RetrieveTree
            | Operation::GeoJson
            | Operation::Register
            | Operation::Login
            | Operation::RefreshToken
            | Operation::Health => PUBLIC,
            Operation::CreateTree
            | Operation::UpdateTree
            | Operation::PartialUpdateTree
            | Operation::DestroyTree
            | Operation::MyStats
            | Operation::CurrentUser => AUTHENTICATED,
        }
    }
}

/// Checks `caller` against the table and hands it back on success.
pub fn authorize(op: Operation, caller: Option<&Principal>) -> Result<Option<&Principal>> {
    for capability in op.required() {
        match capability {
            Capability::Authenticated if caller.is_none() => {
                tracing::debug!(operation = op.name(), "anonymous caller rejected");
                return Err(ApiError::AuthRequired(NOT_AUTHENTICATED.to_string()));
            }
            Capability::Authenticated => {}
        }
    }
    Ok(caller)
}

/// Like [`authorize`], for operations whose table entry demands a caller.
pub fn authorize_principal(op: Operation, caller: Option<&Principal>) -> Result<&Principal> {
    authorize(op, caller)?
        .ok_or_else(|| ApiError::AuthRequired(NOT_AUTHENTICATED.to_string()))
}
