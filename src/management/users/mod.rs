// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::iam::User;
use crate::management::core::{
    ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse,
};
use crate::management::registry::{
    DomainDescriptor, ManagementHandler, ManagementRegistry, RegistryError,
};
use crate::management::roles::ensure_roles_exist;
use crate::roles::{normalize_role, normalize_roles, parse_role_list};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const USERS_DOMAIN_ID: u32 = 1;

pub const USER_ACTION_LIST: u32 = 1;
pub const USER_ACTION_SHOW: u32 = 2;
pub const USER_ACTION_ROLES_UPDATE: u32 = 3;
pub const USER_ACTION_MEMBERS: u32 = 4;

pub const USER_ACTION_LIST_OK: u32 = 101;
pub const USER_ACTION_LIST_ERR: u32 = 102;
pub const USER_ACTION_SHOW_OK: u32 = 201;
pub const USER_ACTION_SHOW_ERR: u32 = 202;
pub const USER_ACTION_ROLES_UPDATE_OK: u32 = 301;
pub const USER_ACTION_ROLES_UPDATE_ERR: u32 = 302;
pub const USER_ACTION_MEMBERS_OK: u32 = 401;
pub const USER_ACTION_MEMBERS_ERR: u32 = 402;

const MAX_EMAIL_CHARS: usize = 254;

#[derive(Debug, Clone)]
pub enum UserCommand {
    List(UserListRequest),
    Show(UserShowRequest),
    RolesUpdate(UserRolesUpdateRequest),
    Members(UserMembersRequest),
}

impl UserCommand {
    pub fn action_id(&self) -> u32 {
        match self {
            UserCommand::List(_) => USER_ACTION_LIST,
            UserCommand::Show(_) => USER_ACTION_SHOW,
            UserCommand::RolesUpdate(_) => USER_ACTION_ROLES_UPDATE,
            UserCommand::Members(_) => USER_ACTION_MEMBERS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserShowRequest {
    pub email: String,
}

/// Replaces a user's roles. `roles` is a single space-separated list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRolesUpdateRequest {
    pub email: String,
    pub roles: String,
}

/// Lists the users holding `role`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMembersRequest {
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
            roles: user.roles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserShowResponse {
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Debug)]
struct UserValidationError {
    message: String,
}

impl UserValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UserValidationError {}

pub fn register(registry: &mut ManagementRegistry) -> Result<(), RegistryError> {
    let handler: ManagementHandler = Arc::new(|request, context| {
        Box::pin(async move { handle_users_request(request, context).await })
    });
    registry.register_domain(
        DomainDescriptor {
            name: "users",
            id: USERS_DOMAIN_ID,
            actions: &[
                ("list", USER_ACTION_LIST),
                ("show", USER_ACTION_SHOW),
                ("roles_update", USER_ACTION_ROLES_UPDATE),
                ("members", USER_ACTION_MEMBERS),
            ],
        },
        handler,
    )
}

async fn handle_users_request(
    request: ManagementRequest,
    context: Arc<ManagementContext>,
) -> ManagementResponse {
    match request.command {
        ManagementCommand::Users(UserCommand::List(payload)) => {
            handle_list(payload, request.workflow_id, &context).await
        }
        ManagementCommand::Users(UserCommand::Show(payload)) => {
            handle_show(payload, request.workflow_id, &context).await
        }
        ManagementCommand::Users(UserCommand::RolesUpdate(payload)) => {
            handle_roles_update(payload, request.workflow_id, &context).await
        }
        ManagementCommand::Users(UserCommand::Members(payload)) => {
            handle_members(payload, request.workflow_id, &context).await
        }
        _ => response_err(
            USER_ACTION_SHOW_ERR,
            request.workflow_id,
            "Invalid user command",
        ),
    }
}

async fn handle_list(
    _payload: UserListRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    match context.user_services.list_users() {
        Ok(users) => response_user_list(
            USER_ACTION_LIST_OK,
            workflow_id,
            users.into_iter().map(UserSummary::from).collect(),
        ),
        Err(err) => response_err(USER_ACTION_LIST_ERR, workflow_id, &err.to_string()),
    }
}

async fn handle_show(
    payload: UserShowRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    let user = match find_user(context, &payload.email) {
        Ok(user) => user,
        Err(err) => return response_err(USER_ACTION_SHOW_ERR, workflow_id, &err),
    };
    response_user_show(
        workflow_id,
        UserShowResponse {
            email: user.email,
            name: user.name,
            roles: user.roles,
        },
    )
}

async fn handle_roles_update(
    payload: UserRolesUpdateRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    let user = match find_user(context, &payload.email) {
        Ok(user) => user,
        Err(err) => return response_err(USER_ACTION_ROLES_UPDATE_ERR, workflow_id, &err),
    };
    let roles = match normalize_roles(&parse_role_list(&payload.roles)) {
        Ok(roles) => roles,
        Err(err) => {
            return response_err(USER_ACTION_ROLES_UPDATE_ERR, workflow_id, &err.to_string());
        }
    };
    if let Err(err) = ensure_roles_exist(context, &roles) {
        return response_err(USER_ACTION_ROLES_UPDATE_ERR, workflow_id, &err);
    }
    log::info!("Updating roles for {}: [{}]", user.email, roles.join(", "));

    let user_services = context.user_services.clone();
    let email = user.email;
    let result = context
        .blocking_pool
        .run_blocking("update user roles", move || {
            user_services
                .update_user_roles(&email, roles)
                .map_err(|err| err.to_string())
        })
        .await;
    match result {
        Ok(Ok(())) => response_ok(
            USER_ACTION_ROLES_UPDATE_OK,
            workflow_id,
            "Roles updated successfully",
        ),
        Ok(Err(err)) => response_err(USER_ACTION_ROLES_UPDATE_ERR, workflow_id, &err),
        Err(err) => response_err(USER_ACTION_ROLES_UPDATE_ERR, workflow_id, &err.to_string()),
    }
}

async fn handle_members(
    payload: UserMembersRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    let role = match normalize_role(&payload.role) {
        Ok(role) => role,
        Err(err) => return response_err(USER_ACTION_MEMBERS_ERR, workflow_id, &err.to_string()),
    };
    if let Err(err) = ensure_roles_exist(context, std::slice::from_ref(&role)) {
        return response_err(USER_ACTION_MEMBERS_ERR, workflow_id, &err);
    }
    match context.user_services.members_of(&role) {
        Ok(users) => response_user_list(
            USER_ACTION_MEMBERS_OK,
            workflow_id,
            users.into_iter().map(UserSummary::from).collect(),
        ),
        Err(err) => response_err(USER_ACTION_MEMBERS_ERR, workflow_id, &err.to_string()),
    }
}

/// Case-insensitive lookup; the stored key is kept on the returned user.
fn find_user(context: &ManagementContext, email: &str) -> Result<User, String> {
    let email = normalize_email(email).map_err(|err| err.to_string())?;
    let users = context
        .user_services
        .list_users()
        .map_err(|err| err.to_string())?;
    users
        .into_iter()
        .find(|user| user.email.to_lowercase() == email)
        .ok_or_else(|| "User not found".to_string())
}

define_domain_responses!(USERS_DOMAIN_ID);

fn response_user_list(
    action_id: u32,
    workflow_id: u32,
    users: Vec<UserSummary>,
) -> ManagementResponse {
    ManagementResponse {
        domain_id: USERS_DOMAIN_ID,
        action_id,
        workflow_id,
        payload: crate::management::ResponsePayload::UserList(UserListResponse { users }),
    }
}

fn response_user_show(workflow_id: u32, payload: UserShowResponse) -> ManagementResponse {
    ManagementResponse {
        domain_id: USERS_DOMAIN_ID,
        action_id: USER_ACTION_SHOW_OK,
        workflow_id,
        payload: crate::management::ResponsePayload::UserShow(payload),
    }
}

fn normalize_email(email: &str) -> Result<String, UserValidationError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(UserValidationError::new("Email is required"));
    }
    if normalized.chars().count() > MAX_EMAIL_CHARS {
        return Err(UserValidationError::new(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_CHARS
        )));
    }
    match normalized.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(normalized)
        }
        _ => Err(UserValidationError::new(format!(
            "Invalid email address '{}'",
            email.trim()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatedConfig;
    use crate::iam::{MemoryUserStore, UserServices};
    use crate::management::{ManagementBus, ResponsePayload, next_connection_id};
    use crate::util::test_fixtures::TestFixtureRoot;

    struct Harness {
        _fixture: TestFixtureRoot,
        bus: ManagementBus,
        user_services: Arc<UserServices>,
    }

    fn harness(name: &str) -> Harness {
        let fixture = TestFixtureRoot::new_unique(name).unwrap();
        fixture
            .write_roles("admin: {}\neditor: {}\nviewer: {}\n")
            .expect("write roles");
        let runtime_paths = fixture.runtime_paths().expect("runtime paths");
        let store = Arc::new(MemoryUserStore::from_users(vec![
            User::new("Editor@Example.com", "Editor", vec!["editor".to_string()]),
            User::new("viewer@example.com", "Viewer", vec!["viewer".to_string()]),
        ]));
        let user_services = Arc::new(UserServices::new_with_store(store).expect("users"));
        let context = ManagementContext::from_components(
            Arc::new(ValidatedConfig::for_tests()),
            runtime_paths,
            user_services.clone(),
        )
        .expect("context");
        let bus = ManagementBus::start(
            crate::management::build_default_registry().expect("registry"),
            context,
        );
        Harness {
            _fixture: fixture,
            bus,
            user_services,
        }
    }

    async fn send(harness: &Harness, command: UserCommand) -> ManagementResponse {
        harness
            .bus
            .send(next_connection_id(), 1, ManagementCommand::Users(command))
            .await
            .expect("response")
    }

    #[tokio::test]
    async fn roles_update_dedups_and_persists() {
        let harness = harness("users-roles-update");
        let response = send(
            &harness,
            UserCommand::RolesUpdate(UserRolesUpdateRequest {
                email: "viewer@example.com".to_string(),
                roles: "viewer  editor viewer".to_string(),
            }),
        )
        .await;
        assert_eq!(response.action_id, USER_ACTION_ROLES_UPDATE_OK);

        let user = harness
            .user_services
            .get_user("viewer@example.com")
            .expect("get")
            .expect("user");
        assert_eq!(user.roles, vec!["viewer".to_string(), "editor".to_string()]);
    }

    #[tokio::test]
    async fn roles_update_accepts_empty_list() {
        let harness = harness("users-roles-clear");
        let response = send(
            &harness,
            UserCommand::RolesUpdate(UserRolesUpdateRequest {
                email: "editor@example.com".to_string(),
                roles: String::new(),
            }),
        )
        .await;
        assert_eq!(response.action_id, USER_ACTION_ROLES_UPDATE_OK);
        let user = harness
            .user_services
            .get_user("Editor@Example.com")
            .expect("get")
            .expect("user");
        assert!(user.roles.is_empty());
    }

    #[tokio::test]
    async fn roles_update_rejects_unknown_role_and_user() {
        let harness = harness("users-roles-err");
        let response = send(
            &harness,
            UserCommand::RolesUpdate(UserRolesUpdateRequest {
                email: "viewer@example.com".to_string(),
                roles: "viewer ghost".to_string(),
            }),
        )
        .await;
        assert_eq!(response.action_id, USER_ACTION_ROLES_UPDATE_ERR);
        assert_eq!(response.message_text(), Some("Role 'ghost' does not exist"));

        let response = send(
            &harness,
            UserCommand::RolesUpdate(UserRolesUpdateRequest {
                email: "missing@example.com".to_string(),
                roles: "viewer".to_string(),
            }),
        )
        .await;
        assert_eq!(response.action_id, USER_ACTION_ROLES_UPDATE_ERR);
        assert_eq!(response.message_text(), Some("User not found"));
    }

    #[tokio::test]
    async fn members_lists_role_holders() {
        let harness = harness("users-members");
        let response = send(
            &harness,
            UserCommand::Members(UserMembersRequest {
                role: "editor".to_string(),
            }),
        )
        .await;
        assert_eq!(response.action_id, USER_ACTION_MEMBERS_OK);
        match response.payload {
            ResponsePayload::UserList(list) => {
                assert_eq!(list.users.len(), 1);
                assert_eq!(list.users[0].email, "Editor@Example.com");
            }
            other => panic!("Expected user list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn show_is_case_insensitive() {
        let harness = harness("users-show");
        let response = send(
            &harness,
            UserCommand::Show(UserShowRequest {
                email: " editor@example.COM ".to_string(),
            }),
        )
        .await;
        match response.payload {
            ResponsePayload::UserShow(show) => {
                assert_eq!(show.name, "Editor");
                assert_eq!(show.roles, vec!["editor".to_string()]);
            }
            other => panic!("Expected user show, got {:?}", other),
        }
    }

    #[test]
    fn normalize_email_requires_single_at() {
        assert_eq!(normalize_email(" A@B.io ").unwrap(), "a@b.io");
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("a@b@c").is_err());
        assert!(normalize_email("@b").is_err());
    }
}
