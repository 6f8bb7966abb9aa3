// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::editor::state::UserProfile;
use crate::management::{
    DomainActionKey, ManagementBus, ManagementCommand, ManagementError, ManagementResponse,
    ROLE_ACTION_EDIT_OK, ROLE_ACTION_SHOW_OK, ROLES_DOMAIN_ID, ResponsePayload, RoleCommand,
    RoleEditRequest, RoleShowRequest, USER_ACTION_MEMBERS_OK, USER_ACTION_ROLES_UPDATE_OK,
    USER_ACTION_SHOW_OK, USERS_DOMAIN_ID, UserCommand, UserMembersRequest, UserRolesUpdateRequest,
    UserShowRequest, WorkflowCounter, next_connection_id,
};
use crate::roles::Role;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Mutex;

const DEFAULT_REMOTE_MESSAGE: &str = "remote update failed";

/// Failure reported by the service behind a [`RoleAdminClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self {
                message: DEFAULT_REMOTE_MESSAGE.to_string(),
            };
        }
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for RemoteError {}

impl From<ManagementError> for RemoteError {
    fn from(err: ManagementError) -> Self {
        RemoteError::new(err.to_string())
    }
}

/// The two remote operations the membership editor depends on.
#[async_trait]
pub trait RoleAdminClient: Send + Sync {
    /// Replaces the stored permission set of `role`.
    async fn edit_role(&self, role: &Role) -> Result<(), RemoteError>;

    /// Replaces the role list of one user. `roles` is space-separated.
    async fn update_user_roles(&self, user_id: &str, roles: &str) -> Result<(), RemoteError>;
}

/// [`RoleAdminClient`] over the in-process management bus.
///
/// Each client is one bus connection; workflow ids are issued per call.
pub struct BusRoleAdminClient {
    bus: ManagementBus,
    connection_id: u32,
    workflows: Mutex<WorkflowCounter>,
}

impl BusRoleAdminClient {
    pub fn new(bus: ManagementBus) -> Self {
        Self {
            bus,
            connection_id: next_connection_id(),
            workflows: Mutex::new(WorkflowCounter::new()),
        }
    }

    pub async fn load_role(&self, role: &str) -> Result<Role, RemoteError> {
        let response = self
            .request(
                ManagementCommand::Roles(RoleCommand::Show(RoleShowRequest {
                    role: role.to_string(),
                })),
                DomainActionKey::new(ROLES_DOMAIN_ID, ROLE_ACTION_SHOW_OK),
            )
            .await?;
        match response.payload {
            ResponsePayload::RoleShow(show) => Ok(Role::from(show)),
            _ => Err(RemoteError::new("Unexpected response to role lookup")),
        }
    }

    pub async fn load_user(&self, email: &str) -> Result<UserProfile, RemoteError> {
        let response = self
            .request(
                ManagementCommand::Users(UserCommand::Show(UserShowRequest {
                    email: email.to_string(),
                })),
                DomainActionKey::new(USERS_DOMAIN_ID, USER_ACTION_SHOW_OK),
            )
            .await?;
        match response.payload {
            ResponsePayload::UserShow(show) => Ok(UserProfile::from(show)),
            _ => Err(RemoteError::new("Unexpected response to user lookup")),
        }
    }

    pub async fn role_members(&self, role: &str) -> Result<Vec<UserProfile>, RemoteError> {
        let response = self
            .request(
                ManagementCommand::Users(UserCommand::Members(UserMembersRequest {
                    role: role.to_string(),
                })),
                DomainActionKey::new(USERS_DOMAIN_ID, USER_ACTION_MEMBERS_OK),
            )
            .await?;
        match response.payload {
            ResponsePayload::UserList(list) => {
                Ok(list.users.into_iter().map(UserProfile::from).collect())
            }
            _ => Err(RemoteError::new("Unexpected response to member lookup")),
        }
    }

    async fn request(
        &self,
        command: ManagementCommand,
        success: DomainActionKey,
    ) -> Result<ManagementResponse, RemoteError> {
        let workflow_id = self
            .workflows
            .lock()
            .map_err(|_| RemoteError::new("Workflow counter lock poisoned"))?
            .next_id()?;
        let response = self
            .bus
            .send(self.connection_id, workflow_id, command)
            .await?;
        if response.key() == success {
            return Ok(response);
        }
        Err(RemoteError::new(
            response.message_text().unwrap_or(DEFAULT_REMOTE_MESSAGE),
        ))
    }
}

#[async_trait]
impl RoleAdminClient for BusRoleAdminClient {
    async fn edit_role(&self, role: &Role) -> Result<(), RemoteError> {
        self.request(
            ManagementCommand::Roles(RoleCommand::Edit(RoleEditRequest::from(role))),
            DomainActionKey::new(ROLES_DOMAIN_ID, ROLE_ACTION_EDIT_OK),
        )
        .await
        .map(|_| ())
    }

    async fn update_user_roles(&self, user_id: &str, roles: &str) -> Result<(), RemoteError> {
        self.request(
            ManagementCommand::Users(UserCommand::RolesUpdate(UserRolesUpdateRequest {
                email: user_id.to_string(),
                roles: roles.to_string(),
            })),
            DomainActionKey::new(USERS_DOMAIN_ID, USER_ACTION_ROLES_UPDATE_OK),
        )
        .await
        .map(|_| ())
    }
}
