// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::ValidatedConfig;
use crate::iam::UserServices;
use crate::management::blocking::BlockingPool;
use crate::management::errors::ManagementError;
use crate::management::registry::DomainActionKey;
use crate::management::roles::{ROLES_DOMAIN_ID, RoleCommand, RoleStore};
use crate::management::users::{USERS_DOMAIN_ID, UserCommand};
use crate::runtime_paths::RuntimePaths;
use std::path::Path;
use std::sync::Arc;

/// Longest message text a response carries; longer text is cut.
const MAX_MESSAGE_CHARS: usize = 1024;

/// Stores and limits shared by every domain handler.
#[derive(Clone)]
pub struct ManagementContext {
    pub config: Arc<ValidatedConfig>,
    pub user_services: Arc<UserServices>,
    pub blocking_pool: BlockingPool,
    pub(crate) role_store: Arc<RoleStore>,
}

impl ManagementContext {
    pub fn from_components(
        config: Arc<ValidatedConfig>,
        runtime_paths: RuntimePaths,
        user_services: Arc<UserServices>,
    ) -> Result<Self, ManagementError> {
        let role_store = RoleStore::new(runtime_paths.state_sys_dir)
            .map_err(|err| ManagementError::Setup(format!("Role store error: {}", err)))?;
        Ok(Self {
            blocking_pool: BlockingPool::from_config(&config.management),
            config,
            user_services,
            role_store: Arc::new(role_store),
        })
    }

    /// Bootstraps `root` if needed and opens its user and role stores.
    pub fn from_runtime_root(root: &Path) -> Result<Self, ManagementError> {
        let bootstrap = crate::bootstrap::bootstrap_runtime(root)
            .map_err(|err| ManagementError::Setup(format!("Bootstrap error: {}", err)))?;
        let users = UserServices::new(bootstrap.runtime_paths.users_file.clone())
            .map_err(|err| ManagementError::Setup(format!("User services error: {}", err)))?;
        Self::from_components(
            Arc::new(bootstrap.validated_config),
            bootstrap.runtime_paths,
            Arc::new(users),
        )
    }
}

#[derive(Debug, Clone)]
pub enum ManagementCommand {
    Users(UserCommand),
    Roles(RoleCommand),
}

impl ManagementCommand {
    /// The domain and request action this command is routed by.
    pub fn key(&self) -> DomainActionKey {
        match self {
            ManagementCommand::Users(command) => {
                DomainActionKey::new(USERS_DOMAIN_ID, command.action_id())
            }
            ManagementCommand::Roles(command) => {
                DomainActionKey::new(ROLES_DOMAIN_ID, command.action_id())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagementRequest {
    pub workflow_id: u32,
    pub connection_id: u32,
    pub command: ManagementCommand,
}

#[derive(Debug, Clone)]
pub struct ManagementResponse {
    pub domain_id: u32,
    pub action_id: u32,
    pub workflow_id: u32,
    pub payload: ResponsePayload,
}

impl ManagementResponse {
    /// Plain-text response, cut to the message limit.
    pub(crate) fn text(domain_id: u32, action_id: u32, workflow_id: u32, message: &str) -> Self {
        Self {
            domain_id,
            action_id,
            workflow_id,
            payload: ResponsePayload::Message(MessageResponse {
                message: message.chars().take(MAX_MESSAGE_CHARS).collect(),
            }),
        }
    }

    pub fn key(&self) -> DomainActionKey {
        DomainActionKey::new(self.domain_id, self.action_id)
    }

    pub fn message_text(&self) -> Option<&str> {
        match &self.payload {
            ResponsePayload::Message(message) => Some(&message.message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResponsePayload {
    Message(MessageResponse),
    UserList(crate::management::users::UserListResponse),
    UserShow(crate::management::users::UserShowResponse),
    RoleList(crate::management::roles::RoleListResponse),
    RoleShow(crate::management::roles::RoleShowResponse),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::{ROLE_ACTION_LIST, RoleListRequest, USER_ACTION_SHOW, UserShowRequest};

    #[test]
    fn commands_route_by_domain_and_action() {
        let roles = ManagementCommand::Roles(RoleCommand::List(RoleListRequest {}));
        assert_eq!(roles.key(), DomainActionKey::new(ROLES_DOMAIN_ID, ROLE_ACTION_LIST));
        let users = ManagementCommand::Users(UserCommand::Show(UserShowRequest {
            email: "ann@example.com".to_string(),
        }));
        assert_eq!(users.key(), DomainActionKey::new(USERS_DOMAIN_ID, USER_ACTION_SHOW));
    }

    #[test]
    fn text_response_is_cut_at_message_limit() {
        let response = ManagementResponse::text(ROLES_DOMAIN_ID, 102, 7, &"e".repeat(2000));
        assert_eq!(response.key(), DomainActionKey::new(ROLES_DOMAIN_ID, 102));
        assert_eq!(response.workflow_id, 7);
        assert_eq!(
            response.message_text().map(|text| text.chars().count()),
            Some(MAX_MESSAGE_CHARS)
        );
        let short = ManagementResponse::text(ROLES_DOMAIN_ID, 101, 4, "done");
        assert_eq!(short.message_text(), Some("done"));
    }
}
