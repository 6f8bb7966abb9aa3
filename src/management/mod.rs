// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Typed management commands, dispatched over an in-process bus to the
//! users and roles domains.

macro_rules! define_domain_responses {
    ($domain_id:expr) => {
        fn response_ok(
            action_id: u32,
            workflow_id: u32,
            message: &str,
        ) -> crate::management::ManagementResponse {
            crate::management::ManagementResponse::text($domain_id, action_id, workflow_id, message)
        }

        fn response_err(
            action_id: u32,
            workflow_id: u32,
            message: &str,
        ) -> crate::management::ManagementResponse {
            log::warn!(
                "Domain {} action {} failed: {}",
                $domain_id,
                action_id,
                message
            );
            crate::management::ManagementResponse::text($domain_id, action_id, workflow_id, message)
        }
    };
}

mod blocking;
mod bus;
pub mod cli;
pub mod cli_helper;
mod connection_ids;
mod core;
mod errors;
mod registry;
mod roles;
mod users;
mod workflow;
pub(crate) mod yaml_store;

pub use blocking::{BlockingError, BlockingPool};
pub use bus::ManagementBus;
pub use connection_ids::next_connection_id;
pub use core::{
    ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse, MessageResponse,
    ResponsePayload,
};
pub use errors::ManagementError;
pub use registry::{
    DomainActionKey, DomainDescriptor, ManagementHandler, ManagementRegistry, RegistryError,
};
pub use roles::{
    ROLE_ACTION_ADD, ROLE_ACTION_ADD_ERR, ROLE_ACTION_ADD_OK, ROLE_ACTION_EDIT,
    ROLE_ACTION_EDIT_ERR, ROLE_ACTION_EDIT_OK, ROLE_ACTION_LIST, ROLE_ACTION_LIST_ERR,
    ROLE_ACTION_LIST_OK, ROLE_ACTION_SHOW, ROLE_ACTION_SHOW_ERR, ROLE_ACTION_SHOW_OK,
    ROLES_DOMAIN_ID, RoleAddRequest, RoleCommand, RoleEditRequest, RoleListRequest,
    RoleListResponse, RoleShowRequest, RoleShowResponse,
};
pub use users::{
    USER_ACTION_LIST, USER_ACTION_LIST_ERR, USER_ACTION_LIST_OK, USER_ACTION_MEMBERS,
    USER_ACTION_MEMBERS_ERR, USER_ACTION_MEMBERS_OK, USER_ACTION_ROLES_UPDATE,
    USER_ACTION_ROLES_UPDATE_ERR, USER_ACTION_ROLES_UPDATE_OK, USER_ACTION_SHOW,
    USER_ACTION_SHOW_ERR, USER_ACTION_SHOW_OK, USERS_DOMAIN_ID, UserCommand, UserListRequest,
    UserListResponse, UserMembersRequest, UserRolesUpdateRequest, UserShowRequest,
    UserShowResponse, UserSummary,
};
pub use workflow::WorkflowCounter;

pub fn build_default_registry() -> Result<ManagementRegistry, RegistryError> {
    let mut registry = ManagementRegistry::new();
    users::register(&mut registry)?;
    roles::register(&mut registry)?;
    Ok(registry)
}
