// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::core::{
    ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse,
};
use crate::management::registry::{
    DomainDescriptor, ManagementHandler, ManagementRegistry, RegistryError,
};
use crate::management::yaml_store;
use crate::roles::{
    ADMIN_ROLE, MAX_ROLE_COUNT, PermissionLevel, Role, RoleValidationError, normalize_permission,
    normalize_role, validate_permission_set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const ROLES_DOMAIN_ID: u32 = 13;

pub const ROLE_ACTION_ADD: u32 = 1;
pub const ROLE_ACTION_EDIT: u32 = 2;
pub const ROLE_ACTION_LIST: u32 = 3;
pub const ROLE_ACTION_SHOW: u32 = 4;

pub const ROLE_ACTION_ADD_OK: u32 = 101;
pub const ROLE_ACTION_ADD_ERR: u32 = 102;
pub const ROLE_ACTION_EDIT_OK: u32 = 201;
pub const ROLE_ACTION_EDIT_ERR: u32 = 202;
pub const ROLE_ACTION_LIST_OK: u32 = 301;
pub const ROLE_ACTION_LIST_ERR: u32 = 302;
pub const ROLE_ACTION_SHOW_OK: u32 = 401;
pub const ROLE_ACTION_SHOW_ERR: u32 = 402;

const ROLES_FILE_NAME: &str = "roles.yaml";

#[derive(Debug, Clone)]
pub enum RoleCommand {
    Add(RoleAddRequest),
    Edit(RoleEditRequest),
    List(RoleListRequest),
    Show(RoleShowRequest),
}

impl RoleCommand {
    pub fn action_id(&self) -> u32 {
        match self {
            RoleCommand::Add(_) => ROLE_ACTION_ADD,
            RoleCommand::Edit(_) => ROLE_ACTION_EDIT,
            RoleCommand::List(_) => ROLE_ACTION_LIST,
            RoleCommand::Show(_) => ROLE_ACTION_SHOW,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAddRequest {
    pub role: String,
}

/// Replaces the whole permission set of an existing role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEditRequest {
    pub role: String,
    pub permissions: BTreeMap<String, PermissionLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleListRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleShowRequest {
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleListResponse {
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleShowResponse {
    pub role: String,
    pub permissions: BTreeMap<String, PermissionLevel>,
}

impl From<RoleShowResponse> for Role {
    fn from(response: RoleShowResponse) -> Self {
        Role {
            name: response.role,
            permissions: response.permissions,
        }
    }
}

impl From<&Role> for RoleEditRequest {
    fn from(role: &Role) -> Self {
        RoleEditRequest {
            role: role.name.clone(),
            permissions: role.permissions.clone(),
        }
    }
}

impl RoleEditRequest {
    fn normalized_permissions(
        &self,
    ) -> Result<BTreeMap<String, PermissionLevel>, RoleValidationError> {
        let mut permissions = BTreeMap::new();
        for (name, level) in &self.permissions {
            permissions.insert(normalize_permission(name)?, *level);
        }
        validate_permission_set(&permissions)?;
        Ok(permissions)
    }
}

#[derive(Debug)]
pub(crate) struct RoleStoreError {
    message: String,
}

impl RoleStoreError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RoleStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RoleStoreError {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RoleRecord {
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionLevel>,
}

/// On-disk shapes of `roles.yaml`; a bare name list is upgraded on load.
#[derive(Deserialize)]
#[serde(untagged)]
enum RolesFile {
    Names(Vec<String>),
    Records(BTreeMap<String, Option<RoleRecord>>),
}

pub(crate) type RoleRecords = BTreeMap<String, RoleRecord>;

pub(crate) struct RoleStore {
    roles_file: PathBuf,
    roles: RwLock<RoleRecords>,
}

impl RoleStore {
    pub fn new(state_sys_dir: PathBuf) -> Result<Self, RoleStoreError> {
        let roles_file = state_sys_dir.join(ROLES_FILE_NAME);
        let (roles, should_persist) = Self::load_from_disk(&roles_file)?;
        let store = Self {
            roles_file,
            roles: RwLock::new(roles),
        };
        if should_persist {
            let snapshot = store.snapshot()?;
            store.persist(snapshot)?;
            log::info!("Initialized {}", store.roles_file.display());
        }
        Ok(store)
    }

    pub fn snapshot(&self) -> Result<RoleRecords, RoleStoreError> {
        self.roles
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| RoleStoreError::new("Role store lock poisoned"))
    }

    pub fn get(&self, role: &str) -> Result<Option<Role>, RoleStoreError> {
        let guard = self
            .roles
            .read()
            .map_err(|_| RoleStoreError::new("Role store lock poisoned"))?;
        Ok(guard.get(role).map(|record| Role {
            name: role.to_string(),
            permissions: record.permissions.clone(),
        }))
    }

    /// Writes `roles` to disk, then swaps the cache. Blocking.
    pub fn persist(&self, roles: RoleRecords) -> Result<(), RoleStoreError> {
        yaml_store::write_yaml_file(&self.roles_file, "roles", &roles)
            .map_err(|err| RoleStoreError::new(err.to_string()))?;
        let mut guard = self
            .roles
            .write()
            .map_err(|_| RoleStoreError::new("Role store lock poisoned"))?;
        *guard = roles;
        Ok(())
    }

    fn load_from_disk(roles_file: &Path) -> Result<(RoleRecords, bool), RoleStoreError> {
        let raw: Option<RolesFile> = yaml_store::read_yaml_file(roles_file, "roles")
            .map_err(|err| RoleStoreError::new(err.to_string()))?;
        let (entries, mut should_persist) = match raw {
            None => (Vec::new(), true),
            Some(RolesFile::Names(names)) => (
                names
                    .into_iter()
                    .map(|name| (name, RoleRecord::default()))
                    .collect::<Vec<_>>(),
                true,
            ),
            Some(RolesFile::Records(records)) => (
                records
                    .into_iter()
                    .map(|(name, record)| (name, record.unwrap_or_default()))
                    .collect(),
                false,
            ),
        };
        if entries.len() > MAX_ROLE_COUNT {
            return Err(RoleStoreError::new(format!(
                "Roles must be at most {} entries",
                MAX_ROLE_COUNT
            )));
        }
        let mut roles = RoleRecords::new();
        for (name, record) in entries {
            let normalized =
                normalize_role(&name).map_err(|err| RoleStoreError::new(err.to_string()))?;
            validate_permission_set(&record.permissions).map_err(|err| {
                RoleStoreError::new(format!("Role '{}': {}", normalized, err))
            })?;
            roles.insert(normalized, record);
        }
        if !roles.contains_key(ADMIN_ROLE) {
            roles.insert(ADMIN_ROLE.to_string(), RoleRecord::default());
            should_persist = true;
        }
        Ok((roles, should_persist))
    }
}

pub fn register(registry: &mut ManagementRegistry) -> Result<(), RegistryError> {
    let handler: ManagementHandler = Arc::new(|request, context| {
        Box::pin(async move { handle_roles_request(request, context).await })
    });
    registry.register_domain(
        DomainDescriptor {
            name: "roles",
            id: ROLES_DOMAIN_ID,
            actions: &[
                ("add", ROLE_ACTION_ADD),
                ("edit", ROLE_ACTION_EDIT),
                ("list", ROLE_ACTION_LIST),
                ("show", ROLE_ACTION_SHOW),
            ],
        },
        handler,
    )
}

async fn handle_roles_request(
    request: ManagementRequest,
    context: Arc<ManagementContext>,
) -> ManagementResponse {
    let workflow_id = request.workflow_id;
    match request.command {
        ManagementCommand::Roles(RoleCommand::Add(payload)) => {
            handle_add(payload, workflow_id, &context).await
        }
        ManagementCommand::Roles(RoleCommand::Edit(payload)) => {
            handle_edit(payload, workflow_id, &context).await
        }
        ManagementCommand::Roles(RoleCommand::List(payload)) => {
            handle_list(payload, workflow_id, &context).await
        }
        ManagementCommand::Roles(RoleCommand::Show(payload)) => {
            handle_show(payload, workflow_id, &context).await
        }
        _ => response_err(
            ROLE_ACTION_ADD_ERR,
            workflow_id,
            "Unsupported command for role domain",
        ),
    }
}

async fn handle_add(
    payload: RoleAddRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    let role = match normalize_role(&payload.role) {
        Ok(role) => role,
        Err(err) => return response_err(ROLE_ACTION_ADD_ERR, workflow_id, &err.to_string()),
    };
    log::info!("Adding role {}", role);
    if role == ADMIN_ROLE {
        return response_err(
            ROLE_ACTION_ADD_ERR,
            workflow_id,
            "Admin role already exists",
        );
    }
    let mut roles = match context.role_store.snapshot() {
        Ok(roles) => roles,
        Err(err) => return response_err(ROLE_ACTION_ADD_ERR, workflow_id, &err.to_string()),
    };
    if roles.len() >= MAX_ROLE_COUNT {
        return response_err(
            ROLE_ACTION_ADD_ERR,
            workflow_id,
            &format!("Roles must be at most {} entries", MAX_ROLE_COUNT),
        );
    }
    if roles.contains_key(&role) {
        return response_err(ROLE_ACTION_ADD_ERR, workflow_id, "Role already exists");
    }
    roles.insert(role, RoleRecord::default());
    if let Err(err) = persist_roles(context, roles).await {
        return response_err(ROLE_ACTION_ADD_ERR, workflow_id, &err);
    }
    response_ok(ROLE_ACTION_ADD_OK, workflow_id, "Role created successfully")
}

async fn handle_edit(
    payload: RoleEditRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    let role = match normalize_role(&payload.role) {
        Ok(role) => role,
        Err(err) => return response_err(ROLE_ACTION_EDIT_ERR, workflow_id, &err.to_string()),
    };
    let permissions = match payload.normalized_permissions() {
        Ok(permissions) => permissions,
        Err(err) => return response_err(ROLE_ACTION_EDIT_ERR, workflow_id, &err.to_string()),
    };
    log::info!(
        "Editing role {} ({} permission(s))",
        role,
        permissions.len()
    );
    let mut roles = match context.role_store.snapshot() {
        Ok(roles) => roles,
        Err(err) => return response_err(ROLE_ACTION_EDIT_ERR, workflow_id, &err.to_string()),
    };
    let record = match roles.get_mut(&role) {
        Some(record) => record,
        None => return response_err(ROLE_ACTION_EDIT_ERR, workflow_id, "Role not found"),
    };
    if record.permissions == permissions {
        return response_ok(ROLE_ACTION_EDIT_OK, workflow_id, "Role is unchanged");
    }
    record.permissions = permissions;
    if let Err(err) = persist_roles(context, roles).await {
        return response_err(ROLE_ACTION_EDIT_ERR, workflow_id, &err);
    }
    response_ok(ROLE_ACTION_EDIT_OK, workflow_id, "Role updated successfully")
}

async fn handle_list(
    _payload: RoleListRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    let roles = match context.role_store.snapshot() {
        Ok(roles) => roles,
        Err(err) => return response_err(ROLE_ACTION_LIST_ERR, workflow_id, &err.to_string()),
    };
    response_role_list(workflow_id, roles.into_keys().collect())
}

async fn handle_show(
    payload: RoleShowRequest,
    workflow_id: u32,
    context: &ManagementContext,
) -> ManagementResponse {
    let role = match normalize_role(&payload.role) {
        Ok(role) => role,
        Err(err) => return response_err(ROLE_ACTION_SHOW_ERR, workflow_id, &err.to_string()),
    };
    match context.role_store.get(&role) {
        Ok(Some(found)) => response_role_show(
            workflow_id,
            RoleShowResponse {
                role: found.name,
                permissions: found.permissions,
            },
        ),
        Ok(None) => response_err(ROLE_ACTION_SHOW_ERR, workflow_id, "Role not found"),
        Err(err) => response_err(ROLE_ACTION_SHOW_ERR, workflow_id, &err.to_string()),
    }
}

async fn persist_roles(context: &ManagementContext, roles: RoleRecords) -> Result<(), String> {
    let store = context.role_store.clone();
    context
        .blocking_pool
        .run_blocking("persist roles", move || store.persist(roles))
        .await
        .map_err(|err| err.to_string())?
        .map_err(|err| err.to_string())
}

define_domain_responses!(ROLES_DOMAIN_ID);

fn response_role_list(workflow_id: u32, roles: Vec<String>) -> ManagementResponse {
    ManagementResponse {
        domain_id: ROLES_DOMAIN_ID,
        action_id: ROLE_ACTION_LIST_OK,
        workflow_id,
        payload: crate::management::ResponsePayload::RoleList(RoleListResponse { roles }),
    }
}

fn response_role_show(workflow_id: u32, payload: RoleShowResponse) -> ManagementResponse {
    ManagementResponse {
        domain_id: ROLES_DOMAIN_ID,
        action_id: ROLE_ACTION_SHOW_OK,
        workflow_id,
        payload: crate::management::ResponsePayload::RoleShow(payload),
    }
}

pub(crate) fn ensure_roles_exist(
    context: &ManagementContext,
    roles: &[String],
) -> Result<(), String> {
    let available = context
        .role_store
        .snapshot()
        .map_err(|err| err.to_string())?;
    for role in roles {
        if !available.contains_key(role) {
            return Err(format!("Role '{}' does not exist", role));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatedConfig;
    use crate::iam::UserServices;
    use crate::management::{ManagementBus, ResponsePayload, next_connection_id};
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::fs;

    fn start_bus(fixture: &TestFixtureRoot) -> ManagementBus {
        let runtime_paths = fixture.runtime_paths().expect("runtime paths");
        let user_services =
            Arc::new(UserServices::new(runtime_paths.users_file.clone()).expect("users"));
        let context = ManagementContext::from_components(
            Arc::new(ValidatedConfig::for_tests()),
            runtime_paths,
            user_services,
        )
        .expect("context");
        ManagementBus::start(
            crate::management::build_default_registry().expect("registry"),
            context,
        )
    }

    async fn send(bus: &ManagementBus, command: RoleCommand) -> ManagementResponse {
        bus.send(next_connection_id(), 1, ManagementCommand::Roles(command))
            .await
            .expect("response")
    }

    #[test]
    fn role_store_creates_admin_role() {
        let fixture = TestFixtureRoot::new_unique("role-store").unwrap();
        let runtime_paths = fixture.runtime_paths().expect("runtime paths");
        let store = RoleStore::new(runtime_paths.state_sys_dir.clone()).expect("role store");
        let roles = store.snapshot().expect("role snapshot");
        assert!(roles.contains_key(ADMIN_ROLE));
        assert!(fixture.roles_file().exists());
    }

    #[test]
    fn role_store_upgrades_name_list() {
        let fixture = TestFixtureRoot::new_unique("role-store-legacy").unwrap();
        fixture.write_roles("- admin\n- editor\n").expect("write roles");
        let runtime_paths = fixture.runtime_paths().expect("runtime paths");

        let store = RoleStore::new(runtime_paths.state_sys_dir.clone()).expect("role store");
        assert!(store.get("editor").expect("get").is_some());

        let content = fs::read_to_string(fixture.roles_file()).expect("read roles");
        let records: RoleRecords = serde_yaml::from_str(&content).expect("parse roles");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn role_store_rejects_stored_revocation() {
        let fixture = TestFixtureRoot::new_unique("role-store-revoked").unwrap();
        fixture
            .write_roles("admin: {}\neditor:\n  permissions:\n    pages: revoked\n")
            .expect("write roles");
        let runtime_paths = fixture.runtime_paths().expect("runtime paths");
        let err = RoleStore::new(runtime_paths.state_sys_dir.clone())
            .err()
            .expect("revoked rejected");
        assert!(err.to_string().contains("editor"));
    }

    #[tokio::test]
    async fn role_edit_replaces_permissions_and_persists() {
        let fixture = TestFixtureRoot::new_unique("role-edit").unwrap();
        fixture
            .write_roles("admin: {}\neditor:\n  permissions:\n    pages: read\n")
            .expect("write roles");
        let bus = start_bus(&fixture);

        let role = Role::new("editor")
            .with_permission("pages", PermissionLevel::ReadWrite)
            .with_permission("themes", PermissionLevel::ReadOnly);
        let response = send(&bus, RoleCommand::Edit(RoleEditRequest::from(&role))).await;
        assert_eq!(response.action_id, ROLE_ACTION_EDIT_OK);

        let response = send(
            &bus,
            RoleCommand::Show(RoleShowRequest {
                role: "editor".to_string(),
            }),
        )
        .await;
        match response.payload {
            ResponsePayload::RoleShow(show) => assert_eq!(Role::from(show), role),
            other => panic!("Expected role show, got {:?}", other),
        }

        let content = fs::read_to_string(fixture.roles_file()).expect("read roles");
        assert!(content.contains("themes: read"));
    }

    #[tokio::test]
    async fn role_edit_rejects_unknown_role_and_revoked_levels() {
        let fixture = TestFixtureRoot::new_unique("role-edit-err").unwrap();
        let bus = start_bus(&fixture);

        let response = send(
            &bus,
            RoleCommand::Edit(RoleEditRequest::from(&Role::new("ghost"))),
        )
        .await;
        assert_eq!(response.action_id, ROLE_ACTION_EDIT_ERR);
        assert_eq!(response.message_text(), Some("Role not found"));

        let revoked = Role::new("admin").with_permission("pages", PermissionLevel::Revoked);
        let response = send(&bus, RoleCommand::Edit(RoleEditRequest::from(&revoked))).await;
        assert_eq!(response.action_id, ROLE_ACTION_EDIT_ERR);
    }

    #[tokio::test]
    async fn role_add_rejects_duplicates() {
        let fixture = TestFixtureRoot::new_unique("role-add").unwrap();
        let bus = start_bus(&fixture);
        let add = || {
            RoleCommand::Add(RoleAddRequest {
                role: " editor ".to_string(),
            })
        };

        assert_eq!(send(&bus, add()).await.action_id, ROLE_ACTION_ADD_OK);
        let response = send(&bus, add()).await;
        assert_eq!(response.action_id, ROLE_ACTION_ADD_ERR);
        assert_eq!(response.message_text(), Some("Role already exists"));

        let response = send(
            &bus,
            RoleCommand::Add(RoleAddRequest {
                role: ADMIN_ROLE.to_string(),
            }),
        )
        .await;
        assert_eq!(response.action_id, ROLE_ACTION_ADD_ERR);

        match send(&bus, RoleCommand::List(RoleListRequest {})).await.payload {
            ResponsePayload::RoleList(list) => {
                assert_eq!(list.roles, vec!["admin".to_string(), "editor".to_string()])
            }
            other => panic!("Expected role list, got {:?}", other),
        }
    }
}
