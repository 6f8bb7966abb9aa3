// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::editor::{BusRoleAdminClient, EditorError, MembershipEditor, RemoteError, UserProfile};
use crate::management::bus::ManagementBus;
use crate::management::cli::CliError;
use crate::management::core::{ManagementCommand, ManagementResponse};
use crate::management::errors::ManagementError;
use crate::management::registry::DomainActionKey;
use crate::management::{
    ManagementContext, ResponsePayload, WorkflowCounter, build_default_registry, next_connection_id,
};
use crate::roles::PermissionLevel;
use std::path::Path;

#[derive(Debug)]
pub enum CliCommand {
    /// A single management request and the responses that count as success.
    Request {
        command: ManagementCommand,
        success_actions: Vec<DomainActionKey>,
    },
    /// Membership and permission edit for one role, saved through the editor.
    EditMembers(MembersEdit),
}

impl CliCommand {
    pub fn request(command: ManagementCommand, success: DomainActionKey) -> Self {
        CliCommand::Request {
            command,
            success_actions: vec![success],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembersEdit {
    pub role: String,
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub permissions: Vec<(String, PermissionLevel)>,
}

pub async fn execute(runtime_root: &Path, cli_command: CliCommand) -> Result<i32, CliError> {
    let bus = start_bus(runtime_root)?;
    match cli_command {
        CliCommand::Request {
            command,
            success_actions,
        } => {
            let connection_id = next_connection_id();
            let workflow_id = WorkflowCounter::new().next_id()?;
            let response = bus.send(connection_id, workflow_id, command).await?;
            Ok(output_response(&response, &success_actions))
        }
        CliCommand::EditMembers(edit) => edit_members(BusRoleAdminClient::new(bus), edit).await,
    }
}

fn start_bus(runtime_root: &Path) -> Result<ManagementBus, CliError> {
    let registry = build_default_registry().map_err(|err| CliError::connector(err.to_string()))?;
    let context = ManagementContext::from_runtime_root(runtime_root)?;
    Ok(ManagementBus::start(registry, context))
}

async fn edit_members(client: BusRoleAdminClient, edit: MembersEdit) -> Result<i32, CliError> {
    let role = client.load_role(&edit.role).await?;
    let role_name = role.name.clone();
    let mut editor = MembershipEditor::new(role);

    // Removals first so that `--remove x --add x` cancels out.
    for user in load_users(&client, &edit.remove).await? {
        if !user.roles.contains(&role_name) {
            return Err(CliError::usage(format!(
                "{} does not hold role '{}'",
                user.id, role_name
            )));
        }
        editor.remove_user(user).map_err(editor_error)?;
    }
    let additions = load_users(&client, &edit.add).await?;
    editor.add_users(additions).map_err(editor_error)?;
    for (permission, level) in &edit.permissions {
        editor
            .update_permission(permission, *level)
            .map_err(editor_error)?;
    }

    if !editor.has_pending_changes() {
        print!("{}", editor.view());
        let members = client.role_members(&role_name).await?;
        print_members(&members);
        println!("Nothing to save");
        return Ok(0);
    }

    print!("{}", editor.view());
    match editor.submit(&client).await {
        Ok(report) => {
            let mut summary = format!(
                "Saved role '{}': {} added, {} removed",
                role_name,
                report.added.len(),
                report.removed.len()
            );
            if report.updated_role.is_some() {
                summary.push_str(", permissions updated");
            }
            println!("{}", summary);
            Ok(0)
        }
        Err(err) => {
            eprintln!("Save failed: {}", err);
            Ok(1)
        }
    }
}

async fn load_users(
    client: &BusRoleAdminClient,
    emails: &[String],
) -> Result<Vec<UserProfile>, CliError> {
    let mut users = Vec::with_capacity(emails.len());
    for email in emails {
        users.push(client.load_user(email).await?);
    }
    Ok(users)
}

fn editor_error(err: EditorError) -> CliError {
    match err {
        EditorError::Validation(message) => CliError::usage(message),
        other => CliError::connector(other.to_string()),
    }
}

fn print_members(members: &[UserProfile]) {
    if members.is_empty() {
        println!("Members: (none)");
        return;
    }
    println!("Members:");
    for member in members {
        println!("  {} ({})", member.id, member.name);
    }
}

fn output_response(response: &ManagementResponse, success_actions: &[DomainActionKey]) -> i32 {
    let is_success = success_actions.contains(&response.key());

    match &response.payload {
        ResponsePayload::Message(payload) => {
            if is_success {
                println!("{}", payload.message);
                0
            } else {
                eprintln!("{}", payload.message);
                1
            }
        }
        ResponsePayload::UserList(payload) => {
            if is_success {
                print_user_list(payload);
                0
            } else {
                eprintln!("User list failed");
                1
            }
        }
        ResponsePayload::UserShow(payload) => {
            if is_success {
                print_user_show(payload);
                0
            } else {
                eprintln!("User lookup failed");
                1
            }
        }
        ResponsePayload::RoleList(payload) => {
            if is_success {
                print_role_list(payload);
                0
            } else {
                eprintln!("Role list failed");
                1
            }
        }
        ResponsePayload::RoleShow(payload) => {
            if is_success {
                print_role_show(payload);
                0
            } else {
                eprintln!("Role lookup failed");
                1
            }
        }
    }
}

fn print_user_list(payload: &crate::management::users::UserListResponse) {
    let email_header = "Email";
    let name_header = "Name";
    let mut email_width = email_header.len();
    let mut name_width = name_header.len();
    for user in &payload.users {
        email_width = email_width.max(user.email.chars().count());
        name_width = name_width.max(user.name.chars().count());
    }
    println!(
        "{:<email_width$}  {:<name_width$}  Roles",
        email_header, name_header
    );
    for user in &payload.users {
        println!(
            "{:<email_width$}  {:<name_width$}  {}",
            user.email,
            user.name,
            user.roles.join(", ")
        );
    }
}

fn print_user_show(payload: &crate::management::users::UserShowResponse) {
    println!("Email: {}", payload.email);
    println!("Name: {}", payload.name);
    if payload.roles.is_empty() {
        println!("Roles: (none)");
    } else {
        println!("Roles: {}", payload.roles.join(", "));
    }
}

fn print_role_list(payload: &crate::management::roles::RoleListResponse) {
    for role in &payload.roles {
        println!("{}", role);
    }
}

fn print_role_show(payload: &crate::management::roles::RoleShowResponse) {
    println!("Role: {}", payload.role);
    if payload.permissions.is_empty() {
        println!("Permissions: (none)");
        return;
    }
    println!("Permissions:");
    for (permission, level) in &payload.permissions {
        println!("  {} = {}", permission, level);
    }
}

impl From<ManagementError> for CliError {
    fn from(err: ManagementError) -> Self {
        CliError::connector(err.to_string())
    }
}

impl From<RemoteError> for CliError {
    fn from(err: RemoteError) -> Self {
        CliError::connector(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::UserServices;
    use crate::management::roles::{RoleCommand, RoleListRequest};
    use crate::management::{ROLE_ACTION_LIST_OK, ROLES_DOMAIN_ID};
    use crate::util::test_fixtures::TestFixtureRoot;

    const USERS_YAML: &str = "ann@example.com:\n  name: Ann\n  roles: [editor]\nbob@example.com:\n  name: Bob\n  roles: []\n";
    const ROLES_YAML: &str = "admin: {}\neditor:\n  permissions:\n    pages: read\n";

    fn fixture(prefix: &str) -> TestFixtureRoot {
        let fixture = TestFixtureRoot::new_unique(prefix).unwrap();
        fixture.write_users(USERS_YAML).unwrap();
        fixture.write_roles(ROLES_YAML).unwrap();
        fixture
    }

    fn roles_of(fixture: &TestFixtureRoot, email: &str) -> Vec<String> {
        let services = UserServices::new(fixture.users_file()).unwrap();
        services.get_user(email).unwrap().unwrap().roles
    }

    #[tokio::test]
    async fn request_runs_over_in_process_bus() {
        let fixture = fixture("cli-request");
        let command = CliCommand::request(
            ManagementCommand::Roles(RoleCommand::List(RoleListRequest {})),
            DomainActionKey::new(ROLES_DOMAIN_ID, ROLE_ACTION_LIST_OK),
        );
        assert_eq!(execute(fixture.path(), command).await.unwrap(), 0);
        assert!(fixture.path().join("config.yaml").exists());
    }

    #[tokio::test]
    async fn members_edit_swaps_membership() {
        let fixture = fixture("cli-members");
        let edit = MembersEdit {
            role: "editor".to_string(),
            add: vec!["bob@example.com".to_string()],
            remove: vec!["ann@example.com".to_string()],
            permissions: vec![("pages".to_string(), PermissionLevel::ReadWrite)],
        };

        let code = execute(fixture.path(), CliCommand::EditMembers(edit))
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert!(roles_of(&fixture, "ann@example.com").is_empty());
        assert_eq!(roles_of(&fixture, "bob@example.com"), vec!["editor"]);
        let roles = std::fs::read_to_string(fixture.roles_file()).unwrap();
        assert!(roles.contains("pages: write"));
    }

    #[tokio::test]
    async fn members_edit_rejects_removing_non_member() {
        let fixture = fixture("cli-non-member");
        let edit = MembersEdit {
            role: "editor".to_string(),
            remove: vec!["bob@example.com".to_string()],
            ..MembersEdit::default()
        };

        let err = execute(fixture.path(), CliCommand::EditMembers(edit))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("does not hold role"));
    }

    #[tokio::test]
    async fn members_remove_then_add_cancels_out() {
        let fixture = fixture("cli-cancel-out");
        let before = std::fs::read_to_string(fixture.users_file()).unwrap();
        let edit = MembersEdit {
            role: "editor".to_string(),
            add: vec!["ann@example.com".to_string()],
            remove: vec!["ann@example.com".to_string()],
            ..MembersEdit::default()
        };

        let code = execute(fixture.path(), CliCommand::EditMembers(edit))
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(fixture.users_file()).unwrap(), before);
        assert_eq!(roles_of(&fixture, "ann@example.com"), vec!["editor"]);
    }

    #[tokio::test]
    async fn members_re_adding_holder_keeps_single_role_entry() {
        let fixture = fixture("cli-re-add");
        let edit = MembersEdit {
            role: "editor".to_string(),
            add: vec!["ann@example.com".to_string()],
            ..MembersEdit::default()
        };

        let code = execute(fixture.path(), CliCommand::EditMembers(edit))
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(roles_of(&fixture, "ann@example.com"), vec!["editor"]);
    }

    #[tokio::test]
    async fn members_edit_reports_unknown_role() {
        let fixture = fixture("cli-unknown-role");
        let edit = MembersEdit {
            role: "ghost".to_string(),
            ..MembersEdit::default()
        };

        let err = execute(fixture.path(), CliCommand::EditMembers(edit))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn members_without_changes_saves_nothing() {
        let fixture = fixture("cli-no-changes");
        let before = std::fs::read_to_string(fixture.users_file()).unwrap();
        let edit = MembersEdit {
            role: "editor".to_string(),
            ..MembersEdit::default()
        };

        let code = execute(fixture.path(), CliCommand::EditMembers(edit))
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(fixture.users_file()).unwrap(), before);
    }
}
