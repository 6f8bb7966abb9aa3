// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use roledesk::editor::{BusRoleAdminClient, EditorError, MembershipEditor};
use roledesk::management::{ManagementBus, ManagementContext, build_default_registry};
use roledesk::roles::PermissionLevel;
use roledesk::util::test_fixtures::TestFixtureRoot;

const USERS_YAML: &str = "\
ann@example.com:
  name: Ann
  roles: [editor, viewer]
bob@example.com:
  name: Bob
  roles: [viewer]
cid@example.com:
  name: Cid
  roles: []
";

const ROLES_YAML: &str = "\
admin: {}
editor:
  permissions:
    pages: read
viewer: {}
";

fn start_client(fixture: &TestFixtureRoot) -> BusRoleAdminClient {
    fixture.write_users(USERS_YAML).expect("write users");
    fixture.write_roles(ROLES_YAML).expect("write roles");
    let context = ManagementContext::from_runtime_root(fixture.path()).expect("context");
    let registry = build_default_registry().expect("registry");
    BusRoleAdminClient::new(ManagementBus::start(registry, context))
}

#[tokio::test]
async fn editor_saves_membership_and_permissions_over_bus() {
    let fixture = TestFixtureRoot::new_unique("editor-bus-save").unwrap();
    let client = start_client(&fixture);

    let role = client.load_role("editor").await.expect("load role");
    let mut editor = MembershipEditor::new(role);
    let bob = client.load_user("bob@example.com").await.expect("bob");
    let cid = client.load_user("cid@example.com").await.expect("cid");
    let ann = client.load_user("ann@example.com").await.expect("ann");
    editor.add_users(vec![bob, cid]).expect("add");
    editor.remove_user(ann).expect("remove");
    editor
        .update_permission("themes", PermissionLevel::ReadWrite)
        .expect("permission");

    let report = editor.submit(&client).await.expect("submit");
    assert_eq!(report.added.len(), 2);
    assert_eq!(report.removed, vec!["ann@example.com".to_string()]);
    assert_eq!(editor.save_state().reset_key, 1);

    let members: Vec<String> = client
        .role_members("editor")
        .await
        .expect("members")
        .into_iter()
        .map(|user| user.id)
        .collect();
    assert_eq!(members, vec!["bob@example.com", "cid@example.com"]);

    let ann = client.load_user("ann@example.com").await.expect("ann");
    assert_eq!(ann.roles, vec!["viewer".to_string()]);

    let stored = client.load_role("editor").await.expect("role");
    assert_eq!(stored.permissions["pages"], PermissionLevel::ReadOnly);
    assert_eq!(stored.permissions["themes"], PermissionLevel::ReadWrite);
}

#[tokio::test]
async fn failed_removal_leaves_users_file_untouched() {
    let fixture = TestFixtureRoot::new_unique("editor-bus-fail").unwrap();
    let client = start_client(&fixture);
    let before = std::fs::read_to_string(fixture.users_file()).expect("read users");

    let role = client.load_role("editor").await.expect("load role");
    let mut editor = MembershipEditor::new(role);
    let mut ghost = client.load_user("cid@example.com").await.expect("cid");
    ghost.id = "ghost@example.com".to_string();
    editor.remove_user(ghost).expect("remove");
    let bob = client.load_user("bob@example.com").await.expect("bob");
    editor.add_users(vec![bob]).expect("add");

    let err = editor.submit(&client).await.unwrap_err();
    match err {
        EditorError::Remote(remote) => assert_eq!(remote.message(), "User not found"),
        other => panic!("expected remote error, got {}", other),
    }
    assert!(editor.save_state().save_needed);
    assert_eq!(editor.save_state().error.as_deref(), Some("User not found"));
    assert_eq!(editor.pending_additions().len(), 1);

    let after = std::fs::read_to_string(fixture.users_file()).expect("read users");
    assert_eq!(before, after);
}
