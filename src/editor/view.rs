// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::editor::state::{MembershipEditor, UserProfile};
use crate::roles::{PermissionLevel, Role};
use std::collections::BTreeMap;
use std::fmt;

pub struct PermissionsProps<'a> {
    pub role: &'a Role,
    pub pending: &'a BTreeMap<String, PermissionLevel>,
    pub read_only: bool,
}

impl PermissionsProps<'_> {
    /// Level shown for a permission once pending changes are applied.
    pub fn effective_level(&self, permission: &str) -> PermissionLevel {
        self.pending
            .get(permission)
            .or_else(|| self.role.permissions.get(permission))
            .copied()
            .unwrap_or(PermissionLevel::Revoked)
    }

    fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .role
            .permissions
            .keys()
            .chain(self.pending.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

pub struct MemberListProps<'a> {
    pub additions: &'a BTreeMap<String, UserProfile>,
    pub removals: &'a BTreeMap<String, UserProfile>,
    pub reset_key: u64,
    pub read_only: bool,
}

pub struct SavePanelProps<'a> {
    pub saving: bool,
    pub save_needed: bool,
    pub error: Option<&'a str>,
    pub disabled: bool,
}

pub struct EditorView<'a> {
    pub permissions: PermissionsProps<'a>,
    pub members: MemberListProps<'a>,
    pub save_panel: SavePanelProps<'a>,
}

impl<'a> EditorView<'a> {
    pub(crate) fn project(editor: &'a MembershipEditor) -> Self {
        let save = editor.save_state();
        Self {
            permissions: PermissionsProps {
                role: editor.role(),
                pending: editor.permission_changes(),
                read_only: save.saving,
            },
            members: MemberListProps {
                additions: editor.pending_additions(),
                removals: editor.pending_removals(),
                reset_key: save.reset_key,
                read_only: save.saving,
            },
            save_panel: SavePanelProps {
                saving: save.saving,
                save_needed: save.save_needed,
                error: save.error.as_deref(),
                disabled: save.saving || !editor.has_pending_changes(),
            },
        }
    }
}

impl fmt::Display for EditorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Role: {}", self.permissions.role.name)?;
        let names = self.permissions.names();
        if names.is_empty() {
            writeln!(f, "  Permissions: (none)")?;
        } else {
            writeln!(f, "  Permissions:")?;
            for name in names {
                let level = self.permissions.effective_level(name);
                if self.permissions.pending.contains_key(name) {
                    writeln!(f, "    {} = {} (pending)", name, level)?;
                } else {
                    writeln!(f, "    {} = {}", name, level)?;
                }
            }
        }
        for user in self.members.additions.values() {
            writeln!(f, "  + {} ({})", user.id, user.name)?;
        }
        for user in self.members.removals.values() {
            writeln!(f, "  - {} ({})", user.id, user.name)?;
        }
        if let Some(error) = self.save_panel.error {
            writeln!(f, "  Error: {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::testing::user;

    #[test]
    fn save_panel_enabled_by_permission_changes_alone() {
        let mut editor = MembershipEditor::new(Role::new("editor"));
        assert!(editor.view().save_panel.disabled);

        editor
            .update_permission("pages", PermissionLevel::ReadWrite)
            .unwrap();
        let view = editor.view();
        assert!(!view.save_panel.disabled);
        assert!(!view.save_panel.save_needed);
        assert_eq!(
            view.permissions.effective_level("pages"),
            PermissionLevel::ReadWrite
        );
    }

    #[test]
    fn member_list_is_read_only_while_saving() {
        let mut editor = MembershipEditor::new(Role::new("editor"));
        editor.add_users(vec![user("ann", &[])]).unwrap();
        let _plan = editor.begin_submit().unwrap();

        let view = editor.view();
        assert!(view.members.read_only);
        assert!(view.permissions.read_only);
        assert!(view.save_panel.disabled);
        assert_eq!(view.members.additions.len(), 1);
    }

    #[test]
    fn display_lists_pending_changes() {
        let mut editor = MembershipEditor::new(
            Role::new("editor").with_permission("pages", PermissionLevel::ReadOnly),
        );
        editor.add_users(vec![user("ann", &[])]).unwrap();
        editor.remove_user(user("bob", &["editor"])).unwrap();
        editor
            .update_permission("pages", PermissionLevel::Revoked)
            .unwrap();

        let text = editor.view().to_string();
        assert!(text.contains("Role: editor"));
        assert!(text.contains("pages = revoked (pending)"));
        assert!(text.contains("+ ann (ann)"));
        assert!(text.contains("- bob (bob)"));
    }
}
