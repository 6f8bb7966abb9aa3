// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::editor::client::{RemoteError, RoleAdminClient};
use crate::editor::state::UserProfile;
use crate::roles::{PermissionLevel, Role, format_role_list, with_role, without_role};
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    Removals,
    Additions,
    Permissions,
}

impl fmt::Display for SubmitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmitPhase::Removals => "removals",
            SubmitPhase::Additions => "additions",
            SubmitPhase::Permissions => "permissions",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFailure {
    pub phase: SubmitPhase,
    pub error: RemoteError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub updated_role: Option<Role>,
}

/// One user's recomputed role list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleListUpdate {
    pub user_id: String,
    pub roles: String,
}

/// Everything one submit sends, computed up front so the network phases
/// run without borrowing the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPlan {
    role: String,
    removals: Vec<RoleListUpdate>,
    additions: Vec<RoleListUpdate>,
    role_edit: Option<Role>,
}

impl SubmitPlan {
    pub(crate) fn new(
        role: &Role,
        removals: Vec<UserProfile>,
        additions: Vec<UserProfile>,
        permission_changes: &BTreeMap<String, PermissionLevel>,
    ) -> Self {
        let removals = removals
            .into_iter()
            .map(|user| RoleListUpdate {
                roles: format_role_list(&without_role(&user.roles, &role.name)),
                user_id: user.id,
            })
            .collect();
        let additions = additions
            .into_iter()
            .map(|user| RoleListUpdate {
                roles: format_role_list(&with_role(&user.roles, &role.name)),
                user_id: user.id,
            })
            .collect();
        let role_edit = if permission_changes.is_empty() {
            None
        } else {
            Some(role.apply_permission_changes(permission_changes))
        };
        Self {
            role: role.name.clone(),
            removals,
            additions,
            role_edit,
        }
    }

    pub fn removals(&self) -> &[RoleListUpdate] {
        &self.removals
    }

    pub fn additions(&self) -> &[RoleListUpdate] {
        &self.additions
    }

    pub fn role_edit(&self) -> Option<&Role> {
        self.role_edit.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty() && self.role_edit.is_none()
    }

    /// Runs removals, then additions, then the permission edit. A failed
    /// phase stops the ones after it.
    pub async fn execute<C>(&self, client: &C) -> Result<SaveReport, SubmitFailure>
    where
        C: RoleAdminClient + ?Sized,
    {
        log::info!(
            "Saving role '{}': {} removal(s), {} addition(s), permission edit: {}",
            self.role,
            self.removals.len(),
            self.additions.len(),
            self.role_edit.is_some()
        );
        run_phase(client, &self.removals)
            .await
            .map_err(|error| SubmitFailure {
                phase: SubmitPhase::Removals,
                error,
            })?;
        run_phase(client, &self.additions)
            .await
            .map_err(|error| SubmitFailure {
                phase: SubmitPhase::Additions,
                error,
            })?;
        if let Some(role) = &self.role_edit {
            client
                .edit_role(role)
                .await
                .map_err(|error| SubmitFailure {
                    phase: SubmitPhase::Permissions,
                    error,
                })?;
        }
        Ok(SaveReport {
            removed: self.removals.iter().map(|u| u.user_id.clone()).collect(),
            added: self.additions.iter().map(|u| u.user_id.clone()).collect(),
            updated_role: self.role_edit.clone(),
        })
    }
}

/// Issues every update at once and waits for all of them. The error that
/// completes first is the one reported.
async fn run_phase<C>(client: &C, updates: &[RoleListUpdate]) -> Result<(), RemoteError>
where
    C: RoleAdminClient + ?Sized,
{
    let mut pending: FuturesUnordered<_> = updates
        .iter()
        .map(|update| client.update_user_roles(&update.user_id, &update.roles))
        .collect();
    let mut first_error = None;
    while let Some(result) = pending.next().await {
        if let Err(err) = result {
            log::warn!("Role list update failed: {}", err);
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::testing::{Call, RecordingClient, user};

    fn plan(removals: Vec<UserProfile>, additions: Vec<UserProfile>) -> SubmitPlan {
        SubmitPlan::new(&Role::new("editor"), removals, additions, &BTreeMap::new())
    }

    #[test]
    fn role_lists_are_recomputed_without_duplicates() {
        let plan = plan(
            vec![user("cid", &["editor", "viewer", "editor"])],
            vec![user("ann", &["viewer", "viewer", "editor"])],
        );
        assert_eq!(plan.removals()[0].roles, "viewer");
        assert_eq!(plan.additions()[0].roles, "viewer editor");
    }

    #[test]
    fn empty_plan_has_nothing_to_send() {
        assert!(plan(vec![], vec![]).is_empty());
        let changes = BTreeMap::from([("pages".to_string(), PermissionLevel::ReadOnly)]);
        let with_edit = SubmitPlan::new(&Role::new("editor"), vec![], vec![], &changes);
        assert!(!with_edit.is_empty());
        assert_eq!(
            with_edit.role_edit().map(|role| role.permissions.len()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn every_call_in_a_failing_phase_completes() {
        let plan = plan(
            vec![user("ann", &["editor"]), user("bob", &["editor"])],
            vec![user("cid", &[])],
        );
        let client = RecordingClient::new().fail_user("ann", "nope");

        let failure = plan.execute(&client).await.unwrap_err();
        assert_eq!(failure.phase, SubmitPhase::Removals);
        assert_eq!(failure.error.message(), "nope");
        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.contains(&Call::update("bob", "")));
        assert_eq!(client.completed(), 2);
    }

    #[tokio::test]
    async fn edit_role_failure_is_reported_as_permission_phase() {
        let changes = BTreeMap::from([("pages".to_string(), PermissionLevel::ReadWrite)]);
        let plan = SubmitPlan::new(&Role::new("editor"), vec![], vec![], &changes);
        let client = RecordingClient::new().fail_edit_role("locked");

        let failure = plan.execute(&client).await.unwrap_err();
        assert_eq!(failure.phase, SubmitPhase::Permissions);
        assert_eq!(failure.error.to_string(), "locked");
    }
}
