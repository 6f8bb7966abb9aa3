// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::editor::client::{RemoteError, RoleAdminClient};
use crate::editor::submit::{SaveReport, SubmitFailure, SubmitPlan};
use crate::editor::view::EditorView;
use crate::management::{UserShowResponse, UserSummary};
use crate::roles::{PermissionLevel, Role, RoleValidationError, normalize_permission};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// An account as the editor sees it: id, display name and current roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub roles: Vec<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles,
        }
    }
}

impl From<UserShowResponse> for UserProfile {
    fn from(show: UserShowResponse) -> Self {
        Self::new(show.email, show.name, show.roles)
    }
}

impl From<UserSummary> for UserProfile {
    fn from(summary: UserSummary) -> Self {
        Self::new(summary.email, summary.name, summary.roles)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveState {
    pub saving: bool,
    /// True exactly when membership additions or removals are pending.
    pub save_needed: bool,
    pub error: Option<String>,
    /// Bumped after each successful save so the member list drops its local state.
    pub reset_key: u64,
}

#[derive(Debug)]
pub enum EditorError {
    /// A submit is in flight; the editor is read-only until it finishes.
    Saving,
    Validation(String),
    Remote(RemoteError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::Saving => write!(f, "A save is already in progress"),
            EditorError::Validation(message) => write!(f, "{}", message),
            EditorError::Remote(err) => write!(f, "{}", err),
        }
    }
}

impl Error for EditorError {}

impl From<RoleValidationError> for EditorError {
    fn from(err: RoleValidationError) -> Self {
        EditorError::Validation(err.to_string())
    }
}

/// Pending membership and permission changes for one role.
///
/// State only changes through the methods below; [`MembershipEditor::view`]
/// projects it for the permissions panel, the member list and the save panel.
#[derive(Debug, Clone)]
pub struct MembershipEditor {
    role: Role,
    additions: BTreeMap<String, UserProfile>,
    removals: BTreeMap<String, UserProfile>,
    permission_changes: BTreeMap<String, PermissionLevel>,
    save: SaveState,
}

impl MembershipEditor {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            additions: BTreeMap::new(),
            removals: BTreeMap::new(),
            permission_changes: BTreeMap::new(),
            save: SaveState::default(),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn pending_additions(&self) -> &BTreeMap<String, UserProfile> {
        &self.additions
    }

    pub fn pending_removals(&self) -> &BTreeMap<String, UserProfile> {
        &self.removals
    }

    pub fn permission_changes(&self) -> &BTreeMap<String, PermissionLevel> {
        &self.permission_changes
    }

    pub fn save_state(&self) -> &SaveState {
        &self.save
    }

    pub fn has_membership_changes(&self) -> bool {
        !self.additions.is_empty() || !self.removals.is_empty()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.has_membership_changes() || !self.permission_changes.is_empty()
    }

    pub fn view(&self) -> EditorView<'_> {
        EditorView::project(self)
    }

    /// Marks each user for addition, or cancels their pending removal.
    pub fn add_users<I>(&mut self, users: I) -> Result<(), EditorError>
    where
        I: IntoIterator<Item = UserProfile>,
    {
        self.ensure_idle()?;
        for user in users {
            if self.removals.remove(&user.id).is_none() {
                self.additions.insert(user.id.clone(), user);
            }
        }
        self.refresh_save_needed();
        Ok(())
    }

    /// Marks the user for removal, or cancels their pending addition.
    pub fn remove_user(&mut self, user: UserProfile) -> Result<(), EditorError> {
        self.ensure_idle()?;
        if self.additions.remove(&user.id).is_none() {
            self.removals.insert(user.id.clone(), user);
        }
        self.refresh_save_needed();
        Ok(())
    }

    pub fn update_permission(
        &mut self,
        permission: &str,
        level: PermissionLevel,
    ) -> Result<(), EditorError> {
        self.ensure_idle()?;
        let permission = normalize_permission(permission)?;
        self.permission_changes.insert(permission, level);
        Ok(())
    }

    /// Drops every pending change and the last error. The reset key is kept.
    pub fn discard(&mut self) -> Result<(), EditorError> {
        self.ensure_idle()?;
        self.additions.clear();
        self.removals.clear();
        self.permission_changes.clear();
        self.save.error = None;
        self.refresh_save_needed();
        Ok(())
    }

    /// Enters the saving state and snapshots what has to be sent.
    pub fn begin_submit(&mut self) -> Result<SubmitPlan, EditorError> {
        self.ensure_idle()?;
        self.save.saving = true;
        self.save.save_needed = false;
        self.save.error = None;
        Ok(SubmitPlan::new(
            &self.role,
            self.removals.values().cloned().collect(),
            self.additions.values().cloned().collect(),
            &self.permission_changes,
        ))
    }

    /// Leaves the saving state. Success clears the pending changes; failure
    /// keeps them for a retry and records the error.
    pub fn finish_submit(&mut self, outcome: &Result<SaveReport, SubmitFailure>) {
        self.save.saving = false;
        match outcome {
            Ok(report) => {
                if let Some(role) = &report.updated_role {
                    self.role = role.clone();
                }
                self.additions.clear();
                self.removals.clear();
                self.permission_changes.clear();
                self.save.error = None;
                self.save.reset_key += 1;
            }
            Err(failure) => {
                self.save.error = Some(failure.error.message().to_string());
            }
        }
        self.refresh_save_needed();
    }

    pub async fn submit<C>(&mut self, client: &C) -> Result<SaveReport, EditorError>
    where
        C: RoleAdminClient + ?Sized,
    {
        let plan = self.begin_submit()?;
        let outcome = plan.execute(client).await;
        self.finish_submit(&outcome);
        outcome.map_err(|failure| EditorError::Remote(failure.error))
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        if self.save.saving {
            return Err(EditorError::Saving);
        }
        Ok(())
    }

    fn refresh_save_needed(&mut self) {
        self.save.save_needed = self.has_membership_changes();
    }
}
