// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Role membership editor: pending additions, removals and permission
//! changes for one role, saved through a [`RoleAdminClient`].

mod client;
mod state;
mod submit;
mod view;

pub use client::{BusRoleAdminClient, RemoteError, RoleAdminClient};
pub use state::{EditorError, MembershipEditor, SaveState, UserProfile};
pub use submit::{RoleListUpdate, SaveReport, SubmitFailure, SubmitPhase, SubmitPlan};
pub use view::{EditorView, MemberListProps, PermissionsProps, SavePanelProps};
