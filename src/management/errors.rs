// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::error::Error;
use std::fmt;

/// A request that never got a domain response.
///
/// Domain failures are not errors at this level: handlers answer them with
/// their `*_ERR` action and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementError {
    /// `connection_id` or `workflow_id` was zero.
    ZeroId(&'static str),
    /// Nothing is registered for the request; carries the readable route.
    NoHandler(String),
    BusClosed,
    ReplyDropped,
    WorkflowsExhausted,
    /// The context could not be built (bootstrap or store load).
    Setup(String),
}

impl fmt::Display for ManagementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagementError::ZeroId(field) => write!(f, "{} must be non-zero", field),
            ManagementError::NoHandler(route) => write!(f, "No handler for {}", route),
            ManagementError::BusClosed => write!(f, "Management bus is unavailable"),
            ManagementError::ReplyDropped => write!(f, "Management bus dropped response"),
            ManagementError::WorkflowsExhausted => write!(f, "Workflow counter exhausted"),
            ManagementError::Setup(message) => write!(f, "{}", message),
        }
    }
}

impl Error for ManagementError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_part() {
        assert_eq!(
            ManagementError::ZeroId("workflow_id").to_string(),
            "workflow_id must be non-zero"
        );
        assert_eq!(
            ManagementError::NoHandler("roles/show".to_string()).to_string(),
            "No handler for roles/show"
        );
        assert_eq!(
            ManagementError::Setup("Bootstrap error: denied".to_string()).to_string(),
            "Bootstrap error: denied"
        );
    }
}
