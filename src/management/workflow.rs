// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::errors::ManagementError;

/// Hands out workflow ids for one connection, starting at 1. Zero is never issued.
#[derive(Debug)]
pub struct WorkflowCounter {
    next_id: u32,
}

impl Default for WorkflowCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowCounter {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn next_id(&mut self) -> Result<u32, ManagementError> {
        if self.next_id == u32::MAX {
            return Err(ManagementError::WorkflowsExhausted);
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }
}
