// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::core::{ManagementContext, ManagementRequest, ManagementResponse};
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainActionKey {
    pub domain_id: u32,
    pub action_id: u32,
}

impl DomainActionKey {
    pub fn new(domain_id: u32, action_id: u32) -> Self {
        Self {
            domain_id,
            action_id,
        }
    }
}

/// A domain and the request actions it answers, by name and id.
#[derive(Debug, Clone, Copy)]
pub struct DomainDescriptor {
    pub name: &'static str,
    pub id: u32,
    pub actions: &'static [(&'static str, u32)],
}

impl DomainDescriptor {
    fn action_name(&self, action_id: u32) -> Option<&'static str> {
        self.actions
            .iter()
            .find(|(_, id)| *id == action_id)
            .map(|(name, _)| *name)
    }
}

#[derive(Debug)]
pub struct RegistryError(String);

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry error: {}", self.0)
    }
}

impl Error for RegistryError {}

/// Domain handlers always answer; failures come back as `*_ERR` responses.
pub type ManagementHandler = Arc<
    dyn Fn(ManagementRequest, Arc<ManagementContext>) -> BoxFuture<'static, ManagementResponse>
        + Send
        + Sync,
>;

struct RegisteredDomain {
    descriptor: DomainDescriptor,
    handler: ManagementHandler,
}

/// Routes each request action of a registered domain to that domain's handler.
#[derive(Default)]
pub struct ManagementRegistry {
    domains: BTreeMap<u32, RegisteredDomain>,
}

impl ManagementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_domain(
        &mut self,
        descriptor: DomainDescriptor,
        handler: ManagementHandler,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.domains.get(&descriptor.id) {
            return Err(RegistryError(format!(
                "domain id {} is taken by '{}'",
                descriptor.id, existing.descriptor.name
            )));
        }
        for (index, (name, id)) in descriptor.actions.iter().enumerate() {
            if descriptor.actions[..index].iter().any(|(_, seen)| seen == id) {
                return Err(RegistryError(format!(
                    "action id {} ('{}') repeats in domain '{}'",
                    id, name, descriptor.name
                )));
            }
        }
        self.domains.insert(
            descriptor.id,
            RegisteredDomain {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    pub fn handler(&self, key: &DomainActionKey) -> Option<&ManagementHandler> {
        let domain = self.domains.get(&key.domain_id)?;
        domain
            .descriptor
            .action_name(key.action_id)
            .map(|_| &domain.handler)
    }

    /// Readable route for logs and errors, e.g. `roles/list`. Unknown parts
    /// fall back to their ids.
    pub fn describe(&self, key: &DomainActionKey) -> String {
        let Some(domain) = self.domains.get(&key.domain_id) else {
            return format!("domain {} action {}", key.domain_id, key.action_id);
        };
        match domain.descriptor.action_name(key.action_id) {
            Some(action) => format!("{}/{}", domain.descriptor.name, action),
            None => format!("{} action {}", domain.descriptor.name, key.action_id),
        }
    }
}
