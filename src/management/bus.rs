// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::core::{
    ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse,
};
use crate::management::errors::ManagementError;
use crate::management::registry::ManagementRegistry;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

type Reply = oneshot::Sender<Result<ManagementResponse, ManagementError>>;

/// Handle to the dispatcher task. Clones feed the same queue.
#[derive(Clone)]
pub struct ManagementBus {
    sender: mpsc::Sender<(ManagementRequest, Reply)>,
}

impl ManagementBus {
    /// Spawns the dispatcher; must be called from within a tokio runtime.
    /// The task ends once every handle is dropped.
    pub fn start(registry: ManagementRegistry, context: ManagementContext) -> Self {
        let depth = context.config.management.bus_channel_depth;
        let (sender, mut receiver) = mpsc::channel::<(ManagementRequest, Reply)>(depth);
        let context = Arc::new(context);
        tokio::spawn(async move {
            while let Some((request, reply)) = receiver.recv().await {
                let _ = reply.send(dispatch(&registry, &context, request).await);
            }
            log::debug!("Management bus stopped");
        });
        Self { sender }
    }

    pub async fn send(
        &self,
        connection_id: u32,
        workflow_id: u32,
        command: ManagementCommand,
    ) -> Result<ManagementResponse, ManagementError> {
        if connection_id == 0 {
            return Err(ManagementError::ZeroId("connection_id"));
        }
        if workflow_id == 0 {
            return Err(ManagementError::ZeroId("workflow_id"));
        }
        let request = ManagementRequest {
            workflow_id,
            connection_id,
            command,
        };
        let (reply, response) = oneshot::channel();
        self.sender
            .send((request, reply))
            .await
            .map_err(|_| ManagementError::BusClosed)?;
        response.await.map_err(|_| ManagementError::ReplyDropped)?
    }
}

async fn dispatch(
    registry: &ManagementRegistry,
    context: &Arc<ManagementContext>,
    request: ManagementRequest,
) -> Result<ManagementResponse, ManagementError> {
    let key = request.command.key();
    log::trace!(
        "Management bus request {} (connection_id={}, workflow_id={})",
        registry.describe(&key),
        request.connection_id,
        request.workflow_id
    );
    let handler = registry
        .handler(&key)
        .ok_or_else(|| ManagementError::NoHandler(registry.describe(&key)))?;
    Ok(handler(request, context.clone()).await)
}
