// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::ManagementConfig;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockingError {
    /// Every regular and overflow permit was taken.
    Saturated(&'static str),
    /// The task panicked or was cancelled.
    Join {
        context: &'static str,
        message: String,
    },
}

impl fmt::Display for BlockingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingError::Saturated(context) => {
                write!(f, "{}: blocking pool saturated", context)
            }
            BlockingError::Join { context, message } => {
                write!(f, "{}: blocking task failed: {}", context, message)
            }
        }
    }
}

impl Error for BlockingError {}

/// Bounds the store writes handed to `spawn_blocking`.
///
/// A write takes a regular permit if one is free, else an overflow permit;
/// with both exhausted it fails at once instead of queueing.
#[derive(Clone)]
pub struct BlockingPool {
    regular: Arc<Semaphore>,
    overflow: Arc<Semaphore>,
}

impl BlockingPool {
    pub fn new(regular: usize, overflow: usize) -> Self {
        Self {
            regular: Arc::new(Semaphore::new(regular)),
            overflow: Arc::new(Semaphore::new(overflow)),
        }
    }

    pub fn from_config(config: &ManagementConfig) -> Self {
        Self::new(config.blocking_workers, config.overflow_workers)
    }

    pub async fn run_blocking<F, R>(
        &self,
        context: &'static str,
        task: F,
    ) -> Result<R, BlockingError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let _permit = self.acquire(context)?;
        tokio::task::spawn_blocking(task)
            .await
            .map_err(|err| BlockingError::Join {
                context,
                message: err.to_string(),
            })
    }

    fn acquire(&self, context: &'static str) -> Result<OwnedSemaphorePermit, BlockingError> {
        self.regular.clone().try_acquire_owned().or_else(|_| {
            let permit = self
                .overflow
                .clone()
                .try_acquire_owned()
                .map_err(|_| BlockingError::Saturated(context))?;
            log::warn!("Blocking pool overflow used for {}", context);
            Ok(permit)
        })
    }
}
