// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod store;
pub(crate) mod types;
mod user_services;

pub use store::{FileUserStore, MemoryUserStore, UserStore};
pub use types::{IamError, User};
pub use user_services::{UserServiceError, UserServiceResult, UserServices};
