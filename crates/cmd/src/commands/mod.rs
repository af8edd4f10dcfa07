// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod backup;
pub mod restore;

pub use backup::backup_command;
pub use restore::restore_command;
