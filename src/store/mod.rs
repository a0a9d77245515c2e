// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for projects on disk.
//!
//! A project folder holds `manifest.json` plus one JSON file per tile. Saves go through a
//! sibling temp folder and a backup rotation; loads fall back to a folder scan when the
//! manifest cannot be trusted.

pub mod codec;
pub mod loader;
pub mod project_folder;
pub mod recovery;

pub use loader::{load_project, LoadOptions, LoadReport, DEFAULT_MISSING_TOLERANCE};
pub use project_folder::{
    LoadError, LoadedProject, ProjectFolder, SaveError, SaveReport, StoreError, WriteDurability,
};
pub use recovery::{recover, Recovered, RecoverySource};
