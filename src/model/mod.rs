// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A project owns every tile in a registry keyed by id; links and plot points refer to
//! other tiles by id only.

pub mod error;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod ids;
pub mod link;
pub mod project;
pub mod tile;
pub mod timestamp;

pub use error::GraphError;
pub use ids::{Id, IdError, TileId};
pub use link::{Link, LinkType, ParseLinkTypeError};
pub use project::{
    DanglingReference, MetaInt, Project, ProjectMeta, ReferenceKind, DEFAULT_PROJECT_NAME,
    SCHEMA_VERSION,
};
pub use tile::{
    CharacterFields, ParseTileVariantError, PlotEventFields, PlotMapFields, SettingFields, Tile,
    TileBody, TileVariant,
};
