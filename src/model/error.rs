// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use super::ids::TileId;
use super::link::LinkType;
use super::tile::TileVariant;

/// Validation failures raised synchronously by graph mutations.
///
/// A failed call leaves the project unchanged unless the operation documents otherwise
/// (see [`crate::model::Project::apply_to_tiles`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    DuplicateId {
        tile_id: TileId,
    },
    NotFound {
        tile_id: TileId,
    },
    UnknownTarget {
        source_id: TileId,
        target_id: TileId,
    },
    DuplicateLink {
        source_id: TileId,
        target_id: TileId,
        link_type: LinkType,
    },
    InvalidLinkType {
        link_type: LinkType,
        source_variant: TileVariant,
        target_variant: TileVariant,
    },
    EmptyTag,
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    NotAPlotMap {
        tile_id: TileId,
    },
    NotAPlotEvent {
        tile_id: TileId,
    },
    AlreadyPlotPoint {
        map_id: TileId,
        event_id: TileId,
    },
    NotAPlotPoint {
        map_id: TileId,
        event_id: TileId,
    },
    InvalidQuery,
    AuthorAlreadySet,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { tile_id } => {
                write!(f, "tile id {tile_id} already exists in this project")
            }
            Self::NotFound { tile_id } => write!(f, "tile {tile_id} not found in project"),
            Self::UnknownTarget {
                source_id,
                target_id,
            } => write!(
                f,
                "cannot link {source_id} to {target_id}: target is not in the project"
            ),
            Self::DuplicateLink {
                source_id,
                target_id,
                link_type,
            } => write!(
                f,
                "link already exists: {source_id} -[{link_type}]-> {target_id}"
            ),
            Self::InvalidLinkType {
                link_type,
                source_variant,
                target_variant,
            } => write!(
                f,
                "story logic link '{link_type}' must connect two PlotEvent tiles \
                 (got {source_variant} -> {target_variant})"
            ),
            Self::EmptyTag => f.write_str("tag cannot be empty"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range (len {len})")
            }
            Self::NotAPlotMap { tile_id } => write!(f, "tile {tile_id} is not a PlotMap"),
            Self::NotAPlotEvent { tile_id } => write!(f, "tile {tile_id} is not a PlotEvent"),
            Self::AlreadyPlotPoint { map_id, event_id } => {
                write!(f, "{event_id} is already a plot point of {map_id}")
            }
            Self::NotAPlotPoint { map_id, event_id } => {
                write!(f, "{event_id} is not a plot point of {map_id}")
            }
            Self::InvalidQuery => {
                f.write_str("orphan query must check incoming or outgoing links")
            }
            Self::AuthorAlreadySet => f.write_str("project author is already set"),
        }
    }
}

impl std::error::Error for GraphError {}
