// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeSet, HashSet};

use crate::model::{GraphError, Project, Tile, TileId, TileVariant};

/// Which tiles count as orphans.
///
/// The default checks both directions and reports the union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanQuery {
    pub check_incoming: bool,
    pub check_outgoing: bool,
    /// Report only tiles failing every enabled check.
    pub require_both: bool,
    pub ignore_variants: BTreeSet<TileVariant>,
    pub ignore_ids: BTreeSet<TileId>,
}

impl Default for OrphanQuery {
    fn default() -> Self {
        Self {
            check_incoming: true,
            check_outgoing: true,
            require_both: false,
            ignore_variants: BTreeSet::new(),
            ignore_ids: BTreeSet::new(),
        }
    }
}

impl OrphanQuery {
    pub fn incoming_only() -> Self {
        Self {
            check_outgoing: false,
            ..Self::default()
        }
    }

    pub fn outgoing_only() -> Self {
        Self {
            check_incoming: false,
            ..Self::default()
        }
    }

    pub fn fully_isolated() -> Self {
        Self {
            require_both: true,
            ..Self::default()
        }
    }

    pub fn ignoring_variant(mut self, variant: TileVariant) -> Self {
        self.ignore_variants.insert(variant);
        self
    }

    pub fn ignoring_id(mut self, tile_id: TileId) -> Self {
        self.ignore_ids.insert(tile_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrphanFlags {
    pub incoming: bool,
    pub outgoing: bool,
}

/// Classifies one tile. Incoming counts links from every other tile, ignored ones included.
pub fn orphan_flags(tile: &Tile, linked_from_others: &HashSet<&TileId>) -> OrphanFlags {
    OrphanFlags {
        incoming: tile
            .id()
            .map_or(true, |tile_id| !linked_from_others.contains(tile_id)),
        outgoing: tile.links().is_empty(),
    }
}

fn incoming_targets(project: &Project) -> HashSet<&TileId> {
    let mut targets = HashSet::new();
    for (source_id, tile) in project.tiles() {
        for link in tile.links() {
            if link.target() != source_id {
                targets.insert(link.target());
            }
        }
    }
    targets
}

/// Returns orphan tiles in id order.
pub fn find_orphans<'a>(
    project: &'a Project,
    query: &OrphanQuery,
) -> Result<Vec<&'a Tile>, GraphError> {
    if !query.check_incoming && !query.check_outgoing {
        return Err(GraphError::InvalidQuery);
    }

    let linked = incoming_targets(project);
    let mut orphans = Vec::new();

    for (tile_id, tile) in project.tiles() {
        if query.ignore_variants.contains(&tile.variant()) || query.ignore_ids.contains(tile_id) {
            continue;
        }

        let flags = orphan_flags(tile, &linked);
        let mut conditions = Vec::with_capacity(2);
        if query.check_incoming {
            conditions.push(flags.incoming);
        }
        if query.check_outgoing {
            conditions.push(flags.outgoing);
        }

        let is_orphan = if query.require_both {
            conditions.iter().all(|hit| *hit)
        } else {
            conditions.iter().any(|hit| *hit)
        };
        if is_orphan {
            orphans.push(tile);
        }
    }

    Ok(orphans)
}
