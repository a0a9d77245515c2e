// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::error::GraphError;
use super::ids::{generate_project_id, generate_tile_id, TileId};
use super::link::{Link, LinkType};
use super::tile::{normalize_tag, Tile, TileVariant};
use super::timestamp::now_timestamp;
use crate::query::orphans::{self, OrphanQuery};

pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";
pub const SCHEMA_VERSION: i64 = 1;

/// An integer metadata slot that remembers how it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaInt {
    Missing,
    /// The raw JSON text of a value that was not an integer.
    Malformed(String),
    Value(i64),
}

impl MetaInt {
    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Value(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for MetaInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("<missing>"),
            Self::Malformed(raw) => f.write_str(raw),
            Self::Value(value) => write!(f, "{value}"),
        }
    }
}

/// Project-level metadata. `None` means the field was absent from the loaded manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMeta {
    pub name: Option<String>,
    pub id: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub last_editor: Option<String>,
    pub created_at: Option<String>,
    pub last_modified: Option<String>,
    pub version: MetaInt,
    pub schema_version: MetaInt,
    pub tags: Option<BTreeSet<String>>,
    /// Raw JSON text of manifest tag entries that were not strings.
    pub invalid_tags: Vec<String>,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        let now = now_timestamp();
        Self {
            name: Some(DEFAULT_PROJECT_NAME.to_owned()),
            id: Some(generate_project_id()),
            description: Some(String::new()),
            author: Some(String::new()),
            last_editor: Some(String::new()),
            created_at: Some(now.clone()),
            last_modified: Some(now),
            version: MetaInt::Value(0),
            schema_version: MetaInt::Value(SCHEMA_VERSION),
            tags: Some(BTreeSet::new()),
            invalid_tags: Vec::new(),
        }
    }
}

impl ProjectMeta {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("MISSING NAME")
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("MISSING ID")
    }

    /// Version the next successful save will carry.
    pub fn next_version(&self) -> i64 {
        match self.version {
            MetaInt::Value(value) => value.saturating_add(1),
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceKind {
    Link,
    PlotPoint,
}

/// A reference that did not resolve against the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DanglingReference {
    pub source: TileId,
    pub target: TileId,
    pub kind: ReferenceKind,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReferenceKind::Link => write!(
                f,
                "Tile {} links to missing tile {}; dropped from resolved links",
                self.source, self.target
            ),
            ReferenceKind::PlotPoint => write!(
                f,
                "PlotMap {} lists missing plot point {}; dropped from resolved plot points",
                self.source, self.target
            ),
        }
    }
}

/// The registry: sole owner of every tile, keyed by id, plus project metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Project {
    meta: ProjectMeta,
    tiles: BTreeMap<TileId, Tile>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(meta: ProjectMeta, tiles: BTreeMap<TileId, Tile>) -> Self {
        Self { meta, tiles }
    }

    pub fn meta(&self) -> &ProjectMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut ProjectMeta {
        &mut self.meta
    }

    pub fn tiles(&self) -> &BTreeMap<TileId, Tile> {
        &self.tiles
    }

    /// Raw registry access. Edits made here bypass link and plot-point validation; run
    /// [`Project::resolve_all`] and the integrity checker afterwards.
    pub fn tiles_mut(&mut self) -> &mut BTreeMap<TileId, Tile> {
        &mut self.tiles
    }

    pub fn tile(&self, tile_id: &TileId) -> Option<&Tile> {
        self.tiles.get(tile_id)
    }

    pub fn tile_mut(&mut self, tile_id: &TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(tile_id)
    }

    pub fn contains(&self, tile_id: &TileId) -> bool {
        self.tiles.contains_key(tile_id)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Replaces tiles and metadata wholesale with a recovered copy.
    pub fn adopt(&mut self, recovered: Project) {
        *self = recovered;
    }

    pub(crate) fn touch(&mut self) {
        self.meta.last_modified = Some(now_timestamp());
    }

    pub(crate) fn bump_version(&mut self) {
        self.meta.version = MetaInt::Value(self.meta.next_version());
    }

    fn generate_id(&self, variant: TileVariant) -> TileId {
        generate_tile_id(variant.id_prefix(), |candidate| {
            self.tiles.contains_key(candidate)
        })
    }

    pub fn add_tile(&mut self, mut tile: Tile) -> Result<TileId, GraphError> {
        let tile_id = match tile.id() {
            Some(tile_id) => {
                if self.tiles.contains_key(tile_id) {
                    return Err(GraphError::DuplicateId {
                        tile_id: tile_id.clone(),
                    });
                }
                tile_id.clone()
            }
            None => {
                let tile_id = self.generate_id(tile.variant());
                tile.set_id(Some(tile_id.clone()));
                tile_id
            }
        };

        self.tiles.insert(tile_id.clone(), tile);
        Ok(tile_id)
    }

    pub fn create_tile(&mut self, variant: TileVariant, name: impl Into<String>) -> TileId {
        let tile_id = self.generate_id(variant);
        let tile = Tile::new(variant, name).with_id(tile_id.clone());
        self.tiles.insert(tile_id.clone(), tile);
        tile_id
    }

    /// Removes a tile and strips every edge and plot-point entry that targeted it.
    pub fn remove_tile(&mut self, tile_id: &TileId) -> Result<Tile, GraphError> {
        let removed = self
            .tiles
            .remove(tile_id)
            .ok_or_else(|| GraphError::NotFound {
                tile_id: tile_id.clone(),
            })?;

        for (other_id, other) in self.tiles.iter_mut() {
            let broken: Vec<LinkType> = other.link_types(tile_id).into_iter().cloned().collect();
            other.remove_link(tile_id, None);
            for link_type in &broken {
                tracing::warn!(
                    source = %other_id,
                    target = %tile_id,
                    link_type = %link_type,
                    "removed broken link to deleted tile"
                );
            }

            if let Some(fields) = other.as_plot_map_mut() {
                fields.plot_points.retain(|id| id != tile_id);
                fields.resolved_plot_points.retain(|id| id != tile_id);
            }
        }

        Ok(removed)
    }

    pub fn select_tiles(&self, mut filter: impl FnMut(&Tile) -> bool) -> Vec<&Tile> {
        self.tiles.values().filter(|tile| filter(tile)).collect()
    }

    /// Runs `action` on every tile accepted by `filter`, in id order.
    ///
    /// Returns the number of tiles acted on. The first failing action stops the walk; tiles
    /// already mutated stay mutated.
    pub fn apply_to_tiles<E>(
        &mut self,
        mut filter: impl FnMut(&Tile) -> bool,
        mut action: impl FnMut(&mut Tile) -> Result<(), E>,
    ) -> Result<usize, E> {
        let mut count = 0;
        for tile in self.tiles.values_mut() {
            if filter(tile) {
                action(tile)?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn find_orphans(&self, query: &OrphanQuery) -> Result<Vec<&Tile>, GraphError> {
        orphans::find_orphans(self, query)
    }

    pub fn find_tiles_by_tag(&self, tag: &str) -> Vec<&Tile> {
        self.select_tiles(|tile| tile.has_tag(tag))
    }

    pub fn resolved_links_of(&self, tile_id: &TileId) -> Vec<&Tile> {
        let Some(tile) = self.tiles.get(tile_id) else {
            return Vec::new();
        };
        tile.resolved_links()
            .iter()
            .filter_map(|target| self.tiles.get(target))
            .collect()
    }

    pub fn add_link(
        &mut self,
        source_id: &TileId,
        target_id: &TileId,
        link_type: LinkType,
    ) -> Result<(), GraphError> {
        let source_variant = self
            .tiles
            .get(source_id)
            .ok_or_else(|| GraphError::NotFound {
                tile_id: source_id.clone(),
            })?
            .variant();
        let target_variant = self
            .tiles
            .get(target_id)
            .ok_or_else(|| GraphError::UnknownTarget {
                source_id: source_id.clone(),
                target_id: target_id.clone(),
            })?
            .variant();

        if link_type.is_story_logic()
            && (source_variant != TileVariant::PlotEvent
                || target_variant != TileVariant::PlotEvent)
        {
            return Err(GraphError::InvalidLinkType {
                link_type,
                source_variant,
                target_variant,
            });
        }

        let source = self
            .tiles
            .get_mut(source_id)
            .ok_or_else(|| GraphError::NotFound {
                tile_id: source_id.clone(),
            })?;
        if source.has_link(target_id, &link_type) {
            return Err(GraphError::DuplicateLink {
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                link_type,
            });
        }

        source.push_link(Link::new(target_id.clone(), link_type));
        Ok(())
    }

    /// Removes matching edges from `source_id`; returns how many were removed.
    pub fn remove_link(
        &mut self,
        source_id: &TileId,
        target_id: &TileId,
        link_type: Option<&LinkType>,
    ) -> Result<usize, GraphError> {
        let source = self
            .tiles
            .get_mut(source_id)
            .ok_or_else(|| GraphError::NotFound {
                tile_id: source_id.clone(),
            })?;
        Ok(source.remove_link(target_id, link_type))
    }

    /// Links both tiles to each other with `references` edges, skipping edges that exist.
    pub fn link_bidirectional(&mut self, a: &TileId, b: &TileId) -> Result<(), GraphError> {
        for id in [a, b] {
            if !self.tiles.contains_key(id) {
                return Err(GraphError::NotFound {
                    tile_id: id.clone(),
                });
            }
        }

        for (source, target) in [(a, b), (b, a)] {
            match self.add_link(source, target, LinkType::References) {
                Ok(()) | Err(GraphError::DuplicateLink { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    pub fn unlink_bidirectional(&mut self, a: &TileId, b: &TileId) -> Result<(), GraphError> {
        for id in [a, b] {
            if !self.tiles.contains_key(id) {
                return Err(GraphError::NotFound {
                    tile_id: id.clone(),
                });
            }
        }

        self.remove_link(a, b, None)?;
        self.remove_link(b, a, None)?;
        Ok(())
    }

    fn require_variant(
        &self,
        tile_id: &TileId,
        variant: TileVariant,
    ) -> Result<&Tile, GraphError> {
        let tile = self.tiles.get(tile_id).ok_or_else(|| GraphError::NotFound {
            tile_id: tile_id.clone(),
        })?;
        if tile.variant() != variant {
            let tile_id = tile_id.clone();
            return Err(match variant {
                TileVariant::PlotMap => GraphError::NotAPlotMap { tile_id },
                _ => GraphError::NotAPlotEvent { tile_id },
            });
        }
        Ok(tile)
    }

    /// Inserts `event_id` into the map's story order (appending when `index` is `None`) and
    /// creates the mutual `plot point` edges. Nothing changes unless every check passes.
    pub fn add_plot_point(
        &mut self,
        map_id: &TileId,
        event_id: &TileId,
        index: Option<usize>,
    ) -> Result<(), GraphError> {
        let map = self.require_variant(map_id, TileVariant::PlotMap)?;
        let event = self.require_variant(event_id, TileVariant::PlotEvent)?;

        let len = map.as_plot_map().map_or(0, |fields| fields.plot_points.len());
        if map
            .as_plot_map()
            .is_some_and(|fields| fields.contains(event_id))
        {
            return Err(GraphError::AlreadyPlotPoint {
                map_id: map_id.clone(),
                event_id: event_id.clone(),
            });
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(GraphError::IndexOutOfRange { index, len });
        }
        if map.has_link(event_id, &LinkType::PlotPoint) {
            return Err(GraphError::DuplicateLink {
                source_id: map_id.clone(),
                target_id: event_id.clone(),
                link_type: LinkType::PlotPoint,
            });
        }
        if event.has_link(map_id, &LinkType::PlotPoint) {
            return Err(GraphError::DuplicateLink {
                source_id: event_id.clone(),
                target_id: map_id.clone(),
                link_type: LinkType::PlotPoint,
            });
        }

        if let Some(map) = self.tiles.get_mut(map_id) {
            map.push_link(Link::new(event_id.clone(), LinkType::PlotPoint));
            if let Some(fields) = map.as_plot_map_mut() {
                fields.plot_points.insert(index, event_id.clone());
            }
        }
        if let Some(event) = self.tiles.get_mut(event_id) {
            event.push_link(Link::new(map_id.clone(), LinkType::PlotPoint));
        }
        self.refresh_plot_points(map_id);
        Ok(())
    }

    /// Removes `event_id` from the map's story order and both `plot point` edges.
    pub fn remove_plot_point(
        &mut self,
        map_id: &TileId,
        event_id: &TileId,
    ) -> Result<(), GraphError> {
        let map = self.require_variant(map_id, TileVariant::PlotMap)?;
        self.require_variant(event_id, TileVariant::PlotEvent)?;
        if !map
            .as_plot_map()
            .is_some_and(|fields| fields.contains(event_id))
        {
            return Err(GraphError::NotAPlotPoint {
                map_id: map_id.clone(),
                event_id: event_id.clone(),
            });
        }

        if let Some(map) = self.tiles.get_mut(map_id) {
            map.remove_link(event_id, Some(&LinkType::PlotPoint));
            if let Some(fields) = map.as_plot_map_mut() {
                fields.plot_points.retain(|id| id != event_id);
                fields.resolved_plot_points.retain(|id| id != event_id);
            }
        }
        if let Some(event) = self.tiles.get_mut(event_id) {
            event.remove_link(map_id, Some(&LinkType::PlotPoint));
        }
        Ok(())
    }

    pub fn move_plot_point(
        &mut self,
        map_id: &TileId,
        old_index: usize,
        new_index: usize,
    ) -> Result<(), GraphError> {
        self.require_variant(map_id, TileVariant::PlotMap)?;
        let Some(fields) = self
            .tiles
            .get_mut(map_id)
            .and_then(Tile::as_plot_map_mut)
        else {
            return Err(GraphError::NotAPlotMap {
                tile_id: map_id.clone(),
            });
        };

        let len = fields.plot_points.len();
        for index in [old_index, new_index] {
            if index >= len {
                return Err(GraphError::IndexOutOfRange { index, len });
            }
        }

        let moved = fields.plot_points.remove(old_index);
        fields.plot_points.insert(new_index, moved);
        self.refresh_plot_points(map_id);
        Ok(())
    }

    fn refresh_plot_points(&mut self, map_id: &TileId) {
        let known: HashSet<TileId> = self.tiles.keys().cloned().collect();
        if let Some(map) = self.tiles.get_mut(map_id) {
            map.resolve_plot_points(|id| known.contains(id));
        }
    }

    /// Rebuilds every link and plot-point cache from the persisted lists.
    pub fn resolve_all(&mut self) -> Vec<DanglingReference> {
        let known: HashSet<TileId> = self.tiles.keys().cloned().collect();
        let exists = |id: &TileId| known.contains(id);

        let mut dangling = Vec::new();
        for (source, tile) in self.tiles.iter_mut() {
            for target in tile.resolve_links(exists) {
                dangling.push(DanglingReference {
                    source: source.clone(),
                    target,
                    kind: ReferenceKind::Link,
                });
            }
            for target in tile.resolve_plot_points(exists) {
                dangling.push(DanglingReference {
                    source: source.clone(),
                    target,
                    kind: ReferenceKind::PlotPoint,
                });
            }
        }

        for reference in &dangling {
            tracing::warn!(
                source = %reference.source,
                target = %reference.target,
                kind = ?reference.kind,
                "dangling reference"
            );
        }
        dangling
    }

    pub fn set_author(&mut self, name: impl Into<String>) -> Result<(), GraphError> {
        if self
            .meta
            .author
            .as_deref()
            .is_some_and(|author| !author.is_empty())
        {
            return Err(GraphError::AuthorAlreadySet);
        }
        self.meta.author = Some(name.into());
        Ok(())
    }

    pub fn set_last_editor(&mut self, name: impl Into<String>) {
        self.meta.last_editor = Some(name.into());
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<(), GraphError> {
        let tag = normalize_tag(tag).ok_or(GraphError::EmptyTag)?;
        self.meta.tags.get_or_insert_with(BTreeSet::new).insert(tag);
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.meta
            .tags
            .as_mut()
            .is_some_and(|tags| tags.remove(&tag))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        self.meta
            .tags
            .as_ref()
            .is_some_and(|tags| tags.contains(&tag))
    }
}
