// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use super::error::GraphError;
use super::ids::TileId;
use super::link::{Link, LinkType};

/// The closed set of tile kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileVariant {
    PlotMap,
    PlotEvent,
    Character,
    Setting,
}

impl TileVariant {
    pub const ALL: [Self; 4] = [
        Self::PlotMap,
        Self::PlotEvent,
        Self::Character,
        Self::Setting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlotMap => "PlotMap",
            Self::PlotEvent => "PlotEvent",
            Self::Character => "Character",
            Self::Setting => "Setting",
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::PlotMap => "pm",
            Self::PlotEvent => "pe",
            Self::Character => "ch",
            Self::Setting => "st",
        }
    }

    /// Directory under `Tiles/` holding files of this variant.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::PlotMap => "PlotMaps",
            Self::PlotEvent => "PlotEvents",
            Self::Character => "Characters",
            Self::Setting => "Settings",
        }
    }
}

impl fmt::Display for TileVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTileVariantError {
    value: String,
}

impl fmt::Display for ParseTileVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tile variant {:?}", self.value)
    }
}

impl std::error::Error for ParseTileVariantError {}

impl FromStr for TileVariant {
    type Err = ParseTileVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older project folders used the `*Tile` class names.
        match s {
            "PlotMap" => Ok(Self::PlotMap),
            "PlotEvent" | "PlotTile" => Ok(Self::PlotEvent),
            "Character" | "CharacterTile" => Ok(Self::Character),
            "Setting" | "SettingTile" => Ok(Self::Setting),
            _ => Err(ParseTileVariantError {
                value: s.to_owned(),
            }),
        }
    }
}

/// Story-order membership of a plot map.
///
/// `plot_points` is the source of truth; `resolved_plot_points` is a lookup cache holding the
/// subset of ids that resolved against the registry, in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotMapFields {
    pub(crate) plot_points: Vec<TileId>,
    pub(crate) resolved_plot_points: Vec<TileId>,
}

impl PlotMapFields {
    pub fn plot_points(&self) -> &[TileId] {
        &self.plot_points
    }

    pub fn resolved_plot_points(&self) -> &[TileId] {
        &self.resolved_plot_points
    }

    pub fn contains(&self, event_id: &TileId) -> bool {
        self.plot_points.contains(event_id)
    }

    pub fn position(&self, event_id: &TileId) -> Option<usize> {
        self.plot_points.iter().position(|id| id == event_id)
    }
}

/// `None` in an optional text field means the field was absent from the loaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotEventFields {
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    /// Chronological position in the story world; independent of plot-map order.
    pub timeline_index: Option<i64>,
}

impl Default for PlotEventFields {
    fn default() -> Self {
        Self {
            description: Some(String::new()),
            date: Some(String::new()),
            location: Some(String::new()),
            timeline_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterFields {
    pub description: Option<String>,
    pub title: Option<String>,
    pub backstory: Option<String>,
    pub traits: Option<Vec<String>>,
    pub race: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
}

impl Default for CharacterFields {
    fn default() -> Self {
        Self {
            description: Some(String::new()),
            title: Some(String::new()),
            backstory: Some(String::new()),
            traits: Some(Vec::new()),
            race: Some(String::new()),
            age: None,
            gender: Some(String::new()),
            occupation: Some(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingFields {
    pub description: Option<String>,
    pub history: Option<String>,
}

impl Default for SettingFields {
    fn default() -> Self {
        Self {
            description: Some(String::new()),
            history: Some(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileBody {
    PlotMap(PlotMapFields),
    PlotEvent(PlotEventFields),
    Character(CharacterFields),
    Setting(SettingFields),
}

impl TileBody {
    pub fn new(variant: TileVariant) -> Self {
        match variant {
            TileVariant::PlotMap => Self::PlotMap(PlotMapFields::default()),
            TileVariant::PlotEvent => Self::PlotEvent(PlotEventFields::default()),
            TileVariant::Character => Self::Character(CharacterFields::default()),
            TileVariant::Setting => Self::Setting(SettingFields::default()),
        }
    }

    pub fn variant(&self) -> TileVariant {
        match self {
            Self::PlotMap(_) => TileVariant::PlotMap,
            Self::PlotEvent(_) => TileVariant::PlotEvent,
            Self::Character(_) => TileVariant::Character,
            Self::Setting(_) => TileVariant::Setting,
        }
    }

    /// Names of optional variant fields that are currently absent.
    pub fn absent_fields(&self) -> Vec<&'static str> {
        fn push(out: &mut Vec<&'static str>, name: &'static str, present: bool) {
            if !present {
                out.push(name);
            }
        }

        let mut out = Vec::new();
        match self {
            Self::PlotMap(_) => {}
            Self::PlotEvent(fields) => {
                push(&mut out, "description", fields.description.is_some());
                push(&mut out, "date", fields.date.is_some());
                push(&mut out, "location", fields.location.is_some());
            }
            Self::Character(fields) => {
                push(&mut out, "description", fields.description.is_some());
                push(&mut out, "title", fields.title.is_some());
                push(&mut out, "backstory", fields.backstory.is_some());
                push(&mut out, "traits", fields.traits.is_some());
                push(&mut out, "race", fields.race.is_some());
                push(&mut out, "gender", fields.gender.is_some());
                push(&mut out, "occupation", fields.occupation.is_some());
            }
            Self::Setting(fields) => {
                push(&mut out, "description", fields.description.is_some());
                push(&mut out, "history", fields.history.is_some());
            }
        }
        out
    }
}

/// A node in the authoring graph.
///
/// `links` is the persisted source of truth. `resolved_links` caches the distinct link
/// targets that resolved against the owning project, in first-seen order; it holds ids only
/// and is looked up through the registry, never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    id: Option<TileId>,
    name: String,
    tags: BTreeSet<String>,
    links: Vec<Link>,
    resolved_links: Vec<TileId>,
    body: TileBody,
    /// Integer fields whose stored value could not be read, keyed by field name.
    invalid_fields: BTreeMap<&'static str, String>,
}

impl Tile {
    pub fn new(variant: TileVariant, name: impl Into<String>) -> Self {
        Self::with_body(TileBody::new(variant), name)
    }

    pub fn with_body(body: TileBody, name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            tags: BTreeSet::new(),
            links: Vec::new(),
            resolved_links: Vec::new(),
            body,
            invalid_fields: BTreeMap::new(),
        }
    }

    pub fn plot_map(name: impl Into<String>) -> Self {
        Self::new(TileVariant::PlotMap, name)
    }

    pub fn plot_event(name: impl Into<String>) -> Self {
        Self::new(TileVariant::PlotEvent, name)
    }

    pub fn character(name: impl Into<String>) -> Self {
        Self::new(TileVariant::Character, name)
    }

    pub fn setting(name: impl Into<String>) -> Self {
        Self::new(TileVariant::Setting, name)
    }

    pub fn with_id(mut self, id: TileId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<&TileId> {
        self.id.as_ref()
    }

    pub(crate) fn set_id(&mut self, id: Option<TileId>) {
        self.id = id;
    }

    pub fn variant(&self) -> TileVariant {
        self.body.variant()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn body(&self) -> &TileBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut TileBody {
        &mut self.body
    }

    /// Raw text of fields that were stored with the wrong type; the checker reports each.
    pub fn invalid_fields(&self) -> &BTreeMap<&'static str, String> {
        &self.invalid_fields
    }

    pub(crate) fn mark_invalid_field(&mut self, field: &'static str, raw: String) {
        self.invalid_fields.insert(field, raw);
    }

    /// Forgets an unreadable stored value, usually after the field has been set again.
    pub fn clear_invalid_field(&mut self, field: &str) -> Option<String> {
        self.invalid_fields.remove(field)
    }

    pub fn as_plot_map(&self) -> Option<&PlotMapFields> {
        match &self.body {
            TileBody::PlotMap(fields) => Some(fields),
            _ => None,
        }
    }

    pub(crate) fn as_plot_map_mut(&mut self) -> Option<&mut PlotMapFields> {
        match &mut self.body {
            TileBody::PlotMap(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_plot_event(&self) -> Option<&PlotEventFields> {
        match &self.body {
            TileBody::PlotEvent(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_plot_event_mut(&mut self) -> Option<&mut PlotEventFields> {
        match &mut self.body {
            TileBody::PlotEvent(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_character(&self) -> Option<&CharacterFields> {
        match &self.body {
            TileBody::Character(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut CharacterFields> {
        match &mut self.body {
            TileBody::Character(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_setting(&self) -> Option<&SettingFields> {
        match &self.body {
            TileBody::Setting(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_setting_mut(&mut self) -> Option<&mut SettingFields> {
        match &mut self.body {
            TileBody::Setting(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<(), GraphError> {
        let tag = normalize_tag(tag).ok_or(GraphError::EmptyTag)?;
        self.tags.insert(tag);
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(&tag.trim().to_lowercase())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.trim().to_lowercase())
    }

    pub(crate) fn tags_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.tags
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub(crate) fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }

    pub fn resolved_links(&self) -> &[TileId] {
        &self.resolved_links
    }

    pub(crate) fn resolved_links_mut(&mut self) -> &mut Vec<TileId> {
        &mut self.resolved_links
    }

    pub fn has_link(&self, target: &TileId, link_type: &LinkType) -> bool {
        self.links.iter().any(|link| link.is(target, link_type))
    }

    pub fn links_to(&self, target: &TileId) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|link| link.target() == target)
            .collect()
    }

    /// Distinct link targets in first-seen order.
    pub fn link_targets(&self) -> Vec<&TileId> {
        let mut seen = HashSet::new();
        self.links
            .iter()
            .map(Link::target)
            .filter(|target| seen.insert(*target))
            .collect()
    }

    pub fn link_types(&self, target: &TileId) -> Vec<&LinkType> {
        self.links
            .iter()
            .filter(|link| link.target() == target)
            .map(Link::link_type)
            .collect()
    }

    /// Appends an already-validated edge and keeps the resolved cache in step.
    pub(crate) fn push_link(&mut self, link: Link) {
        if !self.resolved_links.contains(link.target()) {
            self.resolved_links.push(link.target().clone());
        }
        self.links.push(link);
    }

    /// Removes every edge to `target` (of `link_type` when given) and returns how many were
    /// removed. The cache entry goes away only once no edge targets that id.
    pub fn remove_link(&mut self, target: &TileId, link_type: Option<&LinkType>) -> usize {
        let before = self.links.len();
        self.links.retain(|link| {
            !(link.target() == target && link_type.map_or(true, |ty| link.link_type() == ty))
        });

        let still_linked = self.links.iter().any(|link| link.target() == target);
        if !still_linked {
            self.resolved_links.retain(|id| id != target);
        }

        before - self.links.len()
    }

    /// Rebuilds `resolved_links` from `links`, skipping targets `exists` rejects.
    ///
    /// Returns the distinct dangling targets so the caller can report them.
    pub fn resolve_links(&mut self, exists: impl Fn(&TileId) -> bool) -> Vec<TileId> {
        let mut resolved = Vec::new();
        let mut dangling = Vec::new();
        let mut seen = HashSet::new();

        for link in &self.links {
            let target = link.target();
            if !seen.insert(target) {
                continue;
            }
            if exists(target) {
                resolved.push(target.clone());
            } else {
                dangling.push(target.clone());
            }
        }

        self.resolved_links = resolved;
        dangling
    }

    /// Rebuilds `resolved_plot_points` for plot maps; other variants resolve nothing.
    pub fn resolve_plot_points(&mut self, exists: impl Fn(&TileId) -> bool) -> Vec<TileId> {
        let Some(fields) = self.as_plot_map_mut() else {
            return Vec::new();
        };

        let (resolved, dangling): (Vec<_>, Vec<_>) =
            fields.plot_points.iter().cloned().partition(|id| exists(id));
        fields.resolved_plot_points = resolved;
        dangling
    }
}

pub(crate) fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}
