// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! JSON shapes of `manifest.json` and tile files.
//!
//! Decoding is lenient: absent fields become `None` (or a documented default) so hand-edited
//! and older files still load; the integrity checker reports what is missing.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::project_folder::StoreError;
use crate::model::tile::normalize_tag;
use crate::model::{
    CharacterFields, Link, LinkType, MetaInt, PlotEventFields, PlotMapFields, Project,
    ProjectMeta, SettingFields, Tile, TileBody, TileId, TileVariant,
};

pub const MANIFEST_FILENAME: &str = "manifest.json";
pub const TILES_DIR: &str = "Tiles";
pub const UNNAMED_TILE: &str = "Unnamed Tile";

/// Older files store links as bare target ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LinkJson {
    Typed {
        target: String,
        #[serde(rename = "type", default)]
        link_type: Option<String>,
    },
    Bare(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TileJson {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, alias = "tile_type")]
    variant: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    links: Vec<LinkJson>,
    #[serde(default)]
    tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    plot_points: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeline_index: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backstory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    traits: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    race: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    occupation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    history: Option<String>,
}

fn tile_to_json(tile_id: &TileId, tile: &Tile) -> TileJson {
    let mut json = TileJson {
        id: Some(tile_id.to_string()),
        variant: Some(tile.variant().as_str().to_owned()),
        name: Some(tile.name().to_owned()),
        links: tile
            .links()
            .iter()
            .map(|link| LinkJson::Typed {
                target: link.target().to_string(),
                link_type: Some(link.link_type().to_string()),
            })
            .collect(),
        tags: tile.tags().iter().cloned().collect(),
        ..TileJson::default()
    };

    match tile.body() {
        TileBody::PlotMap(fields) => {
            json.plot_points = Some(
                fields
                    .plot_points()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            );
        }
        TileBody::PlotEvent(fields) => {
            json.description = fields.description.clone();
            json.date = fields.date.clone();
            json.location = fields.location.clone();
            json.timeline_index = fields.timeline_index.map(Value::from);
        }
        TileBody::Character(fields) => {
            json.description = fields.description.clone();
            json.title = fields.title.clone();
            json.backstory = fields.backstory.clone();
            json.traits = fields.traits.clone();
            json.race = fields.race.clone();
            json.age = fields.age.map(Value::from);
            json.gender = fields.gender.clone();
            json.occupation = fields.occupation.clone();
        }
        TileBody::Setting(fields) => {
            json.description = fields.description.clone();
            json.history = fields.history.clone();
        }
    }

    json
}

fn parse_tile_id(path: &Path, value: String) -> Result<TileId, StoreError> {
    TileId::new(value.clone()).map_err(|source| StoreError::InvalidId {
        path: path.to_path_buf(),
        value,
        source: Box::new(source),
    })
}

/// Reads an optional integer field. A value of the wrong type is kept as raw text in
/// `invalid` so one bad field does not discard the whole tile.
fn int_field<T: TryFrom<i64>>(
    field: &'static str,
    value: Option<Value>,
    invalid: &mut Vec<(&'static str, String)>,
) -> Option<T> {
    let value = value.filter(|value| !value.is_null())?;
    let parsed = value.as_i64().and_then(|raw| T::try_from(raw).ok());
    if parsed.is_none() {
        invalid.push((field, value.to_string()));
    }
    parsed
}

fn tile_from_json(path: &Path, json: TileJson) -> Result<Tile, StoreError> {
    let raw_variant = json.variant.unwrap_or_default();
    let variant: TileVariant =
        raw_variant
            .parse()
            .map_err(|_| StoreError::UnknownVariant {
                path: path.to_path_buf(),
                value: raw_variant.clone(),
            })?;

    let mut invalid = Vec::new();
    let body = match variant {
        TileVariant::PlotMap => {
            let plot_points = json
                .plot_points
                .unwrap_or_default()
                .into_iter()
                .map(|raw| parse_tile_id(path, raw))
                .collect::<Result<Vec<_>, _>>()?;
            TileBody::PlotMap(PlotMapFields {
                plot_points,
                resolved_plot_points: Vec::new(),
            })
        }
        TileVariant::PlotEvent => TileBody::PlotEvent(PlotEventFields {
            description: json.description,
            date: json.date,
            location: json.location,
            timeline_index: int_field("timeline_index", json.timeline_index, &mut invalid),
        }),
        TileVariant::Character => TileBody::Character(CharacterFields {
            description: json.description,
            title: json.title,
            backstory: json.backstory,
            traits: json.traits,
            race: json.race,
            age: int_field("age", json.age, &mut invalid),
            gender: json.gender,
            occupation: json.occupation,
        }),
        TileVariant::Setting => TileBody::Setting(SettingFields {
            description: json.description,
            history: json.history,
        }),
    };

    let mut tile = Tile::with_body(body, json.name.unwrap_or_else(|| UNNAMED_TILE.to_owned()));
    for (field, raw) in invalid {
        tile.mark_invalid_field(field, raw);
    }
    if let Some(raw_id) = json.id {
        tile.set_id(Some(parse_tile_id(path, raw_id)?));
    }

    for tag in json.tags {
        if let Some(tag) = normalize_tag(&tag) {
            tile.tags_mut().insert(tag);
        }
    }

    for link in json.links {
        let (target, link_type) = match link {
            LinkJson::Typed { target, link_type } => (target, link_type),
            LinkJson::Bare(target) => (target, None),
        };
        let link_type = link_type
            .and_then(|raw| raw.parse::<LinkType>().ok())
            .unwrap_or_default();
        let target = parse_tile_id(path, target)?;
        // Duplicate edges in a hand-edited file collapse to one.
        if !tile.has_link(&target, &link_type) {
            tile.links_mut().push(Link::new(target, link_type));
        }
    }

    Ok(tile)
}

pub fn encode_tile(tile_id: &TileId, tile: &Tile) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&tile_to_json(tile_id, tile))
}

/// Decodes a tile file. Link and plot-point caches are left empty until resolution.
pub fn decode_tile(path: &Path, contents: &str) -> Result<Tile, StoreError> {
    let json: TileJson = serde_json::from_str(contents).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tile_from_json(path, json)
}

pub fn read_tile_file(path: &Path) -> Result<Tile, StoreError> {
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_tile(path, &contents)
}

pub(crate) struct ManifestEntry<'a> {
    pub(crate) id: &'a TileId,
    pub(crate) variant: TileVariant,
    pub(crate) filepath: String,
}

#[derive(Debug, Serialize)]
struct ManifestOut<'a> {
    project_name: Option<&'a str>,
    project_id: Option<&'a str>,
    description: Option<&'a str>,
    author: Option<&'a str>,
    last_editor: Option<&'a str>,
    created_at: Option<&'a str>,
    last_modified: Option<&'a str>,
    version: i64,
    schema_version: i64,
    tile_count: usize,
    tiles: Vec<ManifestTileOut<'a>>,
    project_tags: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct ManifestTileOut<'a> {
    id: &'a str,
    variant: &'static str,
    filepath: &'a str,
}

pub(crate) fn encode_manifest(
    project: &Project,
    version: i64,
    entries: &[ManifestEntry<'_>],
) -> Result<String, serde_json::Error> {
    let meta = project.meta();
    let manifest = ManifestOut {
        project_name: meta.name.as_deref(),
        project_id: meta.id.as_deref(),
        description: meta.description.as_deref(),
        author: meta.author.as_deref(),
        last_editor: meta.last_editor.as_deref(),
        created_at: meta.created_at.as_deref(),
        last_modified: meta.last_modified.as_deref(),
        version,
        schema_version: meta
            .schema_version
            .value()
            .unwrap_or(crate::model::SCHEMA_VERSION),
        tile_count: project.tile_count(),
        tiles: entries
            .iter()
            .map(|entry| ManifestTileOut {
                id: entry.id.as_str(),
                variant: entry.variant.as_str(),
                filepath: &entry.filepath,
            })
            .collect(),
        project_tags: meta
            .tags
            .iter()
            .flatten()
            .map(String::as_str)
            .collect(),
    };
    serde_json::to_string_pretty(&manifest)
}

/// Manifest as read from disk. Loosely typed fields are interpreted by [`manifest_meta`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestIn {
    #[serde(default)]
    project_name: Option<Value>,
    #[serde(default)]
    project_id: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    last_editor: Option<Value>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    last_modified: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    schema_version: Option<Value>,
    #[serde(default)]
    tile_count: Option<Value>,
    #[serde(default)]
    project_tags: Option<Value>,
    #[serde(default)]
    pub tiles: Option<Vec<ManifestTileIn>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestTileIn {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "tile_type")]
    pub variant: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
}

pub fn decode_manifest(path: &Path, contents: &str) -> Result<ManifestIn, StoreError> {
    serde_json::from_str(contents).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|value| !value.is_null())
}

/// Every project-level field a manifest carries.
pub const META_FIELDS: [&str; 10] = [
    "project_name",
    "project_id",
    "description",
    "author",
    "last_editor",
    "created_at",
    "last_modified",
    "version",
    "schema_version",
    "project_tags",
];

/// Project metadata read from a manifest, plus the fields that had to be defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestMeta {
    pub meta: ProjectMeta,
    pub defaulted: Vec<&'static str>,
}

struct MetaReader<'a> {
    warnings: &'a mut Vec<String>,
    defaulted: Vec<&'static str>,
}

impl MetaReader<'_> {
    fn missing(&mut self, field: &'static str) {
        self.warnings
            .push(format!("Manifest missing project's '{field}' attribute"));
        self.defaulted.push(field);
    }

    fn string(
        &mut self,
        field: &'static str,
        value: &Option<Value>,
        default: Option<String>,
    ) -> Option<String> {
        match present(value) {
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => {
                self.warnings.push(format!(
                    "Manifest '{field}' is not a string ({other}); using default"
                ));
                self.defaulted.push(field);
                default
            }
            None => {
                self.missing(field);
                default
            }
        }
    }

    fn int(&mut self, field: &'static str, value: &Option<Value>, default: MetaInt) -> MetaInt {
        match present(value) {
            Some(value) => value
                .as_i64()
                .map(MetaInt::Value)
                .unwrap_or_else(|| MetaInt::Malformed(value.to_string())),
            None => {
                self.missing(field);
                default
            }
        }
    }
}

/// Builds project metadata from a manifest, falling back to new-project defaults (with a
/// warning) for absent fields. Malformed integers and non-string tags are kept for the checker.
pub fn manifest_meta(manifest: &ManifestIn, warnings: &mut Vec<String>) -> ManifestMeta {
    let defaults = ProjectMeta::default();
    let mut reader = MetaReader {
        warnings,
        defaulted: Vec::new(),
    };

    let mut tags = BTreeSet::new();
    let mut invalid_tags = Vec::new();
    match present(&manifest.project_tags) {
        Some(Value::Array(values)) => {
            for value in values {
                match value {
                    Value::String(tag) => {
                        tags.insert(tag.clone());
                    }
                    other => invalid_tags.push(other.to_string()),
                }
            }
        }
        Some(other) => invalid_tags.push(other.to_string()),
        None => reader.missing("project_tags"),
    }

    let meta = ProjectMeta {
        name: reader.string("project_name", &manifest.project_name, defaults.name),
        id: reader.string("project_id", &manifest.project_id, defaults.id),
        description: reader.string("description", &manifest.description, defaults.description),
        author: reader.string("author", &manifest.author, defaults.author),
        last_editor: reader.string("last_editor", &manifest.last_editor, defaults.last_editor),
        created_at: reader.string("created_at", &manifest.created_at, defaults.created_at),
        last_modified: reader.string(
            "last_modified",
            &manifest.last_modified,
            defaults.last_modified,
        ),
        version: reader.int("version", &manifest.version, defaults.version),
        schema_version: reader.int(
            "schema_version",
            &manifest.schema_version,
            defaults.schema_version,
        ),
        tags: Some(tags),
        invalid_tags,
    };

    ManifestMeta {
        meta,
        defaulted: reader.defaulted,
    }
}

/// Declared tile count, if present and a non-negative integer.
pub fn manifest_tile_count(manifest: &ManifestIn, warnings: &mut Vec<String>) -> Option<usize> {
    match present(&manifest.tile_count) {
        Some(value) => match value.as_u64().and_then(|count| usize::try_from(count).ok()) {
            Some(count) => Some(count),
            None => {
                warnings.push(format!(
                    "Manifest 'tile_count' is not a non-negative integer: {value}"
                ));
                None
            }
        },
        None => {
            warnings.push("Manifest missing project's 'tile_count' attribute".to_owned());
            None
        }
    }
}
