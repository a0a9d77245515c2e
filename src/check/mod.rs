// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural integrity checks.
//!
//! The checker never repairs anything: it reads a project and reports errors (the project
//! must not be saved) and warnings (suspicious but loadable).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::model::timestamp::parse_timestamp;
use crate::model::{LinkType, MetaInt, Project, ProjectMeta, Tile, TileId, TileVariant};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IntegrityReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl IntegrityReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} integrity error(s), {} warning(s)",
            self.errors.len(),
            self.warnings.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  error: {error}")?;
        }
        for warning in &self.warnings {
            write!(f, "\n  warning: {warning}")?;
        }
        Ok(())
    }
}

pub fn check_project(project: &Project) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    check_meta(project.meta(), &mut report);

    for (key, tile) in project.tiles() {
        check_tile(project, key, tile, &mut report);
    }

    check_timeline_conflicts(project, &mut report);
    report
}

fn check_meta(meta: &ProjectMeta, report: &mut IntegrityReport) {
    let label = format!("Project {} ({})", meta.display_name(), meta.display_id());

    if meta.name.as_deref().map_or(true, |name| name.trim().is_empty()) {
        report
            .errors
            .push(format!("Project ({}) missing 'project_name' attribute", meta.display_id()));
    }
    if meta.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        report
            .errors
            .push(format!("Project {} missing 'project_id' attribute", meta.display_name()));
    }

    for (field, value) in [
        ("description", &meta.description),
        ("author", &meta.author),
        ("last_editor", &meta.last_editor),
        ("created_at", &meta.created_at),
        ("last_modified", &meta.last_modified),
    ] {
        if value.is_none() {
            report
                .warnings
                .push(format!("{label} missing '{field}' attribute"));
        }
    }

    let mut parsed = Vec::with_capacity(2);
    for (field, value) in [
        ("created_at", &meta.created_at),
        ("last_modified", &meta.last_modified),
    ] {
        let Some(value) = value else {
            continue;
        };
        match parse_timestamp(value) {
            Some(timestamp) => parsed.push(timestamp),
            None => report.errors.push(format!(
                "{label} has invalid datetime format in metadata: {field}={value:?}"
            )),
        }
    }
    if let [created_at, last_modified] = parsed.as_slice() {
        if created_at > last_modified {
            report
                .errors
                .push(format!("{label} created_at is after last_modified"));
        }
    }

    match &meta.version {
        MetaInt::Missing => report
            .warnings
            .push(format!("{label} missing 'version' attribute")),
        MetaInt::Malformed(raw) => report
            .errors
            .push(format!("{label} version is not an int: {raw}")),
        MetaInt::Value(value) if *value < 0 => report
            .errors
            .push(format!("{label} version is negative: {value}")),
        MetaInt::Value(_) => {}
    }

    match &meta.schema_version {
        MetaInt::Missing => report
            .errors
            .push(format!("{label} missing 'schema_version' attribute")),
        MetaInt::Malformed(raw) => report
            .errors
            .push(format!("{label} schema version is not an int: {raw}")),
        MetaInt::Value(value) if *value < 0 => report
            .errors
            .push(format!("{label} schema version is negative: {value}")),
        MetaInt::Value(_) => {}
    }

    if meta.tags.is_none() {
        report
            .warnings
            .push(format!("{label} missing 'tags' attribute"));
    }
    if !meta.invalid_tags.is_empty() {
        report.errors.push(format!(
            "{label} tags contain non-string values: {}",
            meta.invalid_tags.join(", ")
        ));
    }
}

fn tile_label(tile: &Tile) -> String {
    let id = tile.id().map_or("MISSING ID", TileId::as_str);
    format!("{} {} ({id})", tile.variant(), tile.name())
}

fn check_tile(project: &Project, key: &TileId, tile: &Tile, report: &mut IntegrityReport) {
    let label = tile_label(tile);

    match tile.id() {
        None => {
            report.errors.push(format!("{label} missing 'id' attribute"));
            report
                .errors
                .push(format!("Tile ID mismatch: {label} has no id, key={key}"));
        }
        Some(tile_id) if tile_id != key => report
            .errors
            .push(format!("Tile ID mismatch: {label} tile.id={tile_id}, key={key}")),
        Some(_) => {}
    }
    if tile.name().trim().is_empty() {
        report.errors.push(format!("{label} missing 'name' attribute"));
    }

    check_link_cache(project, tile, &label, report);

    for link in tile.links() {
        if !link.link_type().is_story_logic() {
            continue;
        }
        let Some(target) = project.tile(link.target()) else {
            continue;
        };
        if tile.variant() != TileVariant::PlotEvent || target.variant() != TileVariant::PlotEvent
        {
            report.warnings.push(format!(
                "{label} has story logic link '{}' to {} which is only valid between PlotEvents",
                link.link_type(),
                tile_label(target)
            ));
        }
    }

    match tile.variant() {
        TileVariant::PlotMap => check_plot_map(project, tile, &label, report),
        TileVariant::PlotEvent => check_plot_event(project, tile, &label, report),
        TileVariant::Character | TileVariant::Setting => {}
    }

    for (field, raw) in tile.invalid_fields() {
        let negative = raw.parse::<i64>().is_ok_and(|value| value < 0);
        let problem = if negative { "is negative" } else { "is not an int" };
        report
            .errors
            .push(format!("{label} {field} {problem}: {raw}"));
    }

    for field in tile.body().absent_fields() {
        report
            .warnings
            .push(format!("{label} missing '{field}' attribute"));
    }
}

fn check_link_cache(project: &Project, tile: &Tile, label: &str, report: &mut IntegrityReport) {
    let targets = tile.link_targets();
    let resolved = tile.resolved_links();
    let resolved_set: HashSet<&TileId> = resolved.iter().collect();
    let target_set: HashSet<&TileId> = targets.iter().copied().collect();

    for target in &targets {
        if !project.contains(target) {
            report
                .errors
                .push(format!("{label} links to nonexistent tile {target}"));
        } else if !resolved_set.contains(*target) {
            report
                .errors
                .push(format!("{label} has unresolved link {target}"));
        }
    }

    for entry in resolved {
        if !project.contains(entry) {
            report.errors.push(format!(
                "{label} has resolved link to nonexistent tile {entry}"
            ));
        }
        if !target_set.contains(entry) {
            report
                .errors
                .push(format!("{label} has extra resolved link {entry} not in links"));
        }
    }
    if resolved_set.len() != resolved.len() {
        report
            .errors
            .push(format!("{label} has duplicate resolved links"));
    }
}

fn check_plot_map(project: &Project, tile: &Tile, label: &str, report: &mut IntegrityReport) {
    let Some(fields) = tile.as_plot_map() else {
        return;
    };
    let map_id = tile.id();

    for event_id in fields.plot_points() {
        let Some(event) = project.tile(event_id) else {
            report
                .errors
                .push(format!("{label} has unknown plot point {event_id}"));
            continue;
        };
        if event.variant() != TileVariant::PlotEvent {
            report.errors.push(format!(
                "{label} has plot point {} which is not a PlotEvent",
                tile_label(event)
            ));
        }
        if !tile.has_link(event_id, &LinkType::PlotPoint) {
            report.errors.push(format!(
                "{label} is missing its 'plot point' link to {}",
                tile_label(event)
            ));
        }
        let linked_back = map_id.is_some_and(|map_id| event.has_link(map_id, &LinkType::PlotPoint));
        if !linked_back {
            report
                .errors
                .push(format!("{} not linked back to {label}", tile_label(event)));
        }
    }

    let plot_set: HashSet<&TileId> = fields.plot_points().iter().collect();
    let resolved_set: HashSet<&TileId> = fields.resolved_plot_points().iter().collect();
    let mut coherent = true;

    for entry in fields.resolved_plot_points() {
        if !project.contains(entry) {
            coherent = false;
            report.errors.push(format!(
                "{label} has resolved plot point to unknown tile {entry}"
            ));
        }
        if !plot_set.contains(entry) {
            coherent = false;
            report.errors.push(format!(
                "{label} has extra resolved plot point {entry} not in plot_points"
            ));
        }
    }
    for event_id in fields.plot_points() {
        if project.contains(event_id) && !resolved_set.contains(event_id) {
            coherent = false;
            report
                .errors
                .push(format!("{label} has unresolved plot point {event_id}"));
        }
    }

    if coherent {
        let expected: Vec<&TileId> = fields
            .plot_points()
            .iter()
            .filter(|id| project.contains(id))
            .collect();
        let actual: Vec<&TileId> = fields.resolved_plot_points().iter().collect();
        if expected != actual {
            report.errors.push(format!(
                "{label} resolved plot points are out of order with plot_points"
            ));
        }
    }
}

fn check_plot_event(project: &Project, tile: &Tile, label: &str, report: &mut IntegrityReport) {
    if let Some(event_id) = tile.id() {
        for link in tile.links() {
            if link.link_type() != &LinkType::PlotPoint {
                continue;
            }
            let Some(map) = project.tile(link.target()) else {
                continue;
            };
            let Some(fields) = map.as_plot_map() else {
                continue;
            };
            if !fields.contains(event_id) {
                report.errors.push(format!(
                    "{label} has a 'plot point' link to {} which does not list it",
                    tile_label(map)
                ));
            }
        }
    }

    let timeline_index = tile
        .as_plot_event()
        .and_then(|fields| fields.timeline_index);
    if let Some(index) = timeline_index.filter(|index| *index < 0) {
        report
            .errors
            .push(format!("{label} timeline_index is negative: {index}"));
    }
}

fn check_timeline_conflicts(project: &Project, report: &mut IntegrityReport) {
    let mut by_index: BTreeMap<i64, BTreeSet<&TileId>> = BTreeMap::new();
    for (key, tile) in project.tiles() {
        if let Some(index) = tile
            .as_plot_event()
            .and_then(|fields| fields.timeline_index)
        {
            by_index.entry(index).or_default().insert(key);
        }
    }

    for (index, sharers) in by_index {
        if sharers.len() < 2 {
            continue;
        }
        let ids: Vec<&str> = sharers.into_iter().map(TileId::as_str).collect();
        report.warnings.push(format!(
            "Timeline conflict: timeline_index {index} is used by PlotEvents [{}]",
            ids.join(", ")
        ));
    }
}
