// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Deterministic story fixtures (fixed ids, no RNG).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use storyalign::model::{LinkType, Project, Tile, TileId};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("storyalign_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    /// 2 maps x 10 events, 8 characters, 4 settings.
    Small,
    /// 8 maps x 40 events, 60 characters, 24 settings.
    Medium,
}

impl Case {
    fn shape(self) -> (usize, usize, usize, usize) {
        match self {
            Self::Small => (2, 10, 8, 4),
            Self::Medium => (8, 40, 60, 24),
        }
    }
}

fn tid(prefix: &str, index: usize) -> TileId {
    TileId::new(format!("{prefix}_{index:06}")).expect("tile id")
}

/// Builds a story whose every tile is reachable: events chain with `causes`, each event
/// involves a character and happens in a setting.
pub fn story(case: Case) -> Project {
    let (maps, events_per_map, characters, settings) = case.shape();
    let mut project = Project::new();
    project.meta_mut().name = Some(format!("Bench {case:?}"));

    for index in 0..characters {
        let mut tile = Tile::character(format!("Character {index}")).with_id(tid("ch", index));
        if let Some(fields) = tile.as_character_mut() {
            fields.age = Some(20 + (index % 50) as u32);
            fields.traits = Some(vec!["brave".to_owned(), format!("trait-{}", index % 7)]);
        }
        tile.add_tag(if index % 3 == 0 { "lead" } else { "support" })
            .expect("tag");
        project.add_tile(tile).expect("character");
    }
    for index in 0..settings {
        project
            .add_tile(Tile::setting(format!("Setting {index}")).with_id(tid("st", index)))
            .expect("setting");
    }

    let mut event_index = 0;
    for map_index in 0..maps {
        let map_id = tid("pm", map_index);
        project
            .add_tile(Tile::plot_map(format!("Arc {map_index}")).with_id(map_id.clone()))
            .expect("map");

        let mut previous: Option<TileId> = None;
        for _ in 0..events_per_map {
            let event_id = tid("pe", event_index);
            let mut event = Tile::plot_event(format!("Event {event_index}"))
                .with_id(event_id.clone());
            if let Some(fields) = event.as_plot_event_mut() {
                fields.timeline_index = Some(event_index as i64);
            }
            project.add_tile(event).expect("event");
            project
                .add_plot_point(&map_id, &event_id, None)
                .expect("plot point");

            if let Some(previous) = &previous {
                project
                    .add_link(previous, &event_id, LinkType::Causes)
                    .expect("causes");
            }
            project
                .add_link(
                    &event_id,
                    &tid("ch", event_index % characters),
                    LinkType::Involves,
                )
                .expect("involves");
            project
                .add_link(
                    &event_id,
                    &tid("st", event_index % settings),
                    LinkType::HappensIn,
                )
                .expect("happens in");

            previous = Some(event_id);
            event_index += 1;
        }
    }

    project
}
