// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::ids::TileId;
use super::link::LinkType;
use super::project::Project;
use super::tile::Tile;

pub(crate) fn tid(value: &str) -> TileId {
    TileId::new(value).expect("tile id")
}

pub(crate) struct StoryIds {
    pub(crate) map: TileId,
    pub(crate) p1: TileId,
    pub(crate) p2: TileId,
    pub(crate) hero: TileId,
    pub(crate) city: TileId,
}

/// One plot map with two ordered events, a character and a setting.
pub(crate) fn small_story() -> (Project, StoryIds) {
    let ids = StoryIds {
        map: tid("pm_000001"),
        p1: tid("pe_000001"),
        p2: tid("pe_000002"),
        hero: tid("ch_000001"),
        city: tid("st_000001"),
    };

    let mut project = Project::new();
    project.meta_mut().name = Some("Fixture Story".to_owned());
    project.add_tag("draft").expect("project tag");

    let mut map = Tile::plot_map("Act One").with_id(ids.map.clone());
    map.add_tag("main").expect("tag");
    project.add_tile(map).expect("map");

    let mut p1 = Tile::plot_event("Arrival").with_id(ids.p1.clone());
    if let Some(fields) = p1.as_plot_event_mut() {
        fields.timeline_index = Some(1);
        fields.location = Some("Harbor".to_owned());
    }
    project.add_tile(p1).expect("p1");

    let mut p2 = Tile::plot_event("Betrayal").with_id(ids.p2.clone());
    if let Some(fields) = p2.as_plot_event_mut() {
        fields.timeline_index = Some(2);
    }
    project.add_tile(p2).expect("p2");

    let mut hero = Tile::character("Mara").with_id(ids.hero.clone());
    if let Some(fields) = hero.as_character_mut() {
        fields.age = Some(31);
        fields.traits = Some(vec!["stubborn".to_owned(), "loyal".to_owned()]);
    }
    hero.add_tag("Protagonist").expect("tag");
    project.add_tile(hero).expect("hero");

    project
        .add_tile(Tile::setting("Port Vell").with_id(ids.city.clone()))
        .expect("city");

    project
        .add_plot_point(&ids.map, &ids.p1, None)
        .expect("plot point p1");
    project
        .add_plot_point(&ids.map, &ids.p2, None)
        .expect("plot point p2");
    project
        .add_link(&ids.p1, &ids.p2, LinkType::Causes)
        .expect("causes");
    project
        .add_link(&ids.hero, &ids.city, LinkType::References)
        .expect("hero lives in city");
    project
        .add_link(&ids.p1, &ids.hero, LinkType::Involves)
        .expect("arrival involves hero");

    (project, ids)
}
