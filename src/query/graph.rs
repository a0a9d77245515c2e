// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::model::{Project, TileId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub target: TileId,
    #[serde(rename = "type")]
    pub link_type: String,
}

/// Flat, serializable view of one tile for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub name: String,
    pub variant: &'static str,
    pub links: Vec<GraphLink>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_points: Option<Vec<TileId>>,
}

pub fn graph_export(project: &Project) -> BTreeMap<TileId, GraphNode> {
    project
        .tiles()
        .iter()
        .map(|(tile_id, tile)| {
            let node = GraphNode {
                name: tile.name().to_owned(),
                variant: tile.variant().as_str(),
                links: tile
                    .links()
                    .iter()
                    .map(|link| GraphLink {
                        target: link.target().clone(),
                        link_type: link.link_type().to_string(),
                    })
                    .collect(),
                tags: tile.tags().iter().cloned().collect(),
                plot_points: tile
                    .as_plot_map()
                    .map(|fields| fields.plot_points().to_vec()),
            };
            (tile_id.clone(), node)
        })
        .collect()
}

pub fn render_graph_text(project: &Project) -> String {
    let graph = graph_export(project);
    let mut out = String::from("Project Graph:");

    for (tile_id, node) in &graph {
        let _ = write!(out, "\n- {} ({}, id={tile_id})", node.name, node.variant);
        if !node.links.is_empty() {
            let links: Vec<String> = node
                .links
                .iter()
                .map(|link| format!("{} ({})", link.target, link.link_type))
                .collect();
            let _ = write!(out, "\n  Links to: {}", links.join(", "));
        }
        if let Some(plot_points) = &node.plot_points {
            let plot_points: Vec<&str> = plot_points.iter().map(TileId::as_str).collect();
            let _ = write!(out, "\n  Plot points: {}", plot_points.join(", "));
        }
        if !node.tags.is_empty() {
            let _ = write!(out, "\n  Tags: {}", node.tags.join(", "));
        }
    }
    let _ = write!(out, "\nTotal tiles: {}", graph.len());

    out
}
