// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over a project.
//!
//! Orphan analysis and the graph export used by the editor and the command line.

pub mod graph;
pub mod orphans;

pub use graph::{graph_export, render_graph_text, GraphLink, GraphNode};
pub use orphans::{find_orphans, OrphanFlags, OrphanQuery};
