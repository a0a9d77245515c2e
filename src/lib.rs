// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! StoryAlign core: a typed story graph (plot maps, plot events, characters, settings),
//! its integrity checker, and crash-safe persistence as a folder of JSON files.

pub mod check;
pub mod model;
pub mod query;
pub mod store;
