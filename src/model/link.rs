// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use super::ids::TileId;

/// Directed, typed edge from the owning tile to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    target: TileId,
    link_type: LinkType,
}

impl Link {
    pub fn new(target: TileId, link_type: LinkType) -> Self {
        Self { target, link_type }
    }

    pub fn target(&self) -> &TileId {
        &self.target
    }

    pub fn link_type(&self) -> &LinkType {
        &self.link_type
    }

    pub fn is(&self, target: &TileId, link_type: &LinkType) -> bool {
        &self.target == target && &self.link_type == link_type
    }
}

/// Edge type. Unknown types are kept verbatim so hand-edited files survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LinkType {
    #[default]
    References,
    PlotPoint,
    Requires,
    Causes,
    Enables,
    Blocks,
    Foreshadows,
    HappensIn,
    Involves,
    Other(String),
}

impl LinkType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::References => "references",
            Self::PlotPoint => "plot point",
            Self::Requires => "requires",
            Self::Causes => "causes",
            Self::Enables => "enables",
            Self::Blocks => "blocks",
            Self::Foreshadows => "foreshadows",
            Self::HappensIn => "happens in",
            Self::Involves => "involves",
            Self::Other(raw) => raw,
        }
    }

    /// Story-logic edges order plot events and are only valid between two of them.
    pub fn is_story_logic(&self) -> bool {
        matches!(
            self,
            Self::Requires | Self::Causes | Self::Enables | Self::Blocks
        )
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLinkTypeError;

impl fmt::Display for ParseLinkTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("link type must not be empty")
    }
}

impl std::error::Error for ParseLinkTypeError {}

impl FromStr for LinkType {
    type Err = ParseLinkTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let link_type = match normalized.as_str() {
            "" => return Err(ParseLinkTypeError),
            "references" => Self::References,
            "plot point" => Self::PlotPoint,
            "requires" => Self::Requires,
            "causes" => Self::Causes,
            "enables" => Self::Enables,
            "blocks" => Self::Blocks,
            "foreshadows" => Self::Foreshadows,
            "happens in" => Self::HappensIn,
            "involves" => Self::Involves,
            _ => Self::Other(normalized),
        };
        Ok(link_type)
    }
}
