//! Level definitions
//!
//! Mirrors the JSON level format produced by the level loader/editor. Only the
//! light source, walls, crystals and draggable mirrors matter to the core;
//! name, world, par moves and grid size are carried along as metadata.

use std::f32::consts::FRAC_PI_4;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::GridCell;
use crate::consts::{ARENA_COLS, ARENA_ROWS};
use crate::error::{Error, Result};
use crate::sim::{Entity, EntityId, SpatialIndex};

/// Light source placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDef {
    pub x: i32,
    pub y: i32,
    /// Emission angle in radians
    #[serde(default)]
    pub angle: f32,
}

/// Wall placement, anchored at its top-left cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallDef {
    pub x: i32,
    pub y: i32,
    #[serde(default = "one")]
    pub width: u32,
    #[serde(default = "one")]
    pub height: u32,
}

/// Crystal placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrystalDef {
    pub x: i32,
    pub y: i32,
}

/// Draggable mirror starting pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MirrorDef {
    pub x: i32,
    pub y: i32,
    #[serde(default = "quarter_pi")]
    pub angle: f32,
}

fn one() -> u32 {
    1
}

fn quarter_pi() -> f32 {
    FRAC_PI_4
}

/// A complete level as authored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub par_moves: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u32>,
    #[serde(default)]
    pub light_source: Option<LightDef>,
    #[serde(default)]
    pub walls: Vec<WallDef>,
    #[serde(default)]
    pub crystals: Vec<CrystalDef>,
    #[serde(default)]
    pub mirrors: Vec<MirrorDef>,
}

impl LightDef {
    pub fn cell(&self) -> GridCell {
        GridCell::new(self.x, self.y)
    }
}

impl CrystalDef {
    pub fn cell(&self) -> GridCell {
        GridCell::new(self.x, self.y)
    }
}

impl MirrorDef {
    pub fn cell(&self) -> GridCell {
        GridCell::new(self.x, self.y)
    }
}

impl LevelDefinition {
    /// Parse a level from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::json("level", e))
    }

    /// Read and parse a level file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&json)
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("Level {id}"),
            (None, None) => "Untitled".to_string(),
        }
    }

    /// Spatial index holding the fixed geometry (light, walls, crystals)
    pub fn fixed_index(&self) -> SpatialIndex {
        let mut index = SpatialIndex::new();
        if let Some(light) = &self.light_source {
            index.add(Entity::light(light.cell(), light.angle));
        }
        for wall in &self.walls {
            index.add(Entity::wall(GridCell::new(wall.x, wall.y), wall.width, wall.height));
        }
        for crystal in &self.crystals {
            index.add(Entity::crystal(crystal.cell()));
        }
        index
    }

    /// Spatial index with the fixed geometry plus every draggable mirror
    ///
    /// Returns the mirror ids in declaration order.
    pub fn build_index(&self) -> (SpatialIndex, Vec<EntityId>) {
        let mut index = self.fixed_index();
        let mirrors = self
            .mirrors
            .iter()
            .map(|m| index.add(Entity::mirror(m.cell(), m.angle)))
            .collect();
        (index, mirrors)
    }

    /// Entities placed outside the 20x15 arena
    ///
    /// Walls must fit entirely; everything else is checked by its cell.
    pub fn placement_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let outside = |what: &str, cell: GridCell| format!("{what} at ({}, {}) is outside the arena", cell.x, cell.y);

        if let Some(light) = &self.light_source {
            if !light.cell().in_bounds() {
                issues.push(outside("Light source", light.cell()));
            }
        }
        for wall in &self.walls {
            let right = i64::from(wall.x) + i64::from(wall.width);
            let bottom = i64::from(wall.y) + i64::from(wall.height);
            if !GridCell::new(wall.x, wall.y).in_bounds()
                || right > i64::from(ARENA_COLS)
                || bottom > i64::from(ARENA_ROWS)
            {
                issues.push(format!("Wall at ({}, {}) extends outside the arena", wall.x, wall.y));
            }
        }
        for crystal in &self.crystals {
            if !crystal.cell().in_bounds() {
                issues.push(outside("Crystal", crystal.cell()));
            }
        }
        for mirror in &self.mirrors {
            if !mirror.cell().in_bounds() {
                issues.push(outside("Mirror", mirror.cell()));
            }
        }
        issues
    }

    /// Static authoring checks, independent of solvability
    pub fn lint(&self) -> Vec<String> {
        let mut issues = self.placement_issues();
        if self.light_source.is_none() {
            issues.push("Missing light source".to_string());
        }
        if self.crystals.is_empty() {
            issues.push("No crystals defined".to_string());
        }
        if self.walls.is_empty() {
            issues.push("No walls defined".to_string());
        }
        if self.name.is_none() {
            issues.push("Missing level name".to_string());
        }
        if self.par_moves.is_none() {
            issues.push("Missing par moves".to_string());
        }
        issues
    }
}
