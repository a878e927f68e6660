//! Layered tile storage
//!
//! A map is a stack of equally sized layers addressed `[layer][x][y]`.
//! Layer 0 holds collision codes and entity spawn markers and is never
//! drawn; the layers above it are visual, each with its own parallax factor.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::animation::AnimationRule;
use super::codec;
use super::error::{FormatError, LoadError};
use crate::consts::{EMPTY_TILE, GROUND_LAYER};

/// Format tag written by `TileGrid::new`
pub const DEFAULT_FORMAT_TAG: &str = "TileMap";

/// Ceiling on width * height * layers accepted from a map header
pub const MAX_CELLS: usize = 1 << 24;

/// One layer of tile codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Scroll multiplier relative to the camera (0 = fixed, 1 = moves with the world)
    pub parallax: Vec2,
    /// Column-major cells: index `x * height + y`
    cells: Vec<u16>,
}

impl Layer {
    fn empty(name: String, width: u16, height: u16) -> Self {
        Self {
            name,
            parallax: Vec2::ONE,
            cells: vec![EMPTY_TILE; width as usize * height as usize],
        }
    }

    /// True if every cell is empty
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == EMPTY_TILE)
    }
}

/// Texture references stored in a map (empty string = none)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTextures {
    pub background: String,
    pub atlas: String,
    pub foreground: String,
    /// Unused slot kept for byte-exact re-encoding
    pub reserved: String,
}

/// A loaded tile map
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    /// Free-form tag at the start of the file
    pub format_tag: String,
    /// Tile edge length in pixels
    pub tile_size: u16,
    /// Reserved header words, preserved as read
    pub header_reserved: [u16; 2],
    pub textures: MapTextures,
    pub animations: Vec<AnimationRule>,
    width: u16,
    height: u16,
    layers: Vec<Layer>,
    main_layer: u8,
    phantom_layer: u8,
}

impl TileGrid {
    /// Create an empty grid. At least one layer (the ground layer) is always
    /// present and at most 256 are kept.
    pub fn new(width: u16, height: u16, layer_count: usize, tile_size: u16) -> Self {
        let layer_count = layer_count.clamp(1, 256);
        let layers = (0..layer_count)
            .map(|i| Layer::empty(format!("Layer {i}"), width, height))
            .collect();
        let mut grid = Self {
            format_tag: DEFAULT_FORMAT_TAG.to_string(),
            tile_size: tile_size.max(1),
            header_reserved: [0; 2],
            textures: MapTextures::default(),
            animations: Vec::new(),
            width,
            height,
            layers,
            main_layer: 0,
            phantom_layer: 0,
        };
        grid.main_layer = grid.detect_main_layer();
        grid
    }

    /// Parse a map from its binary form
    pub fn load(bytes: &[u8]) -> Result<Self, FormatError> {
        codec::decode(bytes)
    }

    /// Read and parse a map file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path.as_ref())?;
        let grid = codec::decode(&bytes)?;
        log::info!("Loaded map {}", path.as_ref().display());
        Ok(grid)
    }

    /// Serialize to the binary map format
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        codec::encode(self)
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Last background layer; entities are drawn right after it
    #[inline]
    pub fn main_layer(&self) -> usize {
        self.main_layer as usize
    }

    pub fn set_main_layer(&mut self, layer: u8) {
        self.main_layer = layer;
    }

    /// Layer that fades out while a tracked entity is beneath it (0 = none)
    #[inline]
    pub fn phantom_layer(&self) -> Option<usize> {
        match self.phantom_layer {
            0 => None,
            l => Some(l as usize),
        }
    }

    /// Raw phantom index as stored in the header
    #[inline]
    pub fn phantom_layer_index(&self) -> u8 {
        self.phantom_layer
    }

    pub fn set_phantom_layer(&mut self, layer: u8) {
        self.phantom_layer = layer;
    }

    /// First drawable layer whose parallax is exactly (1, 1), or 0 if none
    pub fn detect_main_layer(&self) -> u8 {
        self.layers
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, layer)| layer.parallax == Vec2::ONE)
            .map(|(i, _)| i as u8)
            .unwrap_or(0)
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width as usize && y < self.height as usize {
            Some(x * self.height as usize + y)
        } else {
            None
        }
    }

    /// Tile code at a cell, `EMPTY_TILE` outside the grid
    #[inline]
    pub fn get(&self, layer: usize, x: usize, y: usize) -> u16 {
        match (self.layers.get(layer), self.index(x, y)) {
            (Some(l), Some(i)) => l.cells[i],
            _ => EMPTY_TILE,
        }
    }

    /// Set a cell; writes outside the grid are ignored
    pub fn set(&mut self, layer: usize, x: usize, y: usize, code: u16) {
        if let Some(i) = self.index(x, y) {
            if let Some(l) = self.layers.get_mut(layer) {
                l.cells[i] = code;
            }
        }
    }

    /// Fill a horizontal span of a row
    pub fn fill_row(&mut self, layer: usize, y: usize, xs: std::ops::Range<usize>, code: u16) {
        for x in xs {
            self.set(layer, x, y, code);
        }
    }

    pub fn parallax(&self, layer: usize) -> Vec2 {
        self.layers.get(layer).map(|l| l.parallax).unwrap_or(Vec2::ONE)
    }

    pub fn set_parallax(&mut self, layer: usize, parallax: Vec2) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.parallax = parallax;
        }
    }

    /// Width of the map in pixels
    #[inline]
    pub fn pixel_width(&self) -> i32 {
        self.width as i32 * self.tile_size as i32
    }

    /// Height of the map in pixels
    #[inline]
    pub fn pixel_height(&self) -> i32 {
        self.height as i32 * self.tile_size as i32
    }

    /// Index of the right-most pixel column
    #[inline]
    pub fn right_pixel(&self) -> i32 {
        self.pixel_width() - 1
    }

    /// Index of the bottom-most pixel row
    #[inline]
    pub fn bottom_pixel(&self) -> i32 {
        self.pixel_height() - 1
    }

    /// Tile code under a pixel, `None` outside the grid
    pub fn code_at_pixel(&self, layer: usize, px: i32, py: i32) -> Option<u16> {
        if px < 0 || py < 0 || px > self.right_pixel() || py > self.bottom_pixel() {
            return None;
        }
        let ts = self.tile_size as i32;
        Some(self.get(layer, (px / ts) as usize, (py / ts) as usize))
    }

    /// Ground-layer code under a pixel
    #[inline]
    pub fn ground_code_at_pixel(&self, px: i32, py: i32) -> Option<u16> {
        self.code_at_pixel(GROUND_LAYER, px, py)
    }

    /// One row of a layer, left to right
    pub fn row(&self, layer: usize, y: usize) -> impl Iterator<Item = u16> + '_ {
        (0..self.width as usize).map(move |x| self.get(layer, x, y))
    }

    /// Non-empty cells of a layer in reading order (row by row): `(x, y, code)`
    pub fn occupied_cells(&self, layer: usize) -> impl Iterator<Item = (usize, usize, u16)> + '_ {
        let (w, h) = (self.width as usize, self.height as usize);
        (0..h)
            .flat_map(move |y| (0..w).map(move |x| (x, y)))
            .filter_map(move |(x, y)| match self.get(layer, x, y) {
                EMPTY_TILE => None,
                code => Some((x, y, code)),
            })
    }
}
