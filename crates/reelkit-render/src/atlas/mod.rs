//! Symbol atlas: every symbol image packed into one square texture.
//!
//! All tiles share one size, so packing is a fixed row-major grid instead of
//! a general rectangle packer. The UV rectangle of a symbol is a direct
//! function of its slot index.
//!
//! # Example
//!
//! ```ignore
//! use reelkit_render::atlas::{AtlasConfig, FileImageLoader, SymbolAtlas, SymbolDescriptor};
//!
//! let mut atlas = SymbolAtlas::new(AtlasConfig::default())?;
//! let symbols = [
//!     SymbolDescriptor::from_path("A", "symbols/a.png"),
//!     SymbolDescriptor::alias("_", "A"),
//! ];
//! pollster::block_on(atlas.initialize(&mut renderer, &symbols, &FileImageLoader::new()))?;
//! let uv = atlas.uv("A").unwrap();
//! ```

mod glyph;
mod loader;

pub use glyph::{FALLBACK_PALETTE, fallback_color_for, render_fallback_tile};
pub use loader::{FileImageLoader, ImageLoadError, ImageLoader, SymbolDescriptor, SymbolImage};

use image::RgbaImage;
use reelkit_core::alloc::HashMap;
use reelkit_core::geometry::Rect;
use reelkit_core::profiling::profile_function;

use crate::context::GraphicsError;
use crate::frame::TextureId;
use crate::renderer::Renderer;

/// Atlas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtlasConfig {
    /// Width and height of the square atlas texture in pixels.
    pub size: u32,
    /// Width and height of one symbol tile in pixels.
    pub tile_size: u32,
    /// Empty pixels around every tile, to stop linear filtering bleeding
    /// between neighbours.
    pub padding: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            size: 1024,
            tile_size: 128,
            padding: 2,
        }
    }
}

impl AtlasConfig {
    pub fn tiles_per_row(&self) -> u32 {
        self.size.saturating_sub(self.padding) / (self.tile_size + self.padding)
    }

    /// Maximum number of symbols the atlas can hold.
    pub fn capacity(&self) -> usize {
        let per_row = self.tiles_per_row() as usize;
        per_row * per_row
    }

    /// Pixel origin of the tile in `slot` (row-major).
    pub fn slot_origin(&self, slot: usize) -> (u32, u32) {
        let per_row = self.tiles_per_row().max(1) as usize;
        let col = (slot % per_row) as u32;
        let row = (slot / per_row) as u32;
        let stride = self.tile_size + self.padding;
        (self.padding + col * stride, self.padding + row * stride)
    }

    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.tile_size == 0 || self.tiles_per_row() == 0 {
            return Err(AtlasError::InvalidTileSize {
                tile_size: self.tile_size,
                atlas_size: self.size,
                padding: self.padding,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtlasError {
    /// More symbols than tiles.
    Overflow { requested: usize, capacity: usize },
    /// Not even one tile fits in the atlas.
    InvalidTileSize {
        tile_size: u32,
        atlas_size: u32,
        padding: u32,
    },
    /// Uploading the packed atlas failed.
    Graphics(GraphicsError),
}

impl std::fmt::Display for AtlasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtlasError::Overflow { requested, capacity } => {
                write!(f, "Atlas overflow: {} symbols requested, capacity is {}", requested, capacity)
            }
            AtlasError::InvalidTileSize {
                tile_size,
                atlas_size,
                padding,
            } => write!(
                f,
                "Tile size {} with padding {} does not fit in a {}px atlas",
                tile_size, padding, atlas_size
            ),
            AtlasError::Graphics(err) => write!(f, "Atlas upload failed: {}", err),
        }
    }
}

impl std::error::Error for AtlasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AtlasError::Graphics(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphicsError> for AtlasError {
    fn from(err: GraphicsError) -> Self {
        AtlasError::Graphics(err)
    }
}

/// Normalized texture coordinates of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvRect {
    pub u1: f32,
    pub v1: f32,
    pub u2: f32,
    pub v2: f32,
}

impl UvRect {
    pub fn width(&self) -> f32 {
        self.u2 - self.u1
    }

    pub fn height(&self) -> f32 {
        self.v2 - self.v1
    }

    pub fn to_rect(&self) -> Rect<f32> {
        Rect::new(self.u1, self.v1, self.width(), self.height())
    }

    /// UVs for the six vertices of a quad, in [`quad_corners`] order.
    pub fn quad_uvs(&self) -> [f32; 12] {
        [
            self.u1, self.v1, self.u2, self.v1, self.u1, self.v2, //
            self.u1, self.v2, self.u2, self.v1, self.u2, self.v2,
        ]
    }
}

/// Corners of the two triangles making up a quad: top-left, top-right,
/// bottom-left, bottom-left, top-right, bottom-right.
pub fn quad_corners(x: f32, y: f32, w: f32, h: f32) -> [[f32; 2]; 6] {
    [[x, y], [x + w, y], [x, y + h], [x, y + h], [x + w, y], [x + w, y + h]]
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtlasEntry {
    pub id: String,
    /// Pixel origin of the tile.
    pub x: u32,
    pub y: u32,
    pub tile_size: u32,
    pub uv: UvRect,
    /// True when the tile shows the fallback glyph instead of an image.
    pub fallback: bool,
}

/// Packed pixels and entries, before upload.
#[derive(Debug, Clone)]
pub struct PackedAtlas {
    pub image: RgbaImage,
    pub entries: Vec<AtlasEntry>,
}

/// Pack `symbols` into one image.
///
/// Duplicate IDs keep their first descriptor. Images that fail to load are
/// replaced with a fallback tile, so every ID always gets an entry.
pub async fn pack_symbols(
    config: &AtlasConfig,
    symbols: &[SymbolDescriptor],
    loader: &dyn ImageLoader,
) -> Result<PackedAtlas, AtlasError> {
    config.validate()?;

    let mut unique: Vec<&SymbolDescriptor> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if unique.iter().any(|s| s.id == symbol.id) {
            tracing::warn!("Duplicate atlas symbol '{}' ignored", symbol.id);
            continue;
        }
        unique.push(symbol);
    }

    let capacity = config.capacity();
    if unique.len() > capacity {
        return Err(AtlasError::Overflow {
            requested: unique.len(),
            capacity,
        });
    }

    let tile = config.tile_size;
    let mut tiles: Vec<Option<RgbaImage>> = vec![None; unique.len()];

    for (slot, symbol) in unique.iter().enumerate() {
        if symbol.alias_of.is_some() {
            continue;
        }
        if matches!(symbol.image, SymbolImage::None) {
            tracing::debug!("Symbol '{}' has no image, using fallback tile", symbol.id);
            continue;
        }
        match loader.load(&symbol.image).await {
            Ok(image) => {
                let image = if image.dimensions() == (tile, tile) {
                    image
                } else {
                    image::imageops::resize(&image, tile, tile, image::imageops::FilterType::Triangle)
                };
                tiles[slot] = Some(image);
            }
            Err(err) => {
                tracing::warn!("Failed to load image for symbol '{}': {}; using fallback", symbol.id, err);
            }
        }
    }

    let fallback_tile = |symbol: &SymbolDescriptor| {
        let fill = symbol.fallback_color.unwrap_or_else(|| fallback_color_for(&symbol.id));
        render_fallback_tile(&symbol.id, fill, tile)
    };

    // Owned tiles first, so an alias of a failed symbol copies its fallback.
    let mut fallbacks = vec![false; unique.len()];
    for (slot, symbol) in unique.iter().enumerate() {
        if symbol.alias_of.is_none() && tiles[slot].is_none() {
            tiles[slot] = Some(fallback_tile(*symbol));
            fallbacks[slot] = true;
        }
    }

    for (slot, symbol) in unique.iter().enumerate() {
        let Some(target) = &symbol.alias_of else {
            continue;
        };
        let source = unique
            .iter()
            .position(|s| &s.id == target && s.alias_of.is_none())
            .and_then(|i| Some((tiles[i].clone()?, fallbacks[i])));
        match source {
            Some((pixels, fallback)) => {
                tiles[slot] = Some(pixels);
                fallbacks[slot] = fallback;
            }
            None => {
                tracing::warn!("Symbol '{}' aliases unknown symbol '{}'; using fallback", symbol.id, target);
                tiles[slot] = Some(fallback_tile(*symbol));
                fallbacks[slot] = true;
            }
        }
    }

    let mut image = RgbaImage::new(config.size, config.size);
    let mut entries = Vec::with_capacity(unique.len());
    let atlas_size = config.size as f32;

    for (slot, ((symbol, pixels), fallback)) in unique.iter().zip(tiles).zip(fallbacks).enumerate() {
        let pixels = pixels.unwrap_or_else(|| fallback_tile(*symbol));
        let (x, y) = config.slot_origin(slot);
        image::imageops::replace(&mut image, &pixels, x as i64, y as i64);

        entries.push(AtlasEntry {
            id: symbol.id.clone(),
            x,
            y,
            tile_size: tile,
            uv: UvRect {
                u1: x as f32 / atlas_size,
                v1: y as f32 / atlas_size,
                u2: (x + tile) as f32 / atlas_size,
                v2: (y + tile) as f32 / atlas_size,
            },
            fallback,
        });
    }

    Ok(PackedAtlas { image, entries })
}

/// Owns the packed atlas texture and the UV rectangle of every symbol.
#[derive(Debug)]
pub struct SymbolAtlas {
    config: AtlasConfig,
    entries: Vec<AtlasEntry>,
    lookup: HashMap<String, usize>,
    texture: Option<TextureId>,
    image: Option<RgbaImage>,
}

impl SymbolAtlas {
    pub fn new(config: AtlasConfig) -> Result<Self, AtlasError> {
        config.validate()?;
        Ok(Self {
            config,
            entries: Vec::new(),
            lookup: HashMap::default(),
            texture: None,
            image: None,
        })
    }

    /// Load, pack and upload every symbol.
    pub async fn initialize(
        &mut self,
        renderer: &mut Renderer,
        symbols: &[SymbolDescriptor],
        loader: &dyn ImageLoader,
    ) -> Result<(), AtlasError> {
        let packed = pack_symbols(&self.config, symbols, loader).await?;
        self.upload(renderer, packed)
    }

    /// Upload an already packed atlas.
    pub fn upload(&mut self, renderer: &mut Renderer, packed: PackedAtlas) -> Result<(), AtlasError> {
        profile_function!();
        let texture = renderer.create_texture("symbol atlas", &packed.image)?;

        self.lookup = packed
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.id.clone(), i))
            .collect();
        let fallbacks = packed.entries.iter().filter(|e| e.fallback).count();
        self.entries = packed.entries;
        self.image = Some(packed.image);
        self.texture = Some(texture);

        tracing::info!(
            "Symbol atlas ready: {} symbols ({} fallback) in {}px atlas",
            self.entries.len(),
            fallbacks,
            self.config.size
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.texture.is_some()
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn uv(&self, id: &str) -> Option<UvRect> {
        self.entry(id).map(|e| e.uv)
    }

    pub fn entry(&self, id: &str) -> Option<&AtlasEntry> {
        self.lookup.get(id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    /// The atlas texture, once initialized.
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// CPU copy of the packed pixels.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AtlasEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Six interleaved `[x, y, u, v]` vertices for a quad showing `id`.
    pub fn create_symbol_quad(&self, id: &str, x: f32, y: f32, w: f32, h: f32) -> Option<[f32; 24]> {
        let uvs = self.uv(id)?.quad_uvs();
        let mut vertices = [0.0; 24];
        for (i, corner) in quad_corners(x, y, w, h).iter().enumerate() {
            vertices[i * 4] = corner[0];
            vertices[i * 4 + 1] = corner[1];
            vertices[i * 4 + 2] = uvs[i * 2];
            vertices[i * 4 + 3] = uvs[i * 2 + 1];
        }
        Some(vertices)
    }

    /// Twelve UV floats (six vertices) per symbol.
    ///
    /// Unknown symbols get a zeroed block and a warning.
    pub fn create_batch_uvs<S: AsRef<str>>(&self, ids: &[S]) -> Vec<f32> {
        let mut uvs = Vec::with_capacity(ids.len() * 12);
        for id in ids {
            let id = id.as_ref();
            match self.uv(id) {
                Some(uv) => uvs.extend_from_slice(&uv.quad_uvs()),
                None => {
                    tracing::warn!("Symbol '{}' missing from atlas, using empty UVs", id);
                    uvs.extend_from_slice(&[0.0; 12]);
                }
            }
        }
        uvs
    }
}
