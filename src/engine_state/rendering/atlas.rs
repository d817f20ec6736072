//! # Texture Atlas Builder
//!
//! Packs per-block 16x16 PNG tiles into a single RGBA atlas laid out as a
//! 9x5 grid. The `water_still.png` input is a vertical strip of animation
//! frames; each frame occupies its own consecutive tile slot so the shader
//! can page through them with an index offset.

use std::fs::File;
use std::path::Path;

use crate::core::EngineError;

/// Side length of one atlas tile in pixels.
pub const ATLAS_TILE_SIZE: u32 = 16;
/// Tiles per atlas row.
pub const ATLAS_COLUMNS: u32 = 9;
/// Atlas rows.
pub const ATLAS_ROWS: u32 = 5;

/// The block tile files, in atlas-index order. `water_still.png` is the
/// animation strip; the files after it land past the reserved frame range.
const TEXTURE_FILES: [&str; 13] = [
    "air.png",              // 0 - placeholder, never sampled
    "stone.png",            // 1
    "dirt.png",             // 2
    "grass_block_top.png",  // 3
    "grass_block_side.png", // 4
    "cobblestone.png",      // 5
    "spruce_log_top.png",   // 6
    "spruce_log.png",       // 7
    "spruce_leaves.png",    // 8
    "sand.png",             // 9
    "water_still.png",      // 10..=41 - animation frames
    "glass.png",            // 42
    "iron_block.png",       // 43
];

/// A decoded RGBA image.
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// One input to the packer.
pub struct AtlasEntry {
    pub image: TileImage,
    /// Vertical strip of square animation frames rather than a single tile.
    pub is_animation_strip: bool,
}

/// The packed atlas plus the water animation bookkeeping.
pub struct TextureAtlas {
    /// RGBA pixels, row-major.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Tile index of the first water frame.
    pub water_frame_start: u32,
    /// Number of water frames packed.
    pub water_frame_count: u32,
}

impl TextureAtlas {
    /// Pixel coordinates of a tile's upper-left corner.
    pub fn tile_origin(index: u32) -> (u32, u32) {
        (
            (index % ATLAS_COLUMNS) * ATLAS_TILE_SIZE,
            (index / ATLAS_COLUMNS) * ATLAS_TILE_SIZE,
        )
    }
}

/// Loads and packs the block atlas from a directory of PNG tiles.
pub fn load_block_atlas(texture_dir: &Path) -> Result<TextureAtlas, EngineError> {
    let mut entries = Vec::with_capacity(TEXTURE_FILES.len());
    for file in TEXTURE_FILES {
        let path = texture_dir.join(file);
        let image = decode_png(&path)
            .map_err(|e| EngineError::Atlas(format!("{}: {e}", path.display())))?;
        entries.push(AtlasEntry {
            image,
            is_animation_strip: file == "water_still.png",
        });
    }
    let atlas = pack_tiles(&entries);
    log::info!(
        "built {}x{} block atlas ({} water frames)",
        atlas.width,
        atlas.height,
        atlas.water_frame_count
    );
    Ok(atlas)
}

/// Packs decoded tiles into the atlas grid, in order.
///
/// Animation strips expand to one tile slot per frame. Tiles that do not fit
/// in the grid are dropped with a warning.
pub fn pack_tiles(entries: &[AtlasEntry]) -> TextureAtlas {
    let width = ATLAS_COLUMNS * ATLAS_TILE_SIZE;
    let height = ATLAS_ROWS * ATLAS_TILE_SIZE;
    let mut pixels = vec![255u8; (width * height * 4) as usize];

    let capacity = ATLAS_COLUMNS * ATLAS_ROWS;
    let mut next_index = 0u32;
    let mut water_frame_start = 0;
    let mut water_frame_count = 0;

    for entry in entries {
        if entry.is_animation_strip {
            let frame_count = entry.image.height / entry.image.width.max(1);
            water_frame_start = next_index;
            for frame in 0..frame_count {
                if next_index >= capacity {
                    log::warn!("atlas full; dropping animation frame {frame}");
                    break;
                }
                blit_tile(&mut pixels, width, next_index, &entry.image, frame);
                next_index += 1;
                water_frame_count += 1;
            }
        } else {
            if next_index >= capacity {
                log::warn!("atlas full; dropping tile {next_index}");
                continue;
            }
            blit_tile(&mut pixels, width, next_index, &entry.image, 0);
            next_index += 1;
        }
    }

    TextureAtlas {
        pixels,
        width,
        height,
        water_frame_start,
        water_frame_count,
    }
}

/// Copies one 16x16 tile (frame `frame` of a vertical strip) into the atlas
/// slot `index`.
fn blit_tile(pixels: &mut [u8], atlas_width: u32, index: u32, image: &TileImage, frame: u32) {
    let (origin_x, origin_y) = TextureAtlas::tile_origin(index);
    let copy_w = ATLAS_TILE_SIZE.min(image.width);
    let copy_h = ATLAS_TILE_SIZE.min(image.height);

    for y in 0..copy_h {
        for x in 0..copy_w {
            let src_y = frame * ATLAS_TILE_SIZE + y;
            if src_y >= image.height {
                continue;
            }
            let src = ((src_y * image.width + x) * 4) as usize;
            let dst = (((origin_y + y) * atlas_width + origin_x + x) * 4) as usize;
            pixels[dst..dst + 4].copy_from_slice(&image.rgba[src..src + 4]);
        }
    }
}

/// Decodes a PNG into tightly packed RGBA.
fn decode_png(path: &Path) -> Result<TileImage, EngineError> {
    let file = File::open(path)?;
    let decoder = png::Decoder::new(file);
    let mut reader = decoder.read_info()?;

    let (width, height, color_type) = {
        let info = reader.info();
        (info.width, info.height, info.color_type)
    };

    let mut raw = vec![0u8; reader.output_buffer_size()];
    let frame_info = reader.next_frame(&mut raw)?;
    raw.truncate(frame_info.buffer_size());

    let rgba = match color_type {
        png::ColorType::Rgba => raw,
        png::ColorType::Rgb => {
            let mut rgba = vec![0u8; (width * height * 4) as usize];
            for (i, chunk) in raw.chunks_exact(3).enumerate() {
                rgba[i * 4..i * 4 + 3].copy_from_slice(chunk);
                rgba[i * 4 + 3] = 255;
            }
            rgba
        }
        png::ColorType::Grayscale => {
            let mut rgba = vec![0u8; (width * height * 4) as usize];
            for (i, &value) in raw.iter().enumerate() {
                rgba[i * 4] = value;
                rgba[i * 4 + 1] = value;
                rgba[i * 4 + 2] = value;
                rgba[i * 4 + 3] = 255;
            }
            rgba
        }
        other => {
            return Err(EngineError::Atlas(format!(
                "unsupported PNG color type {other:?} in {}",
                path.display()
            )))
        }
    };

    Ok(TileImage {
        width,
        height,
        rgba,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_tile(r: u8) -> TileImage {
        let mut rgba = Vec::with_capacity(16 * 16 * 4);
        for _ in 0..16 * 16 {
            rgba.extend_from_slice(&[r, 0, 0, 255]);
        }
        TileImage {
            width: 16,
            height: 16,
            rgba,
        }
    }

    fn strip(frames: u32) -> TileImage {
        let mut rgba = Vec::with_capacity((16 * 16 * frames * 4) as usize);
        for frame in 0..frames {
            for _ in 0..16 * 16 {
                rgba.extend_from_slice(&[0, frame as u8, 0, 255]);
            }
        }
        TileImage {
            width: 16,
            height: 16 * frames,
            rgba,
        }
    }

    fn pixel_at(atlas: &TextureAtlas, x: u32, y: u32) -> [u8; 4] {
        let index = ((y * atlas.width + x) * 4) as usize;
        atlas.pixels[index..index + 4].try_into().unwrap()
    }

    #[test]
    fn test_atlas_dimensions() {
        let atlas = pack_tiles(&[]);
        assert_eq!(atlas.width, 144);
        assert_eq!(atlas.height, 80);
    }

    #[test]
    fn test_tile_grid_layout() {
        assert_eq!(TextureAtlas::tile_origin(0), (0, 0));
        assert_eq!(TextureAtlas::tile_origin(8), (128, 0));
        assert_eq!(TextureAtlas::tile_origin(9), (0, 16));
        assert_eq!(TextureAtlas::tile_origin(13), (64, 16));
    }

    #[test]
    fn test_tiles_land_in_their_slots() {
        let entries: Vec<AtlasEntry> = (0..12)
            .map(|i| AtlasEntry {
                image: solid_tile(i as u8),
                is_animation_strip: false,
            })
            .collect();
        let atlas = pack_tiles(&entries);

        for i in 0..12u32 {
            let (x, y) = TextureAtlas::tile_origin(i);
            assert_eq!(pixel_at(&atlas, x, y), [i as u8, 0, 0, 255]);
            assert_eq!(pixel_at(&atlas, x + 15, y + 15), [i as u8, 0, 0, 255]);
        }
    }

    #[test]
    fn test_water_strip_expands_to_frames() {
        let mut entries: Vec<AtlasEntry> = (0..10)
            .map(|i| AtlasEntry {
                image: solid_tile(i as u8),
                is_animation_strip: false,
            })
            .collect();
        entries.push(AtlasEntry {
            image: strip(32),
            is_animation_strip: true,
        });
        entries.push(AtlasEntry {
            image: solid_tile(200),
            is_animation_strip: false,
        });

        let atlas = pack_tiles(&entries);
        assert_eq!(atlas.water_frame_start, 10);
        assert_eq!(atlas.water_frame_count, 32);

        // Frame f carries green value f.
        for frame in [0u32, 1, 15, 31] {
            let (x, y) = TextureAtlas::tile_origin(10 + frame);
            assert_eq!(pixel_at(&atlas, x, y), [0, frame as u8, 0, 255]);
        }
        // The tile after the strip lands at index 42.
        let (x, y) = TextureAtlas::tile_origin(42);
        assert_eq!(pixel_at(&atlas, x, y), [200, 0, 0, 255]);
    }
}
