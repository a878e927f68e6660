//! Binary map format
//!
//! Little-endian throughout; floats are IEEE-754 singles. Strings carry a
//! 7-bit-group length prefix followed by UTF-8 bytes.
//!
//! Layers are stored row-sparse: only rows holding a non-empty cell are
//! written, each tagged with its row index and code width (1 or 2 bytes).
//! Inside a row, a sentinel code followed by a u16 length `n` says the
//! previous code covers `n` columns in total, so the sentinel itself fills
//! the next `n - 1` columns.

use glam::Vec2;

use super::animation::{AnimationKind, AnimationRule};
use super::error::FormatError;
use super::grid::{MAX_CELLS, TileGrid};
use crate::consts::EMPTY_TILE;

/// Row index that ends a layer
pub const ROW_END: u16 = 0xFFFF;
/// Run marker in 1-byte rows
pub const RUN_NARROW: u8 = 0xFF;
/// Run marker in 2-byte rows
pub const RUN_WIDE: u16 = 0xFFFF;

const WIDTH_NARROW: u8 = 1;
const WIDTH_WIDE: u8 = 2;

/// Bounds-checked cursor over the input
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(FormatError::Truncated {
                offset: self.pos,
                what,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, FormatError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, FormatError> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, FormatError> {
        let b = self.take(4, what)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self, what: &'static str) -> Result<String, FormatError> {
        let offset = self.pos;
        let mut len: u64 = 0;
        let mut shift = 0;
        loop {
            let b = self.u8(what)?;
            len |= ((b & 0x7F) as u64) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 35 {
                return Err(FormatError::InvalidString { offset });
            }
        }
        let len = usize::try_from(len).map_err(|_| FormatError::InvalidString { offset })?;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidString { offset })
    }
}

/// Parse a map
pub fn decode(bytes: &[u8]) -> Result<TileGrid, FormatError> {
    let mut r = Reader::new(bytes);

    let format_tag = r.string("format tag")?;
    let tile_size = r.u16("tile size")?;
    let header_reserved = [r.u16("reserved header")?, r.u16("reserved header")?];
    let width = r.u16("width")?;
    let height = r.u16("height")?;
    let layer_count = r.u8("layer count")? as usize + 1;
    let main = r.u8("main layer")?;
    let phantom = r.u8("phantom layer")?;

    if width as usize * height as usize * layer_count > MAX_CELLS {
        return Err(FormatError::GridTooLarge {
            width,
            height,
            layers: layer_count,
        });
    }
    check_layer("main", main, layer_count)?;
    check_layer("phantom", phantom, layer_count)?;

    let mut grid = TileGrid::new(width, height, layer_count, tile_size);
    grid.format_tag = format_tag;
    grid.header_reserved = header_reserved;
    grid.set_main_layer(main);
    grid.set_phantom_layer(phantom);

    for layer in 0..layer_count {
        let name = r.string("layer name")?;
        read_rows(&mut r, &mut grid, layer)?;
        let parallax = Vec2::new(r.f32("parallax x")?, r.f32("parallax y")?);
        if let Some(l) = grid.layer_mut(layer) {
            l.name = name;
            l.parallax = parallax;
        }
    }

    grid.textures.background = r.string("background texture")?;
    grid.textures.atlas = r.string("atlas texture")?;
    grid.textures.foreground = r.string("foreground texture")?;
    grid.textures.reserved = r.string("reserved texture")?;

    let count = r.u32("animation count")? as usize;
    let mut animations = Vec::with_capacity(count.min(r.remaining() / 5));
    for _ in 0..count {
        let code = r.u16("animation code")?;
        let frames = r.u8("animation frames")?;
        let ticks_per_frame = r.u8("animation ticks")?;
        let kind_byte = r.u8("animation kind")?;
        let kind = AnimationKind::from_u8(kind_byte).ok_or(FormatError::UnknownAnimationKind(kind_byte))?;
        animations.push(AnimationRule::new(code, frames, ticks_per_frame, kind));
    }
    grid.animations = animations;

    if r.remaining() > 0 {
        log::warn!("Ignoring {} trailing bytes after map data", r.remaining());
    }
    log::info!(
        "Decoded {}x{} map ({} px tiles, {} layers, {} animation rules)",
        width,
        height,
        grid.tile_size,
        layer_count,
        grid.animations.len()
    );
    Ok(grid)
}

fn check_layer(which: &'static str, index: u8, count: usize) -> Result<(), FormatError> {
    if index as usize >= count {
        return Err(FormatError::LayerOutOfRange { which, index, count });
    }
    Ok(())
}

/// Read row records of one layer up to and including the terminator
fn read_rows(r: &mut Reader<'_>, grid: &mut TileGrid, layer: usize) -> Result<(), FormatError> {
    let width = grid.width() as usize;
    loop {
        let row = r.u16("row index")?;
        if row == ROW_END {
            return Ok(());
        }
        if row >= grid.height() {
            return Err(FormatError::RowOutOfRange {
                layer,
                row,
                height: grid.height(),
            });
        }
        let wide = match r.u8("code width")? {
            WIDTH_NARROW => false,
            WIDTH_WIDE => true,
            flag => return Err(FormatError::InvalidCodeWidth { layer, row, flag }),
        };

        let y = row as usize;
        let mut previous = EMPTY_TILE;
        let mut x = 0;
        while x < width {
            let (code, is_run) = if wide {
                let c = r.u16("tile code")?;
                (c, c == RUN_WIDE)
            } else {
                let c = r.u8("tile code")?;
                (c as u16, c == RUN_NARROW)
            };
            if !is_run {
                grid.set(layer, x, y, code);
                previous = code;
                x += 1;
                continue;
            }

            let run = r.u16("run length")?;
            if run == 0 || x + run as usize - 1 > width {
                return Err(FormatError::InvalidRun {
                    layer,
                    row,
                    column: x,
                    run,
                });
            }
            for _ in 1..run {
                grid.set(layer, x, y, previous);
                x += 1;
            }
        }
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, s: &str) {
    let mut len = s.len();
    loop {
        let group = (len & 0x7F) as u8;
        len >>= 7;
        if len == 0 {
            out.push(group);
            break;
        }
        out.push(group | 0x80);
    }
    out.extend_from_slice(s.as_bytes());
}

/// Serialize a grid
pub fn encode(grid: &TileGrid) -> Result<Vec<u8>, FormatError> {
    let layer_count = grid.layer_count();
    if layer_count == 0 || layer_count > 256 {
        return Err(FormatError::Oversized { what: "layer count" });
    }
    check_layer("main", grid.main_layer() as u8, layer_count)?;
    check_layer("phantom", grid.phantom_layer_index(), layer_count)?;

    let mut out = Vec::new();
    put_string(&mut out, &grid.format_tag);
    put_u16(&mut out, grid.tile_size);
    put_u16(&mut out, grid.header_reserved[0]);
    put_u16(&mut out, grid.header_reserved[1]);
    put_u16(&mut out, grid.width());
    put_u16(&mut out, grid.height());
    out.push((layer_count - 1) as u8);
    out.push(grid.main_layer() as u8);
    out.push(grid.phantom_layer_index());

    let mut row = Vec::with_capacity(grid.width() as usize);
    for (index, layer) in grid.layers().iter().enumerate() {
        put_string(&mut out, &layer.name);
        for y in 0..grid.height() {
            row.clear();
            row.extend(grid.row(index, y as usize));
            if row.iter().all(|&c| c == EMPTY_TILE) {
                continue;
            }
            write_row(&mut out, index, y, &row)?;
        }
        put_u16(&mut out, ROW_END);
        put_f32(&mut out, layer.parallax.x);
        put_f32(&mut out, layer.parallax.y);
    }

    put_string(&mut out, &grid.textures.background);
    put_string(&mut out, &grid.textures.atlas);
    put_string(&mut out, &grid.textures.foreground);
    put_string(&mut out, &grid.textures.reserved);

    out.extend_from_slice(&(grid.animations.len() as u32).to_le_bytes());
    for rule in &grid.animations {
        put_u16(&mut out, rule.code);
        out.push(rule.frames);
        out.push(rule.ticks_per_frame);
        out.push(rule.kind as u8);
    }

    log::debug!("Encoded {}x{} map into {} bytes", grid.width(), grid.height(), out.len());
    Ok(out)
}

fn write_row(out: &mut Vec<u8>, layer: usize, y: u16, row: &[u16]) -> Result<(), FormatError> {
    if let Some(x) = row.iter().position(|&c| c == RUN_WIDE) {
        return Err(FormatError::UnencodableCode {
            layer,
            x,
            y: y as usize,
            code: RUN_WIDE,
        });
    }
    let wide = row.iter().any(|&c| c >= RUN_NARROW as u16);
    let code_bytes = if wide { 2 } else { 1 };
    let put_code = |out: &mut Vec<u8>, code: u16| {
        if wide {
            put_u16(out, code);
        } else {
            out.push(code as u8);
        }
    };

    put_u16(out, y);
    out.push(if wide { WIDTH_WIDE } else { WIDTH_NARROW });

    let mut x = 0;
    while x < row.len() {
        let code = row[x];
        let run = row[x..]
            .iter()
            .take(u16::MAX as usize)
            .take_while(|&&c| c == code)
            .count();
        put_code(out, code);
        // value + sentinel + u16 length against the literal span
        if run * code_bytes > 2 * code_bytes + 2 {
            put_code(out, if wide { RUN_WIDE } else { RUN_NARROW as u16 });
            put_u16(out, run as u16);
        } else {
            for _ in 1..run {
                put_code(out, code);
            }
        }
        x += run;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Header for a single-layer map with no texture names
    fn header(width: u16, height: u16, last_layer: u8) -> Vec<u8> {
        let mut out = Vec::new();
        put_string(&mut out, "TileMap");
        put_u16(&mut out, 16);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, width);
        put_u16(&mut out, height);
        out.push(last_layer);
        out.push(0);
        out.push(0);
        out
    }

    fn footer(out: &mut Vec<u8>) {
        put_f32(out, 1.0);
        put_f32(out, 1.0);
        for _ in 0..4 {
            put_string(out, "");
        }
        out.extend_from_slice(&0u32.to_le_bytes());
    }

    fn sample_grid() -> TileGrid {
        let mut grid = TileGrid::new(8, 5, 3, 16);
        grid.fill_row(0, 4, 0..8, 1);
        grid.set(0, 3, 3, 2);
        grid.fill_row(1, 0, 2..4, 300);
        grid.set(1, 7, 0, 0xFFFE);
        grid.set(2, 0, 2, 0xFE);
        grid.set_parallax(1, Vec2::new(0.5, 0.25));
        grid.set_parallax(2, Vec2::ONE);
        grid.set_main_layer(2);
        grid.set_phantom_layer(2);
        grid.textures.atlas = "tiles.png".to_string();
        grid.textures.background = "sky".to_string();
        grid.header_reserved = [7, 9];
        grid.animations = vec![
            AnimationRule::new(5, 3, 4, AnimationKind::Forward),
            AnimationRule::new(40, 2, 1, AnimationKind::RandomGlobal),
        ];
        grid
    }

    #[test]
    fn test_round_trip_sample() {
        let grid = sample_grid();
        let bytes = encode(&grid).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, grid);
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_narrow_runs_of_one_two_and_width() {
        let mut bytes = header(6, 3, 0);
        put_string(&mut bytes, "ground");
        // Row 0: run of 1 (no-op sentinel), then literals
        put_u16(&mut bytes, 0);
        bytes.push(WIDTH_NARROW);
        bytes.extend_from_slice(&[4, RUN_NARROW]);
        put_u16(&mut bytes, 1);
        bytes.extend_from_slice(&[5, 6, 7, 8, 9]);
        // Row 1: run of 2 after the first value
        put_u16(&mut bytes, 1);
        bytes.push(WIDTH_NARROW);
        bytes.extend_from_slice(&[3, RUN_NARROW]);
        put_u16(&mut bytes, 2);
        bytes.extend_from_slice(&[1, 1, 1, 2]);
        // Row 2: one value across the full width
        put_u16(&mut bytes, 2);
        bytes.push(WIDTH_NARROW);
        bytes.extend_from_slice(&[9, RUN_NARROW]);
        put_u16(&mut bytes, 6);
        put_u16(&mut bytes, ROW_END);
        footer(&mut bytes);

        let grid = decode(&bytes).unwrap();
        let rows: Vec<Vec<u16>> = (0..3).map(|y| grid.row(0, y).collect()).collect();
        assert_eq!(rows[0], vec![4, 5, 6, 7, 8, 9]);
        assert_eq!(rows[1], vec![3, 3, 1, 1, 1, 2]);
        assert_eq!(rows[2], vec![9; 6]);
    }

    #[test]
    fn test_wide_runs_of_one_two_and_width_round_trip() {
        let mut bytes = header(6, 3, 0);
        put_string(&mut bytes, "ground");
        put_u16(&mut bytes, 0);
        bytes.push(WIDTH_WIDE);
        for code in [0x0100, RUN_WIDE, 1, 0x0101, 0x0102, 0x0103, 0x0104, 0x0105] {
            put_u16(&mut bytes, code);
        }
        put_u16(&mut bytes, 1);
        bytes.push(WIDTH_WIDE);
        for code in [0x0200, RUN_WIDE, 2, 0x0300, 0x0300, 0x0300, 0x0301] {
            put_u16(&mut bytes, code);
        }
        put_u16(&mut bytes, 2);
        bytes.push(WIDTH_WIDE);
        for code in [0x0400, RUN_WIDE, 6] {
            put_u16(&mut bytes, code);
        }
        put_u16(&mut bytes, ROW_END);
        footer(&mut bytes);

        let grid = decode(&bytes).unwrap();
        let rows: Vec<Vec<u16>> = (0..3).map(|y| grid.row(0, y).collect()).collect();
        assert_eq!(rows[0], vec![0x0100, 0x0101, 0x0102, 0x0103, 0x0104, 0x0105]);
        assert_eq!(rows[1], vec![0x0200, 0x0200, 0x0300, 0x0300, 0x0300, 0x0301]);
        assert_eq!(rows[2], vec![0x0400; 6]);

        let again = decode(&encode(&grid).unwrap()).unwrap();
        assert_eq!(again, grid);
        for y in 0..3 {
            assert_eq!(again.row(0, y).collect::<Vec<_>>(), rows[y]);
        }
    }

    #[test]
    fn test_wide_rows_and_leading_run() {
        let mut bytes = header(4, 2, 0);
        put_string(&mut bytes, "");
        // A run at column 0 repeats the empty code
        put_u16(&mut bytes, 1);
        bytes.push(WIDTH_WIDE);
        put_u16(&mut bytes, RUN_WIDE);
        put_u16(&mut bytes, 3);
        put_u16(&mut bytes, 0x1234);
        put_u16(&mut bytes, 0x1234);
        put_u16(&mut bytes, ROW_END);
        footer(&mut bytes);

        let grid = decode(&bytes).unwrap();
        assert_eq!(grid.row(0, 1).collect::<Vec<_>>(), vec![0, 0, 0x1234, 0x1234]);
        assert_eq!(grid.row(0, 0).collect::<Vec<_>>(), vec![0; 4]);
    }

    #[test]
    fn test_encoder_compresses_full_width_run() {
        let mut grid = TileGrid::new(200, 1, 1, 16);
        grid.fill_row(0, 0, 0..200, 1);
        let bytes = encode(&grid).unwrap();
        assert!(bytes.len() < 200);
        assert_eq!(decode(&bytes).unwrap(), grid);
    }

    #[test]
    fn test_every_prefix_is_truncated() {
        let bytes = encode(&sample_grid()).unwrap();
        for end in 0..bytes.len() {
            assert!(
                matches!(decode(&bytes[..end]), Err(FormatError::Truncated { .. })),
                "prefix of {end} bytes should be truncated"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let grid = sample_grid();
        let mut bytes = encode(&grid).unwrap();
        bytes.extend_from_slice(&[1, 2, 3]);
        assert_eq!(decode(&bytes).unwrap(), grid);
    }

    #[test]
    fn test_invalid_code_width() {
        let mut bytes = header(2, 2, 0);
        put_string(&mut bytes, "");
        put_u16(&mut bytes, 0);
        bytes.push(3);
        assert_eq!(
            decode(&bytes),
            Err(FormatError::InvalidCodeWidth {
                layer: 0,
                row: 0,
                flag: 3
            })
        );
    }

    #[test]
    fn test_row_out_of_range() {
        let mut bytes = header(2, 2, 0);
        put_string(&mut bytes, "");
        put_u16(&mut bytes, 2);
        assert!(matches!(decode(&bytes), Err(FormatError::RowOutOfRange { row: 2, .. })));
    }

    #[test]
    fn test_bad_runs() {
        for run in [0u16, 4] {
            let mut bytes = header(3, 1, 0);
            put_string(&mut bytes, "");
            put_u16(&mut bytes, 0);
            bytes.push(WIDTH_NARROW);
            bytes.extend_from_slice(&[1, RUN_NARROW]);
            put_u16(&mut bytes, run);
            assert!(
                matches!(decode(&bytes), Err(FormatError::InvalidRun { column: 1, .. })),
                "run {run} should be rejected"
            );
        }
    }

    #[test]
    fn test_layer_indices_checked() {
        let mut bytes = header(1, 1, 0);
        let main_offset = bytes.len() - 2;
        bytes[main_offset] = 1;
        assert!(matches!(
            decode(&bytes),
            Err(FormatError::LayerOutOfRange { which: "main", .. })
        ));
    }

    #[test]
    fn test_unknown_animation_kind() {
        let mut bytes = header(1, 1, 0);
        put_string(&mut bytes, "");
        put_u16(&mut bytes, ROW_END);
        put_f32(&mut bytes, 1.0);
        put_f32(&mut bytes, 1.0);
        for _ in 0..4 {
            put_string(&mut bytes, "");
        }
        bytes.extend_from_slice(&1u32.to_le_bytes());
        put_u16(&mut bytes, 3);
        bytes.extend_from_slice(&[2, 2, 9]);
        assert_eq!(decode(&bytes), Err(FormatError::UnknownAnimationKind(9)));
    }

    #[test]
    fn test_random_kind_bytes() {
        let mut bytes = header(1, 1, 0);
        put_string(&mut bytes, "");
        put_u16(&mut bytes, ROW_END);
        put_f32(&mut bytes, 1.0);
        put_f32(&mut bytes, 1.0);
        for _ in 0..4 {
            put_string(&mut bytes, "");
        }
        bytes.extend_from_slice(&2u32.to_le_bytes());
        put_u16(&mut bytes, 10);
        bytes.extend_from_slice(&[8, 1, 2]);
        put_u16(&mut bytes, 20);
        bytes.extend_from_slice(&[8, 1, 3]);

        let grid = decode(&bytes).unwrap();
        assert_eq!(
            grid.animations,
            vec![
                AnimationRule::new(10, 8, 1, AnimationKind::RandomGlobal),
                AnimationRule::new(20, 8, 1, AnimationKind::RandomPerTile),
            ]
        );
        // Both records written back with the same kind bytes
        assert!(encode(&grid).unwrap().ends_with(&bytes[bytes.len() - 10..]));
    }

    #[test]
    fn test_unencodable_code() {
        let mut grid = TileGrid::new(3, 2, 1, 16);
        grid.set(0, 2, 1, 0xFFFF);
        assert_eq!(
            encode(&grid),
            Err(FormatError::UnencodableCode {
                layer: 0,
                x: 2,
                y: 1,
                code: 0xFFFF
            })
        );
    }

    #[test]
    fn test_long_strings_use_multi_byte_prefix() {
        let mut grid = TileGrid::new(1, 1, 1, 8);
        grid.format_tag = "x".repeat(300);
        grid.textures.foreground = "ü".repeat(70);
        let bytes = encode(&grid).unwrap();
        // 300 = 0b10_0101100 -> [0xAC, 0x02]
        assert_eq!(&bytes[..2], &[0xAC, 0x02]);
        assert_eq!(decode(&bytes).unwrap(), grid);
    }

    fn code() -> impl Strategy<Value = u16> {
        prop_oneof![
            4 => Just(0u16),
            3 => 1u16..4,
            2 => 4u16..0xFF,
            1 => 0xFFu16..0xFFFF,
        ]
    }

    fn kind() -> impl Strategy<Value = AnimationKind> {
        prop_oneof![
            Just(AnimationKind::Forward),
            Just(AnimationKind::PingPong),
            Just(AnimationKind::RandomPerTile),
            Just(AnimationKind::RandomGlobal),
        ]
    }

    fn arb_grid() -> impl Strategy<Value = TileGrid> {
        (1u16..24, 1u16..10, 1usize..5)
            .prop_flat_map(|(w, h, layers)| {
                let cells = w as usize * h as usize * layers;
                (
                    Just((w, h, layers)),
                    prop::collection::vec(code(), cells),
                    prop::collection::vec((-4.0f32..4.0, -4.0f32..4.0), layers),
                    prop::collection::vec((any::<u16>(), any::<u8>(), any::<u8>(), kind()), 0..6),
                    0..layers,
                    0..layers,
                    "[a-z]{0,12}",
                )
            })
            .prop_map(|((w, h, layers), cells, parallax, rules, main, phantom, atlas)| {
                let mut grid = TileGrid::new(w, h, layers, 16);
                let mut it = cells.into_iter();
                for l in 0..layers {
                    for x in 0..w as usize {
                        for y in 0..h as usize {
                            grid.set(l, x, y, it.next().unwrap_or(0));
                        }
                    }
                    grid.set_parallax(l, Vec2::new(parallax[l].0, parallax[l].1));
                }
                grid.set_main_layer(main as u8);
                grid.set_phantom_layer(phantom as u8);
                grid.textures.atlas = atlas;
                grid.animations = rules
                    .into_iter()
                    .map(|(c, f, t, k)| AnimationRule::new(c, f, t, k))
                    .collect();
                grid
            })
    }

    proptest! {
        #[test]
        fn prop_round_trip(grid in arb_grid()) {
            let bytes = encode(&grid).unwrap();
            let decoded = decode(&bytes).unwrap();
            prop_assert_eq!(&decoded, &grid);
        }
    }
}
