//! Procedural sprite sheets, so the demo ships without image assets.

/// Edge of every generated texture, in texels.
pub const SIZE: u32 = 64;

/// RGBA8 rows, top first.
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

fn generate(mut texel: impl FnMut(u32, u32) -> [u8; 4]) -> Image {
    let mut rgba = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            rgba.extend_from_slice(&texel(x, y));
        }
    }
    Image { width: SIZE, height: SIZE, rgba }
}

/// Two-tone flagstones with darker grout.
pub fn floor_diffuse() -> Image {
    generate(|x, y| {
        if x % 32 < 2 || y % 32 < 2 {
            return [40, 38, 36, 255];
        }
        let light = ((x / 32) + (y / 32)) % 2 == 0;
        if light { [150, 140, 120, 255] } else { [120, 112, 98, 255] }
    })
}

/// Grout lines bevel inwards; tiles are flat.
pub fn floor_normal() -> Image {
    generate(|x, y| {
        let nx = match x % 32 {
            0 => 64,
            1 => 192,
            _ => 128,
        };
        let ny = match y % 32 {
            0 => 192,
            1 => 64,
            _ => 128,
        };
        [nx, ny, 230, 255]
    })
}

/// Wooden crate: planks with a dark frame.
pub fn crate_diffuse() -> Image {
    generate(|x, y| {
        let edge = x < 4 || y < 4 || x >= SIZE - 4 || y >= SIZE - 4;
        if edge {
            [70, 45, 25, 255]
        } else if y % 12 == 0 {
            [90, 60, 35, 255]
        } else {
            [160, 110, 60, 255]
        }
    })
}

/// Crates block light over their whole face.
pub fn crate_occlusion() -> Image {
    generate(|_, _| [255, 255, 255, 255])
}

/// Raised frame, recessed planks.
pub fn crate_displacement() -> Image {
    generate(|x, y| {
        let edge = x < 4 || y < 4 || x >= SIZE - 4 || y >= SIZE - 4;
        let h = if edge { 255 } else { 96 };
        [h, h, h, 255]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_are_fully_populated() {
        for image in [floor_diffuse(), floor_normal(), crate_diffuse(), crate_occlusion(), crate_displacement()] {
            assert_eq!(image.rgba.len(), (image.width * image.height * 4) as usize);
        }
    }

    #[test]
    fn grout_is_darker_than_tiles() {
        let img = floor_diffuse();
        let at = |x: u32, y: u32| img.rgba[((y * SIZE + x) * 4) as usize];
        assert!(at(0, 10) < at(10, 10));
    }
}
