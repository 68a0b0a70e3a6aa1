//! Cube map face addressing and conversions to and from equirectangular images.
use std::f32::consts::PI;

use glam::{Vec3, Vec4};
use strum::{EnumCount, EnumIter};

use crate::{
    rgba::write_rgba32f,
    surface::{Image, ImageFlags},
    ImageError,
};

/// A cube map face in slice order.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    fn from_index(i: u32) -> Option<Self> {
        match i {
            0 => Some(Self::PositiveX),
            1 => Some(Self::NegativeX),
            2 => Some(Self::PositiveY),
            3 => Some(Self::NegativeY),
            4 => Some(Self::PositiveZ),
            5 => Some(Self::NegativeZ),
            _ => None,
        }
    }
}

/// Converts normalized coordinates `s`, `t` on `face` to a normalized direction.
///
/// `s` increases to the right and `t` increases downwards when viewing the face from the center.
pub fn face_to_cube_map_coords(face: CubeFace, s: f32, t: f32) -> Vec3 {
    let u = 2.0 * s - 1.0;
    let v = 2.0 * t - 1.0;
    let direction = match face {
        CubeFace::PositiveX => Vec3::new(1.0, -v, -u),
        CubeFace::NegativeX => Vec3::new(-1.0, -v, u),
        CubeFace::PositiveY => Vec3::new(u, 1.0, v),
        CubeFace::NegativeY => Vec3::new(u, -1.0, -v),
        CubeFace::PositiveZ => Vec3::new(u, -v, 1.0),
        CubeFace::NegativeZ => Vec3::new(-u, -v, -1.0),
    };
    direction.normalize()
}

/// Converts a direction to the face containing it and normalized coordinates on that face.
///
/// This is the inverse of [face_to_cube_map_coords].
/// The direction does not need to be normalized.
pub fn cube_map_to_face_coords(direction: Vec3) -> (CubeFace, f32, f32) {
    let Vec3 { x, y, z } = direction;
    let abs = direction.abs();

    let (face, u, v) = if abs.x >= abs.y && abs.x >= abs.z {
        if x >= 0.0 {
            (CubeFace::PositiveX, -z / abs.x, -y / abs.x)
        } else {
            (CubeFace::NegativeX, z / abs.x, -y / abs.x)
        }
    } else if abs.y >= abs.z {
        if y >= 0.0 {
            (CubeFace::PositiveY, x / abs.y, z / abs.y)
        } else {
            (CubeFace::NegativeY, x / abs.y, -z / abs.y)
        }
    } else if z >= 0.0 {
        (CubeFace::PositiveZ, x / abs.z, -y / abs.z)
    } else {
        (CubeFace::NegativeZ, -x / abs.z, -y / abs.z)
    };

    (face, (u + 1.0) * 0.5, (v + 1.0) * 0.5)
}

/// The normalized equirectangular coordinates for a normalized direction.
///
/// The top row is +Y and `u` decreases with the azimuth measured from +X towards +Z.
fn direction_to_equirectangular(direction: Vec3) -> (f32, f32) {
    let theta = direction.y.clamp(-1.0, 1.0).acos();
    let mut phi = direction.z.atan2(direction.x);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    (1.0 - phi / (2.0 * PI), theta / PI)
}

fn equirectangular_to_direction(u: f32, v: f32) -> Vec3 {
    let phi = (1.0 - u) * 2.0 * PI;
    let theta = v * PI;
    Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
}

impl Image<Vec<u8>> {
    /// Combines 6 square 2D faces in the order +X, -X, +Y, -Y, +Z, -Z into a cube map.
    pub fn create_cube_from_6_faces<T: AsRef<[u8]>>(faces: &[Image<T>]) -> Result<Self, ImageError> {
        let [first, ..] = faces else {
            return Err(ImageError::InvalidCubeFaces {
                reason: "expected 6 faces but found 0".to_string(),
            });
        };
        if faces.len() != CubeFace::COUNT {
            return Err(ImageError::InvalidCubeFaces {
                reason: format!("expected 6 faces but found {}", faces.len()),
            });
        }
        if first.width != first.height {
            return Err(ImageError::InvalidCubeFaces {
                reason: format!("faces must be square but found {} x {}", first.width, first.height),
            });
        }

        for (i, face) in faces.iter().enumerate() {
            face.validate()?;
            if face.format != first.format {
                return Err(ImageError::FormatMismatch {
                    expected: first.format,
                    actual: face.format,
                });
            }
            if face.dimensions() != (first.width, first.height, 1, 1, first.num_mipmaps) {
                return Err(ImageError::InvalidCubeFaces {
                    reason: format!(
                        "face {i} with dimensions {:?} does not match the first face",
                        face.dimensions()
                    ),
                });
            }
        }

        let mut cube = Image::new(
            first.width,
            first.height,
            1,
            CubeFace::COUNT as u32,
            first.num_mipmaps,
            first.format,
        )?;
        cube.gamma_space = first.gamma_space;
        cube.flags = first.flags | ImageFlags::CUBE_MAP;

        for level in 0..first.num_mipmaps {
            for (slice, face) in faces.iter().enumerate() {
                let slice = slice as u32;
                let data = face.get_or_err(level, 0)?;
                cube.get_mut(level, slice)
                    .ok_or(ImageError::MipmapDataOutOfBounds {
                        slice,
                        mipmap: level,
                    })?
                    .copy_from_slice(data);
            }
        }

        Ok(cube)
    }
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Projects this equirectangular image onto the faces of a `size` x `size` cube map.
    pub fn create_cube_from_equirectangular(&self, size: u32) -> Result<Image, ImageError> {
        let mut cube = Image::new(size, size, 1, CubeFace::COUNT as u32, 1, self.format)?;
        cube.gamma_space = self.gamma_space;
        cube.flags = self.flags | ImageFlags::CUBE_MAP;

        for slice in 0..CubeFace::COUNT as u32 {
            let face = CubeFace::from_index(slice).ok_or(ImageError::InvalidCubeFaces {
                reason: format!("face index {slice} is out of range"),
            })?;
            cube.write_face(slice, |s, t| {
                let (u, v) = direction_to_equirectangular(face_to_cube_map_coords(face, s, t));
                self.sample_2d(u, v, 0, 0)
            })?;
        }

        Ok(cube)
    }

    /// Unwraps this cube map into a `width` x `height` equirectangular image.
    pub fn create_equirectangular_from_cube(
        &self,
        width: u32,
        height: u32,
    ) -> Result<Image, ImageError> {
        if self.num_slices != CubeFace::COUNT as u32 {
            return Err(ImageError::InvalidCubeFaces {
                reason: format!("expected 6 slices but found {}", self.num_slices),
            });
        }

        let mut image = Image::new_2d(width, height, 1, self.format)?;
        image.gamma_space = self.gamma_space;
        image.flags = self.flags - ImageFlags::CUBE_MAP;

        image.write_face(0, |u, v| {
            self.sample_cube(equirectangular_to_direction(u, v), 0)
        })?;

        Ok(image)
    }
}

impl Image<Vec<u8>> {
    /// Fills the base level of `slice` by evaluating `f` at each pixel center.
    fn write_face(
        &mut self,
        slice: u32,
        f: impl Fn(f32, f32) -> Result<Vec4, ImageError>,
    ) -> Result<(), ImageError> {
        let info = self.format.info();
        let pack = info.pack_rgba32f.ok_or(ImageError::UnsupportedFormat {
            format: self.format,
        })?;
        let pixel_size = info.size as usize;
        let width = self.width as usize;
        let height = self.height as usize;

        let data = self
            .get_mut(0, slice)
            .ok_or(ImageError::MipmapDataOutOfBounds { slice, mipmap: 0 })?;

        let mut rgba = [0u8; 16];
        for y in 0..height {
            for x in 0..width {
                let s = (x as f32 + 0.5) / width as f32;
                let t = (y as f32 + 0.5) / height as f32;
                write_rgba32f(&mut rgba, f(s, t)?.to_array());
                let start = (y * width + x) * pixel_size;
                pack(&rgba, &mut data[start..start + pixel_size], 1);
            }
        }
        Ok(())
    }
}
