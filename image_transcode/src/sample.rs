use glam::{Vec3, Vec4};

use crate::{cube::cube_map_to_face_coords, rgba::read_rgba32f, surface::Image, ImageError};

impl<T: AsRef<[u8]>> Image<T> {
    /// Bilinearly samples `slice` of mipmap `level` at normalized coordinates `u`, `v`.
    ///
    /// Coordinates outside `0.0` to `1.0` clamp to the edge pixels.
    /// Values are unpacked to RGBA32F without gamma conversion.
    /// 3D images sample the first depth layer.
    pub fn sample_2d(&self, u: f32, v: f32, level: u32, slice: u32) -> Result<Vec4, ImageError> {
        let info = self.format.info();
        let unpack = info.unpack_rgba32f.ok_or(ImageError::UnsupportedFormat {
            format: self.format,
        })?;
        let data = self.get_or_err(level, slice)?;

        let width = self.mip_width(level) as usize;
        let height = self.mip_height(level) as usize;
        let pixel_size = info.size as usize;

        let read = |x: isize, y: isize| {
            let x = x.clamp(0, width as isize - 1) as usize;
            let y = y.clamp(0, height as isize - 1) as usize;
            let start = (y * width + x) * pixel_size;
            let mut rgba = [0u8; 16];
            unpack(&data[start..start + pixel_size], &mut rgba, 1);
            Vec4::from_array(read_rgba32f(&rgba))
        };

        let fx = u * width as f32 - 0.5;
        let fy = v * height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as isize, y0 as isize);

        let top = read(x0, y0).lerp(read(x0 + 1, y0), tx);
        let bottom = read(x0, y0 + 1).lerp(read(x0 + 1, y0 + 1), tx);
        Ok(top.lerp(bottom, ty))
    }

    /// Samples a cube map in the direction `direction` using [Image::sample_2d] on the selected face.
    pub fn sample_cube(&self, direction: Vec3, level: u32) -> Result<Vec4, ImageError> {
        if self.num_slices != 6 {
            return Err(ImageError::InvalidCubeFaces {
                reason: format!("expected 6 slices but found {}", self.num_slices),
            });
        }

        let (face, s, t) = cube_map_to_face_coords(direction);
        self.sample_2d(s, t, level, face as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::{Format, ImageFlags};

    fn gradient() -> Image {
        // 2x2 R8 with red 0, 255 in the first row and 255, 255 in the second.
        Image::from_data(2, 2, 1, 1, 1, Format::R8, vec![0u8, 255, 255, 255]).unwrap()
    }

    #[test]
    fn sample_2d_pixel_centers() {
        let image = gradient();
        assert_eq!(Vec4::new(0.0, 0.0, 0.0, 1.0), image.sample_2d(0.25, 0.25, 0, 0).unwrap());
        assert_eq!(Vec4::new(1.0, 0.0, 0.0, 1.0), image.sample_2d(0.75, 0.25, 0, 0).unwrap());
    }

    #[test]
    fn sample_2d_center_interpolates() {
        let image = gradient();
        assert_relative_eq!(0.75, image.sample_2d(0.5, 0.5, 0, 0).unwrap().x);
    }

    #[test]
    fn sample_2d_clamps_to_edge() {
        let image = gradient();
        assert_eq!(0.0, image.sample_2d(-4.0, 0.0, 0, 0).unwrap().x);
        assert_eq!(1.0, image.sample_2d(4.0, 4.0, 0, 0).unwrap().x);
    }

    #[test]
    fn sample_2d_invalid_level() {
        let image = gradient();
        assert!(matches!(
            image.sample_2d(0.0, 0.0, 1, 0),
            Err(ImageError::MipmapDataOutOfBounds {
                slice: 0,
                mipmap: 1
            })
        ));
    }

    #[test]
    fn sample_cube_faces() {
        let data: Vec<_> = (0..6u8).map(|i| i * 40).collect();
        let mut image = Image::from_data(1, 1, 1, 6, 1, Format::R8, data).unwrap();
        image.flags = ImageFlags::CUBE_MAP;

        let sample = |d: Vec3| (image.sample_cube(d, 0).unwrap().x * 255.0).round() as u8;
        assert_eq!(0, sample(Vec3::X));
        assert_eq!(40, sample(Vec3::NEG_X));
        assert_eq!(80, sample(Vec3::Y));
        assert_eq!(120, sample(Vec3::NEG_Y));
        assert_eq!(160, sample(Vec3::Z));
        assert_eq!(200, sample(Vec3::NEG_Z));
    }

    #[test]
    fn sample_cube_requires_6_slices() {
        let image = gradient();
        assert!(image.sample_cube(Vec3::X, 0).is_err());
    }
}
