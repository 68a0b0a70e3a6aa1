//! Detecting and dispatching to the supported image containers.
use std::path::Path;

use log::warn;

use crate::{Image, ImageError};

/// The file formats that can be loaded and saved.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerFormat {
    /// Windows bitmap with 8, 16, 24, or 32 bits per pixel.
    Bmp,
    /// DirectDraw surface including the DX10 header extension.
    Dds,
    /// Radiance RGBE.
    Hdr,
    /// PowerVR texture versions 2 and 3.
    Pvr,
}

impl ContainerFormat {
    /// Detects the container from the extension of `name` ignoring case.
    pub fn from_extension(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "bmp" | "dib" => Some(Self::Bmp),
            "dds" => Some(Self::Dds),
            "hdr" | "pic" => Some(Self::Hdr),
            "pvr" => Some(Self::Pvr),
            _ => None,
        }
    }

    /// Detects the container from the signature at the start of `data`.
    pub fn from_magic(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"BM") {
            Some(Self::Bmp)
        } else if data.starts_with(b"DDS ") {
            Some(Self::Dds)
        } else if data.starts_with(b"#?") {
            Some(Self::Hdr)
        } else if data.starts_with(b"PVR\x03") || data.get(44..48) == Some(b"PVR!".as_slice()) {
            Some(Self::Pvr)
        } else {
            None
        }
    }
}

impl Image {
    /// Loads an image from the bytes of a file.
    ///
    /// The container is chosen from the extension of `name` and then from the file signature.
    pub fn load_from_memory(name: &str, data: &[u8]) -> Result<Image, ImageError> {
        let container = ContainerFormat::from_extension(name)
            .or_else(|| ContainerFormat::from_magic(data))
            .ok_or_else(|| {
                warn!("Unable to detect the container for {name}.");
                ImageError::UnrecognizedContainer {
                    name: name.to_string(),
                }
            })?;
        Self::load_container_from_memory(container, data)
    }

    /// Loads an image from the bytes of a file in the given container.
    pub fn load_container_from_memory(
        container: ContainerFormat,
        data: &[u8],
    ) -> Result<Image, ImageError> {
        match container {
            ContainerFormat::Bmp => Image::from_bmp(data),
            ContainerFormat::Dds => Image::from_dds_bytes(data),
            ContainerFormat::Hdr => Image::from_hdr(data),
            ContainerFormat::Pvr => Image::from_pvr(data),
        }
    }
}

impl<T: AsRef<[u8]>> Image<T> {
    /// Saves the image to the bytes of a file in the given container.
    pub fn save_to_memory(&self, container: ContainerFormat) -> Result<Vec<u8>, ImageError> {
        match container {
            ContainerFormat::Bmp => self.to_bmp(),
            ContainerFormat::Dds => {
                let mut bytes = Vec::new();
                self.to_dds()?.write(&mut bytes)?;
                Ok(bytes)
            }
            ContainerFormat::Hdr => self.to_hdr(),
            ContainerFormat::Pvr => self.to_pvr(),
        }
    }
}

pub(crate) fn malformed(container: ContainerFormat, reason: impl Into<String>) -> ImageError {
    let reason = reason.into();
    warn!("Malformed {container:?} file: {reason}");
    ImageError::MalformedContainer { container, reason }
}

pub(crate) fn unsupported(container: ContainerFormat, reason: impl Into<String>) -> ImageError {
    let reason = reason.into();
    warn!("Unsupported {container:?} file: {reason}");
    ImageError::UnsupportedContainerFormat { container, reason }
}

impl Image<()> {
    /// Allocates the described image after checking that `available` bytes of pixel data can fill it.
    pub(crate) fn allocate(
        &self,
        container: ContainerFormat,
        available: usize,
    ) -> Result<Image, ImageError> {
        self.validate_dimensions()?;
        let required = self.mem_required();
        if available < required {
            return Err(malformed(
                container,
                format!("expected {required} bytes of pixel data but found {available}"),
            ));
        }
        Ok(self.with_data(self.format, vec![0u8; required]))
    }
}

/// Little-endian reads from a file in memory.
pub(crate) struct ByteReader<'a> {
    container: ContainerFormat,
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(container: ContainerFormat, data: &'a [u8]) -> Self {
        Self {
            container,
            data,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    pub fn seek(&mut self, position: usize) -> Result<(), ImageError> {
        if position > self.data.len() {
            return Err(malformed(
                self.container,
                format!("offset {position} is past the end of the file"),
            ));
        }
        self.position = position;
        Ok(())
    }

    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8], ImageError> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                malformed(
                    self.container,
                    format!(
                        "expected {count} bytes at offset {} but the file has {}",
                        self.position,
                        self.data.len()
                    ),
                )
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], ImageError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.bytes(N)?);
        Ok(array)
    }

    pub fn u8(&mut self) -> Result<u8, ImageError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ImageError> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, ImageError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn i32(&mut self) -> Result<i32, ImageError> {
        self.array().map(i32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Result<u64, ImageError> {
        self.array().map(u64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_ignores_case() {
        assert_eq!(
            Some(ContainerFormat::Dds),
            ContainerFormat::from_extension("textures/a.DDS")
        );
        assert_eq!(
            Some(ContainerFormat::Hdr),
            ContainerFormat::from_extension("sky.hdr")
        );
        assert_eq!(None, ContainerFormat::from_extension("cat.png"));
        assert_eq!(None, ContainerFormat::from_extension("cat"));
    }

    #[test]
    fn magic_numbers() {
        assert_eq!(
            Some(ContainerFormat::Bmp),
            ContainerFormat::from_magic(b"BM\0\0")
        );
        assert_eq!(
            Some(ContainerFormat::Hdr),
            ContainerFormat::from_magic(b"#?RADIANCE\n")
        );
        assert_eq!(
            Some(ContainerFormat::Pvr),
            ContainerFormat::from_magic(b"PVR\x03\0\0\0\0")
        );

        let mut v2 = [0u8; 52];
        v2[44..48].copy_from_slice(b"PVR!");
        assert_eq!(Some(ContainerFormat::Pvr), ContainerFormat::from_magic(&v2));
        assert_eq!(None, ContainerFormat::from_magic(&[0u8; 4]));
    }

    #[test]
    fn load_unrecognized() {
        let result = Image::load_from_memory("a.txt", b"hello");
        assert!(matches!(
            result,
            Err(ImageError::UnrecognizedContainer { name }) if name == "a.txt"
        ));
    }

    #[test]
    fn load_by_magic_without_extension() {
        let image = Image::new_2d(2, 2, 1, crate::Format::Rgba8).unwrap();
        let bytes = image.save_to_memory(ContainerFormat::Bmp).unwrap();
        let loaded = Image::load_from_memory("data", &bytes).unwrap();
        assert_eq!(image.data, loaded.data);
    }

    #[test]
    fn allocate_checks_available_data() {
        let layout = Image::layout(65536, 65536, 1, 64, 1, crate::Format::Rgba32F);
        assert!(matches!(
            layout.allocate(ContainerFormat::Pvr, 16),
            Err(ImageError::MalformedContainer {
                container: ContainerFormat::Pvr,
                ..
            })
        ));

        let layout = Image::layout(4, 2, 1, 1, 1, crate::Format::Rgba8);
        assert_eq!(32, layout.allocate(ContainerFormat::Pvr, 32).unwrap().data.len());
    }

    #[test]
    fn reader_past_end() {
        let mut reader = ByteReader::new(ContainerFormat::Bmp, &[1, 2, 3]);
        assert_eq!(0x0201, reader.u16().unwrap());
        assert!(matches!(
            reader.u16(),
            Err(ImageError::MalformedContainer {
                container: ContainerFormat::Bmp,
                ..
            })
        ));
        assert_eq!(2, reader.position());
        assert_eq!(&[3], reader.remaining());
    }
}
