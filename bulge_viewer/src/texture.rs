use std::{
    borrow::Cow,
    fs::{self, File},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

use anyhow::{Context, Result, ensure};
use bulge_core::LayerKind;
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureLoadError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{} decoded to an empty image", .path.display())]
    Empty { path: PathBuf },
}

/// Decoded glyph texture in tightly packed RGBA8.
#[derive(Debug, Clone)]
pub struct GlyphImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub source: PathBuf,
}

pub fn load_glyph_image(path: &Path) -> Result<GlyphImage, TextureLoadError> {
    let bytes = fs::read(path).map_err(|source| TextureLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_glyph_image(path, &bytes)
}

pub fn decode_glyph_image(path: &Path, bytes: &[u8]) -> Result<GlyphImage, TextureLoadError> {
    let decoded = image::load_from_memory(bytes).map_err(|source| TextureLoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureLoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(GlyphImage {
        width,
        height,
        pixels: rgba.into_raw(),
        source: path.to_path_buf(),
    })
}

pub enum TextureSlot {
    Loading,
    Ready(GlyphImage),
    Failed,
}

impl TextureSlot {
    pub fn image(&self) -> Option<&GlyphImage> {
        match self {
            TextureSlot::Ready(image) => Some(image),
            TextureSlot::Loading | TextureSlot::Failed => None,
        }
    }
}

/// Both glyph textures. The scene only draws once both are ready.
pub struct LayerTextures {
    pub main: TextureSlot,
    pub shadow: TextureSlot,
}

impl LayerTextures {
    pub fn loading() -> Self {
        Self {
            main: TextureSlot::Loading,
            shadow: TextureSlot::Loading,
        }
    }

    pub fn slot_mut(&mut self, layer: LayerKind) -> &mut TextureSlot {
        match layer {
            LayerKind::Main => &mut self.main,
            LayerKind::Shadow => &mut self.shadow,
        }
    }

    pub fn ready(&self) -> Option<(&GlyphImage, &GlyphImage)> {
        Some((self.main.image()?, self.shadow.image()?))
    }
}

pub type TextureEvent = (LayerKind, Result<GlyphImage, TextureLoadError>);

/// Decodes each requested texture on its own thread; the render loop drains
/// finished loads with [`TextureLoader::poll`] without blocking.
pub struct TextureLoader {
    events: Receiver<TextureEvent>,
    pending: usize,
}

impl TextureLoader {
    pub fn spawn(requests: &[(LayerKind, PathBuf)]) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        for (layer, path) in requests {
            let tx = tx.clone();
            let layer = *layer;
            let path = path.clone();
            thread::Builder::new()
                .name(format!("bulge_texture_{}", layer.label()))
                .spawn(move || {
                    let _ = tx.send((layer, load_glyph_image(&path)));
                })
                .with_context(|| format!("spawning {} texture loader", layer.label()))?;
        }
        Ok(Self {
            events: rx,
            pending: requests.len(),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.pending == 0
    }

    pub fn poll(&mut self) -> Vec<TextureEvent> {
        let mut finished = Vec::new();
        while self.pending > 0 {
            match self.events.try_recv() {
                Ok(event) => {
                    self.pending -= 1;
                    finished.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.pending = 0;
                    break;
                }
            }
        }
        finished
    }
}

pub struct TextureUpload<'a> {
    data: Cow<'a, [u8]>,
    bytes_per_row: u32,
}

impl<'a> TextureUpload<'a> {
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

pub fn prepare_rgba_upload<'a>(
    width: u32,
    height: u32,
    data: &'a [u8],
) -> Result<TextureUpload<'a>> {
    ensure!(width > 0 && height > 0, "texture has no dimensions");
    let row_bytes = 4usize * width as usize;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    ensure!(
        data.len() >= row_bytes * height as usize,
        "texture buffer ({}) smaller than {}x{} RGBA ({})",
        data.len(),
        width,
        height,
        row_bytes * height as usize
    );

    if row_bytes % alignment == 0 && data.len() == row_bytes * height as usize {
        return Ok(TextureUpload {
            data: Cow::Borrowed(data),
            bytes_per_row: row_bytes as u32,
        });
    }

    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let mut buffer = vec![0u8; padded_row_bytes * height as usize];
    for row in 0..height as usize {
        let src_offset = row * row_bytes;
        let dst_offset = row * padded_row_bytes;
        buffer[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&data[src_offset..src_offset + row_bytes]);
    }

    Ok(TextureUpload {
        data: Cow::Owned(buffer),
        bytes_per_row: padded_row_bytes as u32,
    })
}

pub fn export_rgba_to_png(path: &Path, width: u32, height: u32, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let encoder = PngEncoder::new(file);
    encoder
        .write_image(data, width, height, ColorType::Rgba8.into())
        .with_context(|| format!("writing PNG to {}", path.display()))?;
    Ok(())
}

/// Loads both textures on the calling thread; used by the offscreen paths.
pub fn load_layer_textures(main: &Path, shadow: &Path) -> Result<(GlyphImage, GlyphImage)> {
    let main = load_glyph_image(main)?;
    let shadow = load_glyph_image(shadow)?;
    Ok((main, shadow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32, alpha: u8) {
        let pixels: Vec<u8> = (0..width * height)
            .flat_map(|_| [0u8, 0, 0, alpha])
            .collect();
        export_rgba_to_png(path, width, height, &pixels).expect("write png fixture");
    }

    #[test]
    fn decodes_png_into_rgba() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("glyph.png");
        write_png(&path, 3, 2, 200);

        let image = load_glyph_image(&path).expect("load glyph");
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.pixels.len(), 3 * 2 * 4);
        assert_eq!(image.pixels[3], 200);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_glyph_image(Path::new("/nonexistent/glyph.png")).expect_err("must fail");
        assert!(matches!(err, TextureLoadError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/glyph.png"));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode_glyph_image(Path::new("junk.png"), b"definitely not a png")
            .expect_err("must fail");
        assert!(matches!(err, TextureLoadError::Decode { .. }));
    }

    #[test]
    fn upload_pads_rows_to_copy_alignment() {
        let data = vec![7u8; 3 * 2 * 4];
        let upload = prepare_rgba_upload(3, 2, &data).expect("upload");
        assert_eq!(upload.bytes_per_row(), wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        assert_eq!(upload.pixels().len(), 2 * upload.bytes_per_row() as usize);
        let second_row = upload.bytes_per_row() as usize;
        assert_eq!(&upload.pixels()[second_row..second_row + 12], &[7u8; 12]);
    }

    #[test]
    fn aligned_upload_borrows() {
        let data = vec![1u8; 64 * 4];
        let upload = prepare_rgba_upload(64, 1, &data).expect("upload");
        assert!(matches!(upload.data, Cow::Borrowed(_)));
    }

    #[test]
    fn loader_reports_success_and_failure() {
        let temp = tempdir().expect("temp dir");
        let good = temp.path().join("main.png");
        write_png(&good, 4, 4, 255);
        let bad = temp.path().join("missing.png");

        let mut loader = TextureLoader::spawn(&[
            (LayerKind::Main, good.clone()),
            (LayerKind::Shadow, bad),
        ])
        .expect("spawn loader");

        let mut textures = LayerTextures::loading();
        let deadline = Instant::now() + Duration::from_secs(10);
        while !loader.is_finished() && Instant::now() < deadline {
            for (layer, result) in loader.poll() {
                *textures.slot_mut(layer) = match result {
                    Ok(image) => TextureSlot::Ready(image),
                    Err(_) => TextureSlot::Failed,
                };
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(loader.is_finished());
        assert_eq!(textures.main.image().map(|image| image.width), Some(4));
        assert!(matches!(textures.shadow, TextureSlot::Failed));
        assert!(textures.ready().is_none());
    }
}
