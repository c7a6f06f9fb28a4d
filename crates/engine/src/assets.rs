use std::collections::{HashMap, HashSet};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, warn};

use crate::app::rendering::Rgba;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key must not be empty")]
    Empty,
    #[error("asset key must not start with '/'")]
    LeadingSlash,
    #[error("asset key must not contain '\\\\'")]
    Backslash,
    #[error("asset key must not contain '..'")]
    ParentTraversal,
    #[error("asset key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

pub fn validate_asset_key(key: &str) -> Result<(), AssetKeyError> {
    if key.is_empty() {
        return Err(AssetKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(AssetKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(AssetKeyError::Backslash);
    }
    if key.contains("..") {
        return Err(AssetKeyError::ParentTraversal);
    }
    match key
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-')))
    {
        Some(character) => Err(AssetKeyError::InvalidCharacter { character }),
        None => Ok(()),
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    InvalidKey(#[from] AssetKeyError),
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture data is {actual} bytes, expected {expected} for {width}x{height} rgba")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Decoded RGBA8 image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Texture {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(AssetError::SizeMismatch {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: Rgba) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }
}

/// Shared, cheap-to-clone reference to a cached texture.
#[derive(Debug, Clone)]
pub struct TextureHandle(Arc<Texture>);

impl TextureHandle {
    pub fn ptr_eq(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for TextureHandle {
    type Target = Texture;

    fn deref(&self) -> &Texture {
        &self.0
    }
}

impl From<Texture> for TextureHandle {
    fn from(texture: Texture) -> Self {
        Self(Arc::new(texture))
    }
}

/// Textures keyed by path-like names, loaded from `<root>/<key>.png` on first
/// use. Failed loads are cached too and warned about once.
#[derive(Debug)]
pub struct AssetCache {
    root: PathBuf,
    textures: HashMap<String, Option<TextureHandle>>,
    warned_keys: HashSet<String>,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            textures: HashMap::new(),
            warned_keys: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn texture(&mut self, key: &str) -> Option<TextureHandle> {
        if let Some(cached) = self.textures.get(key) {
            return cached.clone();
        }

        let loaded = match load_texture(&self.root, key) {
            Ok(texture) => {
                debug!(
                    asset_key = key,
                    width = texture.width(),
                    height = texture.height(),
                    "texture_loaded"
                );
                Some(TextureHandle::from(texture))
            }
            Err(error) => {
                self.warn_load_failure_once(key, &error);
                None
            }
        };
        self.textures.insert(key.to_string(), loaded.clone());
        loaded
    }

    /// Registers a procedurally built texture, replacing anything cached
    /// under `key`.
    pub fn insert(&mut self, key: &str, texture: Texture) -> Result<TextureHandle, AssetKeyError> {
        validate_asset_key(key)?;
        let handle = TextureHandle::from(texture);
        self.textures.insert(key.to_string(), Some(handle.clone()));
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.textures.values().filter(|entry| entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.warned_keys.clear();
    }

    fn warn_load_failure_once(&mut self, key: &str, error: &AssetError) {
        if !self.warned_keys.insert(key.to_string()) {
            return;
        }
        warn!(asset_key = key, error = %error, "texture_load_failed");
    }
}

fn texture_path(root: &Path, key: &str) -> Result<PathBuf, AssetKeyError> {
    validate_asset_key(key)?;
    Ok(root.join(format!("{key}.png")))
}

fn load_texture(root: &Path, key: &str) -> Result<Texture, AssetError> {
    let path = texture_path(root, key)?;
    let reader = ImageReader::open(&path).map_err(|source| AssetError::Open {
        path: path.clone(),
        source,
    })?;
    let decoded = reader
        .decode()
        .map_err(|source| AssetError::Decode { path, source })?;
    let image = decoded.to_rgba8();
    Texture::from_rgba(image.width(), image.height(), image.into_raw())
}
