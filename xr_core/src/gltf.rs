//! Just enough glTF 2.0 to read controller models: the binary container, the node graph
//! and the accessor/buffer view/buffer chain down to raw bytes.

use std::collections::BTreeMap;

use base64::Engine;
use serde::Deserialize;

pub const COMPONENT_BYTE: u32 = 5120;
pub const COMPONENT_UNSIGNED_BYTE: u32 = 5121;
pub const COMPONENT_SHORT: u32 = 5122;
pub const COMPONENT_UNSIGNED_SHORT: u32 = 5123;
pub const COMPONENT_UNSIGNED_INT: u32 = 5125;
pub const COMPONENT_FLOAT: u32 = 5126;

pub const MODE_TRIANGLES: u32 = 4;

const GLB_MAGIC: u32 = 0x4654_6C67;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default, rename = "scene")]
    pub default_scene: Option<usize>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<usize>,
    #[serde(default)]
    pub mesh: Option<usize>,
    /// Column major.
    #[serde(default)]
    pub matrix: Option<[f32; 16]>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// `[x, y, z, w]`
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mesh {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<Primitive>,
}

fn default_mode() -> u32 {
    MODE_TRIANGLES
}

#[derive(Debug, Clone, Deserialize)]
pub struct Primitive {
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    #[serde(default)]
    pub indices: Option<usize>,
    #[serde(default = "default_mode")]
    pub mode: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorType {
    pub fn components(&self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 | AccessorType::Mat2 => 4,
            AccessorType::Mat3 => 9,
            AccessorType::Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(default)]
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: AccessorType,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default)]
    pub byte_stride: Option<usize>,
    #[serde(default)]
    pub target: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    #[serde(default)]
    pub uri: Option<String>,
    pub byte_length: usize,
    #[serde(skip)]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub buffer_view: Option<usize>,
    #[serde(skip)]
    pub width: u32,
    #[serde(skip)]
    pub height: u32,
    #[serde(skip)]
    pub pixels: Vec<u8>,
}

pub fn component_size(component_type: u32) -> Option<usize> {
    match component_type {
        COMPONENT_BYTE | COMPONENT_UNSIGNED_BYTE => Some(1),
        COMPONENT_SHORT | COMPONENT_UNSIGNED_SHORT => Some(2),
        COMPONENT_UNSIGNED_INT | COMPONENT_FLOAT => Some(4),
        _ => None,
    }
}

/// Decodes `bytes` into `image`. Returning an error keeps the image as an unresolved URI.
pub type ImageLoader = Box<dyn FnMut(&mut Image, usize, &[u8]) -> Result<(), String> + Send>;

pub struct LoadedGltf {
    pub model: Model,
    pub warnings: Vec<String>,
}

#[derive(Default)]
pub struct GltfLoader {
    image_loader: Option<ImageLoader>,
}

impl GltfLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_loader(
        mut self,
        loader: impl FnMut(&mut Image, usize, &[u8]) -> Result<(), String> + Send + 'static,
    ) -> Self {
        self.image_loader = Some(Box::new(loader));
        self
    }

    pub fn load_binary_from_memory(&mut self, bytes: &[u8]) -> Result<LoadedGltf, String> {
        let (json, bin) = split_glb(bytes)?;
        let mut model: Model =
            serde_json::from_slice(json).map_err(|err| format!("Invalid glTF JSON: {}", err))?;
        let mut warnings = Vec::new();

        for (i, buffer) in model.buffers.iter_mut().enumerate() {
            buffer.data = match &buffer.uri {
                None if i == 0 => bin
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| "Buffer 0 refers to a missing BIN chunk".to_owned())?,
                None => return Err(format!("Buffer {} has no data", i)),
                Some(uri) => decode_data_uri(uri).ok_or_else(|| {
                    format!("External buffer \"{}\" cannot be loaded from memory", uri)
                })??,
            };
            if buffer.data.len() < buffer.byte_length {
                return Err(format!(
                    "Buffer {} holds {} bytes, {} declared",
                    i,
                    buffer.data.len(),
                    buffer.byte_length
                ));
            }
        }

        if let Some(loader) = self.image_loader.as_mut() {
            for i in 0..model.images.len() {
                let bytes = match image_bytes(&model, &model.images[i]) {
                    Ok(bytes) => bytes,
                    Err(warning) => {
                        warnings.push(warning);
                        continue;
                    }
                };
                if let Err(err) = loader(&mut model.images[i], i, &bytes) {
                    warnings.push(format!("Failed to load image {}: {}", i, err));
                }
            }
        }

        Ok(LoadedGltf { model, warnings })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}

fn split_glb(bytes: &[u8]) -> Result<(&[u8], Option<&[u8]>), String> {
    let header = |offset| read_u32(bytes, offset).ok_or_else(|| "Truncated GLB header".to_owned());

    if header(0)? != GLB_MAGIC {
        return Err("Not a binary glTF file".to_owned());
    }
    let version = header(4)?;
    if version != 2 {
        return Err(format!("Unsupported glTF version {}", version));
    }
    let length = header(8)? as usize;
    if length > bytes.len() {
        return Err(format!(
            "GLB declares {} bytes but {} were given",
            length,
            bytes.len()
        ));
    }

    let mut json = None;
    let mut bin = None;
    let mut offset = 12;
    while offset + 8 <= length {
        let chunk_length = read_u32(bytes, offset).unwrap_or(0) as usize;
        let chunk_type = read_u32(bytes, offset + 4).unwrap_or(0);
        let start = offset + 8;
        let end = start
            .checked_add(chunk_length)
            .filter(|end| *end <= length)
            .ok_or_else(|| format!("GLB chunk at {} overruns the file", offset))?;

        match chunk_type {
            CHUNK_JSON if json.is_none() => json = Some(&bytes[start..end]),
            CHUNK_BIN if bin.is_none() => bin = Some(&bytes[start..end]),
            _ => {}
        }
        offset = end;
    }

    json.map(|json| (json, bin))
        .ok_or_else(|| "GLB has no JSON chunk".to_owned())
}

/// `None` when `uri` is not a data URI.
fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, String>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|err| format!("Invalid base64 data URI: {}", err)),
    )
}

fn image_bytes(model: &Model, image: &Image) -> Result<Vec<u8>, String> {
    if let Some(view) = image.buffer_view {
        let view = model
            .buffer_views
            .get(view)
            .ok_or_else(|| format!("Image buffer view {} does not exist", view))?;
        return model
            .buffers
            .get(view.buffer)
            .and_then(|buffer| {
                buffer
                    .data
                    .get(view.byte_offset..view.byte_offset.checked_add(view.byte_length)?)
            })
            .map(<[u8]>::to_vec)
            .ok_or_else(|| "Image buffer view is out of range".to_owned());
    }
    match &image.uri {
        Some(uri) => decode_data_uri(uri)
            .unwrap_or_else(|| Err(format!("External image \"{}\" was not loaded", uri))),
        None => Err("Image has neither a URI nor a buffer view".to_owned()),
    }
}
