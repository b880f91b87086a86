use crate::ImageFormat;

/// Raw `MTLPixelFormat` values.
pub type MtlPixelFormat = u64;

pub const MTL_PIXEL_FORMAT_RGBA8_UNORM: MtlPixelFormat = 70;
pub const MTL_PIXEL_FORMAT_RGBA8_UNORM_SRGB: MtlPixelFormat = 71;
pub const MTL_PIXEL_FORMAT_BGRA8_UNORM: MtlPixelFormat = 80;
pub const MTL_PIXEL_FORMAT_BGRA8_UNORM_SRGB: MtlPixelFormat = 81;
pub const MTL_PIXEL_FORMAT_RGBA16_FLOAT: MtlPixelFormat = 115;

lazy_static::lazy_static! {
    static ref MTL_FORMATS: bimap::BiHashMap<ImageFormat, MtlPixelFormat> = {
        [
            (ImageFormat::Rgba8Unorm, MTL_PIXEL_FORMAT_RGBA8_UNORM),
            (ImageFormat::Rgba8UnormSrgb, MTL_PIXEL_FORMAT_RGBA8_UNORM_SRGB),
            (ImageFormat::Bgra8Unorm, MTL_PIXEL_FORMAT_BGRA8_UNORM),
            (ImageFormat::Bgra8UnormSrgb, MTL_PIXEL_FORMAT_BGRA8_UNORM_SRGB),

            (ImageFormat::Rgba16Float, MTL_PIXEL_FORMAT_RGBA16_FLOAT),
        ]
        .into_iter()
        .collect::<bimap::BiHashMap<_, _>>()
    };
}

impl ImageFormat {
    pub fn to_mtl(&self) -> Option<MtlPixelFormat> {
        MTL_FORMATS.get_by_left(self).copied()
    }

    pub fn from_mtl(mtl_format: MtlPixelFormat) -> Option<Self> {
        MTL_FORMATS.get_by_right(&mtl_format).copied()
    }
}
