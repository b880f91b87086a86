use crate::ImageFormat;

pub type DxgiFormat = u32;

pub const DXGI_FORMAT_R16G16B16A16_FLOAT: DxgiFormat = 10;
pub const DXGI_FORMAT_R8G8B8A8_UNORM: DxgiFormat = 28;
pub const DXGI_FORMAT_R8G8B8A8_UNORM_SRGB: DxgiFormat = 29;
pub const DXGI_FORMAT_B8G8R8A8_UNORM: DxgiFormat = 87;
pub const DXGI_FORMAT_B8G8R8A8_UNORM_SRGB: DxgiFormat = 91;

lazy_static::lazy_static! {
    static ref DXGI_FORMATS: bimap::BiHashMap<ImageFormat, DxgiFormat> = {
        [
            (ImageFormat::Rgba8Unorm, DXGI_FORMAT_R8G8B8A8_UNORM),
            (ImageFormat::Rgba8UnormSrgb, DXGI_FORMAT_R8G8B8A8_UNORM_SRGB),
            (ImageFormat::Bgra8Unorm, DXGI_FORMAT_B8G8R8A8_UNORM),
            (ImageFormat::Bgra8UnormSrgb, DXGI_FORMAT_B8G8R8A8_UNORM_SRGB),

            (ImageFormat::Rgba16Float, DXGI_FORMAT_R16G16B16A16_FLOAT),
        ]
        .into_iter()
        .collect::<bimap::BiHashMap<_, _>>()
    };
}

impl ImageFormat {
    pub fn to_dxgi(&self) -> Option<DxgiFormat> {
        DXGI_FORMATS.get_by_left(self).copied()
    }

    pub fn from_dxgi(dxgi_format: DxgiFormat) -> Option<Self> {
        DXGI_FORMATS.get_by_right(&dxgi_format).copied()
    }
}
