use std::{borrow::Cow, fmt::Display, io::Cursor};

use image::{imageops::FilterType, ColorType, DynamicImage, ImageFormat, ImageReader};
use tracing::debug;

use crate::Result;

/// Format the pages are re-encoded to
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// Lossy, smallest pages
    #[cfg_attr(feature = "clap", value(alias = "lossy"))]
    Jpeg,
    /// Lossless
    #[cfg_attr(feature = "clap", value(alias = "lossless"))]
    Png,
    /// Lossless WebP
    #[default]
    #[cfg_attr(feature = "clap", value(alias = "hybrid"))]
    Webp,
}

impl OutputFormat {
    /// Extension given to the re-encoded pages
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
        }
    }

    /// Returns the raster as is when the encoder accepts its color type, a converted copy otherwise
    fn compatible_raster(self, image: &DynamicImage) -> Cow<'_, DynamicImage> {
        let color = image.color();
        match self {
            Self::Jpeg if matches!(color, ColorType::L8 | ColorType::Rgb8) => Cow::Borrowed(image),
            Self::Webp
                if matches!(
                    color,
                    ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8
                ) =>
            {
                Cow::Borrowed(image)
            }
            Self::Png if !matches!(color, ColorType::Rgb32F | ColorType::Rgba32F) => {
                Cow::Borrowed(image)
            }
            Self::Png => Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16())),
            Self::Webp if color.has_alpha() => {
                Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
            }
            Self::Jpeg | Self::Webp => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Jpeg => "jpeg",
                Self::Png => "png",
                Self::Webp => "webp",
            }
        )
    }
}

/// Largest dimensions fitting in `max_width` x `max_height` while keeping the aspect ratio.
/// Images are never upscaled and both sides are at least 1 pixel long.
///
/// Bounds must be positive.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fit_dimensions(
    (width, height): (u32, u32),
    (max_width, max_height): (u32, u32),
) -> (u32, u32) {
    debug_assert!(max_width > 0 && max_height > 0);

    let scale = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height))
        .min(1.0);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);

    (scaled(width), scaled(height))
}

#[derive(Debug, PartialEq)]
pub struct Image {
    dynamic_image: DynamicImage,
    format: Option<ImageFormat>,
}

impl Image {
    /// The format is guessed from the content, the file name plays no role
    ///
    /// ## Errors
    ///
    /// Fails if the image format can't be guessed or the image can't be decoded
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format();
        Ok(Self {
            dynamic_image: reader.decode()?,
            format,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.dynamic_image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.dynamic_image.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Format detected when decoding
    #[must_use]
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Nearest neighbor downscale so the image fits in the bounds, see `fit_dimensions`
    #[must_use]
    pub fn resize_to_fit(self, max_width: u32, max_height: u32) -> Self {
        let (width, height) = fit_dimensions(self.dimensions(), (max_width, max_height));
        if (width, height) == self.dimensions() {
            return self;
        }

        debug!(
            "resizing {}x{} to {width}x{height}",
            self.width(),
            self.height()
        );
        Self {
            dynamic_image: self
                .dynamic_image
                .resize_exact(width, height, FilterType::Nearest),
            format: self.format,
        }
    }

    /// ## Errors
    ///
    /// Fails if the encoder rejects the image
    pub fn encode(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        format
            .compatible_raster(&self.dynamic_image)
            .write_to(&mut out, format.image_format())?;

        Ok(out.into_inner())
    }
}

impl From<DynamicImage> for Image {
    fn from(dynamic_image: DynamicImage) -> Self {
        Self {
            dynamic_image,
            format: None,
        }
    }
}
