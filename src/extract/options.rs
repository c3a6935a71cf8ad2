//! Panel extraction options.

/// Options for cropping panels out of page images.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Factor applied to layout coordinates before cropping
    pub scale: f64,

    /// What to do with panels that reach past the page edge
    pub bounds: BoundsPolicy,

    /// Encoding of written panel images
    pub format: PanelFormat,

    /// Page image extensions tried by the naming convention, in order
    pub image_extensions: Vec<String>,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coordinate scale factor.
    ///
    /// Use this when the detector ran on a downscaled copy of the pages
    /// (e.g. `2.0` for half-resolution input). Non-finite or non-positive
    /// values are ignored.
    pub fn with_scale(mut self, scale: f64) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        }
        self
    }

    /// Set the bounds policy.
    pub fn with_bounds(mut self, bounds: BoundsPolicy) -> Self {
        self.bounds = bounds;
        self
    }

    /// Skip panels that reach past the page edge instead of clamping.
    pub fn strict_bounds(mut self) -> Self {
        self.bounds = BoundsPolicy::Skip;
        self
    }

    /// Set the output image format.
    pub fn with_format(mut self, format: PanelFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the page image extensions tried during lookup.
    pub fn with_image_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            bounds: BoundsPolicy::Clamp,
            format: PanelFormat::Png,
            image_extensions: vec!["jpg".to_string(), "png".to_string()],
        }
    }
}

/// Handling of panel rectangles that exceed the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    /// Crop to the part that lies on the page
    #[default]
    Clamp,
    /// Drop the panel
    Skip,
}

/// Encoding of written panel images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// JPEG
    Jpeg,
}

impl PanelFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PanelFormat::Png => "png",
            PanelFormat::Jpeg => "jpg",
        }
    }

    /// Matching `image` crate format.
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            PanelFormat::Png => image::ImageFormat::Png,
            PanelFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_options_builder() {
        let options = ExtractOptions::new()
            .with_scale(2.0)
            .strict_bounds()
            .with_format(PanelFormat::Jpeg)
            .with_image_extensions(["webp"]);

        assert_eq!(options.scale, 2.0);
        assert_eq!(options.bounds, BoundsPolicy::Skip);
        assert_eq!(options.format.extension(), "jpg");
        assert_eq!(options.image_extensions, vec!["webp".to_string()]);
    }

    #[test]
    fn test_default_options() {
        let options = ExtractOptions::default();
        assert_eq!(options.scale, 1.0);
        assert_eq!(options.bounds, BoundsPolicy::Clamp);
        assert_eq!(options.format, PanelFormat::Png);
    }

    #[test]
    fn test_invalid_scale_ignored() {
        let options = ExtractOptions::new().with_scale(0.0).with_scale(f64::NAN);
        assert_eq!(options.scale, 1.0);
    }
}
