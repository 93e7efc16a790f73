use crate::core::elements::{ColorStyle, RadiusStyle};
use crate::core::models::instance::InstanceShape;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Defaults a registry applies to species defined without explicit settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    pub radius_style: RadiusStyle,
    pub color_style: ColorStyle,
    pub shape: InstanceShape,
    /// Uniform instance scale.
    pub scale: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            radius_style: RadiusStyle::default(),
            color_style: ColorStyle::default(),
            shape: InstanceShape::default(),
            scale: 1.0,
        }
    }
}

#[derive(Default)]
pub struct RegistryConfigBuilder {
    radius_style: Option<RadiusStyle>,
    color_style: Option<ColorStyle>,
    shape: Option<InstanceShape>,
    scale: Option<f64>,
}

impl RegistryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn radius_style(mut self, style: RadiusStyle) -> Self {
        self.radius_style = Some(style);
        self
    }
    pub fn color_style(mut self, style: ColorStyle) -> Self {
        self.color_style = Some(style);
        self
    }
    pub fn shape(mut self, shape: InstanceShape) -> Self {
        self.shape = Some(shape);
        self
    }
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn build(self) -> Result<RegistryConfig, ConfigError> {
        let defaults = RegistryConfig::default();
        let shape = self.shape.unwrap_or(defaults.shape);
        if !shape.is_valid() {
            return Err(ConfigError::InvalidParameter {
                name: "shape",
                reason: format!("{} cannot be built", shape),
            });
        }
        let scale = self.scale.unwrap_or(defaults.scale);
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "scale",
                reason: format!("{} is not a positive number", scale),
            });
        }
        Ok(RegistryConfig {
            radius_style: self.radius_style.unwrap_or(defaults.radius_style),
            color_style: self.color_style.unwrap_or(defaults.color_style),
            shape,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_falls_back_to_defaults() {
        let config = RegistryConfigBuilder::new().build().unwrap();
        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn builder_sets_all_fields() {
        let config = RegistryConfigBuilder::new()
            .radius_style(RadiusStyle::Ionic)
            .color_style(ColorStyle::Vesta)
            .shape(InstanceShape::Cube)
            .scale(0.5)
            .build()
            .unwrap();
        assert_eq!(config.radius_style, RadiusStyle::Ionic);
        assert_eq!(config.color_style, ColorStyle::Vesta);
        assert_eq!(config.shape, InstanceShape::Cube);
        assert_eq!(config.scale, 0.5);
    }

    #[test]
    fn builder_rejects_invalid_values() {
        let result = RegistryConfigBuilder::new().scale(0.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "scale", .. })
        ));
        let result = RegistryConfigBuilder::new()
            .shape(InstanceShape::UvSphere {
                segments: 2,
                rings: 2,
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "shape", .. })
        ));
    }
}
