//! The two image tools and their configuration.
//!
//! Both tools run the same job protocol; they differ only in how the input is
//! delivered, which pixel layout their pipeline emits, and in user-facing text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::ArtifactFormat;
use crate::input::{ImageInput, InputEncoding};
use crate::job::{JobSettings, Progress, Stage};
use crate::pipeline::{
    self, BorderKeyMatte, PipelineLoader, ProcessingError, ProcessingPipeline, ResampleFilter,
    ResampleUpscaler,
};
use crate::pixel::{PixelFormat, PixelResult};

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid tool configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown tool: {0} (expected background-removal or upscale)")]
    UnknownTool(String),
}

/// An image tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    BackgroundRemoval,
    Upscale,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::BackgroundRemoval, Tool::Upscale];

    /// Canonical name, accepted by `FromStr`.
    pub fn slug(self) -> &'static str {
        match self {
            Tool::BackgroundRemoval => "background-removal",
            Tool::Upscale => "upscale",
        }
    }

    /// Encoding the worker expects its input in.
    pub fn input_encoding(self) -> InputEncoding {
        match self {
            Tool::BackgroundRemoval => InputEncoding::RawBytes,
            Tool::Upscale => InputEncoding::DataUrl,
        }
    }

    /// Pixel layout produced by the tool's model.
    pub fn output_format(self) -> PixelFormat {
        match self {
            Tool::BackgroundRemoval => PixelFormat::Rgba,
            Tool::Upscale => PixelFormat::Rgb,
        }
    }

    /// Model the tool is designed around.
    pub fn model_id(self) -> &'static str {
        match self {
            Tool::BackgroundRemoval => "briaai/RMBG-1.4",
            Tool::Upscale => "Xenova/2x_APISR_RRDB_GAN_generator-onnx",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tool::BackgroundRemoval => "Background Remover",
            Tool::Upscale => "Image Upscaler",
        }
    }

    /// Stem of the downloaded file name.
    pub fn artifact_stem(self) -> &'static str {
        match self {
            Tool::BackgroundRemoval => "background-removed",
            Tool::Upscale => "upscaled-image",
        }
    }

    /// Default name of the worker thread.
    pub fn worker_name(self) -> &'static str {
        match self {
            Tool::BackgroundRemoval => "remove-bg-worker",
            Tool::Upscale => "upscale-worker",
        }
    }

    /// Progress shown before the worker's first message.
    pub fn initial_progress(self) -> Progress {
        match self {
            Tool::BackgroundRemoval => Progress::new(20),
            Tool::Upscale => Progress::new(10),
        }
    }

    /// Prefix of error messages shown to the user.
    pub fn error_prefix(self) -> &'static str {
        match self {
            Tool::BackgroundRemoval => "Error processing: ",
            Tool::Upscale => "Processing error: ",
        }
    }

    /// Busy-indicator text for a stage.
    pub fn stage_label(self, stage: Stage) -> &'static str {
        match (self, stage) {
            (Tool::BackgroundRemoval, Stage::Uploading) => "Uploading image...",
            (Tool::Upscale, Stage::Uploading) => "Loading image...",
            (_, Stage::Initializing) => "Initializing AI model...",
            (Tool::BackgroundRemoval, Stage::Processing) => "Removing background...",
            (Tool::Upscale, Stage::Processing) => "Upscaling image...",
            (_, Stage::Finalizing) => "Finalizing...",
        }
    }

    /// State machine settings for this tool.
    pub fn job_settings(self, config: &ToolConfig) -> JobSettings {
        JobSettings {
            initial_progress: config
                .initial_progress
                .unwrap_or_else(|| self.initial_progress()),
            error_prefix: self.error_prefix().to_string(),
            artifact_format: config.artifact_format,
        }
    }

    /// Loader for the built-in, model-free pipeline of this tool.
    pub fn builtin_loader(
        self,
        config: &ToolConfig,
    ) -> impl PipelineLoader<Pipeline = BuiltinPipeline> {
        let config = config.clone();
        pipeline::from_fn(move || BuiltinPipeline::for_tool(self, &config))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Tool {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background-removal" | "background_removal" | "remove-bg" => {
                Ok(Tool::BackgroundRemoval)
            }
            "upscale" | "upscaler" => Ok(Tool::Upscale),
            other => Err(ConfigError::UnknownTool(other.to_string())),
        }
    }
}

/// Runtime configuration of a tool instance.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Format of the downloadable artifact.
    pub artifact_format: ArtifactFormat,
    /// Overrides the tool's initial progress.
    pub initial_progress: Option<Progress>,
    /// Overrides the tool's worker thread name.
    pub worker_name: Option<String>,
    /// Scale factor of the built-in upscaler.
    pub upscale_factor: u32,
    /// Resampling filter of the built-in upscaler.
    pub upscale_filter: ResampleFilter,
    /// Background distance tolerance of the built-in matte (0.0 to 1.0).
    pub matte_tolerance: f32,
    /// Edge softness of the built-in matte.
    pub matte_feather: f32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let matte = BorderKeyMatte::default();
        Self {
            artifact_format: ArtifactFormat::Png,
            initial_progress: None,
            worker_name: None,
            upscale_factor: 2,
            upscale_filter: ResampleFilter::Lanczos3,
            matte_tolerance: matte.tolerance,
            matte_feather: matte.feather,
        }
    }
}

impl ToolConfig {
    /// Parse a configuration from JSON, filling in defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The built-in pipeline of either tool.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinPipeline {
    Matte(BorderKeyMatte),
    Upscale(ResampleUpscaler),
}

impl BuiltinPipeline {
    pub fn for_tool(tool: Tool, config: &ToolConfig) -> Result<Self, ProcessingError> {
        match tool {
            Tool::BackgroundRemoval => Ok(BuiltinPipeline::Matte(BorderKeyMatte::new(
                config.matte_tolerance,
                config.matte_feather,
            ))),
            Tool::Upscale => {
                if config.upscale_factor == 0 {
                    return Err(ProcessingError::new("Upscale factor must be at least 1"));
                }
                Ok(BuiltinPipeline::Upscale(ResampleUpscaler::new(
                    config.upscale_factor,
                    config.upscale_filter,
                )))
            }
        }
    }
}

impl ProcessingPipeline for BuiltinPipeline {
    fn transform(&mut self, input: &ImageInput) -> Result<PixelResult, ProcessingError> {
        match self {
            BuiltinPipeline::Matte(matte) => matte.transform(input),
            BuiltinPipeline::Upscale(upscaler) => upscaler.transform(input),
        }
    }
}

/// Human-readable file size, e.g. `12.3 KB` or `4.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if (bytes as f64) < MIB {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_asymmetry() {
        assert_eq!(Tool::BackgroundRemoval.input_encoding(), InputEncoding::RawBytes);
        assert_eq!(Tool::Upscale.input_encoding(), InputEncoding::DataUrl);
        assert_eq!(Tool::BackgroundRemoval.output_format(), PixelFormat::Rgba);
        assert_eq!(Tool::Upscale.output_format(), PixelFormat::Rgb);
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(
            Tool::Upscale.stage_label(Stage::Processing),
            "Upscaling image..."
        );
        assert_eq!(
            Tool::BackgroundRemoval.stage_label(Stage::Processing),
            "Removing background..."
        );
        for tool in Tool::ALL {
            assert_eq!(tool.stage_label(Stage::Finalizing), "Finalizing...");
        }
    }

    #[test]
    fn test_tool_from_str() {
        assert_eq!("remove-bg".parse::<Tool>().unwrap(), Tool::BackgroundRemoval);
        assert_eq!("Upscale".parse::<Tool>().unwrap(), Tool::Upscale);
        assert!(matches!(
            "denoise".parse::<Tool>(),
            Err(ConfigError::UnknownTool(_))
        ));
        for tool in Tool::ALL {
            assert_eq!(tool.slug().parse::<Tool>().unwrap(), tool);
        }
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config = ToolConfig::from_json("{}").unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_config_partial_json() {
        let config = ToolConfig::from_json(
            r#"{"artifact_format":{"kind":"jpeg","quality":80},"upscale_factor":4,"initial_progress":5}"#,
        )
        .unwrap();
        assert_eq!(config.artifact_format, ArtifactFormat::Jpeg { quality: 80 });
        assert_eq!(config.upscale_factor, 4);
        assert_eq!(config.initial_progress, Some(Progress::new(5)));
        assert_eq!(config.upscale_filter, ResampleFilter::Lanczos3);
    }

    #[test]
    fn test_config_invalid_json() {
        assert!(matches!(
            ToolConfig::from_json("{\"upscale_factor\": \"two\"}"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_job_settings_per_tool() {
        let config = ToolConfig::default();
        let settings = Tool::BackgroundRemoval.job_settings(&config);
        assert_eq!(settings.initial_progress.percent(), 20);
        assert_eq!(settings.error_prefix, "Error processing: ");

        let mut config = ToolConfig::default();
        config.initial_progress = Some(Progress::new(15));
        assert_eq!(Tool::Upscale.job_settings(&config).initial_progress.percent(), 15);
    }

    #[test]
    fn test_builtin_for_zero_factor_fails() {
        let mut config = ToolConfig::default();
        config.upscale_factor = 0;
        assert!(BuiltinPipeline::for_tool(Tool::Upscale, &config).is_err());
        assert!(BuiltinPipeline::for_tool(Tool::BackgroundRemoval, &config).is_ok());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.0 MB");
    }
}
