use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use nalgebra::Complex;
use ndarray::Array1;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::spectrum;
use crate::stack::{Layer, Stack};

#[cfg(test)]
mod tests {

    use super::*;

    const SAMPLE: &str = r#"
        wavelength = 633.0

        [stack]
        ambient = [1.33, 0.0]

        [[stack.layers]]
        refr_index = [1.5, 0.01]
        thickness = 120.0
    "#;

    #[test]
    fn parses_toml_settings() {
        let settings = from_toml_str(SAMPLE).unwrap();
        assert_eq!(settings.wavelength, 633.0);
        assert_eq!(settings.incident_field, Complex::new(1.0, 0.0));
        assert_eq!(settings.sweep, None);
        assert_eq!(settings.stack.ambient, Complex::new(1.33, 0.0));
        assert_eq!(settings.stack.layers, vec![Layer::new(Complex::new(1.5, 0.01), 120.0)]);
        assert_eq!(settings.wavelengths().unwrap().to_vec(), vec![633.0]);
    }

    #[test]
    fn sweep_defines_wavelengths() {
        let toml = format!("{}\n[sweep]\nstart = 400.0\nend = 500.0\nsteps = 11\n", SAMPLE);
        let settings = from_toml_str(&toml).unwrap();
        let wavelengths = settings.wavelengths().unwrap();
        assert_eq!(wavelengths.len(), 11);
        assert!((wavelengths[1] - 410.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_wavelength() {
        let toml = SAMPLE.replace("633.0", "-1.0");
        assert!(from_toml_str(&toml).is_err());
    }

    #[test]
    fn rejects_negative_thickness() {
        let toml = SAMPLE.replace("120.0", "-5.0");
        assert!(from_toml_str(&toml).is_err());
    }

    #[test]
    fn default_config_loads() {
        let settings = load_default_config().unwrap();
        assert!(settings.wavelength > 0.0);
        assert!(!settings.stack.layers.is_empty());
    }

    #[test]
    fn cli_overrides_settings() {
        let mut settings = from_toml_str(SAMPLE).unwrap();
        let args = CliArgs::try_parse_from([
            "tmm",
            "-w",
            "500",
            "--ambient",
            "1",
            "--layers",
            "1.5,100",
            "2.2+0.1i,50",
            "--sweep",
            "400",
            "600",
            "5",
        ])
        .unwrap();
        apply_cli_args(&mut settings, args).unwrap();

        assert_eq!(settings.wavelength, 500.0);
        assert_eq!(settings.stack.ambient, Complex::new(1.0, 0.0));
        assert_eq!(
            settings.stack.layers,
            vec![
                Layer::new(1.5, 100.0),
                Layer::new(Complex::new(2.2, 0.1), 50.0)
            ]
        );
        assert_eq!(
            settings.sweep,
            Some(Sweep {
                start: 400.0,
                end: 600.0,
                steps: 5
            })
        );
    }

    #[test]
    fn parse_layer_formats() {
        assert_eq!(parse_layer("1.5,100").unwrap(), Layer::new(1.5, 100.0));
        assert!(parse_layer("1.5").is_err());
        assert!(parse_layer("abc,100").is_err());
        assert!(parse_layer("1.5,xyz").is_err());
    }

    #[test]
    fn sweep_steps_must_be_whole() {
        assert!(parse_sweep(&[400.0, 600.0, 2.5]).is_err());
        assert!(parse_sweep(&[400.0, 600.0]).is_err());
        assert_eq!(
            parse_sweep(&[400.0, 600.0, 3.0]).unwrap(),
            Sweep {
                start: 400.0,
                end: 600.0,
                steps: 3
            }
        );
    }
}

/// A wavelength range evaluated at `steps` evenly spaced points, endpoints included.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Sweep {
    pub start: f64,
    pub end: f64,
    pub steps: usize,
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub wavelength: f64,
    #[serde(default)]
    pub sweep: Option<Sweep>,
    #[serde(default = "default_incident_field")]
    pub incident_field: Complex<f64>,
    pub stack: Stack,
    #[serde(default)]
    pub output: Option<String>,
}

fn default_incident_field() -> Complex<f64> {
    Complex::new(crate::config::DEFAULT_INCIDENT_FIELD, 0.0)
}

impl Settings {
    /// The wavelengths to evaluate: the sweep grid if one is configured, otherwise
    /// the single configured wavelength.
    pub fn wavelengths(&self) -> Result<Array1<f64>> {
        match &self.sweep {
            Some(sweep) => Ok(spectrum::linspace_wavelengths(
                sweep.start,
                sweep.end,
                sweep.steps,
            )?),
            None => Ok(Array1::from(vec![self.wavelength])),
        }
    }
}

/// Loads `config/default.toml` without environment or command line overrides.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("Error loading configuration")?;

    let config: Settings = settings
        .try_deserialize()
        .context("Error deserializing configuration")?;

    validate_config(&config)?;

    Ok(config)
}

/// Parses settings from a TOML document.
pub fn from_toml_str(toml: &str) -> Result<Settings> {
    let settings: Config = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .context("Error loading configuration")?;

    let config: Settings = settings
        .try_deserialize()
        .context("Error deserializing configuration")?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the full configuration: `config/local.toml` if present, otherwise
/// `config/default.toml`, then `TMM_*` environment variables, then command line
/// arguments.
pub fn load_config() -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    // Check if local config exists, if not use default
    let config_file = if local_config.exists() {
        println!("Using local configuration: {:?}", local_config);
        local_config
    } else {
        println!("Using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(Environment::with_prefix("tmm"))
        .build()
        .context("Error loading configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("Error deserializing configuration")?;

    // Parse command-line arguments and override values
    let args = CliArgs::parse();
    apply_cli_args(&mut config, args)?;

    validate_config(&config)?;

    Ok(config)
}

/// Overrides settings with any values given on the command line.
pub fn apply_cli_args(config: &mut Settings, args: CliArgs) -> Result<()> {
    if let Some(wavelength) = args.w {
        config.wavelength = wavelength;
    }
    if let Some(sweep) = args.sweep {
        config.sweep = Some(parse_sweep(&sweep).map_err(|e| anyhow!(e))?);
    }
    if let Some(ambient) = args.ambient {
        config.stack.ambient = ambient;
    }
    if let Some(layers) = args.layers {
        config.stack.layers = layers;
    }
    if let Some(incident) = args.incident {
        config.incident_field = incident;
    }
    if let Some(output) = args.output {
        config.output = Some(output);
    }
    Ok(())
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the TMM_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("TMM_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    // Fallback: walk upward from the executable directory
    let exe_path = env::current_exe().context("Failed to get current executable path")?;
    let mut current_dir = exe_path.parent();
    while let Some(dir) = current_dir {
        if dir.join("config").is_dir() {
            return Ok(dir.to_path_buf());
        }
        current_dir = dir.parent();
    }

    Err(anyhow!("Could not find project root directory"))
}

fn validate_config(config: &Settings) -> Result<()> {
    if !(config.wavelength > 0.0) || !config.wavelength.is_finite() {
        return Err(anyhow!(
            "Wavelength must be finite and greater than 0, got {}",
            config.wavelength
        ));
    }
    if !config.incident_field.is_finite() {
        return Err(anyhow!(
            "Incident field must be finite, got {}",
            config.incident_field
        ));
    }
    for (i, layer) in config.stack.layers.iter().enumerate() {
        if !(layer.thickness >= 0.0) || !layer.thickness.is_finite() {
            return Err(anyhow!(
                "Layer {} thickness must be finite and non-negative, got {}",
                i,
                layer.thickness
            ));
        }
    }
    config.wavelengths()?;
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "TMM - Transfer matrices for dielectric stacks")]
pub struct CliArgs {
    /// Wavelength, in the same length unit as the layer thicknesses.
    #[arg(short, long)]
    w: Option<f64>,

    /// Sweep over a wavelength range instead of a single wavelength.
    /// Format: start end steps
    #[arg(long, num_args = 3, value_delimiter = ' ')]
    sweep: Option<Vec<f64>>,

    /// The refractive index of the ambient medium on both sides of the stack.
    #[arg(long)]
    ambient: Option<Complex<f64>>,

    /// The layers of the stack from bottom to top, separated by spaces.
    /// Format: n1,d1 n2,d2 ... where each n may be complex, e.g. 2.2+0.1i
    #[arg(short, long, value_parser = parse_layer, num_args = 1.., value_delimiter = ' ')]
    layers: Option<Vec<Layer>>,

    /// Complex amplitude of the incident field.
    #[arg(long)]
    incident: Option<Complex<f64>>,

    /// File path to write the results to as JSON.
    #[arg(short, long)]
    output: Option<String>,
}

/// Parse a layer in the format "n,d"
fn parse_layer(s: &str) -> Result<Layer, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid layer format: '{}'. Expected 'refractive_index,thickness'",
            s
        ));
    }

    let refr_index = parts[0]
        .trim()
        .parse::<Complex<f64>>()
        .map_err(|_| format!("Failed to parse refractive index: {}", parts[0]))?;
    let thickness = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Failed to parse thickness: {}", parts[1]))?;

    Ok(Layer::new(refr_index, thickness))
}

/// Parse a sweep in the format: start end steps
fn parse_sweep(values: &[f64]) -> Result<Sweep, String> {
    if values.len() != 3 {
        return Err(format!(
            "Sweep needs exactly 3 values (start end steps), got {}",
            values.len()
        ));
    }
    let steps = values[2];
    if steps < 1.0 || steps.fract() != 0.0 {
        return Err(format!("Sweep steps must be a positive integer. Got {}", steps));
    }
    Ok(Sweep {
        start: values[0],
        end: values[1],
        steps: steps as usize,
    })
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Wavelength: {:.6}
  - Sweep: {:?}
  - Incident Field: {:.6} + {:.6}i
  - Ambient Refractive Index: {:.6} + {:.6}i
  - Layers: {}
  ",
            self.wavelength,
            self.sweep,
            self.incident_field.re,
            self.incident_field.im,
            self.stack.ambient.re,
            self.stack.ambient.im,
            self.stack.layers.len(),
        )
    }
}
