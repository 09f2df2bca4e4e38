// SPDX-License-Identifier: CEPL-1.0
//! `lumen.toml` plus command-line overrides.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use lumen_render::{MeshKind, RendererConfig, VsyncMode};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "lumen.toml")]
    pub config: PathBuf,

    /// Force the Vulkan validation layer on
    #[arg(long)]
    pub validation: bool,

    /// Frame slots recorded ahead of the GPU (1..=4)
    #[arg(long)]
    pub frames_in_flight: Option<usize>,

    /// Mesh to draw
    #[arg(long, value_enum)]
    pub mesh: Option<MeshCfg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VsyncModeCfg {
    Fifo,
    #[default]
    Mailbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MeshCfg {
    #[default]
    Triangle,
    Quad,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowCfg {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self {
            title: "lumen".to_owned(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderCfg {
    pub clear_color: [f32; 4],
    pub vsync: bool,
    pub vsync_mode: VsyncModeCfg,
    pub frames_in_flight: usize,
    /// Absent means wait forever.
    pub fence_timeout_ms: Option<u64>,
    /// Absent means on for debug builds.
    pub validation: Option<bool>,
    pub mesh: MeshCfg,
}

impl Default for RenderCfg {
    fn default() -> Self {
        let base = RendererConfig::default();
        Self {
            clear_color: base.clear_color,
            vsync: base.vsync,
            vsync_mode: VsyncModeCfg::Mailbox,
            frames_in_flight: base.frames_in_flight,
            fence_timeout_ms: None,
            validation: None,
            mesh: MeshCfg::Triangle,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppCfg {
    pub window: WindowCfg,
    pub render: RenderCfg,
}

impl AppCfg {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Missing file is silent; unreadable or invalid files fall back to defaults.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("cannot read {}: {e}; using defaults", path.display());
                return Self::default();
            }
        };
        match Self::parse(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// CLI flags win over file values.
    pub fn renderer_config(&self, args: &Args) -> RendererConfig {
        let r = &self.render;
        let base = RendererConfig::default();
        RendererConfig {
            validation: args.validation || r.validation.unwrap_or(base.validation),
            vsync: r.vsync,
            vsync_mode: match r.vsync_mode {
                VsyncModeCfg::Fifo => VsyncMode::Fifo,
                VsyncModeCfg::Mailbox => VsyncMode::Mailbox,
            },
            frames_in_flight: args.frames_in_flight.unwrap_or(r.frames_in_flight),
            fence_timeout: r.fence_timeout_ms.map(Duration::from_millis),
            clear_color: r.clear_color,
            mesh: match args.mesh.unwrap_or(r.mesh) {
                MeshCfg::Triangle => MeshKind::Triangle,
                MeshCfg::Quad => MeshKind::Quad,
            },
        }
    }
}
