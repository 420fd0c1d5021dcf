//! Portal demo application
//!
//! Headless driver for the portal engine: builds the demo scene (ground,
//! floating cube, two linked portals), runs a fixed number of timer ticks on
//! the software backend and writes the last frame to a PNG.
//!
//! Usage: `portal_demo [config.toml|config.ron] [output.png]`

use std::path::{Path, PathBuf};

use portal_engine::config::{Config, ConfigError};
use portal_engine::core::config::ApplicationConfig;
use portal_engine::foundation::logging;
use portal_engine::scene::{build_demo_scene, DemoError, DemoScene, OscillatingTranslation, Scene, SceneRenderer};
use portal_engine::render::SoftwareBackend;
use thiserror::Error;

const DEFAULT_OUTPUT: &str = "portal_frame.png";

/// Application errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The demo scene could not be assembled
    #[error("Scene setup failed: {0}")]
    Scene(#[from] DemoError),

    /// Framebuffer bytes did not match its dimensions
    #[error("Framebuffer of {width}x{height} could not be turned into an image")]
    Snapshot {
        /// Framebuffer width
        width: u32,
        /// Framebuffer height
        height: u32,
    },

    /// Writing the PNG failed
    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

pub struct PortalApp {
    config: ApplicationConfig,
    scene: Scene,
    demo: DemoScene,
    renderer: SceneRenderer,
    backend: SoftwareBackend,
    animator: OscillatingTranslation,
}

impl PortalApp {
    pub fn new(config: ApplicationConfig) -> Result<Self, AppError> {
        log::info!("Creating portal demo application...");
        let mut scene = Scene::new();
        let demo = build_demo_scene(&mut scene)?;

        let renderer = SceneRenderer::from_config(&config);
        let mut backend = SoftwareBackend::new(config.renderer.width, config.renderer.height);
        backend.set_back_face_culling(config.renderer.cull_back_faces);
        let animator = OscillatingTranslation::new(demo.cube, &config.animation);

        log::info!(
            "Software backend {}x{}, portal depth {}",
            config.renderer.width,
            config.renderer.height,
            config.portal.max_depth
        );
        Ok(Self {
            config,
            scene,
            demo,
            renderer,
            backend,
            animator,
        })
    }

    /// Run the configured number of ticks; failed frames are logged and skipped
    pub fn run(&mut self) -> u32 {
        let frames = self.config.engine.frame_count;
        let mut failed = 0;
        for _ in 0..frames {
            match self
                .renderer
                .render_frame(&mut self.scene, self.demo.list, &mut self.backend, &mut self.animator)
            {
                Ok(stats) => log::trace!("Frame ok: {:?}", stats),
                Err(e) => {
                    failed += 1;
                    log::warn!("Frame {} abandoned: {}", self.renderer.frame_count(), e);
                }
            }
        }

        let simulated_ms = u64::from(frames) * self.config.animation.tick_interval_ms;
        log::info!(
            "Rendered {} frames ({} failed), {} ms of animation, cube time {:.2}",
            frames,
            failed,
            simulated_ms,
            self.animator.time()
        );
        failed
    }

    /// Write the current color buffer to `path`
    pub fn save_snapshot(&self, path: &Path) -> Result<(), AppError> {
        let (width, height) = (self.config.renderer.width, self.config.renderer.height);
        let image = image::RgbaImage::from_raw(width, height, self.backend.to_rgba8())
            .ok_or(AppError::Snapshot { width, height })?;
        image.save(path)?;
        log::info!("Saved frame to {}", path.display());
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ApplicationConfig::load_from_file(&path)?,
        None => ApplicationConfig::default(),
    };
    let output = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting portal demo");
    config.validate()?;

    let mut app = PortalApp::new(config)?;
    let failed = app.run();
    if failed > 0 {
        log::warn!("{} frames were abandoned; the snapshot shows the last good state", failed);
    }
    app.save_snapshot(&output)?;

    log::info!("Portal demo finished successfully");
    Ok(())
}
