//! Scene engine demo
//!
//! Builds a small scene on the software backend, runs a fixed number of
//! frames and writes the last frame to a PNG.
//!
//! ```text
//! scene_demo [--config FILE] [--font FILE] [--frames N] [--out FILE]
//! ```

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::animation::{AnimationFormat, AnimationLoader};
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use scene_engine::scene::{DrawContext, UpdateContext};

/// Bounce path for the ball, in the same format animation files use
const BOUNCE: &str = r#"(
    duration: 1200,
    repeat: -1,
    properties: [
        (name: "position", type: "vector2", keyframes: [
            (position: 0, value: [40.0, 40.0]),
            (position: 600, value: "260, 180"),
            (position: 1200, value: [40.0, 40.0]),
        ]),
        (name: "thickness", type: "float", keyframes: [
            (position: 0, value: 1),
            (position: 1200, value: 4),
        ]),
    ],
)"#;

struct Args {
    config: Option<PathBuf>,
    font: Option<PathBuf>,
    frames: u32,
    out: PathBuf,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = Self {
            config: None,
            font: None,
            frames: 120,
            out: PathBuf::from("scene_demo.png"),
        };

        let mut iter = std::env::args().skip(1);
        while let Some(flag) = iter.next() {
            let mut value = || iter.next().ok_or_else(|| format!("{flag} needs a value"));
            match flag.as_str() {
                "--config" => args.config = Some(PathBuf::from(value()?)),
                "--font" => args.font = Some(PathBuf::from(value()?)),
                "--frames" => {
                    let raw = value()?;
                    args.frames = raw.parse().map_err(|_| format!("invalid frame count '{raw}'"))?;
                }
                "--out" => args.out = PathBuf::from(value()?),
                other => return Err(format!("unknown argument '{other}'")),
            }
        }
        Ok(args)
    }
}

/// Toggles its node's visibility every `period` frames through the command queue
struct Blinker {
    period: u64,
}

impl Behavior for Blinker {
    fn type_name(&self) -> &'static str {
        "Blinker"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn draw(&mut self, node: &Renderable, ctx: &mut DrawContext<'_>) {
        let center = node.render_position() + node.size * 0.5;
        ctx.backend.draw_ellipse(center, node.size * 0.5, Color::rgb(255, 200, 0), true);
    }

    fn update(&mut self, node: &mut Renderable, ctx: &mut UpdateContext<'_>) {
        if ctx.frame % self.period == 0 {
            ctx.commands.set_visible(ctx.id, !node.visible);
        }
    }
}

fn build_scene(renderer: &mut Renderer, font: Option<FontId>) -> Result<(), RenderError> {
    let viewport = renderer.backend().viewport_size();

    // Background stars, deterministic layout
    let sky = renderer.add_renderable(Renderable::new("sky").with_z_index(-10), None)?;
    let mut rng = StdRng::seed_from_u64(7);
    for i in 0..64 {
        let x = rng.gen_range(0.0..viewport.x);
        let y = rng.gen_range(0.0..viewport.y);
        let shade = rng.gen_range(80..=255);
        renderer.add_renderable(
            Renderable::new(format!("star{i}"))
                .with_position(x, y)
                .with_size(1.0, 1.0)
                .with_behavior(Shape::pixel(Color::rgb(shade, shade, shade))),
            Some(sky),
        )?;
    }

    let ground = renderer.add_renderable(
        Renderable::new("ground")
            .with_position(0.0, viewport.y - 40.0)
            .with_size(viewport.x, 40.0)
            .with_behavior(Shape::rect(Color::rgb(30, 90, 40), true)),
        None,
    )?;
    renderer.add_renderable(
        Renderable::new("horizon")
            .with_position(0.0, viewport.y - 40.0)
            .with_size(viewport.x, 0.0)
            .with_behavior(Shape::line(Color::rgb(60, 160, 70))),
        Some(ground),
    )?;

    let ball = renderer.add_renderable(
        Renderable::new("ball")
            .with_size(24.0, 24.0)
            .with_z_index(5)
            .with_behavior(Shape::ellipse(Color::rgb(220, 60, 60), false)),
        None,
    )?;
    let bounce = Arc::new(AnimationLoader::load_str("bounce", BOUNCE, AnimationFormat::Ron)?);
    renderer.bind_animation(ball, bounce)?;
    renderer.start_animation(ball);

    renderer.add_renderable(
        Renderable::new("beacon")
            .with_position(viewport.x - 30.0, 14.0)
            .with_size(12.0, 12.0)
            .with_behavior(Blinker { period: 20 }),
        None,
    )?;

    if let Some(font) = font {
        renderer.add_renderable(
            Renderable::new("title")
                .with_position(8.0, 8.0)
                .with_size(160.0, 20.0)
                .with_z_index(100)
                .with_snap_to_screen(true)
                .with_behavior(
                    Label::new("scene engine", font, Color::WHITE)
                        .with_background(Shape::rect(Color::rgba(0, 0, 0, 160), true)),
                ),
            None,
        )?;
    }

    if let Some(camera) = renderer.camera_mut() {
        camera.shake(4.0, 500.0);
    }
    Ok(())
}

fn run(args: &Args, config: RendererConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut fonts = FontdueRasterizer::new();
    let font = match &args.font {
        Some(path) => Some(fonts.load_font_file(path, 16.0)?),
        None => {
            log::info!("No font given, skipping text");
            None
        }
    };

    let backend = SoftwareBackend::new(config.viewport_width, config.viewport_height);
    let mut renderer = Renderer::new(config, Box::new(backend), Box::new(fonts))?;
    build_scene(&mut renderer, font)?;
    log::info!("Scene ready: {} nodes", renderer.tree().len());

    for _ in 0..args.frames {
        let stats = renderer.render_frame()?;
        if stats.frame % 30 == 0 {
            log::info!(
                "Frame {}: {} on screen, {} rendered, {} animated, {} glyphs cached",
                stats.frame,
                stats.on_screen,
                stats.rendered,
                stats.animations_advanced,
                renderer.glyph_cache().len()
            );
        }
    }

    for event in renderer.drain_events() {
        log::debug!("Animation event on {:?}: {:?}", event.node, event.event);
    }

    let cache = renderer.glyph_cache().stats();
    log::info!(
        "Glyph cache: {} hits, {} misses, {} evictions",
        cache.hits,
        cache.misses,
        cache.evictions
    );

    if let Some(backend) = renderer.backend_as::<SoftwareBackend>() {
        backend.save_png(&args.out)?;
        log::info!("Wrote {}", args.out.display());
    }
    Ok(())
}

fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: scene_demo [--config FILE] [--font FILE] [--frames N] [--out FILE]");
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => RendererConfig::load_from_file(&path.to_string_lossy()),
        None => Ok(RendererConfig::default().with_fixed_timestep(1000.0 / 60.0)),
    };
    let level = config.as_ref().map_or("info", |config| config.log_level.as_str());
    logging::init_with_level(level);

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            log::error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    log::info!("Starting scene demo");
    if let Err(err) = run(&args, config) {
        log::error!("Demo failed: {}", err);
        std::process::exit(1);
    }
}
