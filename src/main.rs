use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use umbra::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// World seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Frames (tick + update) to run before printing
    #[arg(long, default_value_t = 8)]
    frames: u32,

    /// Camera width in tiles
    #[arg(long, default_value_t = 64)]
    width: i32,

    /// Camera height in tiles
    #[arg(long, default_value_t = 24)]
    height: i32,

    /// Light propagation algorithm
    #[arg(long, value_enum, default_value_t = Algorithm::FloodFill)]
    algorithm: Algorithm,

    /// RON level preset (its camera is replaced by --width/--height)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    FloodFill,
    PathTraced,
}

impl From<Algorithm> for LightAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::FloodFill => LightAlgorithm::FloodFill,
            Algorithm::PathTraced => LightAlgorithm::PathTraced,
        }
    }
}

/// Fills each chunk with floor, scattered walls and the odd torch
struct ScatterGenerator {
    seed: u64,
}

impl ScatterGenerator {
    fn rng_for(&self, origin: IVec2) -> Xoshiro256StarStar {
        let key = ((origin.x as u32 as u64) << 32) | origin.y as u32 as u64;
        Xoshiro256StarStar::seed_from_u64(self.seed ^ key)
    }
}

impl ChunkGenerator for ScatterGenerator {
    fn generate_chunk(&mut self, origin: IVec2, level: &mut Level) {
        let size = level.layout().size();
        let mut rng = self.rng_for(origin);

        let mut entities = Vec::new();
        for y in 0..size.y {
            for x in 0..size.x {
                let pos = origin + IVec2::new(x, y);
                entities.push(
                    Entity::new(pos)
                        .with_glyph('.', Rgb::new(90, 90, 90))
                        .with_kind("floor"),
                );
                if rng.random_bool(0.12) {
                    entities.push(
                        Entity::new(pos)
                            .with_layer(1)
                            .with_glyph('#', Rgb::new(160, 150, 140))
                            .with_kind("wall")
                            .blocking_light(),
                    );
                }
            }
        }

        // Torches stay near the chunk center
        if rng.random_bool(0.6) {
            let jitter = IVec2::new(rng.random_range(-2..=2), rng.random_range(-2..=2));
            entities.push(
                Entity::new(origin + size / 2 + jitter)
                    .with_layer(2)
                    .with_glyph('*', Rgb::new(255, 190, 90))
                    .with_kind("torch")
                    .with_emitter(LightEmitter::new(Rgb::new(255, 170, 80), 5, 6)),
            );
        }

        for entity in entities {
            if let Err(err) = level.add(entity) {
                log::warn!("Generation of chunk at {} aborted: {}", origin, err);
                return;
            }
        }
    }
}

/// Walks back and forth along a row
struct Pacing {
    step: i32,
    min_x: i32,
    max_x: i32,
}

impl Behavior for Pacing {
    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        let next = ctx.position().x + self.step;
        if next < self.min_x || next > self.max_x {
            self.step = -self.step;
        }
        ctx.translate(IVec2::new(self.step, 0));
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading level preset from {:?}", path);
            LevelConfig::from_ron(&std::fs::read_to_string(path)?)?
        }
        None => LevelConfig::default().with_algorithm(args.algorithm.into()),
    };
    config.camera = Some(CameraConfig {
        width: args.width,
        height: args.height,
    });

    let mut level = Level::new(config)?.with_generator(ScatterGenerator { seed: args.seed });
    let center = level.layout().size() / 2;
    level.camera_mut()?.center_on(center);
    level.add(
        Entity::new(center)
            .with_layer(3)
            .with_glyph('@', Rgb::WHITE)
            .with_kind("lantern")
            .with_emitter(LightEmitter::new(Rgb::new(200, 220, 255), 6, 8))
            .with_behavior(Pacing {
                step: 1,
                min_x: center.x - 4,
                max_x: center.x + 4,
            }),
    )?;

    let mut canvas = TextCanvas::new(args.width as usize, args.height as usize);
    let mut time = FrameTime::default();
    for frame in 0..args.frames {
        time = time.advance(Duration::from_millis(100));
        log::debug!("Frame {} ({:.2}s step)", frame, time.delta_secs());
        level.tick(time)?;
        canvas.clear();
        level.update(time, &mut canvas)?;
    }

    print!("{}", canvas);
    log::info!(
        "{} entities in {} chunks after {} frames ({} lighting)",
        level.entity_count(),
        level.chunks().len(),
        args.frames,
        level.lighting().strategy_name()
    );
    Ok(())
}
