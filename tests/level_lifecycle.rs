//! Level phases, generation queue, observers and coordinate transforms

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use umbra::prelude::*;
use umbra::world::ChunkLayout;

// ============================================================================
// Generation
// ============================================================================

/// Records every origin it is asked to generate
struct Recording {
    origins: Rc<RefCell<Vec<IVec2>>>,
    delay: Duration,
}

impl ChunkGenerator for Recording {
    fn generate_chunk(&mut self, origin: IVec2, _level: &mut Level) {
        self.origins.borrow_mut().push(origin);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

fn recording(config: LevelConfig, delay: Duration) -> (Level, Rc<RefCell<Vec<IVec2>>>) {
    let origins = Rc::new(RefCell::new(Vec::new()));
    let level = Level::new(config).unwrap().with_generator(Recording {
        origins: origins.clone(),
        delay,
    });
    (level, origins)
}

#[test]
fn test_generation_receives_chunk_origins_once() {
    let (mut level, origins) = recording(LevelConfig::server(), Duration::ZERO);
    level.load_chunk_at(IVec2::new(-1, -1));
    level.load_chunk_at(IVec2::new(40, 3));
    level.load_chunk_at(IVec2::new(-5, -7));

    level.tick(FrameTime::default()).unwrap();
    let mut generated = origins.borrow().clone();
    generated.sort_by_key(|o| (o.y, o.x));
    assert_eq!(
        generated,
        vec![IVec2::new(-16, -16), IVec2::new(0, 0), IVec2::new(32, 0)]
    );
    assert_eq!(level.pending_generation(), 0);

    level.tick(FrameTime::default()).unwrap();
    assert_eq!(origins.borrow().len(), 3);
}

#[test]
fn test_generation_respects_time_budget() {
    let config = LevelConfig {
        generation_budget_ms: 1,
        ..LevelConfig::server()
    };
    let (mut level, origins) = recording(config, Duration::from_millis(5));
    for x in 1..=4 {
        level.load_chunk_at(IVec2::new(x * 16, 0));
    }

    // Four loaded chunks plus the origin chunk
    level.tick(FrameTime::default()).unwrap();
    assert_eq!(origins.borrow().len(), 1);
    assert_eq!(level.pending_generation(), 4);

    level.tick(FrameTime::default()).unwrap();
    assert_eq!(origins.borrow().len(), 2);
}

#[test]
fn test_unbounded_budget_drains_everything() {
    let (mut level, origins) = recording(LevelConfig::server(), Duration::from_millis(1));
    for x in 0..6 {
        level.load_chunk_at(IVec2::new(x * 16, 100));
    }
    level.tick(FrameTime::default()).unwrap();
    assert_eq!(origins.borrow().len(), 7);
    assert_eq!(level.pending_generation(), 0);
}

#[test]
fn test_queue_is_dropped_without_generator() {
    let mut level = Level::new(LevelConfig::server()).unwrap();
    level.load_chunk_at(IVec2::new(100, 100));
    assert_eq!(level.pending_generation(), 1);
    level.tick(FrameTime::default()).unwrap();
    assert_eq!(level.pending_generation(), 0);
}

/// Populates each chunk with one light in its corner
struct Lamps;

impl ChunkGenerator for Lamps {
    fn generate_chunk(&mut self, origin: IVec2, level: &mut Level) {
        assert_eq!(level.phase(), Phase::Tick);
        let lamp = Entity::new(origin)
            .with_kind("lamp")
            .with_emitter(LightEmitter::new(Rgb::WHITE, 2, 0));
        level.add(lamp).unwrap();
    }
}

#[test]
fn test_generator_adds_entities_during_tick() {
    let mut level = Level::new(LevelConfig::server()).unwrap().with_generator(Lamps);
    level.tick(FrameTime::default()).unwrap();

    assert_eq!(level.entity_count(), 1);
    assert!(level.has_object_at(IVec2::ZERO, None, Some("lamp")));
    // Reconciled in the same tick
    assert!(level.light_at(IVec2::new(2, 2)).has_color());
    assert_eq!(level.phase(), Phase::Idle);
}

/// Tries to start a nested frame from inside generation
struct Reentrant {
    result: Rc<RefCell<Option<Result<(), LevelError>>>>,
}

impl ChunkGenerator for Reentrant {
    fn generate_chunk(&mut self, _origin: IVec2, level: &mut Level) {
        let result = level.update(FrameTime::default(), &mut NullCanvas);
        *self.result.borrow_mut() = Some(result);
    }
}

#[test]
fn test_nested_update_is_rejected() {
    let result = Rc::new(RefCell::new(None));
    let mut level = Level::new(LevelConfig::server())
        .unwrap()
        .with_generator(Reentrant {
            result: result.clone(),
        });
    level.tick(FrameTime::default()).unwrap();

    assert_eq!(
        *result.borrow(),
        Some(Err(LevelError::PhaseViolation {
            operation: "update",
            phase: Phase::Tick
        }))
    );
}

// ============================================================================
// Phases
// ============================================================================

#[test]
fn test_add_and_remove_between_frames() {
    let mut level = Level::new(LevelConfig::server()).unwrap();
    assert_eq!(level.phase(), Phase::Idle);
    let id = level.add(Entity::new(IVec2::new(-3, 9))).unwrap();
    assert!(level.contains(id));
    assert!(level.remove(id).unwrap().is_some());
    assert!(!level.contains(id));
}

#[test]
fn test_position_changes_need_tick() {
    let mut level = Level::new(LevelConfig::server()).unwrap();
    let id = level.add(Entity::new(IVec2::ZERO)).unwrap();
    let err = level.set_position(id, IVec2::ONE).unwrap_err();
    assert!(matches!(err, LevelError::PhaseViolation { phase: Phase::Idle, .. }));
    assert!(err.to_string().contains("set_position"));
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Default)]
struct Counts {
    added: usize,
    removed: usize,
    changed: usize,
}

struct Counter(Rc<RefCell<Counts>>);

impl LevelObserver for Counter {
    fn on_entity_added(&mut self, _entity: &Entity) {
        self.0.borrow_mut().added += 1;
    }

    fn on_entity_removed(&mut self, _id: EntityId) {
        self.0.borrow_mut().removed += 1;
    }

    fn on_entity_changed(&mut self, _entity: &Entity) {
        self.0.borrow_mut().changed += 1;
    }
}

/// Steps east every tick and records reconciled moves
struct Drifter {
    moves: Rc<RefCell<Vec<(IVec2, IVec2)>>>,
}

impl Behavior for Drifter {
    fn tick(&mut self, ctx: &mut TickContext<'_>) {
        ctx.translate(IVec2::X);
    }

    fn moved(&mut self, entity: &Entity, previous: IVec2) {
        self.moves.borrow_mut().push((previous, entity.position()));
    }
}

#[test]
fn test_observers_and_moved_callbacks() {
    let counts = Rc::new(RefCell::new(Counts::default()));
    let moves = Rc::new(RefCell::new(Vec::new()));
    let mut level = Level::new(LevelConfig::server()).unwrap();
    level.add_observer(Box::new(Counter(counts.clone())));

    let drifter = level
        .add(Entity::new(IVec2::new(14, 0)).with_behavior(Drifter {
            moves: moves.clone(),
        }))
        .unwrap();
    let idle = level.add(Entity::new(IVec2::new(3, 3))).unwrap();
    assert_eq!(counts.borrow().added, 2);

    level.tick(FrameTime::default()).unwrap();
    level.tick(FrameTime::default()).unwrap();
    assert_eq!(
        *moves.borrow(),
        vec![
            (IVec2::new(14, 0), IVec2::new(15, 0)),
            (IVec2::new(15, 0), IVec2::new(16, 0))
        ]
    );
    assert_eq!(counts.borrow().changed, 2);

    // Crossed into the next chunk
    assert!(level.chunk(IVec2::new(1, 0)).unwrap().live_ids().contains(&drifter));
    assert!(!level.chunk(IVec2::ZERO).unwrap().live_ids().contains(&drifter));

    level.set_emitter(idle, Some(LightEmitter::new(Rgb::WHITE, 1, 1))).unwrap();
    level.flush().unwrap();
    assert_eq!(counts.borrow().changed, 3);

    level.remove(idle).unwrap();
    assert_eq!(counts.borrow().removed, 1);
}

// ============================================================================
// Coordinates
// ============================================================================

#[test]
fn test_chunk_round_trip_and_negative_wrap() {
    let layout = ChunkLayout::new(16, 16);
    for y in -3..=3 {
        for x in -3..=3 {
            let chunk = IVec2::new(x, y);
            assert_eq!(layout.level_to_chunk(layout.chunk_to_level(chunk)), chunk);
        }
    }
    assert_eq!(layout.level_to_in_chunk(IVec2::new(-1, 0)).x, 15);
    assert_eq!(layout.level_to_chunk(IVec2::new(-1, 0)).x, -1);
    for x in -40..40 {
        let local = layout.level_to_in_chunk(IVec2::new(x, -x));
        assert!((0..16).contains(&local.x) && (0..16).contains(&local.y));
    }
}

#[test]
fn test_config_preset_builds_level() {
    let config = LevelConfig::from_ron(
        "(chunk_width: 8, chunk_height: 4, camera: Some((width: 20, height: 10)), \
         lighting: (algorithm: PathTraced, max_indirect: 0))",
    )
    .unwrap();
    let level = Level::new(config).unwrap();
    assert!(level.is_client());
    assert_eq!(level.layout().size(), IVec2::new(8, 4));
    assert_eq!(level.lighting().strategy_name(), "path-traced");

    assert!(LevelConfig::from_ron("(chunk_width: 0)").is_err());
}
