//! Collision and entity behavior integration tests

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pulse_arena::core::config::GameConfig;
use pulse_arena::core::types::{IdAllocator, PlayerId, Size, Vec2};
use pulse_arena::entity::behavior::{
    update_entities, AMBUSHER_DETECTION_RANGE, MINE_RELOAD_SECS,
};
use pulse_arena::entity::{BehaviorState, EntityKind};
use pulse_arena::player::heroes::HeroCatalog;
use pulse_arena::player::Player;
use pulse_arena::protocol::{ClientCommand, Outbound, ServerEvent};
use pulse_arena::server::outbox::Outbox;
use pulse_arena::server::GameServer;
use pulse_arena::simulation::tick::run_simulation_tick;
use pulse_arena::world::area::Area;
use pulse_arena::world::template::{
    AreaTemplate, EntityTemplate, RegionTemplate, SpawnPosition, WorldData,
};
use tokio::sync::mpsc::UnboundedReceiver;

fn empty_world() -> WorldData {
    WorldData {
        start_region: "Alpha".to_string(),
        regions: vec![RegionTemplate {
            name: "Alpha".to_string(),
            areas: vec![AreaTemplate {
                position: Vec2::ZERO,
                size: Size::new(1000.0, 480.0),
                background: "black".to_string(),
                death_timer: None,
                entities: vec![],
                portals: vec![],
            }],
        }],
    }
}

fn server_with(world: WorldData) -> (GameServer, UnboundedReceiver<Outbound>) {
    let (outbox, rx) = Outbox::channel();
    let server = GameServer::new(GameConfig::default(), world, outbox).unwrap();
    (server, rx)
}

fn join(server: &mut GameServer, name: &str) -> PlayerId {
    let pid = server.id_allocator().player_id();
    server.handle_command(pid, ClientCommand::Connect).unwrap();
    server
        .handle_command(
            pid,
            ClientCommand::Spawn {
                nickname: name.to_string(),
                hero: "Vanguard".to_string(),
            },
        )
        .unwrap();
    pid
}

/// Area with one fixed-position entity, for direct behavior stepping
fn area_with(kind: EntityKind, at: Vec2, extra: Vec<EntityTemplate>) -> Area {
    let config = GameConfig::default();
    let ids = IdAllocator::new();
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut entities = vec![EntityTemplate {
        kind,
        amount: 1,
        speed: None,
        radius: None,
        position: SpawnPosition::Fixed(at),
    }];
    entities.extend(extra);
    let template = AreaTemplate {
        position: Vec2::ZERO,
        size: Size::new(1000.0, 480.0),
        background: "black".to_string(),
        death_timer: None,
        entities,
        portals: vec![],
    };
    Area::from_template(&template, "Alpha", 0, &config, &ids, &mut rng).unwrap()
}

fn player_at(id: u64, position: Vec2) -> Player {
    let config = GameConfig::default();
    let catalog = HeroCatalog::with_defaults();
    let mut player = Player::new(PlayerId(id), "Alpha", catalog.default_hero(), &config);
    player.position = position;
    player.attached = true;
    player
}

#[test]
fn test_player_touching_player_kills_the_other() {
    let (mut server, _rx) = server_with(empty_world());
    let first = join(&mut server, "ada");
    let second = join(&mut server, "bob");

    for pid in [first, second] {
        server.players.get_mut(&pid).unwrap().position = Vec2::new(100.0, 100.0);
    }
    run_simulation_tick(&mut server).unwrap();

    // First-detected pair in roster order: the earlier player wins
    assert!(server.players.get(&first).unwrap().is_alive());
    let victim = server.players.get(&second).unwrap();
    assert_eq!(victim.death_timer, server.config.default_death_timer);
}

#[test]
fn test_pellet_grants_xp_and_relocates() {
    let (mut server, mut rx) = server_with(empty_world());
    let pid = join(&mut server, "ada");

    let (pellet_id, pellet_pos) = {
        let area = server.world.region("Alpha").unwrap().area(0).unwrap();
        let pellet = area
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Pellet)
            .unwrap();
        (pellet.id, pellet.position)
    };
    server.players.get_mut(&pid).unwrap().position = pellet_pos;
    run_simulation_tick(&mut server).unwrap();

    let player = server.players.get(&pid).unwrap();
    assert!(player.is_alive(), "pellets never kill");
    assert!(player.score >= 2, "area 0 pellets pay 2 XP");

    let area = server.world.region("Alpha").unwrap().area(0).unwrap();
    let pellet = area.entities.iter().find(|e| e.id == pellet_id).unwrap();
    assert_ne!(pellet.position, pellet_pos, "pellet relocated on pickup");
    for rect in area.exclusion_rects() {
        assert!(!rect.contains(pellet.position));
    }

    let mut saw_hero_update = false;
    while let Ok(outbound) = rx.try_recv() {
        if matches!(outbound.event, ServerEvent::HeroUpdate(_)) {
            saw_hero_update = true;
        }
    }
    assert!(saw_hero_update, "pickup reports progression to the owner");
}

#[test]
fn test_mine_applies_death_timer_then_rearms_elsewhere() {
    let config = GameConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut area = area_with(EntityKind::Mine, Vec2::new(500.0, 240.0), vec![]);
    let mut players: AHashMap<PlayerId, Player> = AHashMap::new();
    let pid = PlayerId(100);
    players.insert(pid, player_at(100, Vec2::new(520.0, 240.0)));
    area.players.push(pid);

    update_entities(&mut area, &mut players, &config, 1, &mut rng).unwrap();

    assert_eq!(players.get(&pid).unwrap().death_timer, area.death_timer);
    let mine = &area.entities[0];
    match mine.state {
        BehaviorState::Mine { armed, rearm_at } => {
            assert!(!armed, "mine goes inert after triggering");
            assert_eq!(rearm_at, 1 + config.ticks(MINE_RELOAD_SECS));
        }
        _ => unreachable!(),
    }
    assert!(!mine.is_lethal());

    // After the reload delay the mine re-arms at a fresh valid position
    let rearm_tick = 1 + config.ticks(MINE_RELOAD_SECS);
    update_entities(&mut area, &mut players, &config, rearm_tick, &mut rng).unwrap();
    let mine = &area.entities[0];
    assert!(matches!(mine.state, BehaviorState::Mine { armed: true, .. }));
    for rect in area.exclusion_rects() {
        assert!(!rect.contains(mine.position));
    }
}

#[test]
fn test_chaser_steers_at_player_in_play_zone() {
    let config = GameConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut area = area_with(EntityKind::Chaser, Vec2::new(400.0, 240.0), vec![]);
    let mut players: AHashMap<PlayerId, Player> = AHashMap::new();
    let pid = PlayerId(100);
    players.insert(pid, player_at(100, Vec2::new(600.0, 240.0)));
    area.players.push(pid);

    update_entities(&mut area, &mut players, &config, 1, &mut rng).unwrap();

    let chaser = &area.entities[0];
    assert!(chaser.velocity.x > 0.0, "steers toward the player");
    assert!((chaser.velocity.length() - chaser.speed).abs() < 1e-3);
    assert!(chaser.position.x > 400.0);
}

#[test]
fn test_ambusher_hides_until_detection_and_reverts() {
    let config = GameConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut area = area_with(EntityKind::Ambusher, Vec2::new(500.0, 240.0), vec![]);
    let mut players: AHashMap<PlayerId, Player> = AHashMap::new();
    let pid = PlayerId(100);
    players.insert(
        pid,
        player_at(100, Vec2::new(500.0 - AMBUSHER_DETECTION_RANGE + 50.0, 240.0)),
    );
    area.players.push(pid);

    update_entities(&mut area, &mut players, &config, 1, &mut rng).unwrap();
    let ambusher = &area.entities[0];
    assert!(matches!(
        ambusher.state,
        BehaviorState::Ambusher { hidden: false }
    ));
    // True position reported while triggered
    assert_eq!(ambusher.data().position, ambusher.position);

    // Move the player out of range; the ambusher goes dormant again and is
    // reported at the origin point
    players.get_mut(&pid).unwrap().position = Vec2::new(60.0, 240.0);
    update_entities(&mut area, &mut players, &config, 2, &mut rng).unwrap();
    let ambusher = &area.entities[0];
    assert!(matches!(
        ambusher.state,
        BehaviorState::Ambusher { hidden: true }
    ));
    assert_eq!(ambusher.data().position, Vec2::ZERO);
}

#[test]
fn test_clinger_picks_nearest_play_zone_target() {
    let config = GameConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut area = area_with(
        EntityKind::Clinger,
        Vec2::new(400.0, 240.0),
        vec![EntityTemplate {
            kind: EntityKind::Normal,
            amount: 1,
            speed: None,
            radius: None,
            position: SpawnPosition::Fixed(Vec2::new(600.0, 240.0)),
        }],
    );
    let normal_id = area.entities[1].id;
    let mut players: AHashMap<PlayerId, Player> = AHashMap::new();

    update_entities(&mut area, &mut players, &config, 1, &mut rng).unwrap();

    match area.entities[0].state {
        BehaviorState::Clinger { target, .. } => assert_eq!(target, Some(normal_id)),
        _ => unreachable!(),
    }
    assert!(area.entities[0].velocity.x > 0.0, "approaches its host");
}

#[test]
fn test_connectus_pairs_grows_line_then_cools_down() {
    let config = GameConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut area = area_with(
        EntityKind::Connectus,
        Vec2::new(400.0, 200.0),
        vec![EntityTemplate {
            kind: EntityKind::Connectus,
            amount: 1,
            speed: None,
            radius: None,
            position: SpawnPosition::Fixed(Vec2::new(600.0, 300.0)),
        }],
    );
    let mut players: AHashMap<PlayerId, Player> = AHashMap::new();

    update_entities(&mut area, &mut players, &config, 1, &mut rng).unwrap();
    let twins: Vec<_> = area
        .entities
        .iter()
        .map(|e| match e.state {
            BehaviorState::Connectus { twin, .. } => twin,
            _ => None,
        })
        .collect();
    assert_eq!(twins[0], Some(area.entities[1].id));
    assert_eq!(twins[1], Some(area.entities[0].id));

    // Halfway through, the owner carries a growing two-segment line
    let halfway = 1 + config.ticks(5.0) / 2;
    update_entities(&mut area, &mut players, &config, halfway, &mut rng).unwrap();
    match &area.entities[0].state {
        BehaviorState::Connectus { line, progress, .. } => {
            assert!(line.is_some());
            assert!(*progress > 0.3 && *progress < 0.7);
        }
        _ => unreachable!(),
    }

    // Completion unpairs both and starts a cooldown
    let done = 2 + config.ticks(5.0);
    update_entities(&mut area, &mut players, &config, done, &mut rng).unwrap();
    for entity in &area.entities {
        match &entity.state {
            BehaviorState::Connectus {
                twin,
                cooldown_until,
                line,
                ..
            } => {
                assert!(twin.is_none());
                assert!(*cooldown_until > done);
                assert!(line.is_none());
            }
            _ => unreachable!(),
        }
    }
}

#[test]
fn test_zigzag_follows_sinusoid() {
    let config = GameConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut area = area_with(EntityKind::Zigzag, Vec2::new(500.0, 240.0), vec![]);
    let mut players: AHashMap<PlayerId, Player> = AHashMap::new();

    update_entities(&mut area, &mut players, &config, 1, &mut rng).unwrap();

    let zigzag = &area.entities[0];
    let expected_x = zigzag.speed * (0.1f32).cos();
    let expected_y = zigzag.speed * (0.1f32).sin();
    assert!((zigzag.velocity.x - expected_x).abs() < 1e-3);
    assert!((zigzag.velocity.y - expected_y).abs() < 1e-3);
}
