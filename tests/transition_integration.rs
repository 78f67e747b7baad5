//! Player transition state machine integration tests: area changes,
//! completion XP, portals, death/respawn

use pulse_arena::core::config::GameConfig;
use pulse_arena::core::types::{PlayerId, Size, Vec2};
use pulse_arena::protocol::{ClientCommand, Outbound, ServerEvent};
use pulse_arena::server::outbox::Outbox;
use pulse_arena::server::GameServer;
use pulse_arena::simulation::tick::run_simulation_tick;
use pulse_arena::world::template::{AreaTemplate, PortalTemplate, RegionTemplate, WorldData};
use tokio::sync::mpsc::UnboundedReceiver;

fn plain_area(width: f32, height: f32, portals: Vec<PortalTemplate>) -> AreaTemplate {
    AreaTemplate {
        position: Vec2::ZERO,
        size: Size::new(width, height),
        background: "black".to_string(),
        death_timer: None,
        entities: vec![],
        portals,
    }
}

/// One region, three enemy-free areas; the middle one is taller to exercise
/// relative-offset mapping
fn open_world() -> WorldData {
    WorldData {
        start_region: "Alpha".to_string(),
        regions: vec![RegionTemplate {
            name: "Alpha".to_string(),
            areas: vec![
                plain_area(1000.0, 480.0, vec![]),
                plain_area(1000.0, 960.0, vec![]),
                plain_area(1000.0, 480.0, vec![]),
            ],
        }],
    }
}

/// Two enemy-free regions linked by portals both ways
fn portal_world() -> WorldData {
    let portal = |target: &str| PortalTemplate {
        target_region: target.to_string(),
        position: Vec2::new(375.0, 10.0),
        size: Size::new(250.0, 50.0),
        exit_offset_y: 0.0,
    };
    WorldData {
        start_region: "Alpha".to_string(),
        regions: vec![
            RegionTemplate {
                name: "Alpha".to_string(),
                areas: vec![plain_area(1000.0, 480.0, vec![portal("Beta")])],
            },
            RegionTemplate {
                name: "Beta".to_string(),
                areas: vec![plain_area(1000.0, 480.0, vec![portal("Alpha")])],
            },
        ],
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

fn place(server: &mut GameServer, pid: PlayerId, x: f32, y: f32) {
    server.players.get_mut(&pid).unwrap().position = Vec2::new(x, y);
}

#[test]
fn test_next_zone_triggers_transition_with_preserved_relative_y() {
    let (mut server, _rx) = server_with(open_world());
    let pid = join(&mut server, "ada");

    // Area width 1000, next zone spans x in [950, 1000]; radius 15 at x=990
    place(&mut server, pid, 990.0, 240.0);
    run_simulation_tick(&mut server).unwrap();

    let player = server.players.get(&pid).unwrap();
    assert_eq!(player.area_index, 1);
    // Relative vertical fraction 0.5 maps into the taller destination
    assert!((player.position.y - 480.0).abs() < 1e-3);
    // Fixed safe distance from the entered (left) edge
    assert!((player.position.x - server.config.transition_offset).abs() < 1e-3);

    // The vacated area was swept, the destination is live
    let region = server.world.region("Alpha").unwrap();
    assert!(region.area(0).is_none());
    assert!(region.area(1).is_some());
}

#[test]
fn test_zone_overlap_by_radius_is_enough() {
    let (mut server, _rx) = server_with(open_world());
    let pid = join(&mut server, "ada");

    // Centre outside the strip; the radius margin overlaps it
    place(&mut server, pid, 940.0, 240.0);
    run_simulation_tick(&mut server).unwrap();
    assert_eq!(server.players.get(&pid).unwrap().area_index, 1);
}

#[test]
fn test_previous_transition_enters_from_right_edge() {
    let (mut server, _rx) = server_with(open_world());
    let pid = join(&mut server, "ada");

    place(&mut server, pid, 990.0, 240.0);
    run_simulation_tick(&mut server).unwrap();
    place(&mut server, pid, 30.0, 480.0);
    run_simulation_tick(&mut server).unwrap();

    let player = server.players.get(&pid).unwrap();
    assert_eq!(player.area_index, 0);
    assert!((player.position.x - (1000.0 - server.config.transition_offset)).abs() < 1e-3);
    // Fraction 0.5 of the tall area maps back to the shorter one
    assert!((player.position.y - 240.0).abs() < 1e-3);
}

#[test]
fn test_area_completion_pays_exactly_once() {
    let (mut server, _rx) = server_with(open_world());
    let pid = join(&mut server, "ada");
    let per_area = server.config.area_completion_xp as u64;

    place(&mut server, pid, 990.0, 240.0);
    run_simulation_tick(&mut server).unwrap();
    assert_eq!(server.players.get(&pid).unwrap().score, per_area);

    // Back and forth through the same boundary: no double pay
    place(&mut server, pid, 10.0, 480.0);
    run_simulation_tick(&mut server).unwrap();
    place(&mut server, pid, 990.0, 240.0);
    run_simulation_tick(&mut server).unwrap();

    let player = server.players.get(&pid).unwrap();
    assert_eq!(player.area_index, 1);
    assert_eq!(player.score, per_area);
    assert!(player.completed.contains(&("Alpha".to_string(), 0)));
}

#[test]
fn test_last_area_has_no_next_transition() {
    let (mut server, _rx) = server_with(open_world());
    let pid = join(&mut server, "ada");

    // Walk to the last area
    for _ in 0..2 {
        place(&mut server, pid, 990.0, 240.0);
        run_simulation_tick(&mut server).unwrap();
    }
    assert_eq!(server.players.get(&pid).unwrap().area_index, 2);

    place(&mut server, pid, 990.0, 240.0);
    run_simulation_tick(&mut server).unwrap();
    // Still in the last area; the request was ignored
    assert_eq!(server.players.get(&pid).unwrap().area_index, 2);
}

#[test]
fn test_death_countdown_ends_in_area_zero_respawn() {
    let (mut server, mut rx) = server_with(open_world());
    let pid = join(&mut server, "ada");

    place(&mut server, pid, 990.0, 240.0);
    run_simulation_tick(&mut server).unwrap();
    assert_eq!(server.players.get(&pid).unwrap().area_index, 1);

    server.players.get_mut(&pid).unwrap().death_timer = 2;
    run_simulation_tick(&mut server).unwrap();
    assert_eq!(server.players.get(&pid).unwrap().death_timer, 1);

    run_simulation_tick(&mut server).unwrap();
    let player = server.players.get(&pid).unwrap();
    assert_eq!(player.death_timer, -1, "death state cleared");
    assert_eq!(player.area_index, 0);
    let region = server.world.region("Alpha").unwrap();
    let area = region.area(0).unwrap();
    assert!(area.players.contains(&pid));
    assert!(area.start_zone.contains(player.position));

    // The destination audience was notified
    let mut saw_area_changed = false;
    while let Ok(outbound) = rx.try_recv() {
        if matches!(outbound.event, ServerEvent::AreaChanged { .. }) {
            saw_area_changed = true;
        }
    }
    assert!(saw_area_changed);
}

#[test]
fn test_dead_player_does_not_move_or_transition() {
    let (mut server, _rx) = server_with(open_world());
    let pid = join(&mut server, "ada");

    place(&mut server, pid, 990.0, 240.0);
    server.players.get_mut(&pid).unwrap().death_timer = 100;
    run_simulation_tick(&mut server).unwrap();

    let player = server.players.get(&pid).unwrap();
    assert_eq!(player.area_index, 0, "dead players do not transition");
    assert_eq!(player.position, Vec2::new(990.0, 240.0));
    assert_eq!(player.death_timer, 99);
}

#[test]
fn test_portal_maps_span_fraction_into_target_region() {
    let (mut server, _rx) = server_with(portal_world());
    let pid = join(&mut server, "ada");

    // Portal spans x in [375, 625]; stand at its midpoint
    place(&mut server, pid, 500.0, 30.0);
    run_simulation_tick(&mut server).unwrap();

    let player = server.players.get(&pid).unwrap();
    assert_eq!(player.region, "Beta");
    assert_eq!(player.area_index, 0);
    // Return portal exists: same fraction along its span, just below it
    assert!((player.position.x - 500.0).abs() < 1e-3);
    assert!((player.position.y - 75.0).abs() < 1e-3);

    // Origin region is fully vacated and swept
    assert!(server.world.region("Alpha").unwrap().area(0).is_none());
}

#[test]
fn test_arrival_portal_cooldown_blocks_bounce_back() {
    let (mut server, _rx) = server_with(portal_world());
    let pid = join(&mut server, "ada");

    place(&mut server, pid, 500.0, 30.0);
    run_simulation_tick(&mut server).unwrap();
    assert_eq!(server.players.get(&pid).unwrap().region, "Beta");

    // Step straight back onto the return portal: suppressed for the
    // cooldown, then it fires again
    place(&mut server, pid, 500.0, 30.0);
    run_simulation_tick(&mut server).unwrap();
    assert_eq!(server.players.get(&pid).unwrap().region, "Beta");

    for _ in 0..70 {
        place(&mut server, pid, 500.0, 30.0);
        run_simulation_tick(&mut server).unwrap();
        if server.players.get(&pid).unwrap().region == "Alpha" {
            break;
        }
    }
    assert_eq!(server.players.get(&pid).unwrap().region, "Alpha");
}

#[test]
fn test_disconnect_detaches_and_sweeps() {
    let (mut server, mut rx) = server_with(open_world());
    let pid = join(&mut server, "ada");

    server
        .handle_command(pid, ClientCommand::Disconnect)
        .unwrap();

    assert!(server.players.get(&pid).is_none());
    assert!(server.world.region("Alpha").unwrap().area(0).is_none());

    let mut saw_disconnect = false;
    while let Ok(outbound) = rx.try_recv() {
        if matches!(outbound.event, ServerEvent::PlayerDisconnected { id } if id == pid) {
            saw_disconnect = true;
        }
    }
    assert!(saw_disconnect);
}

#[test]
fn test_energy_stays_capped_over_many_ticks() {
    let (mut server, _rx) = server_with(open_world());
    let pid = join(&mut server, "ada");
    place(&mut server, pid, 100.0, 100.0);

    server.players.get_mut(&pid).unwrap().energy -= 0.5;
    for _ in 0..120 {
        run_simulation_tick(&mut server).unwrap();
        let player = server.players.get(&pid).unwrap();
        assert!(player.energy <= player.max_energy);
    }
    let player = server.players.get(&pid).unwrap();
    assert_eq!(player.energy, player.max_energy);
}
