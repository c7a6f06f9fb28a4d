use arbor_engine::app::FrameBuffer;
use arbor_engine::{
    AnimatedSprite, AssetCache, InputAction, InputSnapshot, KeyState, LayerMask, Scene,
    SceneCommand, TileLayer, Vec2, World,
};

use super::scene::{
    generated_player_sheet, ground_tilemap, DemoScene, MAP_HEIGHT, MINIMAP_FULL, SHEET_FRAME_PX,
};

fn loaded() -> (DemoScene, World, AssetCache) {
    let mut scene = DemoScene::new();
    let mut world = World::new();
    let mut assets = AssetCache::new("/nonexistent/arbor/assets");
    scene.load(&mut world, &mut assets);
    world.apply_pending();
    (scene, world, assets)
}

fn press(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_key_state(action, KeyState::Pressed)
}

#[test]
fn load_builds_the_expected_tree() {
    let (scene, world, assets) = loaded();
    let root = world.root();
    let player = world.find_child_by_label(root, "player").expect("player");
    assert_eq!(scene.player, Some(player));
    assert!(world.find_child_with::<AnimatedSprite>(player).is_some());
    assert!(world.find_child_by_label(player, "orbit").is_some());
    assert!(world.find_child_with::<TileLayer>(root).is_some());
    assert_eq!(
        world.layers(world.find_child_by_label(root, "ground").expect("ground")),
        Some(LayerMask::BACKGROUND)
    );

    let main = world.find_child_by_label(player, "main_camera").expect("camera");
    let ui = world.find_child_by_label(root, "ui_camera").expect("ui camera");
    let minimap = scene.minimap.expect("minimap");
    assert_eq!(world.viewports(), vec![main, minimap, ui]);

    assert_eq!(assets.len(), 1);
    assert!(world.shape_count() >= 7);
}

#[test]
fn main_camera_draws_the_player_at_screen_center() {
    let (_scene, mut world, _assets) = loaded();
    let mut frame = FrameBuffer::new(320, 240);
    world.draw(&mut frame);
    assert_eq!(frame.pixel(160, 120), Some([90, 170, 255, 255]));
}

#[test]
fn pause_toggles_actors_on_the_minimap() {
    let (mut scene, mut world, _assets) = loaded();
    let minimap = scene.minimap.expect("minimap");

    scene.after_tick(&mut world, &press(InputAction::Pause));
    assert_eq!(
        world.camera(minimap).expect("camera").filter,
        LayerMask::BACKGROUND
    );

    scene.after_tick(&mut world, &InputSnapshot::empty());
    assert_eq!(
        world.camera(minimap).expect("camera").filter,
        LayerMask::BACKGROUND
    );

    scene.after_tick(&mut world, &press(InputAction::Pause));
    assert_eq!(world.camera(minimap).expect("camera").filter, MINIMAP_FULL);
}

#[test]
fn quit_request_ends_the_scene() {
    let (mut scene, mut world, _assets) = loaded();
    assert_eq!(
        scene.after_tick(&mut world, &InputSnapshot::empty()),
        SceneCommand::Continue
    );
    assert_eq!(
        scene.after_tick(&mut world, &InputSnapshot::empty().with_quit_requested(true)),
        SceneCommand::Quit
    );
}

#[test]
fn debug_title_reports_score_and_motion() {
    let (scene, world, _assets) = loaded();
    let title = scene.debug_title(&world).expect("title");
    assert!(title.contains("score 0"), "{title}");
    assert!(title.contains("idle"), "{title}");
    assert!(title.contains(&format!("live {}", world.live_count())), "{title}");
}

#[test]
fn ground_map_covers_the_play_area() {
    let map = ground_tilemap().expect("ground");
    assert_eq!(map.tile_at(0, 0), Some(0));
    assert_eq!(map.tile_at(0, MAP_HEIGHT / 2), Some(2));
    assert!(map.in_bounds_world(Vec2::new(-11.9, 7.9)));
    assert!(!map.in_bounds_world(Vec2::new(12.1, 0.0)));
}

#[test]
fn generated_sheet_holds_four_frames() {
    let sheet = generated_player_sheet();
    assert_eq!(sheet.width(), SHEET_FRAME_PX * 4);
    assert_eq!(sheet.height(), SHEET_FRAME_PX);
    assert_eq!(sheet.pixel(0, 0), Some([0, 0, 0, 0]));
}
