use arbor_engine::{
    AnimatedSprite, AssetCache, Camera, EntityDesc, EntityId, InputAction, InputSnapshot,
    LayerMask, Scene, SceneCommand, ScreenRegion, Shape, SpriteSheet, Texture, TextureHandle,
    TileLayer, Tilemap, TilemapError, Vec2, World,
};
use tracing::{info, warn};

use super::behaviors::{
    clip, hud_desc, moon_desc, wall_desc, Hud, PickupSpawner, Player, Spin, IDLE_CLIP,
    PLAYER_RADIUS,
};

pub(crate) const MAP_WIDTH: u32 = 24;
pub(crate) const MAP_HEIGHT: u32 = 16;
const PLAYER_SHEET_KEY: &str = "sprites/player";
const GENERATED_SHEET_KEY: &str = "generated/player";
pub(super) const SHEET_FRAME_PX: u32 = 8;
const GROUND_PALETTE: [[u8; 4]; 3] = [[46, 74, 52, 255], [54, 86, 60, 255], [70, 62, 48, 255]];
pub(super) const MINIMAP_FULL: LayerMask = LayerMask::BACKGROUND.union(LayerMask::DEFAULT);

/// The demo: a player that walks a tiled field collecting pickups, with a
/// following camera, a minimap and a HUD pass.
#[derive(Debug, Default)]
pub(crate) struct DemoScene {
    pub(super) player: Option<EntityId>,
    pub(super) minimap: Option<EntityId>,
    hud: Option<EntityId>,
}

impl DemoScene {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn player_sheet(assets: &mut AssetCache) -> TextureHandle {
        if let Some(texture) = assets.texture(PLAYER_SHEET_KEY) {
            return texture;
        }
        match assets.insert(GENERATED_SHEET_KEY, generated_player_sheet()) {
            Ok(handle) => handle,
            Err(error) => {
                warn!(error = %error, "generated_sheet_rejected");
                TextureHandle::from(generated_player_sheet())
            }
        }
    }
}

impl Scene for DemoScene {
    fn load(&mut self, world: &mut World, assets: &mut AssetCache) {
        let root = world.root();
        let half_extent = Vec2::new(MAP_WIDTH as f32 * 0.5, MAP_HEIGHT as f32 * 0.5);

        match ground_tilemap() {
            Ok(map) => {
                world.spawn_child(
                    root,
                    EntityDesc::labeled("ground")
                        .with_layers(LayerMask::BACKGROUND)
                        .with_behavior(TileLayer::new(map, GROUND_PALETTE.to_vec())),
                );
            }
            Err(error) => warn!(error = %error, "ground_tilemap_invalid"),
        }

        for (position, size) in [
            (Vec2::new(0.0, half_extent.y - 0.5), Vec2::new(MAP_WIDTH as f32, 1.0)),
            (Vec2::new(0.0, -half_extent.y + 0.5), Vec2::new(MAP_WIDTH as f32, 1.0)),
            (Vec2::new(-half_extent.x + 0.5, 0.0), Vec2::new(1.0, MAP_HEIGHT as f32)),
            (Vec2::new(half_extent.x - 0.5, 0.0), Vec2::new(1.0, MAP_HEIGHT as f32)),
            (Vec2::new(-4.0, 2.0), Vec2::new(1.0, 5.0)),
            (Vec2::new(5.0, -3.0), Vec2::new(4.0, 1.0)),
        ] {
            world.spawn_child(root, wall_desc(position, size));
        }

        world.spawn_child(
            root,
            EntityDesc::labeled("pickups").with_behavior(PickupSpawner::new(
                0x5eed,
                half_extent - Vec2::new(2.0, 2.0),
            )),
        );

        let Some(player) = world.spawn_child(
            root,
            EntityDesc::labeled("player")
                .with_shape(Shape::circle(PLAYER_RADIUS))
                .with_behavior(Player::new()),
        ) else {
            return;
        };
        let sheet = SpriteSheet::new(Self::player_sheet(assets), SHEET_FRAME_PX, SHEET_FRAME_PX);
        world.spawn_child(
            player,
            EntityDesc::labeled("player_sprite").with_behavior(AnimatedSprite::new(
                sheet,
                clip(IDLE_CLIP),
                Vec2::new(PLAYER_RADIUS * 2.0, PLAYER_RADIUS * 2.0),
            )),
        );
        if let Some(pivot) = world.spawn_child(
            player,
            EntityDesc::labeled("orbit").with_behavior(Spin::new(2.5)),
        ) {
            world.spawn_child(pivot, moon_desc());
        }
        world.spawn_child(
            player,
            EntityDesc::labeled("main_camera")
                .with_camera(Camera::new(0, MINIMAP_FULL).with_zoom(1.5)),
        );

        self.minimap = world.spawn_child(
            root,
            EntityDesc::labeled("minimap").with_camera(
                Camera::new(1, MINIMAP_FULL)
                    .with_zoom(0.2)
                    .with_region(ScreenRegion {
                        x: 0.74,
                        y: 0.02,
                        width: 0.24,
                        height: 0.24,
                    }),
            ),
        );
        world.spawn_child(
            root,
            EntityDesc::labeled("ui_camera").with_camera(Camera::new(2, LayerMask::UI)),
        );
        self.hud = world.spawn_child(root, hud_desc());
        self.player = Some(player);
    }

    fn after_tick(&mut self, world: &mut World, input: &InputSnapshot) -> SceneCommand {
        if input.just_pressed(InputAction::Pause) {
            if let Some(minimap) = self.minimap {
                let showing_actors = world
                    .camera(minimap)
                    .is_some_and(|camera| camera.filter.contains(LayerMask::DEFAULT));
                let filter = if showing_actors {
                    LayerMask::BACKGROUND
                } else {
                    MINIMAP_FULL
                };
                world.set_camera_filter(minimap, filter);
                info!(show_actors = !showing_actors, "minimap_filter_toggled");
            }
        }
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        SceneCommand::Continue
    }

    fn unload(&mut self, _world: &mut World) {
        self.player = None;
        self.minimap = None;
        self.hud = None;
    }

    fn debug_title(&self, world: &World) -> Option<String> {
        let score = self
            .hud
            .and_then(|hud| world.behavior::<Hud>(hud))
            .map(Hud::score)
            .unwrap_or(0);
        let motion = self
            .player
            .and_then(|player| world.behavior::<Player>(player))
            .map(Player::motion_name)
            .unwrap_or("-");
        Some(format!(
            "Arbor | score {score} | {motion} | live {}",
            world.live_count()
        ))
    }
}

pub(crate) fn ground_tilemap() -> Result<Tilemap, TilemapError> {
    let mut tiles = Vec::with_capacity((MAP_WIDTH * MAP_HEIGHT) as usize);
    for y in 0..MAP_HEIGHT {
        for x in 0..MAP_WIDTH {
            let path = y == MAP_HEIGHT / 2 || x == MAP_WIDTH / 3;
            tiles.push(if path { 2 } else { ((x + y) % 2) as u16 });
        }
    }
    let origin = Vec2::new(-(MAP_WIDTH as f32) * 0.5, -(MAP_HEIGHT as f32) * 0.5);
    Tilemap::new(MAP_WIDTH, MAP_HEIGHT, origin, 1.0, tiles)
}

/// Four 8x8 frames in a row: two idle, two walking.
pub(super) fn generated_player_sheet() -> Texture {
    const BODY: [u8; 4] = [90, 170, 255, 255];
    const OUTLINE: [u8; 4] = [20, 40, 80, 255];
    const FRAME_COUNT: u32 = 4;

    let width = SHEET_FRAME_PX * FRAME_COUNT;
    let height = SHEET_FRAME_PX;
    let mut rgba = vec![0u8; (width * height * 4) as usize];
    for frame in 0..FRAME_COUNT {
        let bob = frame % 2;
        for y in 0..SHEET_FRAME_PX {
            for x in 0..SHEET_FRAME_PX {
                let dx = x as f32 + 0.5 - SHEET_FRAME_PX as f32 * 0.5;
                let dy = y as f32 + 0.5 - SHEET_FRAME_PX as f32 * 0.5 + bob as f32 * 0.5;
                let distance = (dx * dx + dy * dy).sqrt();
                let color = if distance <= 2.5 {
                    BODY
                } else if distance <= 3.5 {
                    OUTLINE
                } else {
                    continue;
                };
                let px = frame * SHEET_FRAME_PX + x;
                let offset = ((y * width + px) * 4) as usize;
                rgba[offset..offset + 4].copy_from_slice(&color);
            }
        }
    }
    Texture::from_rgba(width, height, rgba).unwrap_or_else(|_| Texture::solid(width, height, BODY))
}
