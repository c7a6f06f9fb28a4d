use arbor_engine::{
    AnimatedSprite, Behavior, DrawCtx, EntityCtx, EntityDesc, FsmError, InputAction, LayerMask,
    Rgba, Shape, SpriteAnimation, StateMachine, Vec2,
};
use tracing::{debug, error, info};

pub(crate) const PLAYER_RADIUS: f32 = 0.4;
pub(crate) const PICKUP_RADIUS: f32 = 0.25;
const WALK_SPEED: f32 = 4.0;
const DASH_SPEED: f32 = 11.0;
const DASH_SECONDS: f32 = 0.18;
const PICKUP_PULSE_HZ: f32 = 1.5;
const SPAWN_INTERVAL_SECONDS: f32 = 1.25;
const MAX_PICKUPS: usize = 6;

pub(crate) const IDLE_CLIP: (u32, u32) = (0, 2);
pub(crate) const WALK_CLIP: (u32, u32) = (2, 2);
pub(crate) const CLIP_FRAME_SECONDS: f32 = 0.2;

pub(crate) fn clip(range: (u32, u32)) -> SpriteAnimation {
    SpriteAnimation::new(range.0, range.1, CLIP_FRAME_SECONDS, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Motion {
    Idle,
    Walk,
    Dash,
}

struct MoveIntent {
    moving: bool,
    dash_pressed: bool,
    dash_elapsed: f32,
}

pub(crate) struct Player {
    motion: StateMachine<Motion, MoveIntent>,
    facing: Vec2,
}

/// Idle/walk/dash movement. Dash only starts while a direction is held and
/// runs for `DASH_SECONDS` before falling back.
fn motion_machine() -> Result<StateMachine<Motion, MoveIntent>, FsmError> {
    let mut motion: StateMachine<Motion, MoveIntent> = StateMachine::new(Motion::Idle, "idle");
    motion.add_state(Motion::Walk, "walk")?;
    motion.add_state(Motion::Dash, "dash")?;
    motion.add_transition(Motion::Idle, Motion::Dash, |i| i.moving && i.dash_pressed)?;
    motion.add_transition(Motion::Walk, Motion::Dash, |i| i.moving && i.dash_pressed)?;
    motion.add_transition(Motion::Idle, Motion::Walk, |i| i.moving)?;
    motion.add_transition(Motion::Walk, Motion::Idle, |i| !i.moving)?;
    motion.add_transition(Motion::Dash, Motion::Walk, |i| {
        i.dash_elapsed >= DASH_SECONDS && i.moving
    })?;
    motion.add_transition(Motion::Dash, Motion::Idle, |i| {
        i.dash_elapsed >= DASH_SECONDS && !i.moving
    })?;
    Ok(motion)
}

impl Player {
    pub(crate) fn new() -> Self {
        let motion = motion_machine().unwrap_or_else(|error| {
            error!(error = %error, "player_motion_machine_invalid");
            StateMachine::new(Motion::Idle, "idle")
        });
        Self {
            motion,
            facing: Vec2::new(1.0, 0.0),
        }
    }

    pub(crate) fn motion(&self) -> Motion {
        self.motion.current()
    }

    pub(crate) fn motion_name(&self) -> &'static str {
        self.motion.current_name()
    }

    fn speed(&self) -> f32 {
        match self.motion() {
            Motion::Idle => 0.0,
            Motion::Walk => WALK_SPEED,
            Motion::Dash => DASH_SPEED,
        }
    }

    fn update_sprite(&self, ctx: &mut EntityCtx<'_>) {
        let id = ctx.id();
        let Some(sprite_id) = ctx.world().find_child_with::<AnimatedSprite>(id) else {
            return;
        };
        let range = match self.motion() {
            Motion::Idle => IDLE_CLIP,
            Motion::Walk | Motion::Dash => WALK_CLIP,
        };
        if let Some(sprite) = ctx.world_mut().behavior_mut::<AnimatedSprite>(sprite_id) {
            sprite.play(clip(range));
        }
    }
}

impl Behavior for Player {
    fn on_tick(&mut self, ctx: &mut EntityCtx<'_>) {
        let dt = ctx.fixed_dt_seconds();
        let input = *ctx.input();
        let axis = input.move_axis();
        let moving = axis.length_squared() > 0.0;
        if moving {
            self.facing = axis * (1.0 / axis.length());
        }

        let before = self.motion.current();
        let intent = MoveIntent {
            moving,
            dash_pressed: input.just_pressed(InputAction::Action),
            dash_elapsed: self.motion.time_in_state() + dt,
        };
        if let Some(transition) = self.motion.update_with_dt(dt, &intent) {
            debug!(from = ?transition.from, to = ?transition.to, "player_motion_changed");
        }
        if self.motion.current() != before {
            self.update_sprite(ctx);
        }

        let step = self.facing * (self.speed() * dt);
        if step.length_squared() > 0.0 {
            let start = ctx.position();
            ctx.translate(step);
            let blocked = ctx
                .overlapping()
                .into_iter()
                .any(|other| ctx.world().behavior::<Wall>(other).is_some());
            if blocked {
                ctx.set_position(start);
            }
        }

        for other in ctx.overlapping() {
            if let Some(pickup) = ctx.world_mut().behavior_mut::<Pickup>(other) {
                pickup.collected = true;
                ctx.request_destroy(other);
            }
        }
    }

    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let position = ctx.world_transform().position;
        let shadow = Vec2::new(0.0, -PLAYER_RADIUS * 0.6);
        ctx.target()
            .fill_rect(position + shadow, Vec2::new(PLAYER_RADIUS * 1.6, 0.15), [0, 0, 0, 90]);
    }
}

pub(crate) struct Wall {
    pub(crate) size: Vec2,
    pub(crate) color: Rgba,
}

impl Behavior for Wall {
    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let transform = ctx.world_transform();
        ctx.target().fill_rect(
            transform.position,
            self.size.component_mul(transform.scale),
            self.color,
        );
    }
}

pub(crate) fn wall_desc(position: Vec2, size: Vec2) -> EntityDesc {
    EntityDesc::labeled("wall")
        .with_position(position)
        .with_shape(Shape::rect(size.x, size.y))
        .with_behavior(Wall {
            size,
            color: [92, 84, 120, 255],
        })
}

/// Collectible that pulses while alive and credits the HUD when it leaves
/// the tree after being collected.
pub(crate) struct Pickup {
    value: u32,
    age: f32,
    collected: bool,
}

impl Pickup {
    pub(crate) fn new(value: u32) -> Self {
        Self {
            value,
            age: 0.0,
            collected: false,
        }
    }
}

impl Behavior for Pickup {
    fn on_tick(&mut self, ctx: &mut EntityCtx<'_>) {
        self.age += ctx.fixed_dt_seconds();
        let pulse = 1.0 + 0.15 * (self.age * PICKUP_PULSE_HZ * std::f32::consts::TAU).sin();
        ctx.set_scale(Vec2::new(pulse, pulse));
    }

    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let transform = ctx.world_transform();
        let radius = PICKUP_RADIUS * transform.scale.max_abs_component();
        ctx.target()
            .fill_circle(transform.position, radius, [250, 210, 70, 255]);
    }

    fn on_detach(&mut self, ctx: &mut EntityCtx<'_>) {
        if !self.collected {
            return;
        }
        let root = ctx.world().root();
        let Some(hud) = ctx.world().find_child_with::<Hud>(root) else {
            return;
        };
        if let Some(hud) = ctx.world_mut().behavior_mut::<Hud>(hud) {
            hud.add_score(self.value);
        }
    }
}

pub(crate) fn pickup_desc(position: Vec2) -> EntityDesc {
    EntityDesc::labeled("pickup")
        .with_position(position)
        .with_shape(Shape::circle(PICKUP_RADIUS))
        .with_behavior(Pickup::new(1))
}

/// Keeps up to `MAX_PICKUPS` pickups alive as its children.
pub(crate) struct PickupSpawner {
    seed: u32,
    half_extent: Vec2,
    cooldown: f32,
}

impl PickupSpawner {
    pub(crate) fn new(seed: u32, half_extent: Vec2) -> Self {
        Self {
            seed: seed.max(1),
            half_extent,
            cooldown: 0.0,
        }
    }

    fn next_unit(&mut self) -> f32 {
        // xorshift32
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 17;
        self.seed ^= self.seed << 5;
        (self.seed as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl Behavior for PickupSpawner {
    fn on_tick(&mut self, ctx: &mut EntityCtx<'_>) {
        self.cooldown -= ctx.fixed_dt_seconds();
        if self.cooldown > 0.0 {
            return;
        }
        self.cooldown = SPAWN_INTERVAL_SECONDS;
        if ctx.world().children(ctx.id()).len() >= MAX_PICKUPS {
            return;
        }
        let position = Vec2::new(
            self.next_unit() * self.half_extent.x,
            self.next_unit() * self.half_extent.y,
        );
        ctx.spawn_child(pickup_desc(position));
    }
}

/// Advances its own rotation so children orbit the parent.
pub(crate) struct Spin {
    pub(crate) radians_per_second: f32,
    angle: f32,
}

impl Spin {
    pub(crate) fn new(radians_per_second: f32) -> Self {
        Self {
            radians_per_second,
            angle: 0.0,
        }
    }
}

impl Behavior for Spin {
    fn on_tick(&mut self, ctx: &mut EntityCtx<'_>) {
        self.angle = (self.angle + self.radians_per_second * ctx.fixed_dt_seconds())
            .rem_euclid(std::f32::consts::TAU);
        ctx.set_rotation(self.angle);
    }
}

pub(crate) struct Dot {
    pub(crate) radius: f32,
    pub(crate) color: Rgba,
}

impl Behavior for Dot {
    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let transform = ctx.world_transform();
        ctx.target().fill_circle(
            transform.position,
            self.radius * transform.scale.max_abs_component(),
            self.color,
        );
    }
}

/// Score readout drawn in the UI pass, anchored to the top-left of the view.
#[derive(Default)]
pub(crate) struct Hud {
    score: u32,
}

impl Hud {
    pub(crate) fn score(&self) -> u32 {
        self.score
    }

    fn add_score(&mut self, value: u32) {
        self.score = self.score.saturating_add(value);
        info!(score = self.score, "score_changed");
    }
}

impl Behavior for Hud {
    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let view = ctx.target().view();
        let top_left = view.center + Vec2::new(-view.size.x, view.size.y) * 0.5;
        let pip = Vec2::new(0.5, 0.5);
        let shown = self.score.min(24);

        let backdrop_width = 0.5 + 0.7 * shown.max(1) as f32;
        ctx.target().fill_rect(
            top_left + Vec2::new(backdrop_width * 0.5 + 0.25, -0.65),
            Vec2::new(backdrop_width, 0.9),
            [0, 0, 0, 140],
        );
        for index in 0..shown {
            let center = top_left + Vec2::new(0.75 + index as f32 * 0.7, -0.65);
            ctx.target().fill_rect(center, pip, [250, 210, 70, 255]);
        }
    }
}

pub(crate) fn hud_desc() -> EntityDesc {
    EntityDesc::labeled("hud")
        .with_layers(LayerMask::UI)
        .with_behavior(Hud::default())
}

pub(crate) fn moon_desc() -> EntityDesc {
    EntityDesc::labeled("moon")
        .with_position(Vec2::new(1.1, 0.0))
        .with_behavior(Dot {
            radius: 0.12,
            color: [150, 220, 255, 255],
        })
}
