//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Unique identifier for players (one per connection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

/// Unique identifier for entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Unique identifier for ability creations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreationId(pub u64);

/// Monotonic id source shared by players, entities, and ability creations.
///
/// The counter is atomic so a transport adapter on another task can allocate
/// connection ids without touching simulation state.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: std::sync::atomic::AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    pub fn player_id(&self) -> PlayerId {
        PlayerId(self.next())
    }

    pub fn entity_id(&self) -> EntityId {
        EntityId(self.next())
    }

    pub fn creation_id(&self) -> CreationId {
        CreationId(self.next())
    }
}

/// 2D position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::default()
        }
    }

    pub fn from_angle(radians: f32) -> Self {
        Self {
            x: radians.cos(),
            y: radians.sin(),
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Width/height pair for rectangular extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle, stored as position + size to mirror the wire format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub position: Vec2,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min_x(&self) -> f32 {
        self.position.x
    }

    pub fn max_x(&self) -> f32 {
        self.position.x + self.size.width
    }

    pub fn min_y(&self) -> f32 {
        self.position.y
    }

    pub fn max_y(&self) -> f32 {
        self.position.y + self.size.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.position.x + self.size.width / 2.0,
            self.position.y + self.size.height / 2.0,
        )
    }

    /// Inclusive point containment
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min_x() && p.x <= self.max_x() && p.y >= self.min_y() && p.y <= self.max_y()
    }

    /// True if a circle of `radius` at `p` lies entirely inside the rect
    pub fn contains_circle(&self, p: Vec2, radius: f32) -> bool {
        p.x >= self.min_x() + radius
            && p.x <= self.max_x() - radius
            && p.y >= self.min_y() + radius
            && p.y <= self.max_y() - radius
    }

    /// True if a circle of `radius` at `p` overlaps the rect (axis-aligned test)
    pub fn overlaps_circle(&self, p: Vec2, radius: f32) -> bool {
        p.x + radius >= self.min_x()
            && p.x - radius <= self.max_x()
            && p.y + radius >= self.min_y()
            && p.y - radius <= self.max_y()
    }

    /// Clamp a point so a circle of `margin` stays inside the rect
    pub fn clamp_inside(&self, p: Vec2, margin: f32) -> Vec2 {
        Vec2::new(
            p.x.max(self.min_x() + margin).min(self.max_x() - margin),
            p.y.max(self.min_y() + margin).min(self.max_y() - margin),
        )
    }
}

/// Line segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
}

impl Segment {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Distance from a point to this segment
    pub fn distance_to(&self, p: Vec2) -> f32 {
        let l2 = {
            let d = self.b - self.a;
            d.x * d.x + d.y * d.y
        };
        if l2 == 0.0 {
            return p.distance(&self.a);
        }
        let t = ((p - self.a).dot(&(self.b - self.a)) / l2).clamp(0.0, 1.0);
        let closest = self.a + (self.b - self.a) * t;
        p.distance(&closest)
    }
}

/// Circle-vs-circle overlap test shared by every collision site
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance(&b) <= ra + rb
}
