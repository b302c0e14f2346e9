use blockmap::WorldPos;
use blockmap::view::LocalPlayer;

/// Blocks per second.
const SPEED: f64 = 8.0;

/// Player walking in circles around the spawn.
pub struct WalkingPlayer {
    name: String,
    radius: f64,
}

impl WalkingPlayer {
    pub fn new(name: &str, radius: f64) -> Self {
        Self {
            name: name.to_owned(),
            radius,
        }
    }

    /// Where the player is `time` seconds after the start.
    pub fn at(&self, time: f64) -> LocalPlayer {
        let angle = time * SPEED / self.radius;
        let (sin, cos) = angle.sin_cos();

        // Moving counter-clockwise, so facing along the tangent. Yaw 0 faces south (+z), and
        // grows towards west (-x).
        let (dx, dz) = (-sin, cos);
        let yaw = (-dx).atan2(dz).to_degrees() as f32;

        LocalPlayer {
            name: self.name.clone(),
            uuid: String::new(),
            position: WorldPos::new(self.radius * cos, self.radius * sin),
            yaw,
        }
    }
}
