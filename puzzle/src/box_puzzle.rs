use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{PuzzleErr, Result, STATE_LEN, Scene, State};

const PROBES: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// The six walls of a `BoxPuzzle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wall {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

#[derive(Debug, Clone, Copy)]
struct Slab {
    wall: Wall,
    min: Vec3,
    max: Vec3,
}

impl Slab {
    fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Distance from `p` to the closest point of the slab.
    fn distance(&self, p: Vec3) -> f32 {
        (p - p.clamp(self.min, self.max)).length()
    }

    /// Entry distance of the ray `origin + t * dir`, `t >= 0`.
    fn ray_entry(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let (mut t_min, mut t_max) = (0f32, f32::INFINITY);

        for i in 0..3 {
            if dir[i] == 0. {
                if origin[i] < self.min[i] || origin[i] > self.max[i] {
                    return None;
                }
                continue;
            }

            let inv = 1. / dir[i];
            let (t0, t1) = ((self.min[i] - origin[i]) * inv, (self.max[i] - origin[i]) * inv);
            t_min = t_min.max(t0.min(t1));
            t_max = t_max.min(t0.max(t1));
        }

        (t_min <= t_max).then_some(t_min)
    }
}

/// A point robot inside a hollow box made of six wall slabs, the `+X` wall has a
/// square hole the robot must find to escape.
///
/// Observations are the configuration followed by the free distance along
/// `±X, ±Y, ±Z`, capped at `probe_range`.
#[derive(Debug, Clone)]
pub struct BoxPuzzle {
    outer: f32,
    probe_range: f32,
    slabs: Vec<Slab>,
}

impl BoxPuzzle {
    /// Creates a new `BoxPuzzle`.
    ///
    /// # Arguments
    /// * `half_extent` - Half the side of the inner free cube.
    /// * `wall` - Wall thickness.
    /// * `hole` - Side of the square hole in the `+X` wall.
    /// * `probe_range` - Cap of the depth probes.
    ///
    /// # Returns
    /// An `InvalidGeometry` error if a dimension isn't positive or the hole doesn't
    /// fit in the wall.
    pub fn new(half_extent: f32, wall: f32, hole: f32, probe_range: f32) -> Result<Self> {
        let dims = [half_extent, wall, hole, probe_range];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.) {
            return Err(PuzzleErr::InvalidGeometry(format!(
                "dimensions must be positive, got {dims:?}"
            )));
        }

        if hole >= 2. * half_extent {
            return Err(PuzzleErr::InvalidGeometry(format!(
                "hole {hole} doesn't fit a wall of side {}",
                2. * half_extent
            )));
        }

        let (h, o, r) = (half_extent, half_extent + wall, hole / 2.);
        let mut slabs = vec![
            Slab {
                wall: Wall::NegX,
                min: Vec3::new(-o, -o, -o),
                max: Vec3::new(-h, o, o),
            },
            Slab {
                wall: Wall::PosY,
                min: Vec3::new(-o, h, -o),
                max: Vec3::new(o, o, o),
            },
            Slab {
                wall: Wall::NegY,
                min: Vec3::new(-o, -o, -o),
                max: Vec3::new(o, -h, o),
            },
            Slab {
                wall: Wall::PosZ,
                min: Vec3::new(-o, -o, h),
                max: Vec3::new(o, o, o),
            },
            Slab {
                wall: Wall::NegZ,
                min: Vec3::new(-o, -o, -o),
                max: Vec3::new(o, o, -h),
            },
        ];

        // The +X wall is four slabs framing the hole.
        for (min, max) in [
            (Vec3::new(h, -o, -o), Vec3::new(o, -r, o)),
            (Vec3::new(h, r, -o), Vec3::new(o, o, o)),
            (Vec3::new(h, -r, -o), Vec3::new(o, r, -r)),
            (Vec3::new(h, -r, r), Vec3::new(o, r, o)),
        ] {
            slabs.push(Slab {
                wall: Wall::PosX,
                min,
                max,
            });
        }

        Ok(Self {
            outer: o,
            probe_range,
            slabs,
        })
    }

    /// The wall closest to `state` if it lies within `tolerance` of it.
    pub fn contact(&self, state: &State, tolerance: f32) -> Option<Wall> {
        let p = state.translation();

        self.slabs
            .iter()
            .map(|slab| (slab.wall, slab.distance(p)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(wall, _)| wall)
    }

    /// Free distance from `state` along `dir`, capped at the probe range.
    fn probe(&self, origin: Vec3, dir: Vec3) -> f32 {
        self.slabs
            .iter()
            .filter_map(|slab| slab.ray_entry(origin, dir))
            .fold(self.probe_range, f32::min)
    }
}

impl Scene for BoxPuzzle {
    fn is_valid(&self, state: &State) -> bool {
        let p = state.translation();
        p.is_finite() && !self.slabs.iter().any(|slab| slab.contains(p))
    }

    fn is_disentangled(&self, state: &State) -> bool {
        state.translation().abs().max_element() > self.outer
    }

    fn observation_len(&self) -> usize {
        STATE_LEN + PROBES.len()
    }

    fn observe(&self, state: &State, out: &mut [f32]) -> Result<()> {
        let expected = self.observation_len();
        if out.len() != expected {
            return Err(PuzzleErr::ObservationSize {
                expected,
                got: out.len(),
            });
        }

        let (head, probes) = out.split_at_mut(STATE_LEN);
        head.copy_from_slice(state.as_array());

        let origin = state.translation();
        for (out, dir) in probes.iter_mut().zip(PROBES) {
            *out = self.probe(origin, dir);
        }

        Ok(())
    }
}
