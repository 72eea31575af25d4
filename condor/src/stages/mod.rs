//! The built-in pipeline stages over the `puzzle` scene.

mod group_touch;
mod isect_geometry;
mod sample_touch;

pub use group_touch::{TOUCH_ALL_FILE, group_touch};
pub use isect_geometry::{ISECT_SCRATCH, IsectGeometry, IsectRecord};
pub use sample_touch::{SampleTouch, TOUCH_SCRATCH, TouchRecord};
