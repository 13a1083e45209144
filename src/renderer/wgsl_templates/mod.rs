//! WGSL building blocks assembled by the program synthesizer.

pub mod common;
pub mod geometry;
pub mod raster;
pub mod shadow;
pub mod surface;

pub use common::{build_post_process, build_shared_declarations};
pub use geometry::{build_ray_combiner_fetch, build_ray_geometry};
pub use raster::build_raster_stages;
pub use shadow::build_shadow_stages;
pub use surface::{SurfaceOptions, build_hit_merge, build_surface_stages};
