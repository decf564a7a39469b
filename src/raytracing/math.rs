pub mod box3;
pub mod mat4;
pub mod ray;
pub mod vec3;

pub use box3::*;
pub use mat4::*;
pub use ray::*;
pub use vec3::*;
