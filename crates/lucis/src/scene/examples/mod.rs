//! Built-in scenes, used by the command line front-end and the tests.
//!
//! Every scene comes with a camera framing it.

mod cornell;
mod plane;
mod showcase;
mod spheres;

pub use cornell::CornellBoxScene;
pub use plane::PlaneScene;
pub use showcase::ShowcaseScene;
pub use spheres::SpheresScene;
