//! Shapes made of other shapes.
//!
//! - [ShapeList]: a plain list, tested linearly
//! - [bvh::Bvh]: a list with a spatial index
//! - [Transformed] and [Motion]: a child seen through a static or an animated transform
//! - [Csg]: boolean combination of two solids

pub mod bvh;
pub mod csg;
pub mod shapelist;
pub mod transform;

pub use bvh::Bvh;
pub use csg::{Csg, CsgOp};
pub use shapelist::ShapeList;
pub use transform::{Motion, Transformed};
