pub mod bounds;
pub mod distributions;
pub mod float;
pub mod point;
pub mod stat;
pub mod transform;
pub mod vec;
