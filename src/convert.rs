pub mod emit;
pub mod glow;
pub mod light;
pub mod resolve;
pub mod value;
