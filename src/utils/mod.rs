pub mod money;
pub mod normalize;
