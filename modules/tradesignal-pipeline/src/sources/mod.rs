pub mod economy_middle_east;

pub use economy_middle_east::EconomyMiddleEast;
