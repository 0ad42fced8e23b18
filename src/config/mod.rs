pub mod duration;
pub mod example;
pub mod load;
pub mod model;
