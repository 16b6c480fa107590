pub mod chart;
pub mod portfolio;
pub mod price;
pub mod range;
pub mod settings;
