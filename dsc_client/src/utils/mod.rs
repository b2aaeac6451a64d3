pub mod constants;
pub mod logger;
pub mod math_helper;
