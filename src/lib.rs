pub mod db;
pub mod errors;
pub mod pipeline;
pub mod utils;
