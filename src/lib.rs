pub mod adjust;
pub mod fetch;
pub mod geocode;
pub mod network;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod render;
pub mod stats;
pub mod table;
