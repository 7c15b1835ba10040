pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod extract;
pub mod layout;
pub mod name_plan;
pub mod normalize;
pub mod organize;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod retry;
pub mod sanitize;
pub mod util;
