pub mod analyzers;
pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod frequency;
pub mod geometry;
pub mod headway;
pub mod join;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod time;
pub mod validate;
pub mod xref;
