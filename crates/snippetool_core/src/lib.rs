pub mod blocks;
pub mod config;
pub mod extract;
pub mod filesystem;
pub mod generate;
pub mod install;
pub mod lines;
pub mod locate;
pub mod manifest;
pub mod metadata;
pub mod rewrite;
pub mod runtime;
pub mod slug;
pub mod snapshot;
