pub mod config;
pub mod frame;
pub mod host;
pub mod renderer;
pub mod shading;
pub mod slice;
pub mod tracker;
pub mod traveller;
pub mod trigger;
pub mod world;

#[cfg(test)]
mod testkit;
