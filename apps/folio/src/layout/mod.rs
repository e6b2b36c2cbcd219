// Document pagination and flow layout.
// Pipeline: content model → blocks → hidden measurement mount → flow partitioner → page descriptors.
// The orchestrator runs this pipeline once per debounced input snapshot.

pub mod assembler;
pub mod blocks;
pub mod config;
pub mod flow;
pub mod font_metrics;
pub mod mount;
pub mod orchestrator;
pub mod page_fill;
pub mod probe;

// Re-export the public API consumed at startup.
pub use mount::MountPool;
