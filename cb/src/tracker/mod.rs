// Clipboard history tracker
// Shared between the `cb` CLI (supervisor, browser) and the `cb-tracker` daemon (sampler).

pub mod boot;
pub mod browser;
pub mod history;
pub mod lock;
pub mod process;
pub mod sampler;
pub mod supervisor;
