// cb: clipboard manager with a background clipboard history tracker

// Tracker supervisor, sampler, history store and browser
// (shared between the `cb` CLI and the `cb-tracker` daemon)
pub mod tracker;

// Layered user configuration
pub mod config;

// Locating the `cb` and `cb-tracker` binaries
pub mod cli_paths;

// System clipboard access
pub mod clipboard;

// Tracing subscriber setup
pub mod logging;

#[cfg(test)]
pub mod test_utils;
