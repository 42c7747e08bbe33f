// ─── mcfetch Core ───
// Acquisition and installation engine for Minecraft game versions.
//
// Architecture:
//   core/
//     downloader/ — Staged transfers, digest checks, retrying batch gate
//     version/    — Manifest cache, descriptor schema, inheritance resolver
//     assets/     — Asset index + content-addressed object sync
//     loaders/    — Loader capability table, built-in installers, combos
//     maven/      — Artifact coordinates for loader libraries
//     state/      — Engine facade wiring the shared components
//   source/http   — Endpoint policy and per-host request policy
//   mirror        — Mirror response translators

pub mod assets;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod loaders;
pub mod maven;
pub mod mirror;
pub mod progress;
pub mod source;
pub mod state;
pub mod version;
