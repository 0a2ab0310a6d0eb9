//! Queue engine test suite
//!
//! Each submodule covers one behavioural area; shared fixtures live in
//! `helpers`.

mod helpers;

mod concurrent;
mod events;
