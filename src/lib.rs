//! Workspace layout and view selection for a repository browser
//!
//! [`controller::RepositoryView`] ties together the resizable panes
//! ([`split`]), the persisted per-repository layout ([`layout_state`]) and the
//! working-copy/commit state machine ([`view_state`]), and feeds the panels
//! ([`panels`]) through a [`provider::RepoProvider`].

pub mod config;
pub mod controller;
pub mod fetch;
pub mod git;
pub mod input;
pub mod layout;
pub mod layout_state;
pub mod logging;
pub mod panels;
pub mod provider;
pub mod split;
pub mod store;
pub mod view_state;
pub mod watcher;
