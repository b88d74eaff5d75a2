//! EntroPick Library
//!
//! A Slack bot that picks code reviewers at random.
//!
//! This crate provides the core functionality for:
//! - Loading and validating reviewer pool configurations
//! - Uniform and fairness-weighted reviewer selection
//! - Handling commands from slash commands, mentions and direct messages
//! - Talking to Slack over Socket Mode and the Web API

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod pool;
pub mod slack;
