//! Command-line surface for the hosted wallet

pub mod commands;
