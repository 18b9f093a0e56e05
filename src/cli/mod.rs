//! CLI module - Command-line interface for Foodgram
//!
//! Server startup plus the administrative commands that seed users and
//! reference data.

mod commands;

use clap::{Parser, Subcommand};

/// Foodgram - recipe sharing backend
#[derive(Parser)]
#[command(name = "foodgram")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run migrations and start the HTTP API
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create a user and print its auth token
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: String,
    },

    /// Regenerate and print a user's auth token
    Token {
        /// Email of the user
        email: String,
    },

    /// Add a tag
    AddTag {
        #[arg(long)]
        name: String,
        /// Hex color such as #E26C2D
        #[arg(long)]
        color: String,
        #[arg(long)]
        slug: String,
    },

    /// Add an ingredient
    AddIngredient {
        #[arg(long)]
        name: String,
        /// Measurement unit such as g or ml
        #[arg(long)]
        unit: String,
    },
}

pub use commands::*;
