use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};

pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod metrics;
pub mod page;
pub mod selection;
pub mod service;
pub mod view;
pub mod watcher;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the alerts on the alert center page
    List {
        #[command(flatten)]
        query: page::PageQuery,
    },

    /// Change the status of several alerts at once
    Bulk {
        action: selection::StatusAction,

        /// Alerts to change, they must be on the listed page
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,

        /// Change every active alert
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        query: page::PageQuery,
    },

    /// Change the status of a single alert
    Mark {
        id: String,
        action: selection::StatusAction,

        #[command(flatten)]
        query: page::PageQuery,
    },

    /// Delete a single alert
    Delete {
        id: String,

        #[command(flatten)]
        query: page::PageQuery,
    },

    /// Show the details of a single alert
    Detail { id: String },

    /// Reload the alert list periodically and serve /alive and /metrics
    Watch {
        /// Interval in seconds between reloads
        #[arg(short, long, default_value = "30")]
        interval: u64,

        #[command(flatten)]
        query: page::PageQuery,
    },
}

/// Handle signals
pub fn signal_handler() -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        select! {
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, exiting");
                std::process::exit(0);
            }
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, exiting");
                std::process::exit(0);
            }
        }
    });

    Ok(())
}
