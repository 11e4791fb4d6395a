//! Colored console output for the hybrid PoS/PoA node.
//!
//! Color scheme: blue+bold headers, cyan values, green success, yellow
//! warnings, dimmed secondary text.

use alloy_primitives::Address;
use colored::Colorize;
use std::fmt;
use std::path::Path;

// ── Banner & Identity ──────────────────────────────────────────────

/// Print the startup banner with chain identity.
pub fn print_banner(chain_id: u64, block_period: u64) {
    println!();
    println!("{}", "=== Hybrid PoS/PoA Node ===".blue().bold());
    println!("  Chain ID:     {}", chain_id.to_string().cyan());
    println!(
        "  Block period: {} seconds (PoA era)",
        block_period.to_string().cyan()
    );
}

/// Print the operating mode.
pub fn print_mode(mode: &str) {
    println!("  Mode:         {}", mode.cyan());
}

/// Print the configured transition height, or its absence.
pub fn print_transition_config(transition_block: Option<u64>) {
    match transition_block {
        Some(height) => println!(
            "  Transition:   switches to PoA at block {}",
            height.to_string().cyan()
        ),
        None => println!("  Transition:   {}", "none configured".dimmed()),
    }
}

// ── Signer Info ────────────────────────────────────────────────────

/// Print the authorized signer list.
pub fn print_signers(signers: &[Address]) {
    println!(
        "  Authorized signers ({}):",
        signers.len().to_string().cyan()
    );
    for (i, signer) in signers.iter().enumerate() {
        println!(
            "    {}. {}",
            (i + 1).to_string().dimmed(),
            format!("{signer}").cyan()
        );
    }
}

/// Print confirmation that a signer key was loaded.
pub fn print_signer_loaded(addr: &Address) {
    println!(
        "  {} Signer key loaded: {}",
        "OK".green().bold(),
        format!("{addr}").cyan()
    );
}

/// Print confirmation that dev signers were loaded.
pub fn print_dev_signers_loaded(count: usize) {
    println!(
        "  {} Dev signers loaded: {} keys",
        "OK".green().bold(),
        count.to_string().cyan()
    );
}

/// Print a warning when no signer key is provided.
pub fn print_no_signer_warning() {
    println!(
        "  {} No signer key provided. Node will validate but not produce blocks.",
        "WARNING:".yellow().bold()
    );
    println!(
        "  {}",
        "Set --signer-key or SIGNER_KEY environment variable.".dimmed()
    );
}

// ── Node Configuration ─────────────────────────────────────────────

/// Print the node configuration block.
pub fn print_config(is_dev_mode: bool, gas_limit: u64, datadir: &Path) {
    println!();
    println!("{}", "Node configuration:".blue().bold());
    println!(
        "  {} {}",
        "Dev mode:   ".dimmed(),
        if is_dev_mode {
            "true".green()
        } else {
            "false".normal()
        }
    );
    println!(
        "  {} {}",
        "Gas limit:  ".dimmed(),
        gas_limit.to_string().cyan()
    );
    println!("  {} {:?}", "Data dir:   ".dimmed(), datadir);
}

// ── Node Lifecycle ─────────────────────────────────────────────────

/// Print that the node started successfully.
pub fn print_node_started(genesis_hash: impl fmt::Debug) {
    println!();
    println!("{}", "Node started successfully!".green().bold());
    println!("  Genesis hash: {:?}", genesis_hash);
}

/// Print prefunded accounts.
pub fn print_prefunded(accounts: &[Address]) {
    println!();
    println!("{}", "Prefunded accounts:".blue().bold());
    for (i, account) in accounts.iter().enumerate() {
        println!(
            "  {}. {}",
            (i + 1).to_string().dimmed(),
            format!("{account}").cyan()
        );
    }
}

/// Print chain data storage info and block period.
pub fn print_chain_data(datadir: &Path, block_period: u64) {
    println!();
    println!(
        "  Chain data stored in: {}",
        datadir.display().to_string().dimmed()
    );
    println!(
        "  PoA-era blocks produced every {} seconds",
        block_period.to_string().cyan()
    );
}

// ── Consensus ──────────────────────────────────────────────────────

/// Print consensus initialization info.
pub fn print_consensus_init(signer_count: usize, epoch: u64, period: u64, mode: &str) {
    println!(
        "  {} Hybrid consensus: {} signers, epoch: {}, period: {}s, mode: {}",
        "OK".green().bold(),
        signer_count.to_string().cyan(),
        epoch.to_string().cyan(),
        period.to_string().cyan(),
        mode.cyan(),
    );
}

/// Print the one-shot notice that the chain crossed its transition height.
pub fn print_transition_reached(block_number: u64) {
    println!(
        "  {} PoS to PoA transition reached at block {}",
        "OK".green().bold(),
        block_number.to_string().cyan(),
    );
}
