//! CLI definition using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use waybill_domain::service::AmountMode;
use waybill_infra::api::ApprovalAction;
use waybill_types::OutputFormat;

#[derive(Parser)]
#[command(name = "waybill")]
#[command(author = "yuuji")]
#[command(version)]
#[command(about = "Freight waybill allocation: CBM shares, amounts, entity totals and fees")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Waybill store directory override
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// API base URL override
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Edit,
    Delete,
}

impl From<ActionArg> for ApprovalAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Edit => ApprovalAction::Edit,
            ActionArg::Delete => ApprovalAction::Delete,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new waybill
    New {
        waybill: String,

        /// Truck capacity in CBM
        #[arg(long)]
        truck_cbm: f64,

        /// Shared rate for all drops
        #[arg(long)]
        rate: Option<f64>,

        /// Amount mode (percentage, per-cbm). Uses config value if not specified.
        #[arg(long)]
        mode: Option<AmountMode>,

        /// Shipper name
        #[arg(long)]
        shipper: Option<String>,
    },

    /// Show a waybill with its allocation
    Show { waybill: String },

    /// List stored waybills
    List,

    /// Add a consignee drop
    AddDrop {
        waybill: String,

        /// Consignee display name, e.g. "ABC - Store 12"
        consignee: String,

        cbm: f64,

        /// Mark as split sub-shipment N
        #[arg(long)]
        split: Option<u32>,

        /// Mark as payload sub-shipment N
        #[arg(long)]
        payload: Option<u32>,
    },

    /// Edit drop fields, e.g. `cbm=12.5` or `percentage=40`
    Set {
        waybill: String,

        /// Drop id, consignee name or 1-based position
        drop: String,

        #[arg(required = true)]
        changes: Vec<String>,
    },

    /// Delete a drop
    DeleteDrop {
        waybill: String,

        /// Drop id, consignee name or 1-based position
        drop: String,
    },

    /// Set the shared rate
    Rate { waybill: String, rate: f64 },

    /// Change truck capacity
    Truck { waybill: String, truck_cbm: f64 },

    /// Rescale percentages to total 100
    Normalize { waybill: String },

    /// Pin an entity at a whole percentage
    RoundEntity { waybill: String, entity: String },

    /// Release a rounded entity
    ResetEntity { waybill: String, entity: String },

    /// Import a waybill document (.toml/.json) or drops from CSV
    Import {
        file: PathBuf,

        /// Target waybill for CSV drops
        #[arg(long)]
        waybill: Option<String>,

        /// Validate only, do not save
        #[arg(long)]
        dry_run: bool,
    },

    /// Export a waybill summary to Excel
    Export {
        waybill: String,

        /// Output Excel file path
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show highest rate, additional-drop fee and total rate
    Fee {
        waybill: String,

        /// Fee per extra drop (overrides config)
        #[arg(long)]
        rate_per_drop: Option<f64>,

        /// Reconcile with the API: its rate per drop, highest rate and
        /// additional adjustment win over the local estimate
        #[arg(long)]
        remote: bool,
    },

    /// Fetch a waybill from the API and store it locally
    Pull {
        waybill: String,

        /// Truck capacity in CBM
        #[arg(long)]
        truck_cbm: f64,
    },

    /// Send drops and entity summaries to the API
    Push { waybill: String },

    /// Show cargo sub-details from the API
    Subdetails { waybill: String },

    /// Request approval to edit or delete a drop and wait for the decision
    Approval {
        waybill: String,

        /// Drop id, consignee name or 1-based position
        drop: Option<String>,

        #[arg(long, value_enum, default_value = "edit")]
        action: ActionArg,

        #[arg(long)]
        reason: Option<String>,

        /// Watch an existing request instead of creating one
        #[arg(long)]
        reference: Option<String>,

        /// Return right after the request is created
        #[arg(long)]
        no_wait: bool,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set API base URL
        #[arg(long)]
        set_api_url: Option<String>,

        /// Set fee per extra drop
        #[arg(long)]
        set_additional_rate: Option<f64>,

        /// Set default amount mode
        #[arg(long)]
        set_amount_mode: Option<AmountMode>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Set waybill store directory
        #[arg(long)]
        set_store_dir: Option<PathBuf>,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}
