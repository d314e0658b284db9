//! # Kirha Client
//!
//! Client for the Kirha tool-planning API.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kirha_client::{PlanningClient, PlanningResult};
//! use kirha_core::{merge, StaticConfig};
//!
//! # async fn example() -> PlanningResult<()> {
//! let client = PlanningClient::new()?;
//! let effective = merge(&StaticConfig::default(), "sk-your-api-key", &Default::default());
//!
//! let plan = client.plan(&effective, "What is the current price of ETH?").await?;
//! println!("{}", serde_json::to_string_pretty(&plan)?);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{PlanningClient, PlanningClientBuilder};
pub use config::ClientConfig;
pub use error::{PlanningError, PlanningResult};

// Re-export the request type for convenience
pub use kirha_core::PlanningRequest;
