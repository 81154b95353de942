//! # dilemma-study: Coverage-Balanced Trial Assignment
//!
//! Backend for a behavioral study in which participants rate moral-dilemma
//! trials, optionally after revealing an AI suggestion. Each participant gets
//! blocks of trials from a shared pool; the allocator keeps the number of
//! assignments per trial as even as possible across the whole study.
//!
//! ## Design Principles
//!
//! - **Derived counts**: per-trial coverage is aggregated from the
//!   append-only assignment log, never stored next to the trial
//! - **Least-covered first**: trials are drained bucket by bucket in
//!   ascending count, shuffled within a bucket
//! - **Explicit randomness**: the balancer owns its RNG, seedable for tests
//! - **Serialized allocation**: one lock spans count read and block write
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dilemma_study::request::StartRequest;
//! use dilemma_study::store::MemoryStudyStore;
//! use dilemma_study::Study;
//! use serde_json::json;
//!
//! # async fn example() -> dilemma_study::Result<()> {
//! let store = MemoryStudyStore::with_trials((0..40).map(|i| json!({"dilemma_text": format!("#{i}")})));
//! let study = Study::builder(store).block_size(10).build()?;
//!
//! let started = study.start_session(StartRequest::default()).await?;
//! assert_eq!(started.n_trials, 10);
//!
//! let extended = study.extend_session(started.participant_id).await?;
//! assert_eq!(extended.added, 10);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod coverage;
pub mod error;
pub mod export;
pub mod record;
pub mod request;
pub mod session;
pub mod store;

pub use config::StudyConfig;
pub use error::{Error, Result};
pub use session::{Study, StudyBuilder};
