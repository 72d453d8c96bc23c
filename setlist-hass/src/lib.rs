//! # setlist-hass: Home Assistant integration
//!
//! Glue between the host-agnostic `setlist-core` model, the `setlist-client`
//! HTTP client, and a Home Assistant instance.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 setlist-hass                  │
//! │  ┌───────────┐   ┌─────────────┐   ┌────────┐ │
//! │  │ Scheduler │──►│ Coordinator │──►│  Sink  │─┼──► POST /api/states/{entity_id}
//! │  └───────────┘   └──────┬──────┘   └────────┘ │
//! │                         │ bridge (entity ids, │
//! │                         │ state payloads)     │
//! │          ┌──────────────┴─────────────┐       │
//! │          ▼                            ▼       │
//! │   setlist-client               setlist-core   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `bridge`: entity ids and state payloads for each user
//! - `sink`: where states go (Home Assistant REST, in-memory)
//! - `coordinator`: one user's fetch → select → format → publish cycle
//! - `scheduler`: per-user timers and forced refreshes
//! - `error`: refresh and publication errors

pub mod bridge;
pub mod coordinator;
pub mod error;
pub mod scheduler;
pub mod sink;

pub use coordinator::{ConcertSource, CoordinatorStatus, RefreshReport, UserCoordinator};
pub use error::{RefreshError, SinkError};
pub use scheduler::{RefreshHandle, Scheduler};
pub use sink::{HassRestSink, MemorySink, StateSink, StateUpdate};
