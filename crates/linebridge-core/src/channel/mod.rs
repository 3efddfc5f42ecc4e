//! Messaging channel payload models.
//!
//! linebridge never talks to a channel directly; the orchestration platform
//! relays whatever payload we hand back. Each submodule models one channel's
//! message objects.

pub mod line;
