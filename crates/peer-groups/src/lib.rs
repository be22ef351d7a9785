//! # Peer Group Classifier
//!
//! Assigns every provider to the peer groups it is benchmarked against:
//! national, state, hospital type and state plus hospital type.
//!
//! ## Architectural Principles
//!
//! - **Normalize first:** Identifiers are padded to six characters before the
//!   state prefix is read. Reading the prefix of an unpadded identifier puts the
//!   provider in the wrong state.
//! - **Pure:** Classification depends only on the identifier.

pub mod classifier;
pub mod states;

pub use classifier::{Classification, PeerGroupClassifier, hospital_type_for};
pub use states::state_abbreviation;
