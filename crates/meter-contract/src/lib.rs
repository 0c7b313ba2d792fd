//! Meter contract rules.
//!
//! - [`verify`]: public ownership signature check (anyone can verify)
//! - [`TransitionBuilder`]: pure construction of the next state, script and
//!   spend proof for an increment or decrement
//! - [`evaluate_spend`]: the rule a meter script enforces on whatever spends it
//!
//! Nothing in this crate performs I/O; wallets and ledgers call into it.

pub mod error;
pub mod proof;
pub mod transition;
pub mod verifier;

pub use error::{ContractError, ContractResult};
pub use proof::{evaluate_spend, SpendProof, SPEND_PROOF_LEN};
pub use transition::{build_transition, Transition, TransitionBuilder, TransitionRules};
pub use verifier::{verify, verify_signature};
