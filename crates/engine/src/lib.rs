//! Analysis orchestration.
//!
//! The engine wires the analyzers into one run: it fetches the enabled
//! custom rules through a [`RuleProvider`], executes each analyzer in a
//! fixed order, back-fills instrument names, and assembles the final
//! report. A failing analyzer never aborts the run; it is reported as
//! incomplete alongside the issues the other passes produced.

#![warn(missing_docs)]

mod generator;
mod provider;

pub use generator::{QueryGenerator, RunOutcome};
pub use provider::{EngineError, Result, RuleProvider, StaticRuleProvider};
