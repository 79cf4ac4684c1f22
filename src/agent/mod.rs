//! Agent module - the turn state machine
//!
//! `GraphExecutor` drives one turn: classify the inbound message, let the
//! planner decide, dispatch requested tools, feed results back, and
//! synthesize the final answer. `ContextBuilder` assembles what the planner
//! sees; `ResponseSynthesizer` shapes what the caller gets back.

mod context;
mod executor;
mod synthesizer;
mod types;

pub use context::ContextBuilder;
pub use executor::GraphExecutor;
pub use synthesizer::ResponseSynthesizer;
pub use types::{TurnRequest, TurnResponse};
