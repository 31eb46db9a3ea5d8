// Politely: real-time chat relay with toxicity moderation.
//
// This is the library root. Each module corresponds to a stage of the
// relay: scoring, rephrasing, the pipeline that combines them, and the
// hub that delivers results to live participants.

pub mod config;
pub mod hub;
pub mod moderation;
pub mod output;
pub mod rephrase;
pub mod toxicity;

#[cfg(feature = "web")]
pub mod web;
