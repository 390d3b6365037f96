//! Snare core library: a scam-engagement honeypot relay.
//!
//! Receives a scammer's message, answers in persona through an LLM, pulls payment
//! identifiers out of the text, and reports findings to an external collector.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod intel;
pub mod llm;
pub mod persona;
pub mod report;
