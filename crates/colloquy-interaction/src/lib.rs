//! Responder implementations for Colloquy.

pub mod simulated_responder;

pub use simulated_responder::SimulatedResponder;
