//! The `services` module defines the traits the client uses to talk to the chain. They are
//! implemented by the adapters and are never implemented by the client itself.
pub mod chain;
pub mod wallet;
