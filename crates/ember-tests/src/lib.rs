//! Integration test suite for EmberChain: full-node lifecycle, gossip
//! convergence between real TCP-connected nodes, and adversarial inputs
//! exercised against the chain engine and wire codec.

pub mod helpers;
