//! AEOBRO - Subscription Lifecycle & Entitlement Reconciliation Engine
//!
//! This crate reconciles Stripe webhook events into durable entitlement
//! state: the user's plan, subscription status, and profile visibility.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
