//! Subscription Sync - Subscription state reconciliation for Stripe and RevenueCat
//!
//! This crate keeps one unified subscription record per purchase up to date
//! from provider webhooks, and exposes the subscriber endpoints that open a
//! Stripe checkout or cancel the active subscription.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
