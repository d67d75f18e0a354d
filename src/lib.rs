//! EmbedCord: chat sync client and asset cache worker for the EmbedCord device.
//!
//! SYSTEM CONTEXT
//! ==============
//! The device serves a small message store at `/api/messages` and the built
//! web client. This crate provides the client side of both: a polling chat
//! client with a terminal front end, and a cache-first proxy that keeps the
//! web client usable when the device drops off the network.

pub mod api;
pub mod cache;
pub mod chat;
pub mod config;
pub mod identity;
pub mod message;
pub mod proxy;
pub mod storage;
pub mod terminal;
