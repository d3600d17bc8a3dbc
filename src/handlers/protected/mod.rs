// handlers/protected/mod.rs - Handlers behind bearer authentication
//
// Every handler here receives the caller's Identity from the
// require_identity middleware and scopes all work to identity.uid.

pub mod auth;
pub mod notes;
pub mod tags;
