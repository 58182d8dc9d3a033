// GSD MCP Server - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod config;
pub mod error;
pub mod paths;

// ============================================================================
// PROTOCOL
// ============================================================================

pub mod mcp;
pub mod protocol;

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Tool argument schemas and validation
pub mod schema;

/// Tool registry and handlers
pub mod tools;

/// Tool lookup, validation and failure isolation
pub mod dispatcher;

/// gsd-tools.js subprocess execution
pub mod runner;

pub mod workflows;
pub mod resources;
pub mod prompts;
