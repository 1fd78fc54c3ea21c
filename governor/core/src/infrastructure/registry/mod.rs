// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod file;
pub mod postgres;

pub use file::FileAgentRegistry;
pub use postgres::PostgresAgentRegistry;
