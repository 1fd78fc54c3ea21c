// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod decision;
pub mod evaluators;
pub mod facade;
pub mod pipeline;
