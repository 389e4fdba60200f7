// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default ceiling for sample bytes held by checked-out traces (4 GiB)
pub const DEFAULT_MEMORY_BUDGET_BYTES: u64 = 4 * 1024 * 1024 * 1024;
/// Trace slots created when the pool first runs dry
pub const DEFAULT_POOL_INITIAL_CAPACITY: usize = 16;
/// Added to the pool's growth step after every exhaustion
pub const DEFAULT_POOL_GROWTH_INCREMENT: usize = 16;
/// Length of a `string` header field declared without an explicit length
pub const DEFAULT_STRING_FIELD_LEN: usize = 32;

/// First character of a line that starts a module
pub const MODULE_SENTINEL: char = '$';
/// First non-blank character of a comment line
pub const COMMENT_SENTINEL: char = '#';
/// Delimiter of `&define` names and `&name&` substitutions
pub const DEFINE_SENTINEL: char = '&';
