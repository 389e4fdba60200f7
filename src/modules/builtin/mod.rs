// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod control;
pub mod ensemble_keys;
pub mod header_edit;
pub mod header_print;
pub mod header_table;
pub mod resize;
pub mod scale;
pub mod select;
pub mod stack;
pub mod sum;
pub mod synthetic;

pub use control::{Conditional, HeaderRange, Marker};
pub use ensemble_keys::EnsembleKeys;
pub use header_edit::{HeaderDelete, HeaderSet};
pub use header_print::HeaderPrint;
pub use header_table::HeaderTable;
pub use resize::Resize;
pub use scale::Scale;
pub use select::Select;
pub use stack::Stack;
pub use sum::Sum;
pub use synthetic::Synthetic;
