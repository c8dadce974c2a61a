// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]

//! # trimscope
//!
//! A whole-program reachability marking engine for trimming .NET metadata.
//! Given a set of root members, `trimscope` computes the closure of types,
//! methods, fields, attributes and generic instantiations that must be
//! retained, and attaches per-method actions (parse / stub / throw) that
//! drive downstream bytecode rewriting and binary output.
//!
//! ## Architecture
//!
//! - [`metadata`] - The token-addressed metadata graph, its builder, the
//!   precomputed virtual-method maps, and diagnostics
//! - [`assembly`] - The decoded CIL instruction model bodies are scanned in
//! - [`annotations`] - The annotation store holding every bit of state a
//!   marking run produces
//! - [`mark`] - The marking engine: work-list scheduler, structural closure
//!   rules, virtual dispatch resolution, staged attribute queues, and the
//!   reflection-pattern scanner
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trimscope::prelude::*;
//!
//! let mut builder = GraphBuilder::new("App");
//! let core = builder.core_types();
//! let program = builder.class("App", "Program").base(core.object).define();
//! let main = builder.method(program, "Main").static_().public().define();
//! let graph = builder.build();
//!
//! let maps = VirtualMaps::build(&graph);
//! let mut annotations = Annotations::new(&graph, maps);
//! let diagnostics = Arc::new(Diagnostics::new());
//!
//! let mut mark = MarkStep::new(&graph, &mut annotations, diagnostics.clone(), MarkOptions::default());
//! mark.root_method(main);
//! mark.process()?;
//!
//! assert!(annotations.is_marked(main));
//! # Ok::<(), trimscope::Error>(())
//! ```
//!
//! ## Output Contract
//!
//! The marked/instantiated bits and per-method actions on the
//! [`annotations::Annotations`] store are the sole output: a body rewriter
//! reads actions to synthesize stub/throw bodies, and a sweep step reads the
//! marked bits to decide what to remove from the output binary.

#[macro_use]
mod error;

pub mod annotations;
pub mod assembly;
pub mod mark;
pub mod metadata;
pub mod prelude;
pub(crate) mod utils;

pub use error::Error;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
