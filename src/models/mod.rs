// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation records, drafts and the per-video store.

pub mod annotation;
pub mod draft;
pub mod overlap;
pub mod project;
pub mod store;
