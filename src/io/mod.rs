// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations: backend access, media sources and project files.

pub mod api;
pub mod media;
pub mod metadata;
pub mod serialization;
pub mod sync;
