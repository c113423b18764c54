// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the Cuepoint application.

pub mod canvas;
pub mod images;
pub mod library;
pub mod properties;
pub mod timeline;
pub mod toolbar;
