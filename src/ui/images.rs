// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Product image textures.
//!
//! One texture per product card, built from picked image bytes right away
//! or from a remote URL once the background fetch returns. An entry follows
//! the product's current image, so replacing the image rebuilds it.

use crate::io::media::decode_image;
use crate::models::annotation::{AnnotationId, ImageRef, ProductCta};
use std::collections::HashMap;

enum ImageState {
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

struct Entry {
    source: String,
    state: ImageState,
}

#[derive(Default)]
pub struct ProductImages {
    entries: HashMap<AnnotationId, Entry>,
}

fn source_key(image: &ImageRef) -> String {
    match image {
        ImageRef::Remote(url) => url.clone(),
        ImageRef::Pending { file_name, bytes } => format!("file:{}:{}", file_name, bytes.len()),
    }
}

impl ProductImages {
    /// Load textures for `products` that have none yet.
    ///
    /// Returns the remote images that still need to be fetched.
    pub fn prepare<'a>(
        &mut self,
        ctx: &egui::Context,
        products: impl IntoIterator<Item = &'a ProductCta>,
    ) -> Vec<(AnnotationId, String)> {
        let mut fetches = Vec::new();
        for product in products {
            let Some(image) = &product.image else {
                self.entries.remove(&product.id);
                continue;
            };
            let source = source_key(image);
            if self.entries.get(&product.id).is_some_and(|e| e.source == source) {
                continue;
            }
            let state = match image {
                ImageRef::Pending { bytes, .. } => texture_from_bytes(ctx, &product.id, bytes),
                ImageRef::Remote(url) => {
                    fetches.push((product.id.clone(), url.clone()));
                    ImageState::Loading
                }
            };
            self.entries.insert(product.id.clone(), Entry { source, state });
        }
        fetches
    }

    /// Store the result of fetching `url` for `id`.
    ///
    /// Ignored when the product switched to another image in the meantime.
    pub fn finish_fetch(
        &mut self,
        ctx: &egui::Context,
        id: &AnnotationId,
        url: &str,
        bytes: Option<&[u8]>,
    ) {
        let Some(entry) = self.entries.get_mut(id).filter(|e| e.source == url) else {
            log::debug!("Dropping stale image {} for {}", url, id);
            return;
        };
        entry.state = match bytes {
            Some(bytes) => texture_from_bytes(ctx, id, bytes),
            None => ImageState::Failed,
        };
    }

    pub fn texture(&self, id: &AnnotationId) -> Option<&egui::TextureHandle> {
        match self.entries.get(id).map(|e| &e.state) {
            Some(ImageState::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn texture_from_bytes(ctx: &egui::Context, id: &AnnotationId, bytes: &[u8]) -> ImageState {
    match decode_image(bytes) {
        Ok(image) => {
            let size = [image.width as usize, image.height as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &image.pixels);
            let texture = ctx.load_texture(
                format!("product-{}", id),
                color_image,
                egui::TextureOptions::LINEAR,
            );
            ImageState::Ready(texture)
        }
        Err(e) => {
            log::warn!("Unreadable image for product {}: {}", id, e);
            ImageState::Failed
        }
    }
}
