use std::sync::Arc;

use crate::application::gallery::GalleryService;

#[derive(Clone)]
pub struct ApiState {
    pub gallery: Arc<GalleryService>,
}
