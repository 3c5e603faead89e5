use tracing::error;

use crate::modules::testimonial::model::Testimonial;
use crate::services::api::ChatApi;

pub const LOAD_FAILED: &str = "Failed to load testimonials";

/// Landing-page testimonial carousel.
#[derive(Debug, Default)]
pub struct TestimonialFeed {
    items: Vec<Testimonial>,
    current: usize,
    error: Option<String>,
}

impl TestimonialFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&mut self, api: &ChatApi) {
        self.error = None;
        self.current = 0;

        match api.testimonials().await {
            Ok(items) => self.items = items,
            Err(e) => {
                error!(error = %e, "error fetching testimonials");
                self.error = Some(LOAD_FAILED.to_string());
                self.items.clear();
            }
        }
    }

    pub fn next(&mut self) -> Option<&Testimonial> {
        if !self.items.is_empty() {
            self.current = (self.current + 1) % self.items.len();
        }
        self.current()
    }

    pub fn prev(&mut self) -> Option<&Testimonial> {
        if !self.items.is_empty() {
            let len = self.items.len();
            self.current = (self.current + len - 1) % len;
        }
        self.current()
    }

    pub fn current(&self) -> Option<&Testimonial> {
        self.items.get(self.current)
    }

    pub fn items(&self) -> &[Testimonial] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
