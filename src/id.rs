use uuid::Uuid;

/// Produces opaque, globally-unique actor ids, kept behind a small type so
/// the generation strategy can change without touching callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator
    }

    pub fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
