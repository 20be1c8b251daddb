use std::sync::{Arc, RwLock};

/// The container's own logging facility: a clonable note sink the injector
/// supplies natively. Notes are mirrored to `tracing` at debug level.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    notes: Arc<RwLock<Vec<String>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{}", message);
        if let Ok(mut notes) = self.notes.write() {
            notes.push(message);
        }
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes
            .read()
            .map(|notes| notes.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.notes.read().map(|notes| notes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_sink() {
        let diag = Diagnostics::new();
        let clone = diag.clone();

        diag.note("first");
        clone.note("second");

        assert_eq!(diag.notes(), vec!["first".to_string(), "second".to_string()]);
        assert_eq!(clone.len(), 2);
    }
}
