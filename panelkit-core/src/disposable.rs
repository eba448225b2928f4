/// A one-shot teardown action returned by every subscription in this crate.
///
/// Dropping a `Disposable` does nothing; teardown only happens through
/// [`Disposable::dispose`], matching how host panels hand out listeners.
#[must_use = "dropping a Disposable leaves the subscription attached"]
pub struct Disposable {
    action: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposable {
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// A disposable with nothing to tear down.
    pub fn empty() -> Self {
        Self { action: None }
    }

    /// Combine several disposables; they are disposed in the given order.
    pub fn from_all(disposables: Vec<Disposable>) -> Self {
        Self::new(move || {
            for d in disposables {
                d.dispose();
            }
        })
    }

    pub fn dispose(mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable")
            .field("armed", &self.action.is_some())
            .finish()
    }
}
