//! Type-erased container for initialized feature slices.

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// State owned by an installed application, shared across request handlers.
pub trait FeatureSlice: Any + Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// A feature slice ready to be registered in the API state.
#[derive(Debug)]
pub struct InitializedSlice {
    pub id: TypeId,
    pub state: Box<dyn FeatureSlice>,
}

impl InitializedSlice {
    pub fn new<T: FeatureSlice>(state: T) -> Self {
        Self { id: TypeId::of::<T>(), state: Box::new(state) }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.state.name()
    }
}
