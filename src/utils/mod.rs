/// Hugging Face utilities
pub mod hugging_face;

/// Tensor Utilities
pub mod tensors;

/// Renderer Utilities
pub mod renderer;

/// Utilities for classification tasks
pub mod classes;

/// Learner checkpoint files
pub mod checkpoint;

/// Device selection
pub mod devices;
