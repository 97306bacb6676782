use crate::Value;

/// One path-qualified validation failure.
///
/// Validation never fails fast: every check that fails
/// appends one of these to the active [`ErrorContext`] and the walk
/// continues, so a struct with two missing mandatory fields reports two
/// errors, not one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path from the root of the value being validated, e.g.
    /// `"address.zip"`. Empty at the root.
    pub path: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail, e.g. the value a validator rejected.
    pub extra: Option<Value>,
}

/// Accumulates [`ValidationError`]s while walking into nested values.
///
/// `derive` mirrors the original's `rpct_derive_error_context`: it
/// produces a child context whose path is extended by one segment and
/// whose error list is the *same* list as the parent's (errors bubble up
/// to a single flat array, regardless of nesting depth).
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    /// Current dotted path.
    pub path: String,
    /// Flat, accumulated error list.
    pub errors: Vec<ValidationError>,
}

impl ErrorContext {
    /// A fresh context rooted at the empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// A child context one segment deeper, sharing this context's error
    /// sink is not possible by value in safe Rust without `&mut`
    /// aliasing, so callers thread a single `ErrorContext` by `&mut self`
    /// through the recursive walk and use [`ErrorContext::with_segment`]
    /// only to compute the extended path for that recursive call.
    pub fn with_segment(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        }
    }

    /// Records an error at the current path.
    pub fn add(&mut self, message: impl Into<String>) {
        self.errors.push(ValidationError { path: self.path.clone(), message: message.into(), extra: None });
    }

    /// Records an error at the current path with structured detail
    /// attached.
    pub fn add_with_extra(&mut self, message: impl Into<String>, extra: Value) {
        self.errors.push(ValidationError {
            path: self.path.clone(),
            message: message.into(),
            extra: Some(extra),
        });
    }

    /// Runs `f` with the path extended by `segment`, restoring the
    /// original path afterwards. `f` receives `&mut self` so it can keep
    /// appending to the same flat error list.
    pub fn scoped<T>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.path, self.with_segment(segment));
        let result = f(self);
        self.path = saved;
        result
    }
}
