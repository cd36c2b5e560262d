//! Record identity.
//!
//! Persisted records are addressed by a numeric row identity. Values of zero
//! or below mean the record has not been stored yet.

/// A record that carries a numeric row identity.
pub trait Identity {
    /// The row identity, or a value `<= 0` when the record is not persisted.
    fn identity(&self) -> i64;

    /// Whether the record refers to a stored row.
    fn is_persisted(&self) -> bool {
        self.identity() > 0
    }
}

impl Identity for i64 {
    fn identity(&self) -> i64 {
        *self
    }
}

impl<T: Identity + ?Sized> Identity for &T {
    fn identity(&self) -> i64 {
        (**self).identity()
    }
}
