use zeroize::Zeroizing;

/// Passphrase source for locking and unlocking secret keys.
///
/// The dynamic variant is only asked when a passphrase is actually needed,
/// e.g. never for keys stored without protection.
#[derive(derive_more::Debug)]
pub enum Password {
    Dynamic(#[debug("Box<Fn>")] Box<dyn Fn() -> Zeroizing<Vec<u8>>>),
    Static(#[debug("***")] Zeroizing<Vec<u8>>),
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::Static(value.into_bytes().into())
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::Static(value.as_bytes().to_vec().into())
    }
}

impl From<&[u8]> for Password {
    fn from(value: &[u8]) -> Self {
        Self::Static(value.to_vec().into())
    }
}

impl Default for Password {
    fn default() -> Self {
        Self::empty()
    }
}

impl Password {
    /// No passphrase. Locking with it stores the key unprotected.
    pub fn empty() -> Self {
        Self::Static(Vec::new().into())
    }

    /// Executes the callback and returns the result.
    pub fn read(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Dynamic(ref f) => f(),
            Self::Static(ref s) => s.clone(),
        }
    }

    /// Like [`read`](Self::read), but maps an empty passphrase to `None`.
    pub fn read_non_empty(&self) -> Option<Zeroizing<Vec<u8>>> {
        let pw = self.read();
        if pw.is_empty() {
            None
        } else {
            Some(pw)
        }
    }
}

impl<F: Fn() -> Zeroizing<Vec<u8>> + 'static> From<F> for Password {
    fn from(value: F) -> Self {
        Self::Dynamic(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_dynamic_is_lazy() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let pw = Password::from(move || {
            c.set(c.get() + 1);
            Zeroizing::new(b"secret".to_vec())
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(&pw.read()[..], b"secret");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_empty() {
        assert!(Password::empty().read_non_empty().is_none());
        assert!(Password::from("").read_non_empty().is_none());
        assert!(Password::from("x").read_non_empty().is_some());
        assert_eq!(format!("{:?}", Password::from("x")), "Static(***)");
    }
}
