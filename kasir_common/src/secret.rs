use std::{
    fmt,
    fmt::{Debug, Display},
};

/// Keeps a sensitive value (an API key, say) out of logs and error messages: both `Debug` and `Display` print
/// `****`, and the only way at the inner value is an explicit [`reveal`](Secret::reveal) call, which is easy to
/// audit for.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Hands out the wrapped value. Call sites should pass the result straight to where it is needed rather
    /// than storing it in an unwrapped form.
    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_are_redacted_when_formatted() {
        let key = Secret::new("DK-very-secret".to_string());
        assert_eq!(format!("{key}"), "****");
        assert_eq!(format!("{key:?}"), "****");
        assert_eq!(key.reveal(), "DK-very-secret");
    }
}
