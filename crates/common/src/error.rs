/// Error types that can be built from a plain message string.
///
/// Implement this for a crate's error type and invoke [`impl_context!`] in
/// its error module to get `.context()` / `.with_context()` on `Result` and
/// `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait.
///
/// Expects `Error: FromMessage` and `type Result<T> = std::result::Result<T, Error>`
/// to be in scope at the invocation site:
///
/// ```ignore
/// // crates/structure/src/error.rs
/// fsbot_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug, PartialEq)]
    struct Error(String);

    impl super::FromMessage for Error {
        fn from_message(message: String) -> Self {
            Self(message)
        }
    }

    type Result<T> = std::result::Result<T, Error>;

    mod ctx {
        use super::{Error, Result};

        crate::impl_context!();
    }

    use ctx::Context;

    #[test]
    fn result_context_prefixes_source() {
        let res: std::result::Result<(), &str> = Err("disk full");
        assert_eq!(
            res.context("writing archive"),
            Err(Error("writing archive: disk full".into()))
        );
    }

    #[test]
    fn option_context_uses_message() {
        let missing: Option<u8> = None;
        assert_eq!(
            missing.with_context(|| "no entries"),
            Err(Error("no entries".into()))
        );
    }
}
