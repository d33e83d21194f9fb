use std::{
    error::Error,
    fmt::{Display, Formatter, Result},
};

/// Writes an error followed by its `source()` chain, separated by colons.
pub struct ErrorChainDisplay<'a, E: Error>(pub &'a E);

impl<E: Error> Display for ErrorChainDisplay<'_, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, ": {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}
